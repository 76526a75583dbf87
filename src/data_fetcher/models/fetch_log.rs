use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One fetch attempt or outcome in the per-kind fetch log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl FetchLogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        FetchLogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}
