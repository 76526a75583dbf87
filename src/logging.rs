use crate::cli::{Args, is_quiet_mode};
use crate::config::Config;
use crate::error::AppError;
use std::io::stdout;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILE_NAME: &str = "lift_feed.log";

fn env_filter(debug: bool) -> Result<EnvFilter, AppError> {
    let directive = if debug { "lift_feed=debug" } else { "lift_feed=info" };
    let directive = directive
        .parse()
        .map_err(|e| AppError::log_setup_error(format!("Invalid log directive: {e}")))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Splits the configured log path into directory and file name.
///
/// `--log-file` wins over the config file; without either, the default log
/// directory is used.
pub fn resolve_log_target(args: &Args, config: Option<&Config>) -> (String, String) {
    let custom_log_path = args
        .log_file
        .as_ref()
        .or_else(|| config.and_then(|c| c.log_file_path.as_ref()));

    match custom_log_path {
        Some(custom_path) => {
            let path = Path::new(custom_path);
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(DEFAULT_LOG_FILE_NAME);
            (parent.to_string_lossy().to_string(), file_name.to_string())
        }
        None => (
            Config::get_log_dir_path(),
            DEFAULT_LOG_FILE_NAME.to_string(),
        ),
    }
}

/// Sets up logging for the process.
///
/// - Server mode logs to stdout and a daily rolling file
/// - `--once` without `--debug` logs to the file only, keeping stdout for
///   the JSON summary
/// - `RUST_LOG` adds directives on top of the `lift_feed=info` default
///
/// Returns the log file path and the guard that must be kept alive for the
/// duration of the program to ensure proper log flushing.
pub async fn setup_logging(
    args: &Args,
    config: Option<&Config>,
) -> Result<(String, WorkerGuard), AppError> {
    let (log_dir, log_file_name) = resolve_log_target(args, config);

    if !Path::new(&log_dir).exists() {
        tokio::fs::create_dir_all(&log_dir).await.map_err(|e| {
            AppError::log_setup_error(format!("Failed to create log directory: {e}"))
        })?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, &log_file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::Layer::new()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(env_filter(args.debug)?);

    let registry = tracing_subscriber::registry().with(file_layer);
    let initialized = if is_quiet_mode(args) {
        registry.try_init()
    } else {
        registry
            .with(
                fmt::Layer::new()
                    .with_writer(stdout)
                    .with_ansi(true)
                    .with_filter(env_filter(args.debug)?),
            )
            .try_init()
    };
    initialized.map_err(|e| AppError::log_setup_error(e.to_string()))?;

    let log_file_path = format!("{log_dir}/{log_file_name}");
    Ok((log_file_path, guard))
}
