use crate::data_fetcher::models::FeedKind;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, ValueEnum};

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}

/// Which feeds `--once` refreshes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Lifts,
    Webcams,
    All,
}

impl KindArg {
    pub fn kinds(self) -> Vec<FeedKind> {
        match self {
            KindArg::Lifts => vec![FeedKind::Lifts],
            KindArg::Webcams => vec![FeedKind::Webcams],
            KindArg::All => FeedKind::ALL.to_vec(),
        }
    }
}

/// Whether logs should stay off stdout.
///
/// `--once` prints its JSON summary to stdout, so unless `--debug` is set
/// logs go to the file only.
pub fn is_quiet_mode(args: &Args) -> bool {
    args.once && !args.debug
}

/// Whistler Blackcomb lift status and webcam feed
///
/// Fetches lift status from the vendor API or the resort pages, normalizes
/// it, caches it on disk and serves it over HTTP.
///
/// By default the server runs until Ctrl-C and refreshes every feed on a
/// fixed interval. With --once each feed is refreshed a single time and a
/// JSON summary is printed.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
pub struct Args {
    /// Refresh the selected feeds once, print a JSON summary and exit.
    #[arg(short, long)]
    pub once: bool,

    /// Feeds to refresh with --once.
    #[arg(long, value_enum, default_value_t = KindArg::All, requires = "once")]
    pub kind: KindArg,

    /// Serve without the periodic refresh. Feeds are still fetched on demand.
    #[arg(long = "no-schedule", help_heading = "Server")]
    pub no_schedule: bool,

    /// Address to listen on, e.g. 0.0.0.0:3001.
    #[arg(long, value_name = "ADDR", help_heading = "Server")]
    pub bind: Option<String>,

    /// Directory holding the cached snapshots and fetch logs.
    #[arg(long = "data-dir", value_name = "DIR", help_heading = "Server")]
    pub data_dir: Option<String>,

    /// Path to the configuration file.
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// List current configuration settings
    #[arg(long = "list-config", short = 'l', help_heading = "Configuration")]
    pub list_config: bool,

    /// Also log to stdout in --once mode and lower the default level to debug.
    #[arg(long = "debug", help_heading = "Debug")]
    pub debug: bool,

    /// Specify a custom log file path. If not provided, logs will be written to the default location.
    #[arg(long = "log-file", help_heading = "Debug")]
    pub log_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_run_the_server() {
        let args = Args::parse_from(["lift_feed"]);
        assert!(!args.once);
        assert_eq!(args.kind, KindArg::All);
        assert!(!is_quiet_mode(&args));
    }

    #[test]
    fn test_once_with_kind() {
        let args = Args::parse_from(["lift_feed", "--once", "--kind", "webcams"]);
        assert!(is_quiet_mode(&args));
        assert_eq!(args.kind.kinds(), vec![FeedKind::Webcams]);
    }

    #[test]
    fn test_kind_requires_once() {
        assert!(Args::try_parse_from(["lift_feed", "--kind", "lifts"]).is_err());
    }

    #[test]
    fn test_debug_once_logs_to_stdout() {
        let args = Args::parse_from(["lift_feed", "--once", "--debug"]);
        assert!(!is_quiet_mode(&args));
    }

    #[test]
    fn test_server_overrides() {
        let args = Args::parse_from([
            "lift_feed",
            "--bind",
            "0.0.0.0:8080",
            "--data-dir",
            "/tmp/feeds",
            "--no-schedule",
        ]);
        assert_eq!(args.bind.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(args.data_dir.as_deref(), Some("/tmp/feeds"));
        assert!(args.no_schedule);
    }
}
