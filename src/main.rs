use clap::Parser;
use lift_feed::app;
use lift_feed::cli::Args;
use lift_feed::commands::{apply_cli_overrides, handle_list_config_command, run_once};
use lift_feed::config::Config;
use lift_feed::error::AppError;
use lift_feed::logging::setup_logging;
use lift_feed::service::FeedService;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    let config_path = Config::resolve_path(args.config.as_deref());
    let mut config = Config::load(Some(config_path.as_str())).await?;
    apply_cli_overrides(&mut config, &args)?;

    if args.list_config {
        handle_list_config_command(&config, &config_path);
        return Ok(());
    }

    // The guard must be kept alive for the duration of the program
    // to ensure logs are flushed properly
    let (log_file_path, guard) = setup_logging(&args, Some(&config)).await?;
    tracing::info!("Logs are being written to: {log_file_path}");

    if args.once {
        let service = FeedService::from_config(&config).await?;
        let summary = run_once(&service, &args.kind.kinds()).await;
        println!("{}", serde_json::to_string_pretty(&summary)?);

        if summary.all_failed() {
            drop(guard);
            std::process::exit(1);
        }
        return Ok(());
    }

    app::run_server(&config, !args.no_schedule).await
}
