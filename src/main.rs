use anyhow::Result;
use log::{error, info};

use tracer_monitor::cli::{build_cli, handle_subcommands};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    info!("☀️  Tracer Monitor v{}", tracer_monitor::VERSION);

    if let Err(e) = handle_subcommands(&matches).await {
        error!("❌ {}", e);
        return Err(e.into());
    }

    Ok(())
}
