use clap::Parser;
use miette::Result;

use accessible_routes::{commands, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();
    log::debug!("accessible-routes {}", accessible_routes::VERSION);

    commands::run(cli).await
}
