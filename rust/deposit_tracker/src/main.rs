// src/main.rs

use std::process::ExitCode;

use deposit_tracker::config::Config;
use deposit_tracker::report::{render_chart, render_table};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    info!(?config, "starting deposit calculation");

    match deposit_tracker::run(&config).await {
        Ok(report) => {
            println!("{}", render_table(&report));
            println!("{}", render_chart(&report));
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
