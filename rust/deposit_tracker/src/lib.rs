// src/lib.rs

pub mod calculator;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod report;

use crate::calculator::DepositCalculator;
use crate::config::Config;
use crate::error::AppError;
use crate::loader::HistoricalPriceClient;
use crate::models::DepositReport;

// Runs the whole calculation against the live pricing API
pub async fn run(config: &Config) -> Result<DepositReport, AppError> {
    let client = HistoricalPriceClient::new(
        &config.base_url,
        &config.api_key,
        config.request_timeout(),
    )?;

    let calculator = DepositCalculator::new(client)
        .with_max_concurrent_requests(config.max_concurrent_requests);
    let report = calculator.calculate(&config.deposit_request()).await?;
    Ok(report)
}
