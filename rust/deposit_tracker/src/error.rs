// src/error.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalculationError {
    #[error("ticker list is empty, nothing to allocate the deposit to")]
    EmptyTickerList,
    #[error("invalid date range: start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("deposit must be positive, got {0}")]
    InvalidDeposit(Decimal),
    #[error("ticker {ticker}: no usable price for {date}")]
    InvalidPrice { ticker: String, date: NaiveDate },
    #[error("ticker {ticker}: value is too large to represent")]
    Overflow { ticker: String },
    #[error("ticker {ticker}: upstream request failed: {reason}")]
    UpstreamRequest { ticker: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("environment variable {name}={value:?} is invalid: {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("configuration is invalid: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

// Everything the binary can fail with
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Calculation(#[from] CalculationError),
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
