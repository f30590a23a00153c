// src/config.rs

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use validator::{Validate, ValidationError};

use crate::calculator::{DepositRequest, DEFAULT_MAX_CONCURRENT_REQUESTS};
use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://api.covalenthq.com";
pub const DEFAULT_TICKERS: &str = "UNI,SUSHI,BAL,LRC,BNT,IDEX";
pub const DEFAULT_QUOTE_CURRENCY: &str = "USD";
pub const DEFAULT_START_DATE: &str = "2021-01-01";
pub const DEFAULT_END_DATE: &str = "2021-04-19";
pub const DEFAULT_DEPOSIT: &str = "1000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_positive"))
    }
}

// Operator-editable settings, read from the environment or a `.env` file
#[derive(Clone, Validate)]
pub struct Config {
    #[validate(length(min = 1))]
    pub api_key: String,
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub tickers: Vec<String>,
    #[validate(length(min = 2, max = 10))]
    pub quote_currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(custom(function = "validate_positive"))]
    pub deposit: Decimal,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
    #[validate(range(min = 1))]
    pub max_concurrent_requests: usize,
}

// Keeps the key out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("tickers", &self.tickers)
            .field("quote_currency", &self.quote_currency)
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("deposit", &self.deposit)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .finish()
    }
}

// Custom function to parse a variable, falling back to a default when unset
fn parse_var<T, L>(lookup: &L, name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    L: Fn(&str) -> Option<String>,
{
    let value = lookup(name).unwrap_or_else(|| default.to_string());
    value.trim().parse::<T>().map_err(|err| ConfigError::InvalidVar {
        name,
        value: value.clone(),
        reason: err.to_string(),
    })
}

// Custom function to parse a YYYY-MM-DD variable
fn parse_date_var<L>(
    lookup: &L,
    name: &'static str,
    default: &str,
) -> Result<NaiveDate, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    let value = lookup(name).unwrap_or_else(|| default.to_string());
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|err| ConfigError::InvalidVar {
        name,
        value: value.clone(),
        reason: err.to_string(),
    })
}

pub fn parse_tickers(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|ticker| ticker.trim().to_uppercase())
        .filter(|ticker| !ticker.is_empty())
        .collect()
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any name -> value source.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("API_KEY").ok_or(ConfigError::MissingVar("API_KEY"))?;
        let base_url = lookup("PRICING_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let tickers =
            parse_tickers(&lookup("TICKERS").unwrap_or_else(|| DEFAULT_TICKERS.to_string()));
        let quote_currency = lookup("QUOTE_CURRENCY")
            .unwrap_or_else(|| DEFAULT_QUOTE_CURRENCY.to_string())
            .trim()
            .to_uppercase();

        let config = Config {
            api_key: api_key.trim().to_string(),
            base_url: base_url.trim().to_string(),
            tickers,
            quote_currency,
            start_date: parse_date_var(&lookup, "START_DATE", DEFAULT_START_DATE)?,
            end_date: parse_date_var(&lookup, "END_DATE", DEFAULT_END_DATE)?,
            deposit: parse_var(&lookup, "DEPOSIT", DEFAULT_DEPOSIT)?,
            request_timeout_secs: parse_var(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
            )?,
            max_concurrent_requests: parse_var(
                &lookup,
                "MAX_CONCURRENT_REQUESTS",
                &DEFAULT_MAX_CONCURRENT_REQUESTS.to_string(),
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn deposit_request(&self) -> DepositRequest {
        DepositRequest {
            tickers: self.tickers.clone(),
            quote_currency: self.quote_currency.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            deposit: self.deposit,
        }
    }
}
