// src/calculator.rs

use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::CalculationError;
use crate::loader::PriceFetcher;
use crate::models::{
    allocation_per_ticker, DepositReport, PortfolioSummary, PriceQuery, TickerResult,
};

pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

// Inputs of one run
#[derive(Debug, Clone, PartialEq)]
pub struct DepositRequest {
    pub tickers: Vec<String>,
    pub quote_currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub deposit: Decimal,
}

impl DepositRequest {
    // Rejects inputs that would make the computation meaningless
    pub fn check(&self) -> Result<(), CalculationError> {
        if self.tickers.is_empty() {
            return Err(CalculationError::EmptyTickerList);
        }
        if self.start_date > self.end_date {
            return Err(CalculationError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.deposit <= Decimal::ZERO {
            return Err(CalculationError::InvalidDeposit(self.deposit));
        }
        Ok(())
    }

    pub fn queries(&self) -> Vec<PriceQuery> {
        self.tickers
            .iter()
            .map(|ticker| PriceQuery {
                ticker: ticker.clone(),
                quote_currency: self.quote_currency.clone(),
                start_date: self.start_date,
                end_date: self.end_date,
            })
            .collect()
    }
}

/// Splits a deposit evenly across tickers and works out what each share,
/// and the whole, would be worth at the end of the period.
pub struct DepositCalculator<F> {
    fetcher: F,
    max_concurrent_requests: usize,
}

impl<F: PriceFetcher> DepositCalculator<F> {
    pub fn new(fetcher: F) -> Self {
        DepositCalculator {
            fetcher,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    pub fn with_max_concurrent_requests(mut self, max_concurrent_requests: usize) -> Self {
        self.max_concurrent_requests = max_concurrent_requests.max(1);
        self
    }

    /// Validates the request, fetches every ticker and aggregates the results.
    ///
    /// Nothing is fetched when validation fails. Results keep the order of
    /// `request.tickers`, and the first failing ticker aborts the run.
    pub async fn calculate(
        &self,
        request: &DepositRequest,
    ) -> Result<DepositReport, CalculationError> {
        request.check()?;
        let allocation = allocation_per_ticker(request.deposit, request.tickers.len())?;
        let queries = request.queries();

        let results: Vec<TickerResult> = stream::iter(queries.iter())
            .map(|query| async move {
                let points = self.fetcher.fetch(query).await?;
                let result = TickerResult::from_prices(query, allocation, &points)?;
                debug!(
                    ticker = %result.ticker,
                    start_price = %result.start_price,
                    end_price = %result.end_price,
                    pct_change = %result.pct_change,
                    "ticker result"
                );
                Ok::<_, CalculationError>(result)
            })
            .buffered(self.max_concurrent_requests)
            .try_collect()
            .await?;

        let summary = PortfolioSummary::from_results(request.deposit, allocation, &results)?;

        Ok(DepositReport {
            quote_currency: request.quote_currency.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            results,
            summary,
        })
    }
}
