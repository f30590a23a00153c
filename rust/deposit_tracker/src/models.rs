// src/models.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::error::CalculationError;

// Custom function to convert a JSON string to a NaiveDate
// The API sometimes appends a time part, only the leading date is kept
fn string_to_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let date_part = s.get(..10).unwrap_or(&s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(serde::de::Error::custom)
}

// Define the historical pricing API structure
#[derive(Debug, Deserialize)]
pub struct ContractMetadata {
    pub contract_ticker_symbol: Option<String>,
    pub contract_name: Option<String>,
}

// One daily observation
#[derive(Debug, Deserialize)]
pub struct PriceRecord {
    #[serde(deserialize_with = "string_to_date")]
    pub date: NaiveDate,
    pub price: Option<Decimal>, // null when the API has no quote for the day
    pub contract_metadata: Option<ContractMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct HistoricalPriceData {
    pub quote_currency: Option<String>,
    #[serde(default)]
    pub prices: Vec<PriceRecord>,
}

// Struct for the overall response
#[derive(Debug, Deserialize)]
pub struct HistoricalPriceResponse {
    pub data: Option<HistoricalPriceData>,
    #[serde(default)]
    pub error: bool,
    pub error_message: Option<String>,
}

impl HistoricalPriceResponse {
    /// Flattens the response into observations sorted by ascending date.
    ///
    /// Observations without a price are dropped, they are never read as zero.
    pub fn into_price_points(self, ticker: &str) -> Vec<PricePoint> {
        let records = self.data.map(|data| data.prices).unwrap_or_default();

        let mut points: Vec<PricePoint> = records
            .into_iter()
            .filter_map(|record| match record.price {
                Some(price) => Some(PricePoint {
                    date: record.date,
                    price,
                }),
                None => {
                    warn!(ticker, date = %record.date, "dropping observation without a price");
                    None
                }
            })
            .collect();

        points.sort_by_key(|point| point.date);
        points
    }
}

// Input for a single ticker fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub ticker: String,
    pub quote_currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
}

/// Price in effect on `date`: the observation dated exactly `date`, or else the
/// latest one before it. `points` must be sorted by ascending date.
pub fn price_on(points: &[PricePoint], date: NaiveDate) -> Option<PricePoint> {
    points.iter().rev().find(|point| point.date <= date).copied()
}

/// Portion of the deposit assigned to each ticker.
pub fn allocation_per_ticker(
    deposit: Decimal,
    ticker_count: usize,
) -> Result<Decimal, CalculationError> {
    if ticker_count == 0 {
        return Err(CalculationError::EmptyTickerList);
    }
    Ok(deposit / Decimal::from(ticker_count))
}

// Per-ticker outcome of holding `allocation` over the period
#[derive(Debug, Clone, PartialEq)]
pub struct TickerResult {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub start_price: Decimal,
    pub end_date: NaiveDate,
    pub end_price: Decimal,
    pub min_date: NaiveDate,
    pub min_price: Decimal,
    pub max_date: NaiveDate,
    pub max_price: Decimal,
    pub pct_change: Decimal,
    pub value_start: Decimal,
    pub value_end: Decimal,
    pub value_max: Decimal, // value had the position been sold at the peak
}

impl TickerResult {
    pub fn from_prices(
        query: &PriceQuery,
        allocation: Decimal,
        points: &[PricePoint],
    ) -> Result<Self, CalculationError> {
        let invalid_price = |date: NaiveDate| CalculationError::InvalidPrice {
            ticker: query.ticker.clone(),
            date,
        };
        let overflow = || CalculationError::Overflow {
            ticker: query.ticker.clone(),
        };

        let start = price_on(points, query.start_date)
            .filter(|point| point.price > Decimal::ZERO)
            .ok_or_else(|| invalid_price(query.start_date))?;
        let end = price_on(points, query.end_date)
            .ok_or_else(|| invalid_price(query.end_date))?;

        // Ties keep the earliest date
        let (mut min, mut max) = (start, start);
        for point in points
            .iter()
            .filter(|point| point.date > start.date && point.date <= query.end_date)
        {
            if point.price < min.price {
                min = *point;
            }
            if point.price > max.price {
                max = *point;
            }
        }

        // Value held at `price` when `allocation` was bought at the start price
        let value_at = |price: Decimal| {
            price
                .checked_div(start.price)
                .and_then(|ratio| allocation.checked_mul(ratio))
                .ok_or_else(overflow)
        };

        let pct_change = end
            .price
            .checked_sub(start.price)
            .and_then(|change| change.checked_div(start.price))
            .ok_or_else(overflow)?;
        let value_end = value_at(end.price)?;
        let value_max = value_at(max.price)?;

        Ok(TickerResult {
            ticker: query.ticker.clone(),
            start_date: start.date,
            start_price: start.price,
            end_date: end.date,
            end_price: end.price,
            min_date: min.date,
            min_price: min.price,
            max_date: max.date,
            max_price: max.price,
            pct_change,
            value_start: allocation,
            value_end,
            value_max,
        })
    }

    pub fn profit(&self) -> Decimal {
        self.value_end - self.value_start
    }

    pub fn profit_max(&self) -> Decimal {
        self.value_max - self.value_start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub deposit: Decimal,
    pub per_ticker_allocation: Decimal,
    pub total_value_start: Decimal,
    pub total_value_end: Decimal,
    pub total_value_max: Decimal,
    pub total_pct_change: Decimal,
}

// Custom function to add up one value of every result, naming the ticker that overflows
fn checked_total(
    results: &[TickerResult],
    value: impl Fn(&TickerResult) -> Decimal,
) -> Result<Decimal, CalculationError> {
    results.iter().try_fold(Decimal::ZERO, |total, result| {
        total
            .checked_add(value(result))
            .ok_or_else(|| CalculationError::Overflow {
                ticker: result.ticker.clone(),
            })
    })
}

impl PortfolioSummary {
    pub fn from_results(
        deposit: Decimal,
        per_ticker_allocation: Decimal,
        results: &[TickerResult],
    ) -> Result<Self, CalculationError> {
        if results.is_empty() {
            return Err(CalculationError::EmptyTickerList);
        }

        let total_value_start = checked_total(results, |r| r.value_start)?;
        let total_value_end = checked_total(results, |r| r.value_end)?;
        let total_value_max = checked_total(results, |r| r.value_max)?;

        if total_value_start <= Decimal::ZERO {
            return Err(CalculationError::InvalidDeposit(deposit));
        }
        let total_pct_change = total_value_end
            .checked_sub(total_value_start)
            .and_then(|change| change.checked_div(total_value_start))
            .ok_or_else(|| CalculationError::Overflow {
                ticker: "TOTAL".to_string(),
            })?;

        Ok(PortfolioSummary {
            deposit,
            per_ticker_allocation,
            total_value_start,
            total_value_end,
            total_value_max,
            total_pct_change,
        })
    }

    pub fn total_profit(&self) -> Decimal {
        self.total_value_end - self.total_value_start
    }
}

// Everything a run produces, ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct DepositReport {
    pub quote_currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub results: Vec<TickerResult>,
    pub summary: PortfolioSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("valid test decimal")
    }

    fn point(d: &str, p: &str) -> PricePoint {
        PricePoint {
            date: date(d),
            price: dec(p),
        }
    }

    fn query(ticker: &str, start: &str, end: &str) -> PriceQuery {
        PriceQuery {
            ticker: ticker.to_string(),
            quote_currency: "USD".to_string(),
            start_date: date(start),
            end_date: date(end),
        }
    }

    #[test]
    fn test_ticker_result_gain() {
        let points = vec![
            point("2021-01-01", "10"),
            point("2021-01-02", "18"),
            point("2021-01-03", "8"),
            point("2021-01-04", "15"),
        ];
        let query = query("UNI", "2021-01-01", "2021-01-04");
        let result = TickerResult::from_prices(&query, dec("1000"), &points).unwrap();

        assert_eq!(result.start_price, dec("10"));
        assert_eq!(result.end_price, dec("15"));
        assert_eq!(result.pct_change, dec("0.5"));
        assert_eq!(result.value_start, dec("1000"));
        assert_eq!(result.value_end, dec("1500"));
        assert_eq!(result.max_price, dec("18"));
        assert_eq!(result.max_date, date("2021-01-02"));
        assert_eq!(result.min_price, dec("8"));
        assert_eq!(result.min_date, date("2021-01-03"));
        assert_eq!(result.value_max, dec("1800"));
        assert_eq!(result.profit(), dec("500"));
        assert_eq!(result.profit_max(), dec("800"));
    }

    #[test]
    fn test_flat_price_keeps_value() {
        let points = vec![point("2021-01-01", "5"), point("2021-01-10", "5")];
        let query = query("SUSHI", "2021-01-01", "2021-01-10");
        let result = TickerResult::from_prices(&query, dec("500"), &points).unwrap();

        assert!(result.pct_change.is_zero());
        assert_eq!(result.value_end, result.value_start);
    }

    #[test]
    fn test_min_max_ties_keep_earliest_date() {
        let points = vec![
            point("2021-01-01", "5"),
            point("2021-01-02", "7"),
            point("2021-01-03", "7"),
            point("2021-01-04", "5"),
        ];
        let query = query("BAL", "2021-01-01", "2021-01-04");
        let result = TickerResult::from_prices(&query, dec("100"), &points).unwrap();

        assert_eq!(result.max_date, date("2021-01-02"));
        assert_eq!(result.min_date, date("2021-01-01"));
    }

    #[test]
    fn test_missing_end_date_uses_latest_prior_observation() {
        let points = vec![point("2021-01-01", "2"), point("2021-01-05", "3")];
        let query = query("LRC", "2021-01-01", "2021-01-07");
        let result = TickerResult::from_prices(&query, dec("100"), &points).unwrap();

        assert_eq!(result.end_date, date("2021-01-05"));
        assert_eq!(result.end_price, dec("3"));
    }

    #[test]
    fn test_zero_start_price_is_rejected() {
        let points = vec![point("2021-01-01", "0"), point("2021-01-02", "3")];
        let query = query("BNT", "2021-01-01", "2021-01-02");
        let err = TickerResult::from_prices(&query, dec("100"), &points).unwrap_err();

        match err {
            CalculationError::InvalidPrice { ticker, date: d } => {
                assert_eq!(ticker, "BNT");
                assert_eq!(d, date("2021-01-01"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_no_observation_before_start_is_rejected() {
        let points = vec![point("2021-01-03", "4")];
        let query = query("IDEX", "2021-01-01", "2021-01-05");
        let err = TickerResult::from_prices(&query, dec("100"), &points).unwrap_err();

        assert!(matches!(err, CalculationError::InvalidPrice { .. }));
    }

    #[test]
    fn test_large_deposit_stays_in_range() {
        let points = vec![point("2021-01-01", "10"), point("2021-01-02", "15")];
        let query = query("UNI", "2021-01-01", "2021-01-02");
        let allocation = allocation_per_ticker(dec("10000000000000000000000000000"), 1).unwrap();
        let result = TickerResult::from_prices(&query, allocation, &points).unwrap();

        assert_eq!(result.value_end, dec("15000000000000000000000000000"));
    }

    #[test]
    fn test_value_overflow_is_reported() {
        let points = vec![point("2021-01-01", "10"), point("2021-01-02", "15")];
        let query = query("UNI", "2021-01-01", "2021-01-02");
        let err = TickerResult::from_prices(&query, Decimal::MAX, &points).unwrap_err();

        match err {
            CalculationError::Overflow { ticker } => assert_eq!(ticker, "UNI"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_tiny_start_price_overflow_is_reported() {
        let points = vec![
            point("2021-01-01", "0.0000000000000000000001"),
            point("2021-01-02", "100000"),
        ];
        let query = query("IDEX", "2021-01-01", "2021-01-02");
        let err = TickerResult::from_prices(&query, dec("1000"), &points).unwrap_err();

        assert!(matches!(err, CalculationError::Overflow { ref ticker } if ticker == "IDEX"));
    }

    #[test]
    fn test_allocation_rejects_empty_ticker_list() {
        assert!(matches!(
            allocation_per_ticker(dec("1000"), 0),
            Err(CalculationError::EmptyTickerList)
        ));
        assert_eq!(allocation_per_ticker(dec("1000"), 4).unwrap(), dec("250"));
    }

    #[test]
    fn test_summary_aggregates_results() {
        let uni = TickerResult::from_prices(
            &query("UNI", "2021-01-01", "2021-01-02"),
            dec("500"),
            &[point("2021-01-01", "10"), point("2021-01-02", "15")],
        )
        .unwrap();
        let sushi = TickerResult::from_prices(
            &query("SUSHI", "2021-01-01", "2021-01-02"),
            dec("500"),
            &[point("2021-01-01", "5"), point("2021-01-02", "5")],
        )
        .unwrap();

        let summary =
            PortfolioSummary::from_results(dec("1000"), dec("500"), &[uni, sushi]).unwrap();

        assert_eq!(summary.total_value_start, dec("1000"));
        assert_eq!(summary.total_value_end, dec("1250"));
        assert_eq!(summary.total_pct_change, dec("0.25"));
        assert_eq!(summary.total_profit(), dec("250"));
    }

    #[test]
    fn test_summary_overflow_names_ticker() {
        let allocation = dec("35000000000000000000000000000");
        let doubled = |ticker: &str| {
            TickerResult::from_prices(
                &query(ticker, "2021-01-01", "2021-01-02"),
                allocation,
                &[point("2021-01-01", "1"), point("2021-01-02", "2")],
            )
            .unwrap()
        };
        let results = [doubled("UNI"), doubled("SUSHI")];

        let deposit = dec("70000000000000000000000000000");
        let err = PortfolioSummary::from_results(deposit, allocation, &results).unwrap_err();

        match err {
            CalculationError::Overflow { ticker } => assert_eq!(ticker, "SUSHI"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_response_drops_null_prices_and_sorts() {
        let body = r#"
        {
            "data": {
                "quote_currency": "USD",
                "prices": [
                    {"date": "2021-01-03", "price": 3.5, "contract_metadata": {}},
                    {"date": "2021-01-02", "price": null, "contract_metadata": {}},
                    {"date": "2021-01-01", "price": 2.25, "contract_metadata": {}}
                ]
            },
            "error": false,
            "error_message": null
        }"#;

        let response: HistoricalPriceResponse = serde_json::from_str(body).unwrap();
        let points = response.into_price_points("UNI");

        assert_eq!(
            points,
            vec![point("2021-01-01", "2.25"), point("2021-01-03", "3.5")]
        );
    }
}
