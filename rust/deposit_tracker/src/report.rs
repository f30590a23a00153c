// src/report.rs

use std::fmt::Write;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{DepositReport, TickerResult};

const CHART_WIDTH: usize = 40;

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

// Changes too large to scale to a percentage are shown as a multiple
fn percent(ratio: Decimal) -> String {
    match ratio.checked_mul(Decimal::ONE_HUNDRED) {
        Some(pct) => format!("{:+.2}%", pct.round_dp(2)),
        None => format!("{:+.2}x", ratio.round_dp(2)),
    }
}

fn row(result: &TickerResult) -> [String; 11] {
    [
        result.ticker.clone(),
        format!("{} @ {}", result.start_price, result.start_date),
        format!("{} @ {}", result.end_price, result.end_date),
        format!("{} @ {}", result.min_price, result.min_date),
        format!("{} @ {}", result.max_price, result.max_date),
        percent(result.pct_change),
        money(result.value_start),
        money(result.value_end),
        money(result.value_max),
        money(result.profit()),
        money(result.profit_max()),
    ]
}

/// One row per ticker plus a total row, columns padded to their widest cell.
pub fn render_table(report: &DepositReport) -> String {
    let header = [
        "ticker", "start", "end", "min", "max", "change", "value start", "value end", "value max",
        "profit", "profit max",
    ]
    .map(String::from);

    let summary = &report.summary;
    let total = [
        "TOTAL".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        percent(summary.total_pct_change),
        money(summary.total_value_start),
        money(summary.total_value_end),
        money(summary.total_value_max),
        money(summary.total_profit()),
        money(summary.total_value_max - summary.total_value_start),
    ];

    let mut rows = vec![header];
    rows.extend(report.results.iter().map(row));
    rows.push(total);

    let mut widths = [0usize; 11];
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Deposit {} {} split {} ways ({} each), {} to {}",
        money(summary.deposit),
        report.quote_currency,
        report.results.len(),
        money(summary.per_ticker_allocation),
        report.start_date,
        report.end_date
    );
    for (index, cells) in rows.iter().enumerate() {
        let line: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .enumerate()
            .map(|(column, (cell, width))| {
                // Ticker column left aligned, numbers right aligned
                if column == 0 {
                    format!("{:<width$}", cell, width = width)
                } else {
                    format!("{:>width$}", cell, width = width)
                }
            })
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
        if index == 0 || index == rows.len() - 2 {
            let rule_len = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
            let _ = writeln!(out, "{}", "-".repeat(rule_len));
        }
    }
    out
}

fn bar(value: Decimal, scale: Decimal) -> String {
    if scale.is_zero() {
        return String::new();
    }
    let len = (value.abs() / scale * Decimal::from(CHART_WIDTH))
        .round()
        .to_usize()
        .unwrap_or(0);
    let fill = if value.is_sign_negative() { '-' } else { '#' };
    std::iter::repeat(fill).take(len).collect()
}

/// Horizontal bar chart of the profit at the end date and at the peak.
///
/// Bars are scaled to the largest absolute profit, losses are drawn with `-`.
pub fn render_chart(report: &DepositReport) -> String {
    let scale = report
        .results
        .iter()
        .flat_map(|r| [r.profit().abs(), r.profit_max().abs()])
        .max()
        .unwrap_or(Decimal::ZERO);
    let label_width = report
        .results
        .iter()
        .map(|r| r.ticker.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Profit from {} to {}, {}",
        report.start_date, report.end_date, report.quote_currency
    );
    for result in &report.results {
        for (label, series, value) in [
            (result.ticker.as_str(), "last", result.profit()),
            ("", "max ", result.profit_max()),
        ] {
            let _ = writeln!(
                out,
                "{:<lw$} {} |{:<cw$}| {:>12}",
                label,
                series,
                bar(value, scale),
                money(value),
                lw = label_width,
                cw = CHART_WIDTH
            );
        }
    }
    out
}
