//! Summary statistics for cleaned sales data.
//!
//! Produces the report `sales clean` prints after saving: record count,
//! date range, total revenue, and revenue per product.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::{SalesRecord, ISO_DATE_FORMAT};

#[derive(Debug, Clone, PartialEq)]
pub struct CleaningSummary {
    pub record_count: usize,
    /// `(min, max)` date, `None` when there are no records.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub total_revenue: f64,
    /// Revenue per product, highest first; equal totals sort by name.
    pub revenue_by_product: Vec<(String, f64)>,
}

pub fn summarize(records: &[SalesRecord]) -> CleaningSummary {
    let date_range = records
        .iter()
        .map(|r| r.date)
        .min()
        .zip(records.iter().map(|r| r.date).max());

    let mut by_product: BTreeMap<&str, f64> = BTreeMap::new();
    for r in records {
        *by_product.entry(r.product.as_str()).or_insert(0.0) += r.revenue();
    }
    let mut revenue_by_product: Vec<(String, f64)> = by_product
        .into_iter()
        .map(|(p, v)| (p.to_string(), v))
        .collect();
    revenue_by_product.sort_by(|a, b| b.1.total_cmp(&a.1));

    CleaningSummary {
        record_count: records.len(),
        date_range,
        total_revenue: records.iter().map(|r| r.revenue()).sum(),
        revenue_by_product,
    }
}

/// Format a count with thousands separators: `1234567` → `"1,234,567"`.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Format an amount as dollars with cents: `12345.678` → `"$12,345.68"`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{}${}.{:02}",
        sign,
        format_number(cents / 100),
        cents % 100
    )
}

pub fn render_missing_counts(missing: &[(&str, usize)]) -> String {
    let width = missing.iter().map(|(c, _)| c.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (column, count) in missing {
        let _ = writeln!(out, "{:<width$}  {}", column, count, width = width);
    }
    out
}

pub fn render_summary(summary: &CleaningSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Data Summary:");
    match summary.date_range {
        Some((min, max)) => {
            let _ = writeln!(
                out,
                "Date range: {} to {}",
                min.format(ISO_DATE_FORMAT),
                max.format(ISO_DATE_FORMAT)
            );
        }
        None => {
            let _ = writeln!(out, "Date range: n/a");
        }
    }
    let _ = writeln!(
        out,
        "Total records: {}",
        format_number(summary.record_count as u64)
    );
    let _ = writeln!(
        out,
        "Total revenue: {}",
        format_currency(summary.total_revenue)
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Top products by revenue:");
    let width = summary
        .revenue_by_product
        .iter()
        .map(|(p, _)| p.len())
        .max()
        .unwrap_or(0);
    for (product, revenue) in &summary.revenue_by_product {
        let _ = writeln!(
            out,
            "  {:<width$}  {}",
            product,
            format_currency(*revenue),
            width = width
        );
    }
    out
}
