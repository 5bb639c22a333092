//! Record normalizer: the `sales clean` pipeline.
//!
//! Reads the raw sales CSV, trims every field, parses dates and numbers,
//! derives revenue, drops incomplete rows, sorts by date, and writes the
//! cleaned CSV that the agent pipeline consumes.
//!
//! # Steps
//!
//! 1. Trim whitespace on every field; an empty field counts as missing.
//! 2. Parse `Date` as `DD-MM-YYYY`. A present but malformed date aborts the run.
//! 3. Parse `Price` and `Quantity`; malformed numbers abort the run.
//! 4. Derive `Revenue = Price × Quantity` (any input `Revenue` column is ignored).
//! 5. Count missing values per column, then drop every incomplete row.
//! 6. Stable-sort by date.
//!
//! Nothing is written unless every step succeeds.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{SalesRecord, ISO_DATE_FORMAT};
use crate::stats;

/// Day-month-year format of the raw `Date` column.
pub const INPUT_DATE_FORMAT: &str = "%d-%m-%Y";

/// Columns the raw CSV must provide, in output order.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "Order ID",
    "Date",
    "Product",
    "Price",
    "Quantity",
    "Purchase Type",
    "Payment Method",
    "Manager",
    "City",
];

/// Columns of the cleaned CSV.
pub const OUTPUT_COLUMNS: [&str; 10] = [
    "Order ID",
    "Date",
    "Product",
    "Price",
    "Quantity",
    "Purchase Type",
    "Payment Method",
    "Manager",
    "City",
    "Revenue",
];

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("input is missing required column '{0}'")]
    MissingColumn(String),
    #[error("line {line}: cannot parse date '{value}' (expected DD-MM-YYYY)")]
    InvalidDate { line: u64, value: String },
    #[error("line {line}: cannot parse {column} '{value}' as a number")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },
}

/// One input row after trimming. `None` marks a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// 1-based line number in the input file (header is line 1).
    pub line: u64,
    pub order_id: Option<String>,
    pub date: Option<String>,
    pub product: Option<String>,
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub purchase_type: Option<String>,
    pub payment_method: Option<String>,
    pub manager: Option<String>,
    pub city: Option<String>,
}

/// Outcome of a cleaning run.
#[derive(Debug, Clone)]
pub struct CleaningReport {
    /// Surviving rows, sorted by date.
    pub records: Vec<SalesRecord>,
    /// Rows read from the input.
    pub input_rows: usize,
    /// Missing-value count per output column, before dropping.
    pub missing: Vec<(&'static str, usize)>,
    /// Rows removed because at least one value was missing.
    pub dropped: usize,
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Read and trim raw rows from CSV input.
pub fn read_raw_records<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut positions = [0usize; 9];
    for (slot, column) in positions.iter_mut().zip(REQUIRED_COLUMNS.iter()) {
        *slot = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| NormalizeError::MissingColumn(column.to_string()))?;
    }
    for extra in headers
        .iter()
        .filter(|h| !REQUIRED_COLUMNS.contains(&h.as_str()))
    {
        warn!(column = %extra, "ignoring column not used by the cleaned schema");
    }

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.context("Failed to read CSV record")?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let field = |i: usize| trimmed(record.get(positions[i]));
        rows.push(RawRecord {
            line,
            order_id: field(0),
            date: field(1),
            product: field(2),
            price: field(3),
            quantity: field(4),
            purchase_type: field(5),
            payment_method: field(6),
            manager: field(7),
            city: field(8),
        });
    }
    Ok(rows)
}

fn parse_date(line: u64, value: &str) -> Result<NaiveDate, NormalizeError> {
    NaiveDate::parse_from_str(value, INPUT_DATE_FORMAT).map_err(|_| NormalizeError::InvalidDate {
        line,
        value: value.to_string(),
    })
}

fn parse_price(line: u64, value: &str) -> Result<f64, NormalizeError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| NormalizeError::InvalidNumber {
            line,
            column: "Price",
            value: value.to_string(),
        })
}

/// Quantities are integers; a whole float such as `2.0` is accepted.
fn parse_quantity(line: u64, value: &str) -> Result<i64, NormalizeError> {
    if let Ok(q) = value.parse::<i64>() {
        return Ok(q);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
        _ => Err(NormalizeError::InvalidNumber {
            line,
            column: "Quantity",
            value: value.to_string(),
        }),
    }
}

fn parse_opt<T>(
    value: &Option<String>,
    parse: impl Fn(&str) -> Result<T, NormalizeError>,
) -> Result<Option<T>, NormalizeError> {
    value.as_deref().map(parse).transpose()
}

/// Clean trimmed rows: parse, derive revenue, drop incomplete rows, sort.
pub fn clean_records(raw: Vec<RawRecord>) -> Result<CleaningReport, NormalizeError> {
    let input_rows = raw.len();
    let mut missing = [0usize; 10];
    let mut records = Vec::with_capacity(input_rows);

    for row in raw {
        let line = row.line;
        let date = parse_opt(&row.date, |v| parse_date(line, v))?;
        let price = parse_opt(&row.price, |v| parse_price(line, v))?;
        let quantity = parse_opt(&row.quantity, |v| parse_quantity(line, v))?;

        let present = [
            row.order_id.is_some(),
            date.is_some(),
            row.product.is_some(),
            price.is_some(),
            quantity.is_some(),
            row.purchase_type.is_some(),
            row.payment_method.is_some(),
            row.manager.is_some(),
            row.city.is_some(),
            price.is_some() && quantity.is_some(),
        ];
        for (count, ok) in missing.iter_mut().zip(present.iter()) {
            if !ok {
                *count += 1;
            }
        }

        if let (
            Some(order_id),
            Some(date),
            Some(product),
            Some(price),
            Some(quantity),
            Some(purchase_type),
            Some(payment_method),
            Some(manager),
            Some(city),
        ) = (
            row.order_id,
            date,
            row.product,
            price,
            quantity,
            row.purchase_type,
            row.payment_method,
            row.manager,
            row.city,
        ) {
            records.push(SalesRecord::new(
                order_id,
                date,
                product,
                price,
                quantity,
                purchase_type,
                payment_method,
                manager,
                city,
            ));
        }
    }

    // sort_by_key is stable: same-day orders keep their input order.
    records.sort_by_key(|r| r.date);

    let dropped = input_rows - records.len();
    Ok(CleaningReport {
        records,
        input_rows,
        missing: OUTPUT_COLUMNS.iter().copied().zip(missing).collect(),
        dropped,
    })
}

/// Write cleaned records as CSV with the [`OUTPUT_COLUMNS`] header.
pub fn write_records<W: Write>(writer: W, records: &[SalesRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(OUTPUT_COLUMNS)?;
    for r in records {
        csv_writer.write_record([
            r.order_id.clone(),
            r.date.format(ISO_DATE_FORMAT).to_string(),
            r.product.clone(),
            r.price.to_string(),
            r.quantity.to_string(),
            r.purchase_type.clone(),
            r.payment_method.clone(),
            r.manager.clone(),
            r.city.clone(),
            r.revenue().to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Clean `input` and write the result to `output`.
pub fn clean_file(input: &Path, output: &Path) -> Result<CleaningReport> {
    let file = std::fs::File::open(input)
        .with_context(|| format!("Failed to open input file: {}", input.display()))?;
    let raw = read_raw_records(file)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    let report = clean_records(raw)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let out = std::fs::File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    write_records(std::io::BufWriter::new(out), &report.records)?;

    info!(
        rows = report.input_rows,
        kept = report.records.len(),
        dropped = report.dropped,
        "cleaned sales data"
    );
    Ok(report)
}

/// Run the `clean` command: clean, print the report, save.
pub fn run_clean(config: &Config, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let input = input.unwrap_or_else(|| config.data.input.clone());
    let output = output.unwrap_or_else(|| config.data.output.clone());

    let report = clean_file(&input, &output)?;

    println!("Missing values before handling:");
    print!("{}", stats::render_missing_counts(&report.missing));
    println!();
    print!("{}", stats::render_summary(&stats::summarize(&report.records)));
    println!();
    println!("✓ Cleaned data saved to '{}'", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Order ID,Date,Product,Price,Quantity,Purchase Type,Payment Method,Manager,City\n";

    fn clean_csv(body: &str) -> Result<CleaningReport> {
        let raw = read_raw_records(format!("{}{}", HEADER, body).as_bytes())?;
        Ok(clean_records(raw)?)
    }

    #[test]
    fn widget_row_gets_revenue() {
        let report = clean_csv("O1,01-01-2024,Widget,10,2,Online,Card,Ana,Lisbon\n").unwrap();
        assert_eq!(report.records.len(), 1);
        let r = &report.records[0];
        assert_eq!(r.revenue(), 20.0);
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn trims_whitespace_on_every_field() {
        let report =
            clean_csv("  O1 , 01-01-2024 ,  Widget ,10, 2 , Online ,Card ,  Ana,Lisbon  \n")
                .unwrap();
        let r = &report.records[0];
        assert_eq!(r.order_id, "O1");
        assert_eq!(r.product, "Widget");
        assert_eq!(r.manager, "Ana");
        assert_eq!(r.city, "Lisbon");
    }

    #[test]
    fn drops_rows_with_missing_values_and_counts_them() {
        let report = clean_csv(
            "O1,01-01-2024,Widget,10,2,Online,Card,Ana,Lisbon\n\
             O2,02-01-2024,Widget,10,2,Online,Card,Ana,\n\
             O3,03-01-2024,Gadget,,1,Online,Card,Ana,Porto\n",
        )
        .unwrap();
        assert_eq!(report.input_rows, 3);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.dropped, 2);
        assert!(report.records.iter().all(|r| r.order_id == "O1"));

        let count = |col: &str| {
            report
                .missing
                .iter()
                .find(|(c, _)| *c == col)
                .map(|(_, n)| *n)
                .unwrap()
        };
        assert_eq!(count("City"), 1);
        assert_eq!(count("Price"), 1);
        assert_eq!(count("Revenue"), 1);
        assert_eq!(count("Order ID"), 0);
    }

    #[test]
    fn whitespace_only_field_counts_as_missing() {
        let report = clean_csv("O1,01-01-2024,Widget,10,2,Online,Card,   ,Lisbon\n").unwrap();
        assert!(report.records.is_empty());
    }

    #[test]
    fn sorts_by_date_and_keeps_ties_in_input_order() {
        let report = clean_csv(
            "A,05-03-2024,Widget,1,1,Online,Card,Ana,Lisbon\n\
             B,01-03-2024,Widget,1,1,Online,Card,Ana,Lisbon\n\
             C,05-03-2024,Widget,1,1,Online,Card,Ana,Lisbon\n\
             D,01-03-2024,Widget,1,1,Online,Card,Ana,Lisbon\n",
        )
        .unwrap();
        let ids: Vec<&str> = report.records.iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn malformed_date_aborts_with_line_number() {
        let err = clean_csv(
            "O1,01-01-2024,Widget,10,2,Online,Card,Ana,Lisbon\n\
             O2,2024/01/02,Widget,10,2,Online,Card,Ana,Lisbon\n",
        )
        .unwrap_err();
        let err = err.downcast::<NormalizeError>().unwrap();
        match err {
            NormalizeError::InvalidDate { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "2024/01/02");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn malformed_price_aborts() {
        let err = clean_csv("O1,01-01-2024,Widget,ten,2,Online,Card,Ana,Lisbon\n").unwrap_err();
        assert!(err.to_string().contains("Price"));
    }

    #[test]
    fn whole_float_quantity_is_accepted() {
        let report = clean_csv("O1,01-01-2024,Widget,2.5,4.0,Online,Card,Ana,Lisbon\n").unwrap();
        assert_eq!(report.records[0].quantity, 4);
        assert_eq!(report.records[0].revenue(), 10.0);
        assert!(clean_csv("O1,01-01-2024,Widget,2.5,4.5,Online,Card,Ana,Lisbon\n").is_err());
    }

    #[test]
    fn missing_required_column_is_reported() {
        let err = read_raw_records("Order ID,Date\nO1,01-01-2024\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Product"));
    }

    #[test]
    fn input_revenue_column_is_ignored() {
        let csv = "Order ID,Date,Product,Price,Quantity,Purchase Type,Payment Method,Manager,City,Revenue\n\
                   O1,01-01-2024,Widget,10,2,Online,Card,Ana,Lisbon,999\n";
        let report = clean_records(read_raw_records(csv.as_bytes()).unwrap()).unwrap();
        assert_eq!(report.records[0].revenue(), 20.0);
    }

    #[test]
    fn writes_iso_dates_and_revenue_column() {
        let report = clean_csv("O1,01-01-2024,Widget,10,2,Online,Card,Ana,Lisbon\n").unwrap();
        let mut out = Vec::new();
        write_records(&mut out, &report.records).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Order ID,Date,Product,Price,Quantity,Purchase Type,Payment Method,Manager,City,Revenue\n\
             O1,2024-01-01,Widget,10,2,Online,Card,Ana,Lisbon,20\n"
        );
    }

    #[test]
    fn missing_input_file_is_fatal_and_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("cleaned.csv");

        let err = clean_file(Path::new("/nonexistent.csv"), &output).unwrap_err();
        assert!(err.to_string().contains("Failed to open input file"));
        assert!(!output.exists());
    }
}
