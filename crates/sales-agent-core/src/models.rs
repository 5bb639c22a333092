//! Core data models shared by the cleaning and agent pipelines.
//!
//! [`SalesRecord`] is the strict, fully-typed row produced by the cleaning
//! step. [`CleanedRow`] is the lenient shape the agent reads back from the
//! cleaned CSV, where every field may be absent. Documents and their
//! metadata are derived from a single [`CleanedRow`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used in the cleaned CSV and in rendered documents.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// One sales transaction after cleaning.
///
/// `revenue` is always derived from `price × quantity` in [`SalesRecord::new`];
/// a revenue value present in the input is never trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub order_id: String,
    pub date: NaiveDate,
    pub product: String,
    pub price: f64,
    pub quantity: i64,
    pub purchase_type: String,
    pub payment_method: String,
    pub manager: String,
    pub city: String,
    revenue: f64,
}

impl SalesRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: String,
        date: NaiveDate,
        product: String,
        price: f64,
        quantity: i64,
        purchase_type: String,
        payment_method: String,
        manager: String,
        city: String,
    ) -> Self {
        let revenue = price * quantity as f64;
        Self {
            order_id,
            date,
            product,
            price,
            quantity,
            purchase_type,
            payment_method,
            manager,
            city,
            revenue,
        }
    }

    pub fn revenue(&self) -> f64 {
        self.revenue
    }
}

/// A row of the cleaned CSV as read by the agent pipeline.
///
/// Field names map onto the CSV header written by the cleaning step. Text
/// fields are empty when the cell is empty; numeric fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedRow {
    #[serde(rename = "Order ID", default)]
    pub order_id: String,
    #[serde(rename = "Date", default)]
    pub date: String,
    #[serde(rename = "Product", default)]
    pub product: String,
    #[serde(rename = "Price", default)]
    pub price: Option<f64>,
    #[serde(rename = "Quantity", default)]
    pub quantity: Option<i64>,
    #[serde(rename = "Purchase Type", default)]
    pub purchase_type: String,
    #[serde(rename = "Payment Method", default)]
    pub payment_method: String,
    #[serde(rename = "Manager", default)]
    pub manager: String,
    #[serde(rename = "City", default)]
    pub city: String,
    #[serde(rename = "Revenue", default)]
    pub revenue: Option<f64>,
}

impl From<&SalesRecord> for CleanedRow {
    fn from(record: &SalesRecord) -> Self {
        Self {
            order_id: record.order_id.clone(),
            date: record.date.format(ISO_DATE_FORMAT).to_string(),
            product: record.product.clone(),
            price: Some(record.price),
            quantity: Some(record.quantity),
            purchase_type: record.purchase_type.clone(),
            payment_method: record.payment_method.clone(),
            manager: record.manager.clone(),
            city: record.city.clone(),
            revenue: Some(record.revenue()),
        }
    }
}

/// Structured metadata stored alongside each document.
///
/// Numeric fields are `None` when the source row lacked them; they are
/// never defaulted to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub order_id: String,
    pub product: String,
    pub date: String,
    pub manager: String,
    pub city: String,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub revenue: Option<f64>,
}

/// A retrieval unit: the rendered text of one row plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// The subset of metadata returned as evidence with an answer.
    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            order_id: self.metadata.order_id.clone(),
            product: self.metadata.product.clone(),
            date: self.metadata.date.clone(),
            city: self.metadata.city.clone(),
        }
    }
}

/// Evidence record printed with every answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub order_id: String,
    pub product: String,
    pub date: String,
    pub city: String,
}
