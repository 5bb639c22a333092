//! Document builder: turns one cleaned row into one retrieval document.
//!
//! Rendering is a pure function of the row. The field order and labels are
//! fixed because embeddings (and therefore search order) depend on the
//! exact text; changing either invalidates every persisted index.
//!
//! ```rust
//! use sales_agent_core::document::render_text;
//! use sales_agent_core::models::CleanedRow;
//!
//! let row = CleanedRow {
//!     order_id: "O1".to_string(),
//!     price: Some(10.0),
//!     quantity: Some(2),
//!     revenue: Some(20.0),
//!     ..Default::default()
//! };
//! let text = render_text(&row);
//! assert!(text.starts_with("Order ID: O1\n"));
//! assert!(text.ends_with("Revenue: 20"));
//! ```

use crate::models::{CleanedRow, Document, DocumentMetadata};

/// Placeholder rendered for any absent value.
pub const MISSING_VALUE: &str = "N/A";

fn text_or_missing(value: &str) -> &str {
    if value.is_empty() {
        MISSING_VALUE
    } else {
        value
    }
}

fn number_or_missing<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| MISSING_VALUE.to_string())
}

/// Render the `Label: value` listing for a row.
pub fn render_text(row: &CleanedRow) -> String {
    let pieces = [
        format!("Order ID: {}", text_or_missing(&row.order_id)),
        format!("Date: {}", text_or_missing(&row.date)),
        format!("Product: {}", text_or_missing(&row.product)),
        format!("Price: {}", number_or_missing(row.price)),
        format!("Quantity: {}", number_or_missing(row.quantity)),
        format!("Purchase Type: {}", text_or_missing(&row.purchase_type)),
        format!("Payment Method: {}", text_or_missing(&row.payment_method)),
        format!("Manager: {}", text_or_missing(&row.manager)),
        format!("City: {}", text_or_missing(&row.city)),
        format!("Revenue: {}", number_or_missing(row.revenue)),
    ];
    pieces.join("\n")
}

pub fn build_metadata(row: &CleanedRow) -> DocumentMetadata {
    DocumentMetadata {
        order_id: row.order_id.clone(),
        product: row.product.clone(),
        date: row.date.clone(),
        manager: row.manager.clone(),
        city: row.city.clone(),
        price: row.price,
        quantity: row.quantity,
        revenue: row.revenue,
    }
}

pub fn build_document(row: &CleanedRow) -> Document {
    Document {
        text: render_text(row),
        metadata: build_metadata(row),
    }
}

/// Build one document per row, preserving row order.
pub fn build_documents(rows: &[CleanedRow]) -> Vec<Document> {
    rows.iter().map(build_document).collect()
}
