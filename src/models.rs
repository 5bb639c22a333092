//! Re-exports of the core data models.
//!
//! The record, document, and evidence types are defined in
//! `sales-agent-core` so they stay free of I/O dependencies.

pub use sales_agent_core::models::{
    CleanedRow, Document, DocumentMetadata, SalesRecord, SourceRef, ISO_DATE_FORMAT,
};
