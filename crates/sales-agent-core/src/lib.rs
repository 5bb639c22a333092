//! # Sales Agent Core
//!
//! Pure logic for Sales Agent: record and document models, the document
//! builder, the embedding trait, the in-memory similarity index, and the
//! answer prompt template.
//!
//! This crate contains no tokio, sqlx, filesystem, or network code. The
//! `sales-agent` application crate supplies CSV I/O, embedding backends,
//! index persistence, and the language-model client.

pub mod document;
pub mod embedding;
pub mod index;
pub mod models;
pub mod prompt;
