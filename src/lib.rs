//! # Sales Agent
//!
//! A retrieval-augmented question-answering agent over tabular sales data.
//!
//! The pipeline has two halves. `sales clean` normalizes the raw sales CSV
//! into a cleaned file. The agent side turns each cleaned row into a text
//! document, embeds it into an exact similarity index, and answers
//! questions by retrieving the nearest rows and asking a hosted chat model
//! to answer from those rows only.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌─────────────┐
//! │ raw CSV  │──▶│ normalize │──▶│ documents  │──▶│ VectorIndex │
//! └──────────┘   └───────────┘   │  + embed   │   │ + SQLite    │
//!                                └────────────┘   └──────┬──────┘
//!                                                        │ top_k
//!                                 ┌──────────┐   ┌───────▼──────┐
//!                                 │ ChatModel│◀──│  SalesAgent  │
//!                                 └──────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sales clean                   # data/sales.csv → data/cleaned_sales_data.csv
//! sales index                   # embed rows, write data/sales_index/
//! export GROQ_API_KEY=...
//! sales ask "Which product earned the most revenue?"
//! sales chat                    # interactive loop
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber on stderr |
//! | [`models`] | Core data types (re-exported from `sales-agent-core`) |
//! | [`normalize`] | Raw CSV cleaning |
//! | [`stats`] | Cleaning report and summary formatting |
//! | [`embedding`] | Embedding providers |
//! | [`progress`] | Index build progress on stderr |
//! | [`store`] | Index persistence (vector file + SQLite documents) |
//! | [`index_cmd`] | Index build, save, and load |
//! | [`search`] | Retrieval-only search |
//! | [`llm`] | Chat-completion client |
//! | [`agent`] | Retrieve, prompt, generate |
//! | [`repl`] | Interactive question loop |

pub mod agent;
pub mod config;
pub mod embedding;
pub mod index_cmd;
pub mod llm;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod repl;
pub mod search;
pub mod stats;
pub mod store;
