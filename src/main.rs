//! # Sales Agent CLI (`sales`)
//!
//! Cleans a raw sales CSV, builds a similarity index over the cleaned rows,
//! and answers questions about them with a retrieval-grounded chat model.
//!
//! ## Usage
//!
//! ```bash
//! sales --config ./config/sales.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sales clean` | Clean the raw CSV and print a data summary |
//! | `sales index` | Embed the cleaned rows and persist the index |
//! | `sales search "<query>"` | Show the rows a question would retrieve |
//! | `sales ask "<question>"` | Answer one question |
//! | `sales chat` | Interactive question loop |
//!
//! ## Examples
//!
//! ```bash
//! # Clean a specific file
//! sales clean --input raw/sales.csv --output data/cleaned_sales_data.csv
//!
//! # Inspect retrieval without calling the model
//! sales search "Lisbon card payments" --limit 10
//!
//! # Ask with a freshly rebuilt index
//! GROQ_API_KEY=... sales chat --rebuild
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use sales_agent::agent::SalesAgent;
use sales_agent::config::{self, Config};
use sales_agent::embedding;
use sales_agent::index_cmd;
use sales_agent::llm::OpenAiChatClient;
use sales_agent::logging;
use sales_agent::normalize;
use sales_agent::progress::ProgressMode;
use sales_agent::repl;
use sales_agent::search;

const DEFAULT_CONFIG_PATH: &str = "./config/sales.toml";

/// Sales Agent CLI: question answering over sales data.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/sales.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "sales",
    about = "Sales Agent: retrieval-grounded question answering over sales data",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/sales.toml`; when that file does not exist,
    /// built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the raw sales CSV.
    ///
    /// Trims fields, parses dates and numbers, derives revenue, drops rows
    /// with missing values, sorts by date, and writes the cleaned CSV.
    Clean {
        /// Raw CSV to read (overrides `data.input`).
        #[arg(long)]
        input: Option<PathBuf>,

        /// Cleaned CSV to write (overrides `data.output`).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Build and persist the similarity index from the cleaned CSV.
    ///
    /// Replaces any existing index in `index.path`.
    Index {
        /// Progress output on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<ProgressMode>,
    },

    /// Show the rows retrieved for a query, without asking the model.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a single question.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Answer questions interactively until `exit`, `quit`, or end of input.
    Chat {
        /// Rebuild the index before starting, even if one exists.
        #[arg(long)]
        rebuild: bool,
    },
}

fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => config::load_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                config::load_config(default)
            } else {
                tracing::debug!("no config at {}, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Config::default())
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let cfg = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Clean { input, output } => {
            normalize::run_clean(&cfg, input, output)?;
        }
        Commands::Index { progress } => {
            let provider = embedding::create_provider(&cfg.embedding)?;
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            index_cmd::run_index(&cfg, provider.as_ref(), mode.reporter().as_ref()).await?;
        }
        Commands::Search { query, limit } => {
            let provider = embedding::create_provider(&cfg.embedding)?;
            let reporter = ProgressMode::default_for_tty().reporter();
            let index =
                index_cmd::load_or_build(&cfg, provider.as_ref(), false, reporter.as_ref()).await?;
            search::run_search(&cfg, &index, provider.as_ref(), &query, limit).await?;
        }
        Commands::Ask { question } => {
            let llm = OpenAiChatClient::from_config(&cfg.llm)?;
            let provider = embedding::create_provider(&cfg.embedding)?;
            let reporter = ProgressMode::default_for_tty().reporter();
            let index =
                index_cmd::load_or_build(&cfg, provider.as_ref(), false, reporter.as_ref()).await?;

            let agent = SalesAgent::new(&index, provider.as_ref(), &llm, &cfg);
            let answer = agent.answer(&question).await?;
            repl::write_answer(&mut std::io::stdout().lock(), &answer)?;
        }
        Commands::Chat { rebuild } => {
            let llm = OpenAiChatClient::from_config(&cfg.llm)?;
            let provider = embedding::create_provider(&cfg.embedding)?;
            let reporter = ProgressMode::default_for_tty().reporter();
            let index =
                index_cmd::load_or_build(&cfg, provider.as_ref(), rebuild, reporter.as_ref())
                    .await?;

            let agent = SalesAgent::new(&index, provider.as_ref(), &llm, &cfg);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            repl::run_repl(&agent, stdin, &mut std::io::stdout()).await?;
        }
    }

    Ok(())
}
