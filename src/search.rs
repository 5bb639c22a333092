//! Retrieval-only search: `sales search "<query>"`.
//!
//! Runs the same embedding and nearest-neighbour lookup the agent uses,
//! without calling the answering model, and prints ranked hits with their
//! distances. Useful for checking what context a question would receive.

use anyhow::Result;

use sales_agent_core::embedding::{embed_query, EmbeddingProvider};
use sales_agent_core::index::{SearchHit, VectorIndex};

use crate::config::Config;

pub async fn search<'a>(
    index: &'a VectorIndex,
    provider: &dyn EmbeddingProvider,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchHit<'a>>> {
    let vector = embed_query(provider, query).await?;
    Ok(index.search(&vector, limit)?)
}

pub async fn run_search(
    config: &Config,
    index: &VectorIndex,
    provider: &dyn EmbeddingProvider,
    query: &str,
    limit: Option<usize>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let limit = limit.unwrap_or(config.retrieval.top_k);
    let hits = search(index, provider, query, limit).await?;
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let m = &hit.document.metadata;
        println!(
            "{}. [{:.4}] {} / {}",
            i + 1,
            hit.distance,
            m.order_id,
            m.product
        );
        println!("    date: {}", m.date);
        println!("    city: {}", m.city);
        println!("    manager: {}", m.manager);
        if let Some(revenue) = m.revenue {
            println!("    revenue: {}", revenue);
        }
        println!();
    }
    Ok(())
}
