//! Index construction: cleaned CSV → documents → embeddings → persisted index.
//!
//! Used directly by `sales index` and implicitly by `sales chat`/`sales ask`
//! through [`load_or_build`], which reuses a persisted index when one
//! exists, was built with the configured embedding model, and still holds
//! exactly the documents rendered from the current cleaned CSV.

use anyhow::{bail, Context, Result};
use std::path::Path;

use sales_agent_core::document::build_documents;
use sales_agent_core::index::VectorIndex;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::models::{CleanedRow, Document};
use crate::progress::{IndexProgressEvent, IndexProgressReporter};
use crate::store;

/// Read the cleaned CSV written by `sales clean`.
///
/// Empty numeric cells become `None`; empty text cells become `""`.
pub fn read_cleaned_rows(path: &Path) -> Result<Vec<CleanedRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| {
            format!(
                "Failed to open cleaned data: {}. Run `sales clean` first.",
                path.display()
            )
        })?;

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<CleanedRow>().enumerate() {
        // Line 1 is the header.
        let row = result.with_context(|| format!("Invalid row at line {}", i + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Embed every document text in batches of `batch_size`, in order.
pub async fn embed_documents(
    provider: &dyn EmbeddingProvider,
    documents: &[Document],
    batch_size: usize,
    progress: &dyn IndexProgressReporter,
) -> Result<Vec<Vec<f32>>> {
    let total = documents.len() as u64;
    let mut vectors = Vec::with_capacity(documents.len());

    for batch in documents.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
        let embedded = provider.embed(&texts).await?;
        if embedded.len() != texts.len() {
            bail!(
                "Embedding provider returned {} vectors for {} texts",
                embedded.len(),
                texts.len()
            );
        }
        vectors.extend(embedded);
        progress.report(IndexProgressEvent::Embedding {
            n: vectors.len() as u64,
            total,
        });
    }

    Ok(vectors)
}

/// Documents rendered from the cleaned CSV at `data.output`.
pub fn load_documents(config: &Config) -> Result<Vec<Document>> {
    let rows = read_cleaned_rows(&config.data.output)?;
    Ok(build_documents(&rows))
}

async fn index_documents(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    documents: Vec<Document>,
    progress: &dyn IndexProgressReporter,
) -> Result<VectorIndex> {
    tracing::info!(
        documents = documents.len(),
        model = provider.model_name(),
        "embedding documents"
    );
    let vectors =
        embed_documents(provider, &documents, config.embedding.batch_size, progress).await?;
    Ok(VectorIndex::build(documents, vectors, config.index.metric)?)
}

/// Build an in-memory index from the cleaned CSV.
pub async fn build_index(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    progress: &dyn IndexProgressReporter,
) -> Result<VectorIndex> {
    let documents = load_documents(config)?;
    index_documents(config, provider, documents, progress).await
}

async fn save(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    index: VectorIndex,
    progress: &dyn IndexProgressReporter,
) -> Result<VectorIndex> {
    progress.report(IndexProgressEvent::Saving {
        path: config.index.path.display().to_string(),
    });
    store::save_index(&config.index.path, &index, provider.model_name()).await?;
    Ok(index)
}

/// Build the index and write it to `index.path`.
pub async fn build_and_save(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    progress: &dyn IndexProgressReporter,
) -> Result<VectorIndex> {
    let index = build_index(config, provider, progress).await?;
    save(config, provider, index, progress).await
}

/// Whether `index` holds exactly `documents`, in order, by text hash.
pub fn is_current(index: &VectorIndex, documents: &[Document]) -> bool {
    index.len() == documents.len()
        && index
            .documents()
            .iter()
            .zip(documents)
            .all(|(stored, current)| {
                store::text_hash(&stored.text) == store::text_hash(&current.text)
            })
}

/// Load the persisted index, or build and save one when absent or `rebuild` is set.
///
/// A persisted index built with a different embedding model (or width) is
/// an error: its vectors are not comparable with new query embeddings.
/// One whose documents no longer match the cleaned CSV is rebuilt. When
/// the cleaned CSV is gone, the persisted index is used as is.
pub async fn load_or_build(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    rebuild: bool,
    progress: &dyn IndexProgressReporter,
) -> Result<VectorIndex> {
    let dir = &config.index.path;
    if rebuild || !store::index_exists(dir) {
        if rebuild {
            tracing::info!("rebuilding index at {}", dir.display());
        } else {
            tracing::info!("no index at {}, building one", dir.display());
        }
        return build_and_save(config, provider, progress).await;
    }

    let (index, meta) = store::load_index(dir).await?;
    if meta.embedding_model != provider.model_name() {
        bail!(
            "Index at {} was built with embedding model '{}', but '{}' is configured. \
             Run `sales index` or `sales chat --rebuild` to rebuild it.",
            dir.display(),
            meta.embedding_model,
            provider.model_name()
        );
    }
    if !index.is_empty() && index.dims() != provider.dims() {
        bail!(
            "Index at {} has {}-dimensional vectors, the embedding provider produces {}. \
             Run `sales index` to rebuild it.",
            dir.display(),
            index.dims(),
            provider.dims()
        );
    }

    if config.data.output.exists() {
        let documents = load_documents(config)?;
        if !is_current(&index, &documents) {
            tracing::info!(
                indexed = index.len(),
                current = documents.len(),
                "cleaned data changed since {}, rebuilding index",
                meta.created_at
            );
            let index = index_documents(config, provider, documents, progress).await?;
            return save(config, provider, index, progress).await;
        }
    } else {
        tracing::warn!(
            "cleaned data {} not found, using the persisted index as is",
            config.data.output.display()
        );
    }

    tracing::info!(
        documents = index.len(),
        created_at = %meta.created_at,
        "loaded index from {}",
        dir.display()
    );
    Ok(index)
}

/// Run the `index` command.
pub async fn run_index(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    progress: &dyn IndexProgressReporter,
) -> Result<()> {
    let index = build_and_save(config, provider, progress).await?;
    println!(
        "✓ Indexed {} documents ({} dims, {}) into '{}'",
        index.len(),
        index.dims(),
        index.metric(),
        config.index.path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn doc(text: &str) -> Document {
        build_documents(&[CleanedRow {
            order_id: text.to_string(),
            ..CleanedRow::default()
        }])
        .remove(0)
    }

    #[tokio::test]
    async fn embeds_in_batches_and_keeps_order() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        let docs = vec![doc("a"), doc("bb"), doc("ccc"), doc("dddd"), doc("eeeee")];

        let vectors = embed_documents(&provider, &docs, 2, &NoProgress).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(vectors.len(), 5);
        for (d, v) in docs.iter().zip(&vectors) {
            assert_eq!(v[0], d.text.len() as f32);
        }
    }

    #[test]
    fn reads_cleaned_csv_with_empty_cells() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cleaned.csv");
        std::fs::write(
            &path,
            "Order ID,Date,Product,Price,Quantity,Purchase Type,Payment Method,Manager,City,Revenue\n\
             O1,2024-01-01,Widget,10.0,2,Online,Card,Ana,Lisbon,20.0\n\
             O2,2024-01-02,Gadget,,,Online,Card,Bo,\n",
        )
        .unwrap();
        // The second row is short; csv requires equal lengths by default.
        assert!(read_cleaned_rows(&path).is_err());

        std::fs::write(
            &path,
            "Order ID,Date,Product,Price,Quantity,Purchase Type,Payment Method,Manager,City,Revenue\n\
             O1,2024-01-01,Widget,10.0,2,Online,Card,Ana,Lisbon,20.0\n\
             O2,2024-01-02,Gadget,,,Online,Card,Bo,,\n",
        )
        .unwrap();
        let rows = read_cleaned_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].price, Some(10.0));
        assert_eq!(rows[0].quantity, Some(2));
        assert_eq!(rows[1].price, None);
        assert_eq!(rows[1].city, "");
        assert_eq!(rows[1].revenue, None);
    }

    #[tokio::test]
    async fn current_check_compares_documents_in_order() {
        let docs = vec![doc("a"), doc("b")];
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        let vectors = embed_documents(&provider, &docs, 8, &NoProgress).await.unwrap();
        let index =
            VectorIndex::build(docs.clone(), vectors, sales_agent_core::index::Metric::L2).unwrap();

        assert!(is_current(&index, &docs));
        assert!(!is_current(&index, &[doc("a")]));
        assert!(!is_current(&index, &[doc("b"), doc("a")]));
        assert!(!is_current(&index, &[doc("a"), doc("c")]));
    }

    #[test]
    fn missing_cleaned_file_points_at_clean() {
        let err = read_cleaned_rows(Path::new("/nonexistent/cleaned.csv")).unwrap_err();
        assert!(err.to_string().contains("sales clean"));
    }
}
