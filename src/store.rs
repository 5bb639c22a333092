//! On-disk persistence for the similarity index.
//!
//! An index directory holds two artifacts:
//!
//! | File | Contents |
//! |------|----------|
//! | `vectors.bin` | Binary vector file (see [`VectorIndex::encode_vectors`]) |
//! | `documents.sqlite` | One row per document plus an `index_meta` row |
//!
//! The index is written once per build: [`save_index`] deletes any previous
//! artifacts before writing. [`load_index`] verifies that the two halves
//! agree (counts, metric, SHA-256 of every document text) before joining
//! them back into a [`VectorIndex`].

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use sales_agent_core::index::{Metric, VectorIndex};

use crate::models::{Document, DocumentMetadata};

pub const VECTORS_FILE: &str = "vectors.bin";
pub const DOCUMENTS_FILE: &str = "documents.sqlite";

/// Build parameters recorded alongside a persisted index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMeta {
    pub embedding_model: String,
    pub dims: usize,
    pub count: usize,
    pub metric: Metric,
    pub created_at: String,
}

fn vectors_path(dir: &Path) -> PathBuf {
    dir.join(VECTORS_FILE)
}

fn documents_path(dir: &Path) -> PathBuf {
    dir.join(DOCUMENTS_FILE)
}

/// Whether both index artifacts are present in `dir`.
pub fn index_exists(dir: &Path) -> bool {
    vectors_path(dir).is_file() && documents_path(dir).is_file()
}

pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

async fn connect(db_path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(create)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open document store: {}", db_path.display()))?;

    Ok(pool)
}

async fn create_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            position INTEGER PRIMARY KEY,
            order_id TEXT NOT NULL,
            product TEXT NOT NULL,
            date TEXT NOT NULL,
            manager TEXT NOT NULL,
            city TEXT NOT NULL,
            price REAL,
            quantity INTEGER,
            revenue REAL,
            text TEXT NOT NULL,
            text_hash TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            embedding_model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            count INTEGER NOT NULL,
            metric TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

/// Write `index` to `dir`, replacing whatever was there.
pub async fn save_index(dir: &Path, index: &VectorIndex, embedding_model: &str) -> Result<IndexMeta> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create index directory: {}", dir.display()))?;

    let db_path = documents_path(dir);
    remove_if_exists(&vectors_path(dir))?;
    remove_if_exists(&db_path)?;
    remove_if_exists(&dir.join(format!("{}-wal", DOCUMENTS_FILE)))?;
    remove_if_exists(&dir.join(format!("{}-shm", DOCUMENTS_FILE)))?;

    let meta = IndexMeta {
        embedding_model: embedding_model.to_string(),
        dims: index.dims(),
        count: index.len(),
        metric: index.metric(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    let pool = connect(&db_path, true).await?;
    create_tables(&pool).await?;

    let mut tx = pool.begin().await?;
    for (position, doc) in index.documents().iter().enumerate() {
        let m = &doc.metadata;
        sqlx::query(
            r#"
            INSERT INTO documents
                (position, order_id, product, date, manager, city,
                 price, quantity, revenue, text, text_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(position as i64)
        .bind(&m.order_id)
        .bind(&m.product)
        .bind(&m.date)
        .bind(&m.manager)
        .bind(&m.city)
        .bind(m.price)
        .bind(m.quantity)
        .bind(m.revenue)
        .bind(&doc.text)
        .bind(text_hash(&doc.text))
        .execute(&mut *tx)
        .await?;
    }
    sqlx::query(
        "INSERT INTO index_meta (id, embedding_model, dims, count, metric, created_at)
         VALUES (1, ?, ?, ?, ?, ?)",
    )
    .bind(&meta.embedding_model)
    .bind(meta.dims as i64)
    .bind(meta.count as i64)
    .bind(meta.metric.as_str())
    .bind(&meta.created_at)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    pool.close().await;

    std::fs::write(vectors_path(dir), index.encode_vectors())
        .with_context(|| format!("Failed to write {}", vectors_path(dir).display()))?;

    tracing::info!(
        documents = meta.count,
        dims = meta.dims,
        metric = %meta.metric,
        "saved index to {}",
        dir.display()
    );
    Ok(meta)
}

/// Read and verify a persisted index.
pub async fn load_index(dir: &Path) -> Result<(VectorIndex, IndexMeta)> {
    if !index_exists(dir) {
        bail!(
            "No index found in {}. Run `sales index` first.",
            dir.display()
        );
    }

    let pool = connect(&documents_path(dir), false).await?;

    let meta_row = sqlx::query(
        "SELECT embedding_model, dims, count, metric, created_at FROM index_meta WHERE id = 1",
    )
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| anyhow::anyhow!("Index metadata missing in {}", dir.display()))?;

    let metric_name: String = meta_row.get("metric");
    let meta = IndexMeta {
        embedding_model: meta_row.get("embedding_model"),
        dims: meta_row.get::<i64, _>("dims") as usize,
        count: meta_row.get::<i64, _>("count") as usize,
        metric: Metric::from_str(&metric_name)?,
        created_at: meta_row.get("created_at"),
    };

    let rows = sqlx::query(
        r#"
        SELECT position, order_id, product, date, manager, city,
               price, quantity, revenue, text, text_hash
        FROM documents
        ORDER BY position
        "#,
    )
    .fetch_all(&pool)
    .await?;
    pool.close().await;

    let mut documents = Vec::with_capacity(rows.len());
    for (expected, row) in rows.iter().enumerate() {
        let position: i64 = row.get("position");
        if position != expected as i64 {
            bail!("Document store is corrupt: gap at position {}", expected);
        }
        let text: String = row.get("text");
        let stored_hash: String = row.get("text_hash");
        if text_hash(&text) != stored_hash {
            bail!(
                "Document store is corrupt: text hash mismatch at position {}",
                position
            );
        }
        documents.push(Document {
            text,
            metadata: DocumentMetadata {
                order_id: row.get("order_id"),
                product: row.get("product"),
                date: row.get("date"),
                manager: row.get("manager"),
                city: row.get("city"),
                price: row.get("price"),
                quantity: row.get("quantity"),
                revenue: row.get("revenue"),
            },
        });
    }

    if documents.len() != meta.count {
        bail!(
            "Document store holds {} documents, index metadata says {}",
            documents.len(),
            meta.count
        );
    }

    let bytes = std::fs::read(vectors_path(dir))
        .with_context(|| format!("Failed to read {}", vectors_path(dir).display()))?;
    let stored = VectorIndex::decode_vectors(&bytes)?;
    if stored.metric != meta.metric {
        bail!(
            "Vector file metric ({}) does not match index metadata ({})",
            stored.metric,
            meta.metric
        );
    }

    let index = VectorIndex::from_parts(documents, stored)?;
    if !index.is_empty() && index.dims() != meta.dims {
        bail!(
            "Vector file has {} dimensions, index metadata says {}",
            index.dims(),
            meta.dims
        );
    }

    Ok((index, meta))
}
