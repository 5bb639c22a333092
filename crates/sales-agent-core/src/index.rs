//! Exact nearest-neighbour index over document embeddings.
//!
//! The index is built once from all documents and is read-only afterwards.
//! Search is a brute-force scan, which is exact and keeps ordering fully
//! deterministic: results are sorted by ascending distance and equal
//! distances keep insertion order.
//!
//! # Vector File Format
//!
//! [`VectorIndex::encode_vectors`] produces the on-disk vector artifact:
//!
//! ```text
//! magic  "SAIX"          4 bytes
//! version u32 LE         4 bytes
//! metric  u8             1 byte   (0 = l2, 1 = cosine)
//! dims    u32 LE         4 bytes
//! count   u64 LE         8 bytes
//! data    count × dims × f32 LE
//! ```
//!
//! Documents are persisted separately by the application; [`VectorIndex::from_parts`]
//! joins the two halves back together.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::embedding::{blob_to_vec, cosine_similarity, squared_l2, vec_to_blob};
use crate::models::Document;

const MAGIC: &[u8; 4] = b"SAIX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 1 + 4 + 8;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("document count ({documents}) does not match vector count ({vectors})")]
    CountMismatch { documents: usize, vectors: usize },
    #[error("vector {position} has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },
    #[error("query vector has {actual} dimensions, index expects {expected}")]
    QueryDimension { expected: usize, actual: usize },
    #[error("embedding vectors must not be empty")]
    EmptyVector,
    #[error("unknown distance metric: '{0}'. Must be l2 or cosine.")]
    UnknownMetric(String),
    #[error("corrupt vector file: {0}")]
    Corrupt(String),
}

/// Distance metric used to rank documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// `1 - cosine_similarity`.
    Cosine,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::L2 => "l2",
            Metric::Cosine => "cosine",
        }
    }

    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::L2 => squared_l2(a, b),
            Metric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Metric::L2 => 0,
            Metric::Cosine => 1,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, IndexError> {
        match tag {
            0 => Ok(Metric::L2),
            1 => Ok(Metric::Cosine),
            other => Err(IndexError::Corrupt(format!("unknown metric tag {}", other))),
        }
    }
}

impl FromStr for Metric {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l2" => Ok(Metric::L2),
            "cosine" => Ok(Metric::Cosine),
            other => Err(IndexError::UnknownMetric(other.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search result: a borrowed document and its distance to the query.
#[derive(Debug, Clone, Copy)]
pub struct SearchHit<'a> {
    pub document: &'a Document,
    pub distance: f32,
}

/// Decoded contents of a vector file.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVectors {
    pub metric: Metric,
    pub dims: usize,
    pub vectors: Vec<Vec<f32>>,
}

/// In-memory similarity index: one vector per document.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    metric: Metric,
    dims: usize,
    documents: Vec<Document>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Build an index from documents and their embeddings (same order).
    pub fn build(
        documents: Vec<Document>,
        vectors: Vec<Vec<f32>>,
        metric: Metric,
    ) -> Result<Self, IndexError> {
        if documents.len() != vectors.len() {
            return Err(IndexError::CountMismatch {
                documents: documents.len(),
                vectors: vectors.len(),
            });
        }

        let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
        if !vectors.is_empty() && dims == 0 {
            return Err(IndexError::EmptyVector);
        }
        for (position, v) in vectors.iter().enumerate() {
            if v.len() != dims {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: dims,
                    actual: v.len(),
                });
            }
        }

        Ok(Self {
            metric,
            dims,
            documents,
            vectors,
        })
    }

    /// Rebuild an index from persisted documents and a decoded vector file.
    pub fn from_parts(documents: Vec<Document>, stored: StoredVectors) -> Result<Self, IndexError> {
        let index = Self::build(documents, stored.vectors, stored.metric)?;
        if !index.is_empty() && index.dims != stored.dims {
            return Err(IndexError::Corrupt(format!(
                "header declares {} dimensions, vectors have {}",
                stored.dims, index.dims
            )));
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Return up to `k` documents nearest to `query`, nearest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit<'_>>, IndexError> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dims {
            return Err(IndexError::QueryDimension {
                expected: self.dims,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit<'_>> = self
            .documents
            .iter()
            .zip(self.vectors.iter())
            .map(|(document, vector)| SearchHit {
                document,
                distance: self.metric.distance(query, vector),
            })
            .collect();

        // Stable: equal distances keep insertion order. NaN sorts last.
        hits.sort_by(|a, b| {
            a.distance
                .is_nan()
                .cmp(&b.distance.is_nan())
                .then(a.distance.total_cmp(&b.distance))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Serialize the vector half of the index.
    pub fn encode_vectors(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.len() * self.dims * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.push(self.metric.tag());
        bytes.extend_from_slice(&(self.dims as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for v in &self.vectors {
            bytes.extend_from_slice(&vec_to_blob(v));
        }
        bytes
    }

    /// Parse a vector file produced by [`encode_vectors`](Self::encode_vectors).
    pub fn decode_vectors(bytes: &[u8]) -> Result<StoredVectors, IndexError> {
        if bytes.len() < HEADER_LEN {
            return Err(IndexError::Corrupt("file shorter than header".to_string()));
        }
        if &bytes[0..4] != MAGIC {
            return Err(IndexError::Corrupt("bad magic".to_string()));
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {}",
                version
            )));
        }
        let metric = Metric::from_tag(bytes[8])?;
        let dims = u32::from_le_bytes([bytes[9], bytes[10], bytes[11], bytes[12]]) as usize;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&bytes[13..21]);
        let count = u64::from_le_bytes(count_bytes) as usize;

        let body = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dims)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| IndexError::Corrupt("header sizes overflow".to_string()))?;
        if body.len() != expected {
            return Err(IndexError::Corrupt(format!(
                "expected {} bytes of vector data, found {}",
                expected,
                body.len()
            )));
        }

        let vectors = if dims == 0 {
            vec![Vec::new(); count]
        } else {
            body.chunks_exact(dims * 4).map(blob_to_vec).collect()
        };

        Ok(StoredVectors {
            metric,
            dims,
            vectors,
        })
    }
}
