//! The question-answering agent.
//!
//! Answers one question in a single pass:
//!
//! 1. **Retrieve**: embed the question and take the `top_k` nearest documents.
//! 2. **Assemble**: join their texts, nearest first, with blank lines.
//! 3. **Prompt**: fill the fixed grounding template.
//! 4. **Generate**: one chat completion.
//! 5. **Return**: the model's text plus a [`SourceRef`] per retrieved document.
//!
//! The agent borrows the index, embedder, and chat model; it holds no
//! per-question state, so the same agent answers any number of questions.

use anyhow::Result;
use serde::Serialize;

use sales_agent_core::embedding::{embed_query, EmbeddingProvider};
use sales_agent_core::index::{SearchHit, VectorIndex};
use sales_agent_core::prompt::{build_context, fill_prompt};

use crate::config::Config;
use crate::llm::{ChatMessage, ChatModel, ChatRequest};
use crate::models::SourceRef;

/// An answer and the documents it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

pub struct SalesAgent<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn EmbeddingProvider,
    llm: &'a dyn ChatModel,
    top_k: usize,
    temperature: f64,
    max_tokens: u32,
}

impl<'a> SalesAgent<'a> {
    pub fn new(
        index: &'a VectorIndex,
        embedder: &'a dyn EmbeddingProvider,
        llm: &'a dyn ChatModel,
        config: &Config,
    ) -> Self {
        Self {
            index,
            embedder,
            llm,
            top_k: config.retrieval.top_k,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }

    /// Nearest documents to `question`, nearest first.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchHit<'a>>> {
        let query = embed_query(self.embedder, question).await?;
        Ok(self.index.search(&query, self.top_k)?)
    }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let hits = self.retrieve(question).await?;
        let context = build_context(hits.iter().map(|h| h.document));
        let prompt = fill_prompt(question, &context);

        let request = ChatRequest {
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        tracing::debug!(
            retrieved = hits.len(),
            model = self.llm.model_name(),
            "generating answer"
        );
        let text = self.llm.complete(&request).await?;

        Ok(Answer {
            text,
            sources: hits.iter().map(|h| h.document.source_ref()).collect(),
        })
    }
}
