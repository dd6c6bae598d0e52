pub mod lance;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;

pub use lance::LanceChunkStore;
pub use memory::MemoryChunkStore;

/// One bounded slice of a document, the unit of retrieval. Ids are
/// deterministic so re-insertion overwrites instead of duplicating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    pub id: String,
    pub source_id: String,
    pub chunk_index: i32,
    pub text: String,
}

impl ChunkRecord {
    pub fn new(source_id: &str, chunk_index: i32, text: String) -> Self {
        Self {
            id: format!("{}_chunk_{}", source_id, chunk_index),
            source_id: source_id.to_string(),
            chunk_index,
            text,
        }
    }

    /// Provenance label used in answer source lists
    pub fn provenance(&self) -> String {
        format!("{} (chunk {})", self.source_id, self.chunk_index)
    }
}

/// Retrieval hit with relevance score, higher is better
#[derive(Debug, Clone)]
pub struct ChunkMatch {
    pub chunk: ChunkRecord,
    pub score: f32,
}

/// Statistics about the indexed corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_sources: usize,
    pub total_chunks: usize,
    pub oldest_indexed: Option<DateTime<Utc>>,
    pub newest_indexed: Option<DateTime<Utc>>,
}

/// One indexed source document
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source_id: String,
    pub chunks: usize,
    pub indexed_at: DateTime<Utc>,
}

/// Vector store boundary. Similarity search takes query text; each backend
/// owns its embedding provider and embeds internally, so callers never see
/// vectors.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Replace all chunks for a source (delete-then-insert upsert)
    async fn upsert(
        &self,
        source_id: &str,
        content_hash: &str,
        chunks: &[ChunkRecord],
    ) -> Result<()>;

    /// Top-k similarity search, rank order preserved from the backend
    async fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<ChunkMatch>>;

    /// Content hash stored for a source, if it has been indexed
    async fn source_hash(&self, source_id: &str) -> Result<Option<String>>;

    async fn delete_source(&self, source_id: &str) -> Result<()>;

    async fn stats(&self) -> Result<StoreStats>;

    async fn list_sources(&self, limit: Option<usize>) -> Result<Vec<SourceInfo>>;
}

/// Create the configured chunk store
pub async fn create_chunk_store(
    config: &Config,
    embeddings: Arc<dyn EmbeddingProvider>,
) -> Result<Arc<dyn ChunkStore>> {
    match config.store.backend.as_str() {
        "lance" => {
            let db_path = crate::storage::get_database_path()?;
            Ok(Arc::new(LanceChunkStore::new(&db_path, embeddings).await?))
        }
        "memory" => Ok(Arc::new(MemoryChunkStore::new(embeddings))),
        other => anyhow::bail!("Unknown chunk store backend: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_ids_are_deterministic() {
        let a = ChunkRecord::new("handbook.txt", 0, "text".to_string());
        let b = ChunkRecord::new("handbook.txt", 0, "text".to_string());
        assert_eq!(a.id, "handbook.txt_chunk_0");
        assert_eq!(a, b);
    }

    #[test]
    fn test_provenance_label() {
        let chunk = ChunkRecord::new("policy.pdf", 2, "text".to_string());
        assert_eq!(chunk.provenance(), "policy.pdf (chunk 2)");
    }
}
