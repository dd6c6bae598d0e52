use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::embedding::EmbeddingProvider;
use crate::store::{ChunkMatch, ChunkRecord, ChunkStore, SourceInfo, StoreStats};

struct StoredSource {
    content_hash: String,
    indexed_at: DateTime<Utc>,
    chunks: Vec<(ChunkRecord, Vec<f32>)>,
}

/// In-process chunk store with brute-force cosine ranking. The stub backend
/// behind the same trait as the LanceDB store; also what the pipeline tests
/// run against.
pub struct MemoryChunkStore {
    embeddings: Arc<dyn EmbeddingProvider>,
    sources: RwLock<HashMap<String, StoredSource>>,
}

impl MemoryChunkStore {
    pub fn new(embeddings: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embeddings,
            sources: RwLock::new(HashMap::new()),
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn upsert(
        &self,
        source_id: &str,
        content_hash: &str,
        chunks: &[ChunkRecord],
    ) -> Result<()> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await?;

        let stored = StoredSource {
            content_hash: content_hash.to_string(),
            indexed_at: Utc::now(),
            chunks: chunks.iter().cloned().zip(vectors).collect(),
        };

        self.sources
            .write()
            .await
            .insert(source_id.to_string(), stored);
        Ok(())
    }

    async fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<ChunkMatch>> {
        let query_vector = self.embeddings.embed(query_text).await?;

        let sources = self.sources.read().await;
        let mut matches: Vec<ChunkMatch> = sources
            .values()
            .flat_map(|s| s.chunks.iter())
            .map(|(chunk, vector)| ChunkMatch {
                chunk: chunk.clone(),
                score: cosine(&query_vector, vector),
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn source_hash(&self, source_id: &str) -> Result<Option<String>> {
        Ok(self
            .sources
            .read()
            .await
            .get(source_id)
            .map(|s| s.content_hash.clone()))
    }

    async fn delete_source(&self, source_id: &str) -> Result<()> {
        self.sources.write().await.remove(source_id);
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let sources = self.sources.read().await;
        let total_chunks = sources.values().map(|s| s.chunks.len()).sum();
        Ok(StoreStats {
            total_sources: sources.len(),
            total_chunks,
            oldest_indexed: sources.values().map(|s| s.indexed_at).min(),
            newest_indexed: sources.values().map(|s| s.indexed_at).max(),
        })
    }

    async fn list_sources(&self, limit: Option<usize>) -> Result<Vec<SourceInfo>> {
        let sources = self.sources.read().await;
        let mut result: Vec<SourceInfo> = sources
            .iter()
            .map(|(source_id, s)| SourceInfo {
                source_id: source_id.clone(),
                chunks: s.chunks.len(),
                indexed_at: s.indexed_at,
            })
            .collect();

        // Sort by indexed_at descending
        result.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));

        if let Some(limit) = limit {
            result.truncate(limit);
        }

        Ok(result)
    }
}
