use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::ingest::chunker::SentenceChunker;
use crate::reader;
use crate::store::{ChunkRecord, ChunkStore};

/// Result of indexing one source
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub source_id: String,
    pub chunks_indexed: usize,
    /// Content hash matched the stored one; nothing was rewritten
    pub was_cached: bool,
}

/// Turns documents into chunk records with deterministic ids and upserts them
/// into the chunk store.
pub struct Indexer {
    chunker: SentenceChunker,
    store: Arc<dyn ChunkStore>,
}

impl Indexer {
    pub fn new(config: &Config, store: Arc<dyn ChunkStore>) -> Self {
        Self {
            chunker: SentenceChunker::new(&config.chunking),
            store,
        }
    }

    /// Index one file. Never fails: a read/parse error is logged and reported
    /// as zero chunks so one bad document cannot abort a batch upload.
    pub async fn index_file(&self, path: &Path) -> IndexOutcome {
        let source_id = reader::source_id_for(path);

        match self.try_index_file(path, &source_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(source_id = %source_id, "Failed to index {}: {:#}", path.display(), e);
                IndexOutcome {
                    source_id,
                    chunks_indexed: 0,
                    was_cached: false,
                }
            }
        }
    }

    async fn try_index_file(&self, path: &Path, source_id: &str) -> Result<IndexOutcome> {
        let text = reader::read_document(path)?;
        self.index_text(source_id, &text).await
    }

    /// Chunk raw text and upsert under deterministic ids
    /// `{source_id}_chunk_{i}`. Unchanged content (same SHA-256) is skipped.
    pub async fn index_text(&self, source_id: &str, text: &str) -> Result<IndexOutcome> {
        let content_hash = hex::encode(Sha256::digest(text.as_bytes()));

        if self.store.source_hash(source_id).await? == Some(content_hash.clone()) {
            info!(source_id = %source_id, "Content unchanged, skipping reindex");
            return Ok(IndexOutcome {
                source_id: source_id.to_string(),
                chunks_indexed: 0,
                was_cached: true,
            });
        }

        let chunks: Vec<ChunkRecord> = self
            .chunker
            .split(text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| ChunkRecord::new(source_id, i as i32, text))
            .collect();

        self.store.upsert(source_id, &content_hash, &chunks).await?;

        info!(source_id = %source_id, chunks = chunks.len(), "Indexed source");
        Ok(IndexOutcome {
            source_id: source_id.to_string(),
            chunks_indexed: chunks.len(),
            was_cached: false,
        })
    }
}
