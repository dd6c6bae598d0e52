use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, StringArray,
    TimestampMillisecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lancedb::{
    connect,
    query::{ExecutableQuery, QueryBase},
    Connection, DistanceType,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::store::{ChunkMatch, ChunkRecord, ChunkStore, SourceInfo, StoreStats};

const TABLE: &str = "chunks";

/// LanceDB-backed chunk store with cosine vector search
pub struct LanceChunkStore {
    db: Connection,
    embeddings: Arc<dyn EmbeddingProvider>,
    vector_dim: usize,
}

impl LanceChunkStore {
    fn quote_filter_string(input: &str) -> String {
        input.replace('\'', "''")
    }

    pub async fn new(db_path: &Path, embeddings: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        std::fs::create_dir_all(db_path)?;

        let db = connect(
            db_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Non-UTF8 database path"))?,
        )
        .execute()
        .await?;

        // The provider reports its dimension through a probe embedding
        let probe = embeddings.embed("dimension probe").await?;
        let vector_dim = probe.len();

        let store = Self {
            db,
            embeddings,
            vector_dim,
        };
        store.initialize_table().await?;

        Ok(store)
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("source_id", DataType::Utf8, false),
            Field::new("chunk_index", DataType::Int32, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("content_hash", DataType::Utf8, false),
            Field::new(
                "indexed_at",
                DataType::Timestamp(TimeUnit::Millisecond, None),
                false,
            ),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.vector_dim as i32,
                ),
                false,
            ),
        ]))
    }

    async fn initialize_table(&self) -> Result<()> {
        let table_names = self.db.table_names().execute().await?;

        if !table_names.contains(&TABLE.to_string()) {
            let schema = self.schema();

            // Create empty table
            use arrow::record_batch::RecordBatchIterator;
            use std::iter::once;
            let empty_batch = RecordBatch::new_empty(schema.clone());
            let batches = once(Ok(empty_batch));
            let batch_reader = RecordBatchIterator::new(batches, schema);
            self.db.create_table(TABLE, batch_reader).execute().await?;
        }

        Ok(())
    }
}

#[async_trait]
impl ChunkStore for LanceChunkStore {
    async fn upsert(
        &self,
        source_id: &str,
        content_hash: &str,
        chunks: &[ChunkRecord],
    ) -> Result<()> {
        // Delete existing chunks for this source (full reindex supersedes)
        self.delete_source(source_id).await?;

        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embeddings.embed_batch(&texts).await?;

        let now_millis = Utc::now().timestamp_millis();

        // Build arrays
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let source_ids: Vec<&str> = chunks.iter().map(|_| source_id).collect();
        let chunk_indices: Vec<i32> = chunks.iter().map(|c| c.chunk_index).collect();
        let chunk_texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let content_hashes: Vec<&str> = chunks.iter().map(|_| content_hash).collect();
        let indexed_ats: Vec<i64> = chunks.iter().map(|_| now_millis).collect();

        // Build embedding array
        let embedding_values: Vec<f32> =
            embeddings.iter().flat_map(|e| e.iter().copied()).collect();
        let embedding_array = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.vector_dim as i32,
            Arc::new(Float32Array::from(embedding_values)),
            None,
        )?;

        let batch = RecordBatch::try_new(
            self.schema(),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(source_ids)),
                Arc::new(Int32Array::from(chunk_indices)),
                Arc::new(StringArray::from(chunk_texts)),
                Arc::new(StringArray::from(content_hashes)),
                Arc::new(TimestampMillisecondArray::from(indexed_ats)),
                Arc::new(embedding_array),
            ],
        )?;

        let table = self.db.open_table(TABLE).execute().await?;

        use arrow::record_batch::RecordBatchIterator;
        use std::iter::once;
        let batches = once(Ok(batch.clone()));
        let batch_reader = RecordBatchIterator::new(batches, batch.schema());
        table.add(batch_reader).execute().await?;

        Ok(())
    }

    async fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<ChunkMatch>> {
        let query_embedding = self.embeddings.embed(query_text).await?;

        let table = self.db.open_table(TABLE).execute().await?;

        let query = table
            .vector_search(query_embedding)?
            .distance_type(DistanceType::Cosine)
            .limit(top_k);

        let mut results = query.execute().await?;
        let mut matches = Vec::new();

        while let Some(batch) = results.try_next().await? {
            if batch.num_rows() == 0 {
                continue;
            }

            let ids = batch
                .column_by_name("id")
                .unwrap()
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap();
            let source_ids = batch
                .column_by_name("source_id")
                .unwrap()
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap();
            let chunk_indices = batch
                .column_by_name("chunk_index")
                .unwrap()
                .as_any()
                .downcast_ref::<Int32Array>()
                .unwrap();
            let texts = batch
                .column_by_name("text")
                .unwrap()
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap();
            let distances = batch
                .column_by_name("_distance")
                .unwrap()
                .as_any()
                .downcast_ref::<Float32Array>()
                .unwrap();

            for i in 0..batch.num_rows() {
                let chunk = ChunkRecord {
                    id: ids.value(i).to_string(),
                    source_id: source_ids.value(i).to_string(),
                    chunk_index: chunk_indices.value(i),
                    text: texts.value(i).to_string(),
                };

                let distance = distances.value(i);
                matches.push(ChunkMatch {
                    chunk,
                    score: 1.0 - distance,
                });
            }
        }

        Ok(matches)
    }

    async fn source_hash(&self, source_id: &str) -> Result<Option<String>> {
        let table = self.db.open_table(TABLE).execute().await?;

        let query = table
            .query()
            .only_if(format!(
                "source_id = '{}'",
                Self::quote_filter_string(source_id)
            ))
            .limit(1);

        let results = query.execute().await?;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        if batches.is_empty() || batches[0].num_rows() == 0 {
            return Ok(None);
        }

        let content_hashes = batches[0]
            .column_by_name("content_hash")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();

        Ok(Some(content_hashes.value(0).to_string()))
    }

    async fn delete_source(&self, source_id: &str) -> Result<()> {
        let table = self.db.open_table(TABLE).execute().await?;
        table
            .delete(&format!(
                "source_id = '{}'",
                Self::quote_filter_string(source_id)
            ))
            .await?;
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let table = self.db.open_table(TABLE).execute().await?;
        let count = table.count_rows(None).await?;

        if count == 0 {
            return Ok(StoreStats {
                total_sources: 0,
                total_chunks: 0,
                oldest_indexed: None,
                newest_indexed: None,
            });
        }

        let results = table.query().execute().await?;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        let mut unique_sources = std::collections::HashSet::new();
        let mut oldest: Option<DateTime<Utc>> = None;
        let mut newest: Option<DateTime<Utc>> = None;

        for batch in batches {
            let source_ids = batch
                .column_by_name("source_id")
                .unwrap()
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap();
            let indexed_ats = batch
                .column_by_name("indexed_at")
                .unwrap()
                .as_any()
                .downcast_ref::<TimestampMillisecondArray>()
                .unwrap();

            for i in 0..batch.num_rows() {
                unique_sources.insert(source_ids.value(i).to_string());

                let indexed_millis = indexed_ats.value(i);
                if let Some(indexed) = DateTime::from_timestamp_millis(indexed_millis) {
                    if oldest.is_none_or(|old| indexed < old) {
                        oldest = Some(indexed);
                    }
                    if newest.is_none_or(|new| indexed > new) {
                        newest = Some(indexed);
                    }
                }
            }
        }

        Ok(StoreStats {
            total_sources: unique_sources.len(),
            total_chunks: count,
            oldest_indexed: oldest,
            newest_indexed: newest,
        })
    }

    async fn list_sources(&self, limit: Option<usize>) -> Result<Vec<SourceInfo>> {
        let table = self.db.open_table(TABLE).execute().await?;
        let results = table.query().execute().await?;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        let mut sources: HashMap<String, (usize, DateTime<Utc>)> = HashMap::new();

        for batch in batches {
            let source_ids = batch
                .column_by_name("source_id")
                .unwrap()
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap();
            let indexed_ats = batch
                .column_by_name("indexed_at")
                .unwrap()
                .as_any()
                .downcast_ref::<TimestampMillisecondArray>()
                .unwrap();

            for i in 0..batch.num_rows() {
                let source_id = source_ids.value(i).to_string();
                let indexed_millis = indexed_ats.value(i);
                let indexed_at = DateTime::from_timestamp_millis(indexed_millis)
                    .context("Invalid timestamp")?;

                sources
                    .entry(source_id)
                    .and_modify(|(count, existing)| {
                        *count += 1;
                        if indexed_at > *existing {
                            *existing = indexed_at;
                        }
                    })
                    .or_insert((1, indexed_at));
            }
        }

        let mut result: Vec<SourceInfo> = sources
            .into_iter()
            .map(|(source_id, (chunks, indexed_at))| SourceInfo {
                source_id,
                chunks,
                indexed_at,
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
