use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::config::EmbeddingConfig;
use crate::constants;

/// Text embedding backend. One real HTTP-backed implementation and one
/// deterministic offline stub; selection is explicit configuration, never
/// availability probing.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Create the configured embedding provider
pub fn create_embedding_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "voyage" => Ok(Arc::new(VoyageEmbeddings::new(
            &config.model,
            config.batch_size,
        )?)),
        "stub" => Ok(Arc::new(HashedEmbeddings::new(config.dimension))),
        other => anyhow::bail!("Unknown embedding provider: {}", other),
    }
}

/// Voyage AI embeddings over HTTP
pub struct VoyageEmbeddings {
    client: reqwest::Client,
    model: String,
    api_key: String,
    batch_size: usize,
}

#[derive(Deserialize)]
struct VoyageResponse {
    data: Vec<VoyageEmbedding>,
}

#[derive(Deserialize)]
struct VoyageEmbedding {
    embedding: Vec<f32>,
}

impl VoyageEmbeddings {
    pub fn new(model: &str, batch_size: usize) -> Result<Self> {
        let api_key = std::env::var("VOYAGE_API_KEY")
            .context("VOYAGE_API_KEY not set; required by the voyage embedding provider")?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(constants::HTTP_TIMEOUT_SECS))
            .user_agent(constants::USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            model: model.to_string(),
            api_key,
            batch_size: batch_size.max(1),
        })
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post("https://api.voyageai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "input": inputs,
                "model": self.model,
            }))
            .send()
            .await
            .context("Embedding request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Embedding API error: {}", response.status());
        }

        let parsed: VoyageResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        if parsed.data.len() != inputs.len() {
            anyhow::bail!(
                "Embedding API returned {} vectors for {} inputs",
                parsed.data.len(),
                inputs.len()
            );
        }

        Ok(parsed.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for VoyageEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedding API returned no vector"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.request(batch).await?);
        }
        Ok(vectors)
    }
}

/// Deterministic bag-of-words hash projection. Usable offline and in tests;
/// texts sharing tokens land in shared buckets and score high under cosine.
pub struct HashedEmbeddings {
    dimension: usize,
}

impl HashedEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(8),
        }
    }

    fn project(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u64::from_le_bytes(digest[..8].try_into().unwrap()) as usize;
            vector[bucket % self.dimension] += 1.0;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.project(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.project(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_stub_is_deterministic() {
        let provider = HashedEmbeddings::new(64);
        let a = provider.embed("office days policy").await.unwrap();
        let b = provider.embed("office days policy").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_stub_is_normalized() {
        let provider = HashedEmbeddings::new(64);
        let v = provider.embed("some tokens to embed").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_tokens_score_higher() {
        let provider = HashedEmbeddings::new(256);
        let doc = provider
            .embed("Remote work requires two in-office days.")
            .await
            .unwrap();
        let related = provider.embed("How many in-office days?").await.unwrap();
        let unrelated = provider.embed("quarterly tax filing deadline").await.unwrap();
        assert!(cosine(&doc, &related) > cosine(&doc, &unrelated));
    }
}
