//! Batch embedding generation via Gemini or OpenAI-compatible APIs.

use chrono::Utc;
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::Error;
use crate::models::{CodeChunk, EmbeddedChunk};

/// Texts per embedding request (Gemini's batchEmbedContents cap).
const EMBED_BATCH_SIZE: usize = 100;

/// Concurrent in-flight embedding requests. Bounded to stay inside vendor
/// rate limits while still amortizing request latency.
const MAX_CONCURRENT_BATCHES: usize = 4;

/// Retries per batch within one job attempt, with exponential backoff.
const MAX_BATCH_RETRIES: u32 = 3;
const RETRY_BASE_MS: u64 = 500;

/// Maximum characters sent per text. Dense code tokenizes at roughly 2-3
/// chars per token; 6 000 chars stays well inside a 2 048-token input limit.
const MAX_EMBED_CHARS: usize = 6_000;

/// Embedding client shared by the indexing workers and the query path.
#[derive(Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl EmbeddingClient {
    pub fn new(http: reqwest::Client, config: LlmConfig) -> Self {
        Self { http, config }
    }

    pub fn model(&self) -> &str {
        &self.config.embedding_model
    }

    pub fn dimension(&self) -> usize {
        self.config.embedding_dim
    }

    /// Embed chunks in batches; every returned vector is unit-length.
    ///
    /// A batch that still fails after retries fails the whole call; the
    /// orchestrator retries the job rather than silently truncating the
    /// corpus.
    pub async fn embed_chunks(&self, chunks: &[CodeChunk]) -> Result<Vec<EmbeddedChunk>, Error> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        // Prepend the file path so the embedding carries location context.
        let texts: Vec<String> = chunks
            .iter()
            .map(|c| {
                let text = format!("File: {}\n{}", c.file_path, c.content);
                truncate_for_embedding(&text, MAX_EMBED_CHARS).to_string()
            })
            .collect();

        let batches: Vec<Vec<String>> = texts
            .chunks(EMBED_BATCH_SIZE)
            .map(|b| b.to_vec())
            .collect();

        let results: Vec<Result<Vec<Vec<f32>>, Error>> = stream::iter(batches)
            .map(|batch| async move { self.embed_batch_with_retry(&batch).await })
            .buffered(MAX_CONCURRENT_BATCHES)
            .collect()
            .await;

        let mut vectors = Vec::with_capacity(chunks.len());
        for result in results {
            vectors.extend(result?);
        }

        if vectors.len() != chunks.len() {
            return Err(Error::Llm(format!(
                "embedding count mismatch: sent {} texts, got {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let embedded_at = Utc::now();
        chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, mut embedding)| {
                if embedding.len() != self.config.embedding_dim {
                    return Err(Error::Llm(format!(
                        "embedding dimension mismatch: expected {}, got {}",
                        self.config.embedding_dim,
                        embedding.len()
                    )));
                }
                normalize(&mut embedding);
                Ok(EmbeddedChunk {
                    chunk: chunk.clone(),
                    embedding,
                    embedded_at,
                })
            })
            .collect()
    }

    /// Embed a single query string with the indexing model.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, Error> {
        let truncated = truncate_for_embedding(text, MAX_EMBED_CHARS).to_string();
        let mut vectors = self.embed_batch_with_retry(&[truncated]).await?;
        let mut embedding = vectors
            .pop()
            .ok_or_else(|| Error::Llm("no embedding returned for query".to_string()))?;
        if embedding.len() != self.config.embedding_dim {
            return Err(Error::Llm(format!(
                "query embedding dimension mismatch: expected {}, got {}",
                self.config.embedding_dim,
                embedding.len()
            )));
        }
        normalize(&mut embedding);
        Ok(embedding)
    }

    async fn embed_batch_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        let mut last_err = None;

        for attempt in 0..MAX_BATCH_RETRIES {
            match self.embed_batch_once(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e @ (Error::RateLimited { .. } | Error::TransientIo(_))) => {
                    let delay = Duration::from_millis(RETRY_BASE_MS * 2u64.pow(attempt));
                    tracing::warn!(
                        "embedding batch failed (attempt {}/{MAX_BATCH_RETRIES}), retrying in {delay:?}: {e}",
                        attempt + 1
                    );
                    last_err = Some(e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Llm("embedding batch failed".to_string())))
    }

    async fn embed_batch_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        match self.config.provider.as_str() {
            "gemini" => self.embed_gemini(texts).await,
            "openai" => self.embed_openai(texts).await,
            other => Err(Error::Llm(format!("unknown LLM provider: {other}"))),
        }
    }

    async fn embed_gemini(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Llm("GEMINI_API_KEY is not configured".to_string()))?;

        let model = &self.config.embedding_model;
        let url = format!("{}/models/{model}:batchEmbedContents", self.config.base_url);

        let req = GeminiBatchRequest {
            requests: texts
                .iter()
                .map(|t| GeminiEmbedRequest {
                    model: format!("models/{model}"),
                    content: GeminiContent {
                        parts: vec![GeminiPart { text: t.clone() }],
                    },
                })
                .collect(),
        };

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::TransientIo(format!("Gemini embed request failed: {e}")))?;

        let resp = check_status("gemini", resp).await?;
        let body: GeminiBatchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Llm(format!("failed to parse Gemini embed response: {e}")))?;

        Ok(body.embeddings.into_iter().map(|e| e.values).collect())
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        let url = format!("{}/v1/embeddings", self.config.base_url);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let req = OpenAiEmbedRequest {
            model: self.config.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::TransientIo(format!("OpenAI embed request failed: {e}")))?;

        let resp = check_status("openai", resp).await?;
        let body: OpenAiEmbedResponse = resp
            .json()
            .await
            .map_err(|e| Error::Llm(format!("failed to parse OpenAI embed response: {e}")))?;

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Map an HTTP status onto the error taxonomy: 429 is rate limiting, 5xx is
/// transient, anything else non-success is a provider error.
async fn check_status(service: &'static str, resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited {
            service,
            detail: body,
        });
    }
    if status.is_server_error() {
        return Err(Error::TransientIo(format!("{service} returned {status}: {body}")));
    }
    Err(Error::Llm(format!("{service} returned {status}: {body}")))
}

/// Scale a vector to unit L2 norm. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Truncate to at most `max_chars` bytes on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str, max_chars: usize) -> &str {
    if text.len() <= max_chars {
        return text;
    }
    let mut end = max_chars;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// ─── Wire types ──────────────────────────────────────────

#[derive(Serialize)]
struct GeminiBatchRequest {
    requests: Vec<GeminiEmbedRequest>,
}

#[derive(Serialize)]
struct GeminiEmbedRequest {
    model: String,
    content: GeminiContent,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiBatchResponse {
    embeddings: Vec<GeminiEmbedding>,
}

#[derive(Deserialize)]
struct GeminiEmbedding {
    values: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unit_length() {
        let mut v = vec![3.0f32, 4.0];
        normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0f32, 0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normalize_already_unit() {
        let mut v = vec![1.0f32, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![1.0, 0.0]);
    }

    #[test]
    fn test_truncate_short_text() {
        assert_eq!(truncate_for_embedding("short", 100), "short");
    }

    #[test]
    fn test_truncate_over_limit() {
        let text = "a".repeat(200);
        assert_eq!(truncate_for_embedding(&text, 100).len(), 100);
    }

    #[test]
    fn test_truncate_respects_utf8_boundary() {
        let text = "é".repeat(100); // 200 bytes
        let result = truncate_for_embedding(&text, 151);
        assert!(result.len() <= 151);
        assert!(result.is_char_boundary(result.len()));
    }
}
