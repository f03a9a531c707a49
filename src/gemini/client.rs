//! Gemini REST 클라이언트
//!
//! source: https://ai.google.dev/api/generate-content
//! source: https://ai.google.dev/gemini-api/docs/embeddings

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

use super::{EmbedPurpose, EmbeddingProvider, Generation, GenerationProvider, KeyRing};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// 기본 임베딩 차원
pub const DEFAULT_DIMENSION: usize = 768;

/// 429/전송 실패 시 최대 재시도 횟수
const MAX_RETRIES: u32 = 3;
/// 재시도 시 초기 백오프 (ms)
const INITIAL_BACKOFF_MS: u64 = 2000;

// ============================================================================
// GeminiClient
// ============================================================================

/// Gemini 생성 + 임베딩 클라이언트
#[derive(Debug)]
pub struct GeminiClient {
    keys: KeyRing,
    client: reqwest::Client,
    generation_model: String,
    embedding_model: String,
    dimension: usize,
}

impl GeminiClient {
    /// 설정으로 생성
    ///
    /// 키 풀이 비어 있으면 실패합니다.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let keys = KeyRing::new(config.api_keys.clone())?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(
            "Gemini client ready (generation: {}, embedding: {}, keys: {})",
            config.generation_model,
            config.embedding_model,
            keys.len()
        );

        Ok(Self {
            keys,
            client,
            generation_model: config.generation_model.clone(),
            embedding_model: config.embedding_model.clone(),
            dimension: DEFAULT_DIMENSION,
        })
    }

    /// 키 풀 크기
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// POST 요청 (재시도 포함), 성공 시 응답 본문 반환
    ///
    /// 재시도마다 다음 키를 사용합니다.
    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<String> {
        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 0..=MAX_RETRIES {
            let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));

            // API 키는 URL이 아닌 헤더로 전송
            let response = match self
                .client
                .post(url)
                .header("x-goog-api-key", self.keys.next_key())
                .json(body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(anyhow::anyhow!("Failed to send Gemini request: {}", e));
                    if attempt < MAX_RETRIES {
                        tracing::warn!(
                            "Request failed, retrying in {:?} (attempt {}/{})",
                            backoff,
                            attempt + 1,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();
            let text = response
                .text()
                .await
                .context("Failed to read response body")?;

            if status.is_success() {
                return Ok(text);
            }

            if status.as_u16() == 429 {
                tracing::warn!(
                    "Rate limit hit (429), backing off {:?} (attempt {}/{})",
                    backoff,
                    attempt + 1,
                    MAX_RETRIES
                );
                last_error = Some(anyhow::anyhow!("Rate limit exceeded (429)"));

                if attempt < MAX_RETRIES {
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            } else {
                if let Ok(error) = serde_json::from_str::<GeminiError>(&text) {
                    anyhow::bail!(
                        "Gemini API error ({}): {}",
                        error.error.status,
                        error.error.message
                    );
                }
                anyhow::bail!("Gemini API error ({}): {}", status, text);
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Gemini request failed after {} retries", MAX_RETRIES)))
    }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Generation> {
        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.generation_model);
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let body = self.post_json(&url, &request).await?;
        parse_generation(&body)
    }

    fn model_name(&self) -> &str {
        &self.generation_model
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str, purpose: EmbedPurpose) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            anyhow::bail!("Cannot embed empty text");
        }

        let url = format!("{}/{}:embedContent", GEMINI_API_BASE, self.embedding_model);
        let request = EmbedRequest {
            model: format!("models/{}", self.embedding_model),
            content: RequestContent {
                parts: vec![RequestPart {
                    text: text.to_string(),
                }],
            },
            task_type: purpose.task_type().to_string(),
            output_dimensionality: Some(self.dimension),
        };

        let body = self.post_json(&url, &request).await?;
        let response: EmbedResponse =
            serde_json::from_str(&body).context("Failed to parse embedding response")?;

        Ok(response.embedding.values)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.embedding_model
    }
}

/// generateContent 응답 파싱
///
/// 첫 번째 후보에 콘텐츠 파트가 하나도 없으면 차단된 응답으로 봅니다.
pub fn parse_generation(body: &str) -> Result<Generation> {
    let response: GenerateResponse =
        serde_json::from_str(body).context("Failed to parse generation response")?;

    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    if parts.is_empty() {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            tracing::warn!("Generation blocked: {}", reason);
        }
        return Ok(Generation::blocked());
    }

    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    Ok(Generation::text(text))
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: RequestContent,
    #[serde(rename = "taskType")]
    task_type: String,
    #[serde(rename = "outputDimensionality", skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

// ============================================================================
// Tests
// ============================================================================
