//! Gemini 모듈 - 텍스트 생성과 임베딩
//!
//! 대화 엔진은 아래 두 트레이트에만 의존합니다.
//! - `GenerationProvider`: 프롬프트 → 생성 텍스트 (차단/빈 응답 여부 포함)
//! - `EmbeddingProvider`: 텍스트 → 벡터 (문서용/질의용 구분)
//!
//! `GeminiClient`는 두 트레이트를 모두 구현하며,
//! 호출마다 `KeyRing`에서 다음 API 키를 꺼내 요청을 분산합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let client = GeminiClient::new(&config)?;
//! let generation = client.generate("What is APEC?").await?;
//! ```

mod client;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;

pub use client::{parse_generation, GeminiClient, DEFAULT_DIMENSION};

// ============================================================================
// Generation
// ============================================================================

/// 생성 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    /// 생성된 텍스트 (모든 파트를 이어 붙인 값)
    pub text: String,
    /// 후보가 없거나 콘텐츠 파트가 없는 경우 (안전 필터 차단 포함)
    pub blocked: bool,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            blocked: false,
        }
    }

    pub fn blocked() -> Self {
        Self {
            text: String::new(),
            blocked: true,
        }
    }

    /// 사용 가능한 답변 텍스트
    ///
    /// 차단되었거나 공백뿐인 응답은 `None`입니다.
    pub fn answer(&self) -> Option<&str> {
        if self.blocked || self.text.trim().is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }
}

/// 텍스트 생성 프로바이더 트레이트
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// 프롬프트로 텍스트 생성
    async fn generate(&self, prompt: &str) -> Result<Generation>;

    /// 모델 이름
    fn model_name(&self) -> &str;
}

// ============================================================================
// Embedding
// ============================================================================

/// 임베딩 용도 (Gemini taskType)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedPurpose {
    /// 색인할 문서 청크
    Document,
    /// 검색 질의
    Query,
}

impl EmbedPurpose {
    pub fn task_type(self) -> &'static str {
        match self {
            EmbedPurpose::Document => "RETRIEVAL_DOCUMENT",
            EmbedPurpose::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// 임베딩 프로바이더 트레이트
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str, purpose: EmbedPurpose) -> Result<Vec<f32>>;

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// KeyRing
// ============================================================================

/// API 키 라운드 로빈
///
/// 커서는 원자적으로 증가하므로 동시 호출이 같은 순번을 받지 않습니다.
/// 커서 자체는 외부에 노출하지 않습니다.
pub struct KeyRing {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyRing {
    pub fn new(keys: Vec<String>) -> Result<Self> {
        let keys: Vec<String> = keys.into_iter().filter(|k| !k.trim().is_empty()).collect();
        if keys.is_empty() {
            anyhow::bail!("KeyRing requires at least one API key");
        }

        Ok(Self {
            keys,
            cursor: AtomicUsize::new(0),
        })
    }

    /// 다음 키
    pub fn next_key(&self) -> &str {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        &self.keys[i]
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 키 값은 출력하지 않음
        f.debug_struct("KeyRing")
            .field("keys", &self.keys.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
