//! Vector Search - 벡터 검색 트레이트 및 유틸리티
//!
//! 검색 결과의 본문은 메타데이터의 `original_text` 필드에 들어 있습니다.
//! 필드가 없으면 센티널 `"N/A"`를 본문으로 봅니다.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// 벡터 임베딩 차원 (text-embedding-004 기본값)
pub const EMBEDDING_DIMENSION: i32 = 768;

/// 본문 없음 센티널
pub const MISSING_TEXT: &str = "N/A";

/// 본문 저장용 메타데이터 키
pub const ORIGINAL_TEXT_KEY: &str = "original_text";

/// 자유 형식 메타데이터 (category/section/sub_section/event ...)
pub type Metadata = serde_json::Map<String, Value>;

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// 청크 ID
    pub id: String,
    /// 메타데이터 (`original_text` 포함)
    pub metadata: Metadata,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    /// 유사도 스코어 (높을수록 관련성 높음)
    pub score: f32,
    pub metadata: Metadata,
}

impl VectorMatch {
    /// 저장된 본문, 없으면 `"N/A"`
    pub fn original_text(&self) -> &str {
        self.metadata
            .get(ORIGINAL_TEXT_KEY)
            .and_then(Value::as_str)
            .unwrap_or(MISSING_TEXT)
    }
}

// ============================================================================
// VectorSearch Trait
// ============================================================================

/// 벡터 검색 저장소 트레이트 (async)
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// ID 기준 삽입/갱신
    async fn upsert(&self, entries: &[VectorEntry]) -> Result<usize>;

    /// 상위 k개 검색 (스코어 내림차순)
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<VectorMatch>>;

    /// 벡터 개수 조회
    async fn count(&self) -> Result<usize>;
}

// ============================================================================
// MemoryVectorStore
// ============================================================================

/// 메모리 벡터 저장소
///
/// 전수 코사인 비교로 검색합니다. 소규모 코퍼스와 테스트용입니다.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    entries: Mutex<Vec<VectorEntry>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorSearch for MemoryVectorStore {
    async fn upsert(&self, entries: &[VectorEntry]) -> Result<usize> {
        let mut stored = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        for entry in entries {
            stored.retain(|e| e.id != entry.id);
            stored.push(entry.clone());
        }

        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<VectorMatch>> {
        let stored = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut matches: Vec<VectorMatch> = stored
            .iter()
            .map(|e| VectorMatch {
                id: e.id.clone(),
                score: cosine_similarity(query_embedding, &e.embedding),
                metadata: e.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(limit);

        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        let stored = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        Ok(stored.len())
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================
