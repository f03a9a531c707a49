//! Retriever - 질의 임베딩 → 벡터 검색 → 신뢰도 판정
//!
//! `RetrievalGate`는 검색 결과 스코어의 산술 평균을 신뢰도로 보고
//! 임계값 이상이면서 결과가 하나 이상일 때만 채택합니다.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::gemini::{EmbedPurpose, EmbeddingProvider};

use super::events::{asks_about_today, filter_todays_events};
use super::vector::{Metadata, VectorSearch, MISSING_TEXT};

// ============================================================================
// Types
// ============================================================================

/// 검색된 청크 (요청 범위, 저장하지 않음)
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub id: String,
    /// 유사도 스코어 (높을수록 관련성 높음)
    pub score: f32,
    /// 본문, 저장된 본문이 없으면 `"N/A"`
    pub content: String,
    pub metadata: Metadata,
}

impl RetrievedChunk {
    /// 컨텍스트에 쓸 수 있는 본문인지 여부
    pub fn has_content(&self) -> bool {
        self.content != MISSING_TEXT && !self.content.trim().is_empty()
    }
}

// ============================================================================
// ChunkSource Trait
// ============================================================================

/// 청크 검색 인터페이스
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// 질의로 상위 k개 청크 검색
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>>;
}

// ============================================================================
// VectorRetriever
// ============================================================================

/// 임베딩 + 벡터 저장소 기반 검색기
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorSearch>,
    today_filter: bool,
}

impl VectorRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorSearch>) -> Self {
        Self {
            embedder,
            store,
            today_filter: false,
        }
    }

    /// "오늘의 행사" 필터 사용
    pub fn with_today_filter(mut self, enabled: bool) -> Self {
        self.today_filter = enabled;
        self
    }
}

#[async_trait]
impl ChunkSource for VectorRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let query_embedding = self
            .embedder
            .embed(query, EmbedPurpose::Query)
            .await
            .context("Failed to embed query")?;

        let matches = self
            .store
            .search(&query_embedding, k)
            .await
            .context("Vector search failed")?;

        let chunks: Vec<RetrievedChunk> = matches
            .into_iter()
            .map(|m| RetrievedChunk {
                content: m.original_text().to_string(),
                id: m.id,
                score: m.score,
                metadata: m.metadata,
            })
            .collect();

        if self.today_filter && asks_about_today(query) {
            let today = chrono::Local::now().date_naive();
            return Ok(filter_todays_events(chunks, today));
        }

        Ok(chunks)
    }
}

// ============================================================================
// RetrievalGate
// ============================================================================

/// 검색 신뢰도 판정 결과
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// 검색 결과로 답변
    Accept {
        chunks: Vec<RetrievedChunk>,
        confidence: f32,
    },
    /// 일반 지식 사용 여부를 사용자에게 물어봄
    Reject { confidence: f32 },
}

/// 신뢰도 게이트
#[derive(Debug, Clone, Copy)]
pub struct RetrievalGate {
    threshold: f32,
}

impl RetrievalGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// 채택 여부 판정
    pub fn evaluate(&self, chunks: Vec<RetrievedChunk>) -> GateDecision {
        let confidence = mean_score(&chunks);

        if chunks.is_empty() || confidence < self.threshold {
            return GateDecision::Reject { confidence };
        }

        GateDecision::Accept { chunks, confidence }
    }
}

/// 평균 스코어 (결과가 없으면 0)
pub fn mean_score(chunks: &[RetrievedChunk]) -> f32 {
    if chunks.is_empty() {
        return 0.0;
    }
    chunks.iter().map(|c| c.score).sum::<f32>() / chunks.len() as f32
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::vector::{MemoryVectorStore, VectorEntry, ORIGINAL_TEXT_KEY};
    use serde_json::json;

    fn chunk(score: f32) -> RetrievedChunk {
        RetrievedChunk {
            id: format!("c-{}", score),
            score,
            content: "content".to_string(),
            metadata: Metadata::new(),
        }
    }

    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str, purpose: EmbedPurpose) -> Result<Vec<f32>> {
            assert_eq!(purpose, EmbedPurpose::Query);
            if text.is_empty() {
                anyhow::bail!("empty");
            }
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "axis"
        }
    }

    #[test]
    fn test_gate_boundary_accepts_exact_threshold() {
        let gate = RetrievalGate::new(0.5);
        assert!(matches!(gate.evaluate(vec![chunk(0.5)]), GateDecision::Accept { .. }));
        assert!(matches!(
            gate.evaluate(vec![chunk(0.75), chunk(0.25)]),
            GateDecision::Accept { .. }
        ));
    }

    #[test]
    fn test_gate_rejects_low_mean() {
        let gate = RetrievalGate::new(0.5);
        match gate.evaluate(vec![chunk(0.9), chunk(0.1), chunk(0.1)]) {
            GateDecision::Reject { confidence } => assert!((confidence - 0.3667).abs() < 0.001),
            other => panic!("expected reject, got {:?}", other),
        }
    }

    #[test]
    fn test_gate_rejects_empty() {
        let gate = RetrievalGate::new(0.0);
        match gate.evaluate(vec![]) {
            GateDecision::Reject { confidence } => assert_eq!(confidence, 0.0),
            other => panic!("expected reject, got {:?}", other),
        }
    }

    #[test]
    fn test_has_content() {
        let mut c = chunk(0.9);
        assert!(c.has_content());
        c.content = MISSING_TEXT.to_string();
        assert!(!c.has_content());
        c.content = "  \n".to_string();
        assert!(!c.has_content());
    }

    #[tokio::test]
    async fn test_vector_retriever_maps_matches() {
        let store = Arc::new(MemoryVectorStore::new());
        let mut with_text = Metadata::new();
        with_text.insert(ORIGINAL_TEXT_KEY.into(), json!("APEC was founded in 1989."));

        store
            .upsert(&[
                VectorEntry {
                    id: "text".into(),
                    metadata: with_text,
                    embedding: vec![1.0, 0.0],
                },
                VectorEntry {
                    id: "bare".into(),
                    metadata: Metadata::new(),
                    embedding: vec![1.0, 1.0],
                },
            ])
            .await
            .unwrap();

        let retriever = VectorRetriever::new(Arc::new(AxisEmbedder), store);
        let chunks = retriever.retrieve("What is APEC?", 3).await.unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "text");
        assert_eq!(chunks[0].content, "APEC was founded in 1989.");
        assert_eq!(chunks[1].content, MISSING_TEXT);
    }

    #[tokio::test]
    async fn test_vector_retriever_propagates_embedding_failure() {
        let retriever = VectorRetriever::new(Arc::new(AxisEmbedder), Arc::new(MemoryVectorStore::new()));
        assert!(retriever.retrieve("", 3).await.is_err());
    }
}
