//! 청크 적재 - 전처리된 청크 파일을 벡터 저장소에 올립니다.
//!
//! 입력은 `{id, content, metadata}` 객체의 JSON 배열입니다.
//! 본문은 검색 시 복원할 수 있도록 `metadata.original_text`에 복사됩니다.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gemini::{EmbedPurpose, EmbeddingProvider};

use super::vector::{Metadata, VectorEntry, VectorSearch, ORIGINAL_TEXT_KEY};

/// 업서트 배치 크기
pub const DEFAULT_BATCH_SIZE: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// 청크 레코드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// 적재 통계
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStats {
    /// 입력 청크 수
    pub total: usize,
    /// 저장된 청크 수
    pub upserted: usize,
    /// 임베딩 실패로 건너뛴 청크 수
    pub skipped: usize,
    /// 업서트에 실패한 배치 수
    pub failed_batches: usize,
}

/// 청크 파일 읽기
pub fn load_chunk_file(path: &Path) -> Result<Vec<ChunkRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunk file: {:?}", path))?;

    let chunks: Vec<ChunkRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse chunk file: {:?}", path))?;

    tracing::info!("Loaded {} chunks from {:?}", chunks.len(), path);
    Ok(chunks)
}

// ============================================================================
// ChunkLoader
// ============================================================================

/// 청크 임베딩 + 업서트
pub struct ChunkLoader {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorSearch>,
    batch_size: usize,
}

impl ChunkLoader {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorSearch>) -> Self {
        Self {
            embedder,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// 청크 적재
    ///
    /// 임베딩 실패 청크와 실패한 배치는 기록만 하고 계속 진행합니다.
    pub async fn ingest(&self, chunks: &[ChunkRecord]) -> Result<IngestStats> {
        let mut stats = IngestStats {
            total: chunks.len(),
            ..Default::default()
        };

        let batch_count = chunks.len().div_ceil(self.batch_size);

        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            tracing::info!("Upserting batch {}/{}", batch_index + 1, batch_count);

            let mut entries = Vec::with_capacity(batch.len());

            for chunk in batch {
                match self.embedder.embed(&chunk.content, EmbedPurpose::Document).await {
                    Ok(embedding) => entries.push(to_entry(chunk, embedding)),
                    Err(e) => {
                        tracing::warn!(
                            "Embedding error for '{}': {}",
                            preview(&chunk.content, 50),
                            e
                        );
                        stats.skipped += 1;
                    }
                }
            }

            if entries.is_empty() {
                continue;
            }

            match self.store.upsert(&entries).await {
                Ok(n) => stats.upserted += n,
                Err(e) => {
                    tracing::warn!("Error upserting batch {}: {}", batch_index + 1, e);
                    stats.failed_batches += 1;
                }
            }
        }

        tracing::info!(
            "Finished loading: {} upserted, {} skipped, {} failed batches",
            stats.upserted,
            stats.skipped,
            stats.failed_batches
        );

        Ok(stats)
    }
}

fn to_entry(chunk: &ChunkRecord, embedding: Vec<f32>) -> VectorEntry {
    let mut metadata = chunk.metadata.clone();
    metadata.insert(
        ORIGINAL_TEXT_KEY.to_string(),
        Value::String(chunk.content.clone()),
    );

    VectorEntry {
        id: chunk.id.clone(),
        metadata,
        embedding,
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let truncated: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::vector::MemoryVectorStore;
    use async_trait::async_trait;
    use std::io::Write;

    /// "fail"이 들어간 텍스트만 실패하는 임베더
    struct FlakyEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        async fn embed(&self, text: &str, purpose: EmbedPurpose) -> Result<Vec<f32>> {
            assert_eq!(purpose, EmbedPurpose::Document);
            if text.contains("fail") {
                anyhow::bail!("quota exceeded");
            }
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn chunk(id: &str, content: &str) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            content: content.to_string(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_load_chunk_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "c1", "content": "APEC 2025 KOREA", "metadata": {{"category": "Overview"}}}},
                {{"id": "c2", "content": "Gyeongju"}}
            ]"#
        )
        .unwrap();

        let chunks = load_chunk_file(file.path()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.get("category").and_then(Value::as_str), Some("Overview"));
        assert!(chunks[1].metadata.is_empty());
    }

    #[test]
    fn test_load_chunk_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"not": "a list"}}"#).unwrap();
        assert!(load_chunk_file(file.path()).is_err());
    }

    #[tokio::test]
    async fn test_ingest_copies_original_text_and_skips_failures() {
        let store = Arc::new(MemoryVectorStore::new());
        let loader = ChunkLoader::new(Arc::new(FlakyEmbedder), store.clone()).with_batch_size(2);

        let chunks = vec![
            chunk("a", "Leaders' Meeting in Gyeongju"),
            chunk("b", "this one will fail"),
            chunk("c", "Jeju hosts SOM1"),
        ];

        let stats = loader.ingest(&chunks).await.unwrap();
        assert_eq!(
            stats,
            IngestStats {
                total: 3,
                upserted: 2,
                skipped: 1,
                failed_batches: 0,
            }
        );

        let results = store.search(&[1.0, 0.0], 10).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|m| m.original_text()).collect();
        assert!(texts.contains(&"Leaders' Meeting in Gyeongju"));
        assert!(texts.contains(&"Jeju hosts SOM1"));
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("경주에서 열립니다", 2), "경주...");
    }
}
