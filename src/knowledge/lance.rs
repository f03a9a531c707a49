//! LanceDB Vector Store - 청크 벡터 검색
//!
//! 코사인 거리로 검색하며 스코어는 `1 - distance`입니다.
//! 메타데이터는 JSON 문자열 컬럼으로 저장합니다.
//! ref: https://lancedb.github.io/lancedb/

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;

use super::vector::{Metadata, VectorEntry, VectorMatch, VectorSearch, EMBEDDING_DIMENSION};

// ============================================================================
// LanceVectorStore
// ============================================================================

/// LanceDB 벡터 저장소 구현
pub struct LanceVectorStore {
    db: Connection,
    table_name: String,
}

impl LanceVectorStore {
    /// LanceDB 저장소 열기
    ///
    /// # Arguments
    /// * `path` - .lance 디렉토리 경로
    /// * `table_name` - 청크 테이블 이름
    pub async fn open(path: &Path, table_name: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create LanceDB directory")?;
            }
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))?;

        let db = lancedb::connect(path_str)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        Ok(Self {
            db,
            table_name: table_name.to_string(),
        })
    }

    /// 청크 테이블 스키마
    fn create_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("metadata", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    EMBEDDING_DIMENSION,
                ),
                false,
            ),
        ])
    }

    /// 엔트리들을 Arrow RecordBatch로 변환
    fn entries_to_batch(entries: &[VectorEntry]) -> Result<RecordBatch> {
        if entries.is_empty() {
            anyhow::bail!("Cannot create batch from empty entries");
        }

        if let Some(bad) = entries
            .iter()
            .find(|e| e.embedding.len() != EMBEDDING_DIMENSION as usize)
        {
            anyhow::bail!(
                "Embedding for '{}' has dimension {}, expected {}",
                bad.id,
                bad.embedding.len(),
                EMBEDDING_DIMENSION
            );
        }

        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        let metadata: Vec<String> = entries
            .iter()
            .map(|e| serde_json::to_string(&e.metadata))
            .collect::<Result<_, _>>()
            .context("Failed to serialize metadata")?;

        let embeddings_flat: Vec<f32> = entries
            .iter()
            .flat_map(|e| e.embedding.iter().copied())
            .collect();

        let values = Float32Array::from(embeddings_flat);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let embeddings_list = FixedSizeListArray::try_new(
            field,
            EMBEDDING_DIMENSION,
            Arc::new(values) as Arc<dyn Array>,
            None,
        )
        .context("Failed to create embedding array")?;

        let batch = RecordBatch::try_new(
            Arc::new(Self::create_schema()),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(metadata)),
                Arc::new(embeddings_list),
            ],
        )
        .context("Failed to create RecordBatch")?;

        Ok(batch)
    }

    /// 테이블 존재 여부 확인
    async fn table_exists(&self) -> bool {
        self.db
            .table_names()
            .execute()
            .await
            .map(|names| names.contains(&self.table_name))
            .unwrap_or(false)
    }

    async fn open_table(&self) -> Result<lancedb::table::Table> {
        self.db
            .open_table(&self.table_name)
            .execute()
            .await
            .with_context(|| format!("Failed to open table '{}'", self.table_name))
    }
}

#[async_trait]
impl VectorSearch for LanceVectorStore {
    async fn upsert(&self, entries: &[VectorEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let batch = Self::entries_to_batch(entries)?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        if self.table_exists().await {
            // 같은 id는 갱신, 새 id는 삽입
            let table = self.open_table().await?;
            let mut merge = table.merge_insert(&["id"]);
            merge.when_matched_update_all(None).when_not_matched_insert_all();
            merge
                .execute(Box::new(batches))
                .await
                .context("Failed to upsert vectors")?;
        } else {
            self.db
                .create_table(&self.table_name, batches)
                .execute()
                .await
                .context("Failed to create table")?;
            tracing::info!("Created LanceDB table '{}'", self.table_name);
        }

        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<VectorMatch>> {
        if !self.table_exists().await {
            return Ok(vec![]);
        }

        let table = self.open_table().await?;

        let results = table
            .vector_search(query_embedding.to_vec())
            .context("Failed to create vector search")?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .context("Failed to execute vector search")?;

        use futures::TryStreamExt;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        let mut matches = Vec::new();

        for batch in batches {
            let ids = batch
                .column_by_name("id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing id column"))?;

            let metadata = batch
                .column_by_name("metadata")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing metadata column"))?;

            // _distance 컬럼 (LanceDB가 자동 추가)
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| anyhow::anyhow!("Missing _distance column"))?;

            for i in 0..batch.num_rows() {
                let parsed: Metadata = serde_json::from_str(metadata.value(i)).unwrap_or_else(|e| {
                    tracing::warn!("Invalid metadata for '{}': {}", ids.value(i), e);
                    Metadata::new()
                });

                matches.push(VectorMatch {
                    id: ids.value(i).to_string(),
                    score: 1.0 - distances.value(i),
                    metadata: parsed,
                });
            }
        }

        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        if !self.table_exists().await {
            return Ok(0);
        }

        let table = self.open_table().await?;
        let count = table.count_rows(None).await.context("Failed to count rows")?;
        Ok(count)
    }
}

// ============================================================================
// Tests
// ============================================================================
