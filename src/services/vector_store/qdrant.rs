//! Qdrant vector store backend.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
    PointsIdsList, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};

use super::{PointRecord, ScoredPoint, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{StoredChunk, VectorStoreConfig};

type QdrantValue = qdrant_client::qdrant::Value;

/// Qdrant-backed vector store.
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    dimension: u32,
}

impl QdrantBackend {
    pub fn new(
        config: &VectorStoreConfig,
        collection: String,
        dimension: u32,
    ) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection,
            dimension,
        })
    }

    fn doc_scope_filter(doc_ids: &[String]) -> Option<Filter> {
        if doc_ids.is_empty() {
            return None;
        }
        let conditions: Vec<Condition> = doc_ids
            .iter()
            .map(|id| Condition::matches("doc_id", id.clone()))
            .collect();
        Some(Filter::should(conditions))
    }

    fn chunk_payload(chunk: &StoredChunk) -> HashMap<String, QdrantValue> {
        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        payload.insert("doc_id".to_string(), chunk.doc_id.clone().into());
        payload.insert(
            "chunk_index".to_string(),
            i64::from(chunk.chunk_index).into(),
        );
        payload.insert("text".to_string(), chunk.text.clone().into());
        payload.insert("start_offset".to_string(), (chunk.start_offset as i64).into());
        payload.insert("end_offset".to_string(), (chunk.end_offset as i64).into());
        if let Some(ref label) = chunk.label {
            payload.insert("label".to_string(), label.clone().into());
        }
        if !chunk.keywords.is_empty() {
            let keywords: Vec<QdrantValue> = chunk
                .keywords
                .iter()
                .map(|k| k.clone().into())
                .collect();
            payload.insert("keywords".to_string(), keywords.into());
        }
        payload.insert("created_at".to_string(), chunk.created_at.clone().into());
        payload
    }

    fn chunk_from_payload(
        id: String,
        payload: &HashMap<String, QdrantValue>,
    ) -> StoredChunk {
        StoredChunk {
            id,
            doc_id: payload_str(payload, "doc_id").unwrap_or_default(),
            chunk_index: payload_i64(payload, "chunk_index").unwrap_or(0) as u32,
            text: payload_str(payload, "text").unwrap_or_default(),
            start_offset: payload_i64(payload, "start_offset").unwrap_or(0) as u64,
            end_offset: payload_i64(payload, "end_offset").unwrap_or(0) as u64,
            label: payload_str(payload, "label"),
            keywords: payload_str_list(payload, "keywords"),
            created_at: payload_str(payload, "created_at").unwrap_or_default(),
        }
    }
}

fn payload_str(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    })
}

fn payload_i64(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(qdrant_client::qdrant::value::Kind::IntegerValue(n)) => Some(*n),
        _ => None,
    })
}

fn payload_str_list(payload: &HashMap<String, QdrantValue>, key: &str) -> Vec<String> {
    payload
        .get(key)
        .and_then(|v| match &v.kind {
            Some(qdrant_client::qdrant::value::Kind::ListValue(list)) => Some(
                list.values
                    .iter()
                    .filter_map(|v| match &v.kind {
                        Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => {
                            Some(s.clone())
                        }
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default()
}

fn point_id_string(id: &Option<qdrant_client::qdrant::PointId>) -> String {
    match id {
        Some(id) => match &id.point_id_options {
            Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)) => uuid.clone(),
            Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)) => num.to_string(),
            None => String::new(),
        },
        None => String::new(),
    }
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(_) => return Ok(()),
            Err(e) => {
                let msg = e.to_string();
                if !msg.contains("not found") && !msg.contains("doesn't exist") {
                    return Err(VectorStoreError::CollectionError(msg));
                }
            }
        }

        let create = CreateCollectionBuilder::new(&self.collection).vectors_config(
            VectorParamsBuilder::new(u64::from(self.dimension), Distance::Cosine),
        );

        self.client
            .create_collection(create)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(())
    }

    async fn upsert_points(&self, points: Vec<PointRecord>) -> Result<(), VectorStoreError> {
        if points.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|point| {
                let payload = Self::chunk_payload(&point.chunk);
                PointStruct::new(point.id, point.vector, payload)
            })
            .collect();

        let upsert = UpsertPointsBuilder::new(&self.collection, points);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        doc_ids: &[String],
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, vector, limit).with_payload(true);

        if let Some(filter) = Self::doc_scope_filter(doc_ids) {
            search_builder = search_builder.filter(filter);
        }

        let results = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        let matches = results
            .result
            .into_iter()
            .map(|point| {
                let id = point_id_string(&point.id);
                ScoredPoint {
                    chunk: Self::chunk_from_payload(id, &point.payload),
                    score: point.score,
                }
            })
            .collect();

        Ok(matches)
    }

    async fn list_point_ids(&self, doc_id: &str) -> Result<Vec<String>, VectorStoreError> {
        let mut ids = Vec::new();
        let mut offset: Option<qdrant_client::qdrant::PointId> = None;
        let batch_size = 256u32;

        loop {
            let mut scroll_builder = ScrollPointsBuilder::new(&self.collection)
                .limit(batch_size)
                .filter(Filter::must([Condition::matches(
                    "doc_id",
                    doc_id.to_string(),
                )]))
                .with_payload(false)
                .with_vectors(false);

            if let Some(off) = offset {
                scroll_builder = scroll_builder.offset(off);
            }

            let response = self
                .client
                .scroll(scroll_builder)
                .await
                .map_err(|e| VectorStoreError::ScrollError(e.to_string()))?;

            if response.result.is_empty() {
                break;
            }

            for point in &response.result {
                let id = point_id_string(&point.id);
                if !id.is_empty() {
                    ids.push(id);
                }
            }

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        Ok(ids)
    }

    async fn delete_points(&self, ids: Vec<String>) -> Result<(), VectorStoreError> {
        if ids.is_empty() {
            return Ok(());
        }

        let selector = PointsIdsList {
            ids: ids.into_iter().map(Into::into).collect(),
        };
        let delete = DeletePointsBuilder::new(&self.collection).points(selector);

        self.client
            .delete_points(delete)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(())
    }

    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<(), VectorStoreError> {
        let filter = Filter::must([Condition::matches("doc_id", doc_id.to_string())]);
        let delete = DeletePointsBuilder::new(&self.collection).points(filter);

        self.client
            .delete_points(delete)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
