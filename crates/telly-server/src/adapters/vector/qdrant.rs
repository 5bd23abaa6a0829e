//! Qdrant-backed vector index
//!
//! One collection per store. Point ids must be UUIDs, so record ids that are
//! not already UUIDs are mapped through UUIDv5; the original id travels in
//! the `record_id` payload field.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance,
    GetPointsBuilder, PointId, PointStruct, PointsIdsList, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use uuid::Uuid;

use telly::{DistanceMetric, DomainError, ScoredId, VectorIndex};

const RECORD_ID_FIELD: &str = "record_id";
const SCROLL_PAGE: u32 = 256;

pub struct QdrantVectorIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
    metric: DistanceMetric,
}

fn qdrant_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::ExternalService(format!("qdrant: {}", e))
}

fn point_id(record_id: &str) -> PointId {
    let uuid = Uuid::parse_str(record_id)
        .unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes()));
    PointId::from(uuid.to_string())
}

/// Extract `record_id` from a point payload
fn record_id<T: serde::Serialize>(payload: &T) -> Option<String> {
    let json = serde_json::to_value(payload).ok()?;
    json.get(RECORD_ID_FIELD)?.as_str().map(str::to_string)
}

impl QdrantVectorIndex {
    /// Connect and make sure the collection exists
    pub async fn connect(
        url: &str,
        api_key: Option<String>,
        collection: String,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<Self, DomainError> {
        let client = if let Some(key) = api_key {
            Qdrant::from_url(url).api_key(key).build()
        } else {
            Qdrant::from_url(url).build()
        }
        .map_err(qdrant_err)?;

        let index = Self {
            client,
            collection,
            dimension,
            metric,
        };
        index.ensure_collection().await?;

        tracing::info!(collection = %index.collection, "Connected to Qdrant vector index");
        Ok(index)
    }

    fn distance(&self) -> Distance {
        match self.metric {
            DistanceMetric::Cosine => Distance::Cosine,
            DistanceMetric::Dot => Distance::Dot,
            DistanceMetric::Euclidean => Distance::Euclid,
        }
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        if self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(qdrant_err)?
        {
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, self.distance()),
                ),
            )
            .await
            .map_err(qdrant_err)?;

        tracing::info!(collection = %self.collection, dimension = self.dimension, "Created Qdrant collection");
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }

    async fn add(&self, id: &str, vector: Vec<f32>) -> Result<(), DomainError> {
        DomainError::check_dimension(self.dimension, &vector)?;
        let mut fields = serde_json::Map::new();
        fields.insert(RECORD_ID_FIELD.to_string(), serde_json::Value::from(id));
        let payload = Payload::try_from(serde_json::Value::Object(fields)).map_err(qdrant_err)?;
        let point = PointStruct::new(point_id(id), vector, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(qdrant_err)?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, DomainError> {
        let existing = self
            .client
            .get_points(GetPointsBuilder::new(&self.collection, vec![point_id(id)]))
            .await
            .map_err(qdrant_err)?;
        if existing.result.is_empty() {
            return Ok(false);
        }

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(PointsIdsList {
                        ids: vec![point_id(id)],
                    })
                    .wait(true),
            )
            .await
            .map_err(qdrant_err)?;
        Ok(true)
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredId>, DomainError> {
        DomainError::check_dimension(self.dimension, vector)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(qdrant_err)?;

        let hits = response
            .result
            .into_iter()
            .filter_map(|point| {
                let score = match self.metric {
                    // Qdrant reports raw distance for Euclid; map to similarity
                    DistanceMetric::Euclidean => 1.0 / (1.0 + point.score.max(0.0)),
                    _ => point.score,
                };
                record_id(&point.payload).map(|id| ScoredId { id, score })
            })
            .collect();
        Ok(hits)
    }

    async fn ids(&self) -> Result<Vec<String>, DomainError> {
        let mut ids = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let mut request = ScrollPointsBuilder::new(&self.collection)
                .limit(SCROLL_PAGE)
                .with_payload(true);
            if let Some(offset) = offset.take() {
                request = request.offset(offset);
            }
            let page = self.client.scroll(request).await.map_err(qdrant_err)?;
            ids.extend(page.result.iter().filter_map(|p| record_id(&p.payload)));
            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        Ok(ids)
    }

    async fn len(&self) -> Result<usize, DomainError> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(qdrant_err)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn persist(&self) -> Result<(), DomainError> {
        // Upserts are issued with wait=true; nothing is buffered locally.
        Ok(())
    }

    async fn load(&self) -> Result<(), DomainError> {
        self.ensure_collection().await
    }
}
