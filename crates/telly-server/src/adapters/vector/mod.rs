//! Vector Index Adapters
//!
//! - `InProcessVectorIndex`: exact scan, JSON snapshot on disk
//! - `QdrantVectorIndex`: external Qdrant collection
//!
//! `build_index` picks one from configuration; callers hold `Arc<dyn VectorIndex>`.

mod in_process;
mod qdrant;

pub use in_process::InProcessVectorIndex;
pub use qdrant::QdrantVectorIndex;

use std::path::Path;
use std::sync::Arc;

use telly::{DomainError, VectorIndex};

use crate::config::{AppConfig, VectorBackend};

/// Build the index for one store. `name` becomes the snapshot file stem or
/// the Qdrant collection suffix.
pub async fn build_index(
    config: &AppConfig,
    name: &str,
) -> Result<Arc<dyn VectorIndex>, DomainError> {
    match &config.vector_backend {
        VectorBackend::InProcess => {
            let path = Path::new(&config.data_dir).join(format!("{}.vectors.json", name));
            tracing::info!(store = name, path = %path.display(), "Using in-process vector index");
            Ok(Arc::new(InProcessVectorIndex::new(
                config.embedding_dimension,
                config.vector_metric,
                Some(path),
            )))
        }
        VectorBackend::Qdrant { url, api_key } => {
            let collection = format!("telly_{}", name);
            let index = QdrantVectorIndex::connect(
                url,
                api_key.clone(),
                collection,
                config.embedding_dimension,
                config.vector_metric,
            )
            .await?;
            Ok(Arc::new(index))
        }
    }
}
