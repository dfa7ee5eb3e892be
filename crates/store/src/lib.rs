pub mod backend;
pub mod catalog;
pub mod crm;
pub mod error;
pub mod fixtures;
pub mod local;
pub mod quotes;

use std::sync::Arc;

use unitquote_core::{DomainError, StorageBackendKind, StorageConfig};

pub use backend::{BackendError, DiscountRuleBackend, QuoteBackend, StorageBackend, UnitBackend};
pub use catalog::Catalog;
pub use crm::CrmStore;
pub use error::StoreError;
pub use fixtures::{demo_dataset, seed_demo_data, DemoDataset};
pub use local::LocalStore;
pub use quotes::Quotes;

/// Builds the storage backend named by the configuration. This is the only
/// place backend choice branches; everything above it sees `dyn
/// StorageBackend`.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StoreError> {
    match config.backend {
        StorageBackendKind::Local => {
            let store = match &config.snapshot_path {
                Some(path) => LocalStore::open(path.clone()).await?,
                None => LocalStore::in_memory(),
            };
            Ok(Arc::new(store))
        }
        StorageBackendKind::Crm => {
            let crm = config.crm.as_ref().ok_or_else(|| {
                StoreError::Domain(DomainError::validation(
                    "crm backend selected without crm configuration",
                ))
            })?;
            Ok(Arc::new(CrmStore::new(crm)?))
        }
    }
}
