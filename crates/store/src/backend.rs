use async_trait::async_trait;
use thiserror::Error;

use unitquote_core::{DiscountRule, DiscountRuleId, Quote, QuoteId, Unit, UnitId};

#[derive(Debug, Error)]
pub enum BackendError {
    /// The persistence backend could not be reached. Retryable from the
    /// caller's side; the stores never retry internally.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Raw persistence for catalog units. `save` upserts; `delete` reports
/// whether the record existed.
#[async_trait]
pub trait UnitBackend: Send + Sync {
    async fn list_units(&self) -> Result<Vec<Unit>, BackendError>;
    async fn find_unit(&self, id: &UnitId) -> Result<Option<Unit>, BackendError>;
    async fn save_unit(&self, unit: Unit) -> Result<(), BackendError>;
    async fn delete_unit(&self, id: &UnitId) -> Result<bool, BackendError>;
}

#[async_trait]
pub trait DiscountRuleBackend: Send + Sync {
    async fn list_rules(&self) -> Result<Vec<DiscountRule>, BackendError>;
    async fn find_rule(&self, id: &DiscountRuleId) -> Result<Option<DiscountRule>, BackendError>;
    async fn save_rule(&self, rule: DiscountRule) -> Result<(), BackendError>;
    async fn delete_rule(&self, id: &DiscountRuleId) -> Result<bool, BackendError>;
}

#[async_trait]
pub trait QuoteBackend: Send + Sync {
    async fn list_quotes(&self) -> Result<Vec<Quote>, BackendError>;
    async fn find_quote(&self, id: &QuoteId) -> Result<Option<Quote>, BackendError>;
    async fn save_quote(&self, quote: Quote) -> Result<(), BackendError>;
    async fn delete_quote(&self, id: &QuoteId) -> Result<bool, BackendError>;
}

/// A complete storage backend. Access control and referential maintenance
/// live in the service facades, never down here.
pub trait StorageBackend: UnitBackend + DiscountRuleBackend + QuoteBackend {}

impl<T: UnitBackend + DiscountRuleBackend + QuoteBackend> StorageBackend for T {}
