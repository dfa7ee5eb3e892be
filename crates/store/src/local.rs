use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use unitquote_core::{DiscountRule, DiscountRuleId, Quote, QuoteId, Unit, UnitId};

use crate::backend::{BackendError, DiscountRuleBackend, QuoteBackend, UnitBackend};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalState {
    #[serde(default)]
    units: HashMap<String, Unit>,
    #[serde(default)]
    rules: HashMap<String, DiscountRule>,
    #[serde(default)]
    quotes: HashMap<String, Quote>,
}

/// Device-local storage: maps behind an async lock, with an optional JSON
/// snapshot file rewritten after every mutation. Without a snapshot path the
/// store is purely in-memory, which is what the tests use.
pub struct LocalStore {
    state: RwLock<LocalState>,
    snapshot_path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self { state: RwLock::new(LocalState::default()), snapshot_path: None }
    }

    /// Opens a snapshot-backed store, loading existing state if the file is
    /// present.
    pub async fn open(path: PathBuf) -> Result<Self, BackendError> {
        let state = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|err| BackendError::Decode(format!("snapshot {}: {err}", path.display())))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => LocalState::default(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self { state: RwLock::new(state), snapshot_path: Some(path) })
    }

    async fn persist(&self, state: &LocalState) -> Result<(), BackendError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let raw = serde_json::to_vec_pretty(state)
            .map_err(|err| BackendError::Decode(err.to_string()))?;
        tokio::fs::write(path, raw).await?;
        debug!(path = %path.display(), "wrote local snapshot");
        Ok(())
    }
}

#[async_trait::async_trait]
impl UnitBackend for LocalStore {
    async fn list_units(&self) -> Result<Vec<Unit>, BackendError> {
        let state = self.state.read().await;
        Ok(state.units.values().cloned().collect())
    }

    async fn find_unit(&self, id: &UnitId) -> Result<Option<Unit>, BackendError> {
        let state = self.state.read().await;
        Ok(state.units.get(&id.0).cloned())
    }

    async fn save_unit(&self, unit: Unit) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.units.insert(unit.id.0.clone(), unit);
        self.persist(&state).await
    }

    async fn delete_unit(&self, id: &UnitId) -> Result<bool, BackendError> {
        let mut state = self.state.write().await;
        let removed = state.units.remove(&id.0).is_some();
        if removed {
            self.persist(&state).await?;
        }
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl DiscountRuleBackend for LocalStore {
    async fn list_rules(&self) -> Result<Vec<DiscountRule>, BackendError> {
        let state = self.state.read().await;
        Ok(state.rules.values().cloned().collect())
    }

    async fn find_rule(&self, id: &DiscountRuleId) -> Result<Option<DiscountRule>, BackendError> {
        let state = self.state.read().await;
        Ok(state.rules.get(&id.0).cloned())
    }

    async fn save_rule(&self, rule: DiscountRule) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.rules.insert(rule.id.0.clone(), rule);
        self.persist(&state).await
    }

    async fn delete_rule(&self, id: &DiscountRuleId) -> Result<bool, BackendError> {
        let mut state = self.state.write().await;
        let removed = state.rules.remove(&id.0).is_some();
        if removed {
            self.persist(&state).await?;
        }
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl QuoteBackend for LocalStore {
    async fn list_quotes(&self) -> Result<Vec<Quote>, BackendError> {
        let state = self.state.read().await;
        Ok(state.quotes.values().cloned().collect())
    }

    async fn find_quote(&self, id: &QuoteId) -> Result<Option<Quote>, BackendError> {
        let state = self.state.read().await;
        Ok(state.quotes.get(&id.0).cloned())
    }

    async fn save_quote(&self, quote: Quote) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.quotes.insert(quote.id.0.clone(), quote);
        self.persist(&state).await
    }

    async fn delete_quote(&self, id: &QuoteId) -> Result<bool, BackendError> {
        let mut state = self.state.write().await;
        let removed = state.quotes.remove(&id.0).is_some();
        if removed {
            self.persist(&state).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use unitquote_core::{Unit, UnitId};

    use crate::backend::UnitBackend;

    use super::LocalStore;

    fn unit(id: &str) -> Unit {
        Unit {
            id: UnitId(id.to_string()),
            name: "Cascade".to_string(),
            description: None,
            base_price: Decimal::new(2000, 0),
            category: Some("Premium".to_string()),
            features: Vec::new(),
            active: true,
            applicable_discounts: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_unit_round_trip() {
        let store = LocalStore::in_memory();
        let unit = unit("cascade");

        store.save_unit(unit.clone()).await.expect("save unit");
        let found = store.find_unit(&unit.id).await.expect("find unit");
        assert_eq!(found, Some(unit.clone()));

        assert!(store.delete_unit(&unit.id).await.expect("delete"));
        assert!(!store.delete_unit(&unit.id).await.expect("second delete"));
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("snapshot.json");

        let store = LocalStore::open(path.clone()).await.expect("open");
        store.save_unit(unit("cascade")).await.expect("save unit");
        drop(store);

        let reopened = LocalStore::open(path).await.expect("reopen");
        let found = reopened
            .find_unit(&UnitId("cascade".to_string()))
            .await
            .expect("find after reopen");
        assert!(found.is_some());
    }
}
