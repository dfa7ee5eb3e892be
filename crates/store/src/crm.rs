use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use unitquote_core::{CrmConfig, DiscountRule, DiscountRuleId, Quote, QuoteId, Unit, UnitId};

use crate::backend::{BackendError, DiscountRuleBackend, QuoteBackend, UnitBackend};

/// Remote CRM/pricing API backend.
///
/// Entities live under `/units`, `/discount-rules`, and `/quotes`; saves are
/// PUT-upserts keyed by id. Transport failures and server errors surface as
/// `BackendError::Unavailable`; retries are left to the caller.
pub struct CrmStore {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl CrmStore {
    pub fn new(config: &CrmConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, BackendError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|err| self.transport_error(path, err))?;

        let response = self.check_status(path, response)?;
        response
            .json()
            .await
            .map_err(|err| BackendError::Decode(format!("GET {path}: {err}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, BackendError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|err| self.transport_error(path, err))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.check_status(path, response)?;
        let record = response
            .json()
            .await
            .map_err(|err| BackendError::Decode(format!("GET {path}: {err}")))?;
        Ok(Some(record))
    }

    async fn put<T: Serialize + Sync>(&self, path: &str, record: &T) -> Result<(), BackendError> {
        let response = self
            .client
            .put(self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .json(record)
            .send()
            .await
            .map_err(|err| self.transport_error(path, err))?;

        self.check_status(path, response).map(|_| ())
    }

    async fn delete(&self, path: &str) -> Result<bool, BackendError> {
        let response = self
            .client
            .delete(self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|err| self.transport_error(path, err))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        self.check_status(path, response).map(|_| true)
    }

    fn transport_error(&self, path: &str, err: reqwest::Error) -> BackendError {
        warn!(path, error = %err, "crm request failed");
        BackendError::Unavailable(format!("{path}: {err}"))
    }

    fn check_status(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        warn!(path, %status, "crm request rejected");
        Err(BackendError::Unavailable(format!("{path}: http {status}")))
    }
}

#[async_trait::async_trait]
impl UnitBackend for CrmStore {
    async fn list_units(&self) -> Result<Vec<Unit>, BackendError> {
        self.list("/units").await
    }

    async fn find_unit(&self, id: &UnitId) -> Result<Option<Unit>, BackendError> {
        self.get(&format!("/units/{}", id.0)).await
    }

    async fn save_unit(&self, unit: Unit) -> Result<(), BackendError> {
        self.put(&format!("/units/{}", unit.id.0), &unit).await
    }

    async fn delete_unit(&self, id: &UnitId) -> Result<bool, BackendError> {
        self.delete(&format!("/units/{}", id.0)).await
    }
}

#[async_trait::async_trait]
impl DiscountRuleBackend for CrmStore {
    async fn list_rules(&self) -> Result<Vec<DiscountRule>, BackendError> {
        self.list("/discount-rules").await
    }

    async fn find_rule(&self, id: &DiscountRuleId) -> Result<Option<DiscountRule>, BackendError> {
        self.get(&format!("/discount-rules/{}", id.0)).await
    }

    async fn save_rule(&self, rule: DiscountRule) -> Result<(), BackendError> {
        self.put(&format!("/discount-rules/{}", rule.id.0), &rule).await
    }

    async fn delete_rule(&self, id: &DiscountRuleId) -> Result<bool, BackendError> {
        self.delete(&format!("/discount-rules/{}", id.0)).await
    }
}

#[async_trait::async_trait]
impl QuoteBackend for CrmStore {
    async fn list_quotes(&self) -> Result<Vec<Quote>, BackendError> {
        self.list("/quotes").await
    }

    async fn find_quote(&self, id: &QuoteId) -> Result<Option<Quote>, BackendError> {
        self.get(&format!("/quotes/{}", id.0)).await
    }

    async fn save_quote(&self, quote: Quote) -> Result<(), BackendError> {
        self.put(&format!("/quotes/{}", quote.id.0), &quote).await
    }

    async fn delete_quote(&self, id: &QuoteId) -> Result<bool, BackendError> {
        self.delete(&format!("/quotes/{}", id.0)).await
    }
}
