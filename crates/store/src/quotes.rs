use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use unitquote_core::{
    Caller, DomainError, NewQuoteRequest, Quote, QuoteId, QuoteLineItem, QuoteStatus,
};

use crate::backend::StorageBackend;
use crate::catalog::Catalog;
use crate::error::StoreError;

/// Quote persistence with access control.
///
/// Every operation takes the caller identity explicitly. Admins see and
/// mutate everything; other callers only quotes they own. `get` masks
/// foreign quotes as absent so existence is never confirmed, while the
/// mutating operations answer `Unauthorized` since there the caller already
/// holds the id.
pub struct Quotes {
    backend: Arc<dyn StorageBackend>,
    catalog: Arc<Catalog>,
}

impl Quotes {
    pub fn new(backend: Arc<dyn StorageBackend>, catalog: Arc<Catalog>) -> Self {
        Self { backend, catalog }
    }

    /// Prices the requested lines against the current catalog and persists a
    /// draft quote owned by the caller. Base prices are snapshotted into the
    /// line items; later catalog changes never touch them.
    pub async fn create(
        &self,
        caller: &Caller,
        request: NewQuoteRequest,
    ) -> Result<Quote, StoreError> {
        request.validate()?;
        let now = Utc::now();

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let quantity = line.quantity()?;
            let pricing = self
                .catalog
                .price_line(&line.unit_id, quantity, caller.account_type, now)
                .await?;
            items.push(QuoteLineItem {
                unit_id: line.unit_id.clone(),
                quantity,
                base_price: pricing.base_price,
                discount_percentage: pricing.discount_percentage,
                line_total: pricing.line_total,
            });
        }

        let totals = self.catalog.totals(&items);
        let quote = Quote {
            id: QuoteId(Uuid::new_v4().to_string()),
            name: request.name,
            items,
            subtotal: totals.subtotal,
            discount: totals.discount,
            total: totals.total,
            created_by: caller.username.clone(),
            created_at: now,
            status: QuoteStatus::Draft,
            owner: caller.user_id.clone(),
            owner_account_type: caller.account_type,
        };
        self.backend.save_quote(quote.clone()).await?;
        info!(quote_id = %quote.id.0, owner = %quote.owner.0, "created quote");
        Ok(quote)
    }

    pub async fn list(&self, caller: &Caller) -> Result<Vec<Quote>, StoreError> {
        let mut quotes = self.backend.list_quotes().await?;
        if !caller.is_admin {
            quotes.retain(|quote| caller.owns(&quote.owner));
        }
        // Backend iteration order is unspecified; newest first, id as tiebreak.
        quotes.sort_by(|a, b| {
            b.created_at.cmp(&a.created_at).then_with(|| a.id.0.cmp(&b.id.0))
        });
        Ok(quotes)
    }

    pub async fn get(&self, caller: &Caller, id: &QuoteId) -> Result<Option<Quote>, StoreError> {
        let quote = self.backend.find_quote(id).await?;
        Ok(quote.filter(|quote| caller.can_access(&quote.owner)))
    }

    pub async fn update_status(
        &self,
        caller: &Caller,
        id: &QuoteId,
        status: QuoteStatus,
    ) -> Result<Quote, StoreError> {
        let mut quote = self
            .backend
            .find_quote(id)
            .await?
            .ok_or_else(|| StoreError::not_found("quote", id.0.clone()))?;
        if !caller.can_access(&quote.owner) {
            return Err(StoreError::Unauthorized);
        }
        // Only administrators resolve quotes either way.
        if !caller.is_admin
            && matches!(status, QuoteStatus::Approved | QuoteStatus::Rejected)
        {
            return Err(StoreError::Unauthorized);
        }
        if status == QuoteStatus::Submitted && quote.items.is_empty() {
            return Err(StoreError::Domain(DomainError::validation(
                "cannot submit a quote with no line items",
            )));
        }

        quote.transition_to(status).map_err(StoreError::Domain)?;
        self.backend.save_quote(quote.clone()).await?;
        Ok(quote)
    }

    pub async fn delete(&self, caller: &Caller, id: &QuoteId) -> Result<(), StoreError> {
        let quote = self
            .backend
            .find_quote(id)
            .await?
            .ok_or_else(|| StoreError::not_found("quote", id.0.clone()))?;
        if !caller.can_access(&quote.owner) {
            return Err(StoreError::Unauthorized);
        }
        self.backend.delete_quote(id).await?;
        info!(quote_id = %id.0, "deleted quote");
        Ok(())
    }

    /// Explicit recomputation: refreshes every line's base-price snapshot
    /// and discount from the current catalog and recomputes the totals.
    /// Only drafts can be repriced; a resolved quote's numbers are final.
    /// Discounts resolve against the owner's account type, so an admin
    /// repricing someone else's draft never shifts its eligibility.
    pub async fn reprice(
        &self,
        caller: &Caller,
        id: &QuoteId,
        now: DateTime<Utc>,
    ) -> Result<Quote, StoreError> {
        let mut quote = self
            .backend
            .find_quote(id)
            .await?
            .ok_or_else(|| StoreError::not_found("quote", id.0.clone()))?;
        if !caller.can_access(&quote.owner) {
            return Err(StoreError::Unauthorized);
        }
        if quote.status != QuoteStatus::Draft {
            return Err(StoreError::Domain(DomainError::validation(
                "only draft quotes can be repriced",
            )));
        }

        for item in &mut quote.items {
            let pricing = self
                .catalog
                .price_line(&item.unit_id, item.quantity, quote.owner_account_type, now)
                .await?;
            item.base_price = pricing.base_price;
            item.discount_percentage = pricing.discount_percentage;
            item.line_total = pricing.line_total;
        }
        let totals = self.catalog.totals(&quote.items);
        quote.subtotal = totals.subtotal;
        quote.discount = totals.discount;
        quote.total = totals.total;

        self.backend.save_quote(quote.clone()).await?;
        Ok(quote)
    }
}
