use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::{AccountType, UserId};
use crate::domain::unit::UnitId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

/// One priced (unit, quantity) pairing inside a quote.
///
/// `base_price` is a snapshot taken when the line was priced; later catalog
/// price changes never alter it. Only an explicit reprice refreshes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteLineItem {
    pub unit_id: UnitId,
    pub quantity: u32,
    pub base_price: Decimal,
    pub discount_percentage: Decimal,
    pub line_total: Decimal,
}

/// A priced quote owned by one user.
///
/// `owner_account_type` is the owner's classification captured at creation.
/// Repricing resolves discounts against it, never against whoever triggers
/// the reprice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub name: String,
    pub items: Vec<QuoteLineItem>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub status: QuoteStatus,
    pub owner: UserId,
    pub owner_account_type: AccountType,
}

impl Quote {
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self.status, next),
            (QuoteStatus::Draft, QuoteStatus::Submitted)
                | (QuoteStatus::Submitted, QuoteStatus::Approved)
                | (QuoteStatus::Submitted, QuoteStatus::Rejected)
                | (QuoteStatus::Rejected, QuoteStatus::Draft)
        )
    }

    pub fn transition_to(&mut self, next: QuoteStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidQuoteTransition { from: self.status, to: next })
    }
}

/// Raw line-item input. Quantity arrives unvalidated; `quantity()` rejects
/// negative values before any pricing happens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub unit_id: UnitId,
    pub quantity: i64,
}

impl NewLineItem {
    pub fn quantity(&self) -> Result<u32, DomainError> {
        u32::try_from(self.quantity)
            .map_err(|_| DomainError::validation("line item quantity must not be negative"))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewQuoteRequest {
    pub name: String,
    pub items: Vec<NewLineItem>,
}

impl NewQuoteRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("quote name must not be empty"));
        }
        for item in &self.items {
            item.quantity()?;
        }
        Ok(())
    }
}
