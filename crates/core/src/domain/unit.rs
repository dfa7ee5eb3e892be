use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::discount::DiscountRuleId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub String);

/// A sellable catalog entry.
///
/// `applicable_discounts` is an opt-in allow-list: an empty list means every
/// discount rule may apply to this unit. The catalog keeps it consistent with
/// the `applicable_units` list on each rule; nothing else writes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub category: Option<String>,
    pub features: Vec<String>,
    pub active: bool,
    pub applicable_discounts: Vec<DiscountRuleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Unit {
    /// Whether a discount rule passes this unit's scope filter.
    pub fn permits_rule(&self, rule_id: &DiscountRuleId) -> bool {
        self.applicable_discounts.is_empty() || self.applicable_discounts.contains(rule_id)
    }
}

/// Input for creating a catalog unit. The store assigns id and timestamps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewUnit {
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub category: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub active: bool,
}

impl NewUnit {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("unit name must not be empty"));
        }
        if self.base_price < Decimal::ZERO {
            return Err(DomainError::validation("unit base price must not be negative"));
        }
        Ok(())
    }
}

/// Partial update for a unit. Absent fields are left untouched.
/// `description` and `category` nest an inner `Option` so `Some(None)`
/// clears the stored value while outer `None` leaves it alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub base_price: Option<Decimal>,
    pub category: Option<Option<String>>,
    pub features: Option<Vec<String>>,
    pub active: Option<bool>,
}

impl UnitPatch {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("unit name must not be empty"));
            }
        }
        if let Some(price) = self.base_price {
            if price < Decimal::ZERO {
                return Err(DomainError::validation("unit base price must not be negative"));
            }
        }
        Ok(())
    }

    pub fn apply(self, unit: &mut Unit, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            unit.name = name;
        }
        if let Some(description) = self.description {
            unit.description = description;
        }
        if let Some(base_price) = self.base_price {
            unit.base_price = base_price;
        }
        if let Some(category) = self.category {
            unit.category = category;
        }
        if let Some(features) = self.features {
            unit.features = features;
        }
        if let Some(active) = self.active {
            unit.active = active;
        }
        unit.updated_at = now;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSortField {
    Name,
    Price,
    Category,
    UpdatedAt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Search request over catalog units. Pagination is 1-indexed; a missing
/// `page_size` means all matching results in one page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitSearchParams {
    pub query: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<UnitSortField>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitSearchResult {
    pub units: Vec<Unit>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}
