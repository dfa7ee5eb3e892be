use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountType;
use crate::domain::unit::UnitId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscountRuleId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Volume,
    AccountType,
    Special,
}

/// A pricing adjustment policy.
///
/// `threshold` is meaningful only for VOLUME rules and `account_type` only
/// for ACCOUNT_TYPE rules; evaluation ignores the other field, but both are
/// stored as given. `applicable_units` is the authoritative side of the
/// unit/rule relation; the catalog mirrors it into each unit's allow-list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub id: DiscountRuleId,
    pub name: String,
    pub rule_type: DiscountType,
    pub discount_percentage: Decimal,
    pub threshold: u32,
    pub account_type: Option<AccountType>,
    pub effective_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub applicable_units: Vec<UnitId>,
}

impl DiscountRule {
    /// A rule is live at `now` iff its validity window contains `now`:
    /// `effective_date <= now` and `end_date` absent or strictly later.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.effective_date <= now && self.end_date.map_or(true, |end| end > now)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("discount rule name must not be empty"));
        }
        if self.discount_percentage < Decimal::ZERO
            || self.discount_percentage > Decimal::ONE_HUNDRED
        {
            return Err(DomainError::validation("discount percentage must be between 0 and 100"));
        }
        match self.rule_type {
            DiscountType::Volume if self.threshold == 0 => {
                Err(DomainError::validation("volume rule requires a minimum quantity threshold"))
            }
            DiscountType::AccountType if self.account_type.is_none() => {
                Err(DomainError::validation("account-type rule requires an account type"))
            }
            _ => Ok(()),
        }
    }
}

/// Input for creating a discount rule. The store assigns the id and stamps
/// `effective_date` with the creation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewDiscountRule {
    pub name: String,
    pub rule_type: DiscountType,
    pub discount_percentage: Decimal,
    #[serde(default)]
    pub threshold: u32,
    pub account_type: Option<AccountType>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub applicable_units: Vec<UnitId>,
}

impl NewDiscountRule {
    pub fn into_rule(self, id: DiscountRuleId, now: DateTime<Utc>) -> DiscountRule {
        DiscountRule {
            id,
            name: self.name,
            rule_type: self.rule_type,
            discount_percentage: self.discount_percentage,
            threshold: self.threshold,
            account_type: self.account_type,
            effective_date: now,
            end_date: self.end_date,
            applicable_units: self.applicable_units,
        }
    }
}

/// Partial update for a discount rule. Absent fields are left untouched;
/// `effective_date` is never rewritten by an update. `account_type` and
/// `end_date` nest an inner `Option` so `Some(None)` clears the stored value
/// (reopening a rule to an open-ended window), while outer `None` leaves it
/// alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountRulePatch {
    pub name: Option<String>,
    pub rule_type: Option<DiscountType>,
    pub discount_percentage: Option<Decimal>,
    pub threshold: Option<u32>,
    pub account_type: Option<Option<AccountType>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub applicable_units: Option<Vec<UnitId>>,
}

impl DiscountRulePatch {
    pub fn apply(self, rule: &mut DiscountRule) {
        if let Some(name) = self.name {
            rule.name = name;
        }
        if let Some(rule_type) = self.rule_type {
            rule.rule_type = rule_type;
        }
        if let Some(pct) = self.discount_percentage {
            rule.discount_percentage = pct;
        }
        if let Some(threshold) = self.threshold {
            rule.threshold = threshold;
        }
        if let Some(account_type) = self.account_type {
            rule.account_type = account_type;
        }
        if let Some(end_date) = self.end_date {
            rule.end_date = end_date;
        }
        if let Some(applicable_units) = self.applicable_units {
            rule.applicable_units = applicable_units;
        }
    }
}
