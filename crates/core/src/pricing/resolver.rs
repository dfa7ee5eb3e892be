use chrono::{DateTime, Utc};

use crate::domain::account::AccountType;
use crate::domain::discount::{DiscountRule, DiscountType};
use crate::domain::unit::Unit;

/// Returns every discount rule applicable to `unit` at `now`, ordered by
/// `discount_percentage` descending (ties break ascending by rule id).
///
/// Eligibility runs three filters in order: the unit's opt-in allow-list,
/// the rule's validity window, and the type-specific check (account type
/// match, volume threshold, or unconditional for SPECIAL). An unknown unit
/// (`None`) resolves to an empty list rather than an error.
///
/// Callers apply only the head of the list: discounts never stack.
pub fn resolve_applicable_discounts(
    rules: &[DiscountRule],
    unit: Option<&Unit>,
    quantity: u32,
    account_type: AccountType,
    now: DateTime<Utc>,
) -> Vec<DiscountRule> {
    let Some(unit) = unit else {
        return Vec::new();
    };

    let mut eligible: Vec<DiscountRule> = rules
        .iter()
        .filter(|rule| unit.permits_rule(&rule.id))
        .filter(|rule| rule.is_live(now))
        .filter(|rule| match rule.rule_type {
            DiscountType::AccountType => rule.account_type == Some(account_type),
            DiscountType::Volume => quantity >= rule.threshold,
            DiscountType::Special => true,
        })
        .cloned()
        .collect();

    eligible.sort_by(|a, b| {
        b.discount_percentage.cmp(&a.discount_percentage).then_with(|| a.id.cmp(&b.id))
    });
    eligible
}
