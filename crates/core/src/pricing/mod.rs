pub mod calculator;
pub mod resolver;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::account::AccountType;
use crate::domain::discount::DiscountRule;
use crate::domain::quote::QuoteLineItem;
use crate::domain::unit::Unit;

pub use calculator::{compute_totals, price_line, LinePricing, QuoteTotals};
pub use resolver::resolve_applicable_discounts;

/// Seam for the pricing pipeline: discount resolution, line pricing, and
/// quote aggregation. The stores consume this trait so an embedder can swap
/// in an alternative engine without touching storage code.
pub trait PricingEngine: Send + Sync {
    fn resolve(
        &self,
        rules: &[DiscountRule],
        unit: Option<&Unit>,
        quantity: u32,
        account_type: AccountType,
        now: DateTime<Utc>,
    ) -> Vec<DiscountRule>;

    fn price_line(
        &self,
        base_price: Decimal,
        quantity: u32,
        resolved: &[DiscountRule],
    ) -> LinePricing;

    fn totals(&self, items: &[QuoteLineItem]) -> QuoteTotals;
}

#[derive(Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn resolve(
        &self,
        rules: &[DiscountRule],
        unit: Option<&Unit>,
        quantity: u32,
        account_type: AccountType,
        now: DateTime<Utc>,
    ) -> Vec<DiscountRule> {
        resolve_applicable_discounts(rules, unit, quantity, account_type, now)
    }

    fn price_line(
        &self,
        base_price: Decimal,
        quantity: u32,
        resolved: &[DiscountRule],
    ) -> LinePricing {
        price_line(base_price, quantity, resolved)
    }

    fn totals(&self, items: &[QuoteLineItem]) -> QuoteTotals {
        compute_totals(items)
    }
}
