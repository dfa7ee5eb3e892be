use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::discount::DiscountRule;
use crate::domain::quote::QuoteLineItem;

/// Pricing outcome for a single line. Amounts keep full `Decimal` precision;
/// rounding to two decimal places happens only at the rendering boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinePricing {
    pub base_price: Decimal,
    pub discount_percentage: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Prices one line against an already-resolved, ordered rule list.
///
/// Only the top-ranked rule applies; a quote line never accumulates more
/// than one discount. An empty rule list prices at 0% discount.
pub fn price_line(base_price: Decimal, quantity: u32, resolved: &[DiscountRule]) -> LinePricing {
    let discount_percentage =
        resolved.first().map(|rule| rule.discount_percentage).unwrap_or(Decimal::ZERO);
    let line_subtotal = base_price * Decimal::from(quantity);
    let line_total = line_subtotal * (Decimal::ONE - discount_percentage / Decimal::ONE_HUNDRED);

    LinePricing { base_price, discount_percentage, line_total }
}

/// Aggregates line items into quote totals.
///
/// `subtotal` is the undiscounted sum, `total` the sum of line totals, and
/// `discount` their difference (a currency amount, not a percentage). An
/// empty item list yields all zeroes; rejecting empty quotes is the
/// submission boundary's job, not the calculator's.
pub fn compute_totals(items: &[QuoteLineItem]) -> QuoteTotals {
    let subtotal: Decimal =
        items.iter().map(|item| item.base_price * Decimal::from(item.quantity)).sum();
    let total: Decimal = items.iter().map(|item| item.line_total).sum();

    QuoteTotals { subtotal, discount: subtotal - total, total }
}
