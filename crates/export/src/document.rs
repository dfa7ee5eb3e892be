use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use unitquote_core::{Quote, UnitId};

/// Flattened view of a quote prepared for template rendering. Line items
/// carry display names resolved from the catalog instead of raw unit ids.
#[derive(Clone, Debug, Serialize)]
pub struct QuoteDocument {
    pub id: String,
    pub name: String,
    pub status: String,
    pub created_by: String,
    pub created_at: String,
    pub lines: Vec<DocumentLine>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct DocumentLine {
    pub unit_name: String,
    pub quantity: u32,
    pub base_price: Decimal,
    pub discount_percentage: Decimal,
    pub line_total: Decimal,
}

impl QuoteDocument {
    /// Builds a document from a stored quote. `unit_names` maps unit ids to
    /// display names; lines whose unit is no longer in the catalog fall back
    /// to the raw id.
    pub fn from_quote(quote: &Quote, unit_names: &HashMap<UnitId, String>) -> Self {
        let lines = quote
            .items
            .iter()
            .map(|item| DocumentLine {
                unit_name: unit_names
                    .get(&item.unit_id)
                    .cloned()
                    .unwrap_or_else(|| item.unit_id.0.clone()),
                quantity: item.quantity,
                base_price: item.base_price.round_dp(2),
                discount_percentage: item.discount_percentage,
                line_total: item.line_total.round_dp(2),
            })
            .collect();

        Self {
            id: quote.id.0.clone(),
            name: quote.name.clone(),
            status: status_label(quote),
            created_by: quote.created_by.clone(),
            created_at: format_date(quote.created_at),
            lines,
            subtotal: quote.subtotal.round_dp(2),
            discount: quote.discount.round_dp(2),
            total: quote.total.round_dp(2),
        }
    }
}

fn status_label(quote: &Quote) -> String {
    use unitquote_core::QuoteStatus;
    match quote.status {
        QuoteStatus::Draft => "Draft",
        QuoteStatus::Submitted => "Submitted",
        QuoteStatus::Approved => "Approved",
        QuoteStatus::Rejected => "Rejected",
    }
    .to_string()
}

fn format_date(when: DateTime<Utc>) -> String {
    when.format("%Y-%m-%d").to_string()
}
