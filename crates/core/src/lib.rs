pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;

pub use config::{
    AppConfig, ConfigError, CrmConfig, LoggingConfig, StorageBackendKind, StorageConfig,
};
pub use domain::account::{AccountType, Caller, UserId};
pub use domain::discount::{
    DiscountRule, DiscountRuleId, DiscountRulePatch, DiscountType, NewDiscountRule,
};
pub use domain::quote::{NewLineItem, NewQuoteRequest, Quote, QuoteId, QuoteLineItem, QuoteStatus};
pub use domain::unit::{
    NewUnit, SortOrder, Unit, UnitId, UnitPatch, UnitSearchParams, UnitSearchResult, UnitSortField,
};
pub use errors::DomainError;
pub use pricing::{
    compute_totals, price_line, resolve_applicable_discounts, DeterministicPricingEngine,
    LinePricing, PricingEngine, QuoteTotals,
};
