use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use unitquote_core::{
    AccountType, Caller, DeterministicPricingEngine, DiscountRule, DiscountRuleId,
    DiscountRulePatch, DiscountType, DomainError, LinePricing, NewDiscountRule, NewUnit,
    PricingEngine, QuoteLineItem, QuoteTotals, SortOrder, Unit, UnitId, UnitPatch,
    UnitSearchParams, UnitSearchResult, UnitSortField,
};

use crate::backend::StorageBackend;
use crate::error::StoreError;

/// Catalog service: unit and discount-rule CRUD, unit search, and discount
/// resolution over the injected backend.
///
/// The unit/rule relation is written only here. Rule mutations rewrite every
/// unit's allow-list through `sync_rule_relation`; unit deletion strips the
/// unit from every rule first. Both sequences are best-effort: a crash in
/// the middle can leave the relation inconsistent until the next rewrite.
pub struct Catalog {
    backend: Arc<dyn StorageBackend>,
    engine: Box<dyn PricingEngine>,
}

impl Catalog {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_engine(backend, Box::new(DeterministicPricingEngine))
    }

    pub fn with_engine(backend: Arc<dyn StorageBackend>, engine: Box<dyn PricingEngine>) -> Self {
        Self { backend, engine }
    }

    // --- units ---

    pub async fn get_unit(&self, id: &UnitId) -> Result<Option<Unit>, StoreError> {
        Ok(self.backend.find_unit(id).await?)
    }

    pub async fn search_units(
        &self,
        params: &UnitSearchParams,
    ) -> Result<UnitSearchResult, StoreError> {
        let mut units = self.backend.list_units().await?;

        if let Some(query) = params.query.as_deref().filter(|q| !q.trim().is_empty()) {
            let needle = query.to_lowercase();
            units.retain(|unit| {
                unit.name.to_lowercase().contains(&needle)
                    || unit
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
                    || unit
                        .category
                        .as_deref()
                        .is_some_and(|c| c.to_lowercase().contains(&needle))
            });
        }

        if let Some(category) = params.category.as_deref() {
            units.retain(|unit| {
                unit.category.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(category))
            });
        }

        let sort_by = params.sort_by.unwrap_or(UnitSortField::Name);
        let sort_order = params.sort_order.unwrap_or(SortOrder::Asc);
        // Reverse the comparison, not the sorted vec: the sort stays stable
        // and equal keys keep their incoming order in both directions.
        units.sort_by(|a, b| {
            let ordering = match sort_by {
                UnitSortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                UnitSortField::Price => a.base_price.cmp(&b.base_price),
                UnitSortField::Category => {
                    let left = a.category.as_deref().unwrap_or_default().to_lowercase();
                    let right = b.category.as_deref().unwrap_or_default().to_lowercase();
                    left.cmp(&right)
                }
                UnitSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            };
            match sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = units.len();
        let page = params.page.unwrap_or(1).max(1);
        let page_size = params.page_size.filter(|size| *size > 0).unwrap_or(total);
        let total_pages = if page_size == 0 { 0 } else { total.div_ceil(page_size) };
        let units = units
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        Ok(UnitSearchResult { units, total, page, page_size, total_pages })
    }

    pub async fn create_unit(&self, caller: &Caller, new: NewUnit) -> Result<Unit, StoreError> {
        require_admin(caller)?;
        new.validate()?;

        let now = Utc::now();
        let unit = Unit {
            id: UnitId(Uuid::new_v4().to_string()),
            name: new.name,
            description: new.description,
            base_price: new.base_price,
            category: new.category,
            features: new.features,
            active: new.active,
            applicable_discounts: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.backend.save_unit(unit.clone()).await?;
        info!(unit_id = %unit.id.0, "created catalog unit");
        Ok(unit)
    }

    pub async fn update_unit(
        &self,
        caller: &Caller,
        id: &UnitId,
        patch: UnitPatch,
    ) -> Result<Unit, StoreError> {
        require_admin(caller)?;
        patch.validate()?;

        let mut unit = self
            .backend
            .find_unit(id)
            .await?
            .ok_or_else(|| StoreError::not_found("unit", id.0.clone()))?;
        patch.apply(&mut unit, Utc::now());
        self.backend.save_unit(unit.clone()).await?;
        Ok(unit)
    }

    /// Deletes a unit, first stripping its id from every rule's
    /// `applicable_units` list so no rule dangles.
    pub async fn delete_unit(&self, caller: &Caller, id: &UnitId) -> Result<(), StoreError> {
        require_admin(caller)?;

        for mut rule in self.backend.list_rules().await? {
            if rule.applicable_units.contains(id) {
                rule.applicable_units.retain(|unit_id| unit_id != id);
                self.backend.save_rule(rule).await?;
            }
        }

        if !self.backend.delete_unit(id).await? {
            return Err(StoreError::not_found("unit", id.0.clone()));
        }
        info!(unit_id = %id.0, "deleted catalog unit");
        Ok(())
    }

    // --- discount rules ---

    pub async fn list_rules(&self) -> Result<Vec<DiscountRule>, StoreError> {
        Ok(self.backend.list_rules().await?)
    }

    pub async fn get_rule(&self, id: &DiscountRuleId) -> Result<Option<DiscountRule>, StoreError> {
        Ok(self.backend.find_rule(id).await?)
    }

    pub async fn create_rule(
        &self,
        caller: &Caller,
        new: NewDiscountRule,
    ) -> Result<DiscountRule, StoreError> {
        require_admin(caller)?;

        let id = DiscountRuleId(format!("{}-{}", rule_slug(new.rule_type), Uuid::new_v4()));
        let rule = new.into_rule(id, Utc::now());
        rule.validate()?;

        self.backend.save_rule(rule.clone()).await?;
        self.sync_rule_relation(&rule).await?;
        info!(rule_id = %rule.id.0, "created discount rule");
        Ok(rule)
    }

    pub async fn update_rule(
        &self,
        caller: &Caller,
        id: &DiscountRuleId,
        patch: DiscountRulePatch,
    ) -> Result<DiscountRule, StoreError> {
        require_admin(caller)?;

        let mut rule = self
            .backend
            .find_rule(id)
            .await?
            .ok_or_else(|| StoreError::not_found("discount rule", id.0.clone()))?;
        patch.apply(&mut rule);
        rule.validate()?;

        self.backend.save_rule(rule.clone()).await?;
        self.sync_rule_relation(&rule).await?;
        Ok(rule)
    }

    pub async fn delete_rule(&self, caller: &Caller, id: &DiscountRuleId) -> Result<(), StoreError> {
        require_admin(caller)?;

        if !self.backend.delete_rule(id).await? {
            return Err(StoreError::not_found("discount rule", id.0.clone()));
        }
        for mut unit in self.backend.list_units().await? {
            if unit.applicable_discounts.contains(id) {
                unit.applicable_discounts.retain(|rule_id| rule_id != id);
                self.backend.save_unit(unit).await?;
            }
        }
        info!(rule_id = %id.0, "deleted discount rule");
        Ok(())
    }

    /// Rewrites every unit's allow-list membership for `rule` so that it
    /// mirrors the rule's `applicable_units`. This is the single write path
    /// for the unit/rule relation.
    async fn sync_rule_relation(&self, rule: &DiscountRule) -> Result<(), StoreError> {
        for mut unit in self.backend.list_units().await? {
            let should_have = rule.applicable_units.contains(&unit.id);
            let has = unit.applicable_discounts.contains(&rule.id);
            if should_have == has {
                continue;
            }
            if should_have {
                unit.applicable_discounts.push(rule.id.clone());
            } else {
                unit.applicable_discounts.retain(|rule_id| rule_id != &rule.id);
            }
            self.backend.save_unit(unit).await?;
        }
        Ok(())
    }

    // --- pricing ---

    /// Resolves the ordered applicable rules for one (unit, quantity)
    /// pairing. An unknown unit id yields an empty list, not an error.
    pub async fn applicable_discounts(
        &self,
        quantity: u32,
        unit_id: &UnitId,
        account_type: AccountType,
        now: DateTime<Utc>,
    ) -> Result<Vec<DiscountRule>, StoreError> {
        let unit = self.backend.find_unit(unit_id).await?;
        let rules = self.backend.list_rules().await?;
        Ok(self.engine.resolve(&rules, unit.as_ref(), quantity, account_type, now))
    }

    /// Prices one line against the current catalog. Unknown units are a hard
    /// `NotFound` here (unlike resolution, a price needs the base price) and
    /// inactive units are rejected: they are excluded from new quotes.
    pub async fn price_line(
        &self,
        unit_id: &UnitId,
        quantity: u32,
        account_type: AccountType,
        now: DateTime<Utc>,
    ) -> Result<LinePricing, StoreError> {
        let unit = self
            .backend
            .find_unit(unit_id)
            .await?
            .ok_or_else(|| StoreError::not_found("unit", unit_id.0.clone()))?;
        if !unit.active {
            return Err(StoreError::Domain(DomainError::validation(format!(
                "unit `{}` is inactive and cannot be quoted",
                unit_id.0
            ))));
        }

        let rules = self.backend.list_rules().await?;
        let resolved = self.engine.resolve(&rules, Some(&unit), quantity, account_type, now);
        Ok(self.engine.price_line(unit.base_price, quantity, &resolved))
    }

    pub fn totals(&self, items: &[QuoteLineItem]) -> QuoteTotals {
        self.engine.totals(items)
    }
}

fn require_admin(caller: &Caller) -> Result<(), StoreError> {
    if caller.is_admin {
        Ok(())
    } else {
        Err(StoreError::Unauthorized)
    }
}

fn rule_slug(rule_type: DiscountType) -> &'static str {
    match rule_type {
        DiscountType::Volume => "volume",
        DiscountType::AccountType => "account-type",
        DiscountType::Special => "special",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use unitquote_core::{
        AccountType, Caller, DiscountRulePatch, DiscountType, NewDiscountRule, NewUnit, SortOrder,
        UnitId, UnitSearchParams, UnitSortField, UserId,
    };

    use crate::error::StoreError;
    use crate::local::LocalStore;

    use super::Catalog;

    fn admin() -> Caller {
        Caller {
            user_id: UserId("admin".to_string()),
            username: "admin@example.com".to_string(),
            is_admin: true,
            account_type: AccountType::Enterprise,
        }
    }

    fn member() -> Caller {
        Caller {
            user_id: UserId("u-1".to_string()),
            username: "demo@example.com".to_string(),
            is_admin: false,
            account_type: AccountType::Individual,
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(LocalStore::in_memory()))
    }

    fn new_unit(name: &str, price: i64, category: &str) -> NewUnit {
        NewUnit {
            name: name.to_string(),
            description: None,
            base_price: Decimal::new(price, 0),
            category: Some(category.to_string()),
            features: Vec::new(),
            active: true,
        }
    }

    fn volume_rule(threshold: u32, pct: i64) -> NewDiscountRule {
        NewDiscountRule {
            name: "Volume Discount".to_string(),
            rule_type: DiscountType::Volume,
            discount_percentage: Decimal::new(pct, 0),
            threshold,
            account_type: None,
            end_date: None,
            applicable_units: Vec::new(),
        }
    }

    #[tokio::test]
    async fn search_filters_sorts_and_paginates() {
        let catalog = catalog();
        let admin = admin();
        for (name, price, category) in [
            ("Cascade", 2000, "Premium"),
            ("Codeium Enterprise", 1000, "Enterprise"),
            ("Starter", 100, "Basic"),
        ] {
            catalog.create_unit(&admin, new_unit(name, price, category)).await.expect("create");
        }

        // substring match across name/category, case-insensitive
        let result = catalog
            .search_units(&UnitSearchParams {
                query: Some("enterprise".to_string()),
                ..Default::default()
            })
            .await
            .expect("search");
        assert_eq!(result.total, 1);
        assert_eq!(result.units[0].name, "Codeium Enterprise");

        // default sort is name ascending, one page with everything
        let result = catalog.search_units(&UnitSearchParams::default()).await.expect("search");
        let names: Vec<_> = result.units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Cascade", "Codeium Enterprise", "Starter"]);
        assert_eq!(result.total_pages, 1);

        // price descending, two per page, 1-indexed pages
        let result = catalog
            .search_units(&UnitSearchParams {
                sort_by: Some(UnitSortField::Price),
                sort_order: Some(SortOrder::Desc),
                page: Some(2),
                page_size: Some(2),
                ..Default::default()
            })
            .await
            .expect("search");
        assert_eq!(result.total, 3);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.units.len(), 1);
        assert_eq!(result.units[0].name, "Starter");
    }

    #[tokio::test]
    async fn descending_sort_keeps_tied_keys_stable() {
        let catalog = catalog();
        let admin = admin();
        for (name, price) in [("Cascade", 1000), ("Starter", 1000), ("Codeium Enterprise", 2000)] {
            catalog.create_unit(&admin, new_unit(name, price, "Tools")).await.expect("create");
        }

        let by_price = |order| UnitSearchParams {
            sort_by: Some(UnitSortField::Price),
            sort_order: Some(order),
            ..Default::default()
        };
        let asc = catalog.search_units(&by_price(SortOrder::Asc)).await.expect("search");
        let desc = catalog.search_units(&by_price(SortOrder::Desc)).await.expect("search");

        // the two 1000-priced units must appear in the same relative order
        // whichever direction is requested
        let tied_asc: Vec<_> = asc
            .units
            .iter()
            .filter(|u| u.base_price == Decimal::new(1000, 0))
            .map(|u| u.name.clone())
            .collect();
        let tied_desc: Vec<_> = desc
            .units
            .iter()
            .filter(|u| u.base_price == Decimal::new(1000, 0))
            .map(|u| u.name.clone())
            .collect();
        assert_eq!(tied_asc, tied_desc);
        assert_eq!(desc.units[0].name, "Codeium Enterprise");
    }

    #[tokio::test]
    async fn unit_deletion_strips_rule_references() {
        let catalog = catalog();
        let admin = admin();
        let unit =
            catalog.create_unit(&admin, new_unit("Cascade", 2000, "Premium")).await.expect("unit");

        let mut rule = volume_rule(100, 10);
        rule.applicable_units = vec![unit.id.clone()];
        let rule = catalog.create_rule(&admin, rule).await.expect("rule");

        catalog.delete_unit(&admin, &unit.id).await.expect("delete unit");

        let rule = catalog.get_rule(&rule.id).await.expect("get rule").expect("rule exists");
        assert!(!rule.applicable_units.contains(&unit.id));
    }

    #[tokio::test]
    async fn rule_mutations_keep_unit_allow_lists_in_sync() {
        let catalog = catalog();
        let admin = admin();
        let first =
            catalog.create_unit(&admin, new_unit("Cascade", 2000, "Premium")).await.expect("unit");
        let second = catalog
            .create_unit(&admin, new_unit("Codeium Enterprise", 1000, "Enterprise"))
            .await
            .expect("unit");

        let mut new_rule = volume_rule(10, 5);
        new_rule.applicable_units = vec![first.id.clone()];
        let rule = catalog.create_rule(&admin, new_rule).await.expect("rule");

        let first_unit = catalog.get_unit(&first.id).await.expect("get").expect("unit");
        assert!(first_unit.applicable_discounts.contains(&rule.id));

        // move the rule from the first unit to the second
        let rule = catalog
            .update_rule(
                &admin,
                &rule.id,
                DiscountRulePatch {
                    applicable_units: Some(vec![second.id.clone()]),
                    ..Default::default()
                },
            )
            .await
            .expect("update rule");

        let first_unit = catalog.get_unit(&first.id).await.expect("get").expect("unit");
        let second_unit = catalog.get_unit(&second.id).await.expect("get").expect("unit");
        assert!(!first_unit.applicable_discounts.contains(&rule.id));
        assert!(second_unit.applicable_discounts.contains(&rule.id));

        // deletion strips the allow-list entry again
        catalog.delete_rule(&admin, &rule.id).await.expect("delete rule");
        let second_unit = catalog.get_unit(&second.id).await.expect("get").expect("unit");
        assert!(!second_unit.applicable_discounts.contains(&rule.id));
    }

    #[tokio::test]
    async fn unknown_unit_resolves_to_no_discounts() {
        let catalog = catalog();
        let admin = admin();
        catalog.create_rule(&admin, volume_rule(1, 10)).await.expect("rule");

        let resolved = catalog
            .applicable_discounts(
                500,
                &UnitId("missing".to_string()),
                AccountType::Individual,
                Utc::now(),
            )
            .await
            .expect("resolve");
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn pricing_unknown_unit_is_not_found() {
        let catalog = catalog();
        let result = catalog
            .price_line(&UnitId("missing".to_string()), 1, AccountType::Individual, Utc::now())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn pricing_inactive_unit_is_rejected() {
        let catalog = catalog();
        let admin = admin();
        let mut new_unit = new_unit("Legacy", 500, "Basic");
        new_unit.active = false;
        let unit = catalog.create_unit(&admin, new_unit).await.expect("unit");

        let result =
            catalog.price_line(&unit.id, 1, AccountType::Individual, Utc::now()).await;
        assert!(matches!(result, Err(StoreError::Domain(_))));
    }

    #[tokio::test]
    async fn catalog_mutations_require_admin() {
        let catalog = catalog();
        let result = catalog.create_unit(&member(), new_unit("Cascade", 2000, "Premium")).await;
        assert!(matches!(result, Err(StoreError::Unauthorized)));

        let result = catalog.create_rule(&member(), volume_rule(10, 5)).await;
        assert!(matches!(result, Err(StoreError::Unauthorized)));
    }

    #[tokio::test]
    async fn invalid_rules_are_rejected_before_storage() {
        let catalog = catalog();
        let admin = admin();

        // volume rule without a threshold
        let result = catalog.create_rule(&admin, volume_rule(0, 10)).await;
        assert!(matches!(result, Err(StoreError::Domain(_))));

        // account-type rule without an account type
        let result = catalog
            .create_rule(
                &admin,
                NewDiscountRule {
                    name: "Student Discount".to_string(),
                    rule_type: DiscountType::AccountType,
                    discount_percentage: Decimal::new(50, 0),
                    threshold: 0,
                    account_type: None,
                    end_date: None,
                    applicable_units: Vec::new(),
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::Domain(_))));

        assert!(catalog.list_rules().await.expect("list").is_empty());
    }
}
