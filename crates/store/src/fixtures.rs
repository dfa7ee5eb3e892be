use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use unitquote_core::{
    AccountType, DiscountRule, DiscountRuleId, DiscountType, Unit, UnitId,
};

use crate::backend::{BackendError, StorageBackend};

/// Demo catalog used for local evaluation and tests: two units and the three
/// stock discount rules.
pub struct DemoDataset {
    pub units: Vec<Unit>,
    pub rules: Vec<DiscountRule>,
}

pub fn demo_dataset(now: DateTime<Utc>) -> DemoDataset {
    let units = vec![
        Unit {
            id: UnitId("codeium-enterprise".to_string()),
            name: "Codeium Enterprise".to_string(),
            description: None,
            base_price: Decimal::new(1000, 0),
            category: Some("Enterprise".to_string()),
            features: vec![
                "AI Code Completion".to_string(),
                "Team Collaboration".to_string(),
                "Advanced Code Generation".to_string(),
            ],
            active: true,
            applicable_discounts: Vec::new(),
            created_at: now,
            updated_at: now,
        },
        Unit {
            id: UnitId("cascade".to_string()),
            name: "Cascade".to_string(),
            description: None,
            base_price: Decimal::new(2000, 0),
            category: Some("Premium".to_string()),
            features: vec!["AI Code Completion".to_string(), "Code Analysis".to_string()],
            active: true,
            applicable_discounts: Vec::new(),
            created_at: now,
            updated_at: now,
        },
    ];

    let rules = vec![
        DiscountRule {
            id: DiscountRuleId("student-discount".to_string()),
            name: "Student Discount".to_string(),
            rule_type: DiscountType::AccountType,
            discount_percentage: Decimal::new(50, 0),
            threshold: 0,
            account_type: Some(AccountType::Student),
            effective_date: now,
            end_date: None,
            applicable_units: Vec::new(),
        },
        DiscountRule {
            id: DiscountRuleId("startup-discount".to_string()),
            name: "Startup Discount".to_string(),
            rule_type: DiscountType::AccountType,
            discount_percentage: Decimal::new(30, 0),
            threshold: 0,
            account_type: Some(AccountType::Startup),
            effective_date: now,
            end_date: None,
            applicable_units: Vec::new(),
        },
        DiscountRule {
            id: DiscountRuleId("volume-discount".to_string()),
            name: "Volume Discount".to_string(),
            rule_type: DiscountType::Volume,
            discount_percentage: Decimal::new(10, 0),
            threshold: 100,
            account_type: None,
            effective_date: now,
            end_date: None,
            applicable_units: Vec::new(),
        },
    ];

    DemoDataset { units, rules }
}

/// Writes the demo dataset into a backend. Existing records with the same
/// ids are overwritten.
pub async fn seed_demo_data(
    backend: &dyn StorageBackend,
    now: DateTime<Utc>,
) -> Result<(), BackendError> {
    let dataset = demo_dataset(now);
    for unit in dataset.units {
        backend.save_unit(unit).await?;
    }
    for rule in dataset.rules {
        backend.save_rule(rule).await?;
    }
    Ok(())
}
