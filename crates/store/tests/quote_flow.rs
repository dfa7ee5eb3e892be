//! End-to-end flow over the seeded demo catalog: resolve discounts, build a
//! quote, walk it through its lifecycle, and check access isolation.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use unitquote_core::{
    AccountType, Caller, NewLineItem, NewQuoteRequest, QuoteStatus, UnitId, UserId,
};
use unitquote_store::{seed_demo_data, Catalog, LocalStore, Quotes, StoreError};

fn caller(user_id: &str, is_admin: bool, account_type: AccountType) -> Caller {
    Caller {
        user_id: UserId(user_id.to_string()),
        username: format!("{user_id}@example.com"),
        is_admin,
        account_type,
    }
}

async fn seeded_services() -> (Arc<Catalog>, Quotes) {
    let backend = Arc::new(LocalStore::in_memory());
    seed_demo_data(backend.as_ref(), Utc::now()).await.expect("seed");
    let catalog = Arc::new(Catalog::new(backend.clone()));
    let quotes = Quotes::new(backend, catalog.clone());
    (catalog, quotes)
}

#[tokio::test]
async fn volume_discount_flows_into_quote_totals() {
    let (catalog, quotes) = seeded_services().await;
    let cascade = UnitId("cascade".to_string());

    // below the threshold the rule does not resolve
    let resolved = catalog
        .applicable_discounts(99, &cascade, AccountType::Individual, Utc::now())
        .await
        .expect("resolve");
    assert!(resolved.is_empty());

    let buyer = caller("buyer", false, AccountType::Individual);
    let quote = quotes
        .create(
            &buyer,
            NewQuoteRequest {
                name: "Cascade rollout".to_string(),
                items: vec![NewLineItem { unit_id: cascade, quantity: 150 }],
            },
        )
        .await
        .expect("create quote");

    assert_eq!(quote.items[0].discount_percentage, Decimal::new(10, 0));
    assert_eq!(quote.subtotal, Decimal::new(300_000, 0));
    assert_eq!(quote.total, Decimal::new(270_000, 0));
    assert_eq!(quote.subtotal - quote.discount, quote.total);
}

#[tokio::test]
async fn quote_lifecycle_with_admin_resolution() {
    let (_catalog, quotes) = seeded_services().await;
    let buyer = caller("buyer", false, AccountType::Startup);

    let quote = quotes
        .create(
            &buyer,
            NewQuoteRequest {
                name: "Startup bundle".to_string(),
                items: vec![NewLineItem {
                    unit_id: UnitId("codeium-enterprise".to_string()),
                    quantity: 10,
                }],
            },
        )
        .await
        .expect("create");

    // startup discount: 30% of 10 * 1000
    assert_eq!(quote.total, Decimal::new(7000, 0));

    quotes.update_status(&buyer, &quote.id, QuoteStatus::Submitted).await.expect("submit");
    let admin = caller("admin", true, AccountType::Enterprise);
    let rejected =
        quotes.update_status(&admin, &quote.id, QuoteStatus::Rejected).await.expect("reject");
    assert_eq!(rejected.status, QuoteStatus::Rejected);

    // rejected quotes reopen as drafts for revision
    let reopened =
        quotes.update_status(&buyer, &quote.id, QuoteStatus::Draft).await.expect("reopen");
    assert_eq!(reopened.status, QuoteStatus::Draft);
}

#[tokio::test]
async fn foreign_quotes_stay_invisible() {
    let (_catalog, quotes) = seeded_services().await;
    let alice = caller("alice", false, AccountType::Individual);
    let quote = quotes
        .create(
            &alice,
            NewQuoteRequest {
                name: "Private quote".to_string(),
                items: vec![NewLineItem {
                    unit_id: UnitId("cascade".to_string()),
                    quantity: 1,
                }],
            },
        )
        .await
        .expect("create");

    let eve = caller("eve", false, AccountType::Individual);
    assert!(quotes.list(&eve).await.expect("list").is_empty());
    assert!(quotes.get(&eve, &quote.id).await.expect("get").is_none());
    assert!(matches!(quotes.delete(&eve, &quote.id).await, Err(StoreError::Unauthorized)));
}
