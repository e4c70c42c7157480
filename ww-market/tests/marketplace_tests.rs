//! Marketplace service tests against the SQLite document store

mod common;

use common::{payee, PHOTO};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use ww_common::events::{EventBus, MarketEvent};
use ww_common::models::{CollectionStatus, DeviceStatus, Fields};
use ww_common::paths;
use ww_common::status::{FeeSchedule, TransitionError};
use ww_market::services::{DeviceInput, MarketError, Marketplace, PartInput};
use ww_market::store::{DocumentStore, SqliteDocumentStore};

async fn marketplace() -> (Marketplace, Arc<dyn DocumentStore>, EventBus) {
    marketplace_over(ww_market::db::init_memory_pool().await.unwrap())
}

fn marketplace_over(db: SqlitePool) -> (Marketplace, Arc<dyn DocumentStore>, EventBus) {
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(db));
    let events = EventBus::new(100);
    let fees = FeeSchedule {
        collection_payment: 750.0,
        service_fee: 1.5,
    };
    let market = Marketplace::new(Arc::clone(&store), events.clone(), fees, payee());
    (market, store, events)
}

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap()
}

async fn submit(market: &Marketplace, seller: &str) -> String {
    market
        .submit_device(
            Some(seller),
            DeviceInput {
                photo_data_uri: Some(PHOTO.to_string()),
                device_details: "iPhone 12, cracked screen".to_string(),
            },
        )
        .await
        .unwrap()
        .settle()
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_device_without_status_is_available() {
    let (market, store, _) = marketplace().await;

    // Written by an older client that never set a status
    store
        .set(
            &paths::device("seller-1", "legacy").unwrap(),
            fields(json!({
                "userId": "seller-1",
                "uploadDate": "2025-01-01T00:00:00Z",
                "photoUrl": PHOTO,
                "deviceDetails": "Nokia 3310",
            })),
        )
        .await
        .unwrap();
    submit(&market, "seller-2").await;

    let available = market.available_collections().await.unwrap();
    assert_eq!(available.len(), 2);
    assert!(available
        .iter()
        .all(|d| d.effective_status() == DeviceStatus::Pending));

    // And it can be accepted
    let accepted = market
        .accept_collection(Some("partner-1"), "seller-1", "legacy")
        .await
        .unwrap()
        .settle()
        .await
        .unwrap();
    assert_eq!(accepted.device.status, Some(DeviceStatus::CollectionInProgress));
    assert_eq!(accepted.request.payment_amount, 750.0);
    assert_eq!(accepted.transaction.amount, 1.5);
    assert_eq!(market.available_collections().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_collections_without_device_are_dropped() {
    let (market, store, _) = marketplace().await;
    store
        .set(
            &paths::collection_requests().doc("orphan").unwrap(),
            fields(json!({
                "deviceId": "gone",
                "userId": "seller-1",
                "deliveryPartnerId": "partner-1",
                "requestDate": "2025-01-01T00:00:00Z",
                "status": "accepted",
                "paymentAmount": 500.0,
            })),
        )
        .await
        .unwrap();

    assert!(market.my_collections("partner-1", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unauthenticated_actions_are_rejected() {
    let (market, _, events) = marketplace().await;
    let mut rx = events.subscribe();

    let err = market
        .submit_device(
            None,
            DeviceInput {
                photo_data_uri: Some(PHOTO.to_string()),
                device_details: "iPhone 12".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Transition(TransitionError::Unauthenticated)
    ));

    let err = market.purchase_part(Some(""), "p1").await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::Transition(TransitionError::Unauthenticated)
    ));

    assert!(rx.try_recv().is_err());
    assert!(market.my_devices("seller-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_actions_publish_events() {
    let (market, _, events) = marketplace().await;
    let mut rx = events.subscribe();

    let part = market
        .list_part(
            Some("agency-1"),
            PartInput {
                photo_data_uri: Some(PHOTO.to_string()),
                name: "Samsung S20 Battery".to_string(),
                details: String::new(),
                price: Some(25.0),
            },
        )
        .await
        .unwrap()
        .settle()
        .await
        .unwrap();
    let sale = market
        .purchase_part(Some("buyer-1"), &part.id)
        .await
        .unwrap()
        .settle()
        .await
        .unwrap();
    assert!((sale.commission_amount - 2.5).abs() < 1e-9);

    assert!(matches!(rx.try_recv().unwrap(), MarketEvent::PartListed { price, .. } if price == 25.0));
    match rx.try_recv().unwrap() {
        MarketEvent::PartPurchased {
            part_id,
            buyer_id,
            commission_amount,
            ..
        } => {
            assert_eq!(part_id, part.id);
            assert_eq!(buyer_id, "buyer-1");
            assert!((commission_amount - 2.5).abs() < 1e-9);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_payment_request_for_missing_part() {
    let (market, _, _) = marketplace().await;
    let err = market.payment_request("nope").await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::Transition(TransitionError::MissingReference(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_accept_and_collect_on_file_database() {
    let temp = tempfile::tempdir().unwrap();
    let db = ww_market::db::init_database_pool(&temp.path().join("wastewise.db"))
        .await
        .unwrap();
    let (market, _, _) = marketplace_over(db);

    for _ in 0..30 {
        let device_id = submit(&market, "seller").await;
        let accepted = market
            .accept_collection(Some("partner-1"), "seller", &device_id)
            .await
            .unwrap()
            .settle()
            .await
            .unwrap();
        market
            .mark_collected(Some("partner-1"), &accepted.request.id)
            .await
            .unwrap()
            .settle()
            .await
            .unwrap();
    }

    let devices = market.my_devices("seller").await.unwrap();
    assert_eq!(devices.len(), 30);
    assert!(devices
        .iter()
        .all(|d| d.effective_status() == DeviceStatus::Collected));

    let open = market
        .my_collections("partner-1", Some(CollectionStatus::Accepted))
        .await
        .unwrap();
    assert!(open.is_empty());
    let done = market
        .my_collections("partner-1", Some(CollectionStatus::Collected))
        .await
        .unwrap();
    assert_eq!(done.len(), 30);
    assert_eq!(market.my_transactions("partner-1").await.unwrap().len(), 30);
}
