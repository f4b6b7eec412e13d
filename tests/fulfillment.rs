//! Fulfillment workflow tests against a file-backed SQLite database.
//!
//! Run with: cargo test --test fulfillment --features sqlite
//!
//! A temp-file database with several pooled connections, so concurrent
//! callers really contend for the write lock.

use std::sync::Arc;

use futures::future::join_all;
use tempfile::TempDir;
use tokio::sync::Barrier;
use uuid::Uuid;

use reliefhub::actor::Actor;
use reliefhub::config::{FulfillmentConfig, StorageConfig, StorageType};
use reliefhub::model::{CampStatus, DeliveryStatus, NeedStatus, Role, Urgency};
use reliefhub::services::{CampDraft, NeedDraft, ReliefServices, ServiceError};
use reliefhub::storage::{init_storage, Stores};

struct Harness {
    stores: Stores,
    services: ReliefServices,
    admin: Actor,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StorageConfig {
        storage_type: StorageType::Sqlite,
        path: dir.path().join("relief.db").to_string_lossy().into_owned(),
        max_connections: 8,
        busy_timeout_ms: 5000,
    };
    let stores = init_storage(&config).await.expect("storage");
    let retry = FulfillmentConfig {
        retry_min_delay_ms: 1,
        retry_max_delay_ms: 20,
        max_attempts: 10,
    };
    let services = ReliefServices::new(&stores, &retry);
    Harness {
        stores,
        services,
        admin: Actor::new(Uuid::new_v4(), Role::Camp),
        _dir: dir,
    }
}

impl Harness {
    async fn camp(&self, capacity: i64) -> Uuid {
        self.services
            .camps
            .create(
                &self.admin,
                CampDraft {
                    name: "Stadium shelter".to_string(),
                    location: "Ring road".to_string(),
                    latitude: None,
                    longitude: None,
                    total_capacity: capacity,
                    contact_phone: None,
                    contact_email: None,
                },
            )
            .await
            .expect("camp")
            .id
    }

    async fn need(&self, camp_id: Uuid, quantity: i64) -> Uuid {
        self.services
            .needs
            .create(
                &self.admin,
                camp_id,
                NeedDraft {
                    item_name: "water (l)".to_string(),
                    quantity_needed: quantity,
                    urgency: Urgency::Critical,
                },
            )
            .await
            .expect("need")
            .id
    }
}

fn ngo() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Ngo)
}

fn citizen() -> Actor {
    Actor::new(Uuid::new_v4(), Role::User)
}

#[tokio::test]
async fn test_pledge_sequence() {
    let h = harness().await;
    let camp_id = h.camp(10).await;
    let need_id = h.need(camp_id, 10).await;
    let coordinator = &h.services.fulfillment;

    let first = coordinator
        .pledge_assistance(&ngo(), need_id, 6, None)
        .await
        .unwrap();
    assert_eq!(first.need.quantity_fulfilled, 6);
    assert_eq!(first.need.status, NeedStatus::Partial);

    let second = coordinator
        .pledge_assistance(&ngo(), need_id, 4, None)
        .await
        .unwrap();
    assert_eq!(second.need.quantity_fulfilled, 10);
    assert_eq!(second.need.status, NeedStatus::Fulfilled);

    let err = coordinator
        .pledge_assistance(&ngo(), need_id, 1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::OverCommit(_)));
    assert!(err.is_retryable());

    let need = h.services.needs.get(need_id).await.unwrap();
    assert_eq!(need.quantity_fulfilled, 10);
    assert_eq!(coordinator.pledges_for_need(need_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_six_and_six_against_ten() {
    let h = harness().await;
    let camp_id = h.camp(10).await;
    let need_id = h.need(camp_id, 10).await;

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let services = h.services.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            services
                .fulfillment
                .pledge_assistance(&ngo(), need_id, 6, None)
                .await
        }));
    }

    let mut successes = 0;
    let mut over_commits = 0;
    for outcome in join_all(handles).await {
        match outcome.unwrap() {
            Ok(receipt) => {
                successes += 1;
                assert_eq!(receipt.need.quantity_fulfilled, 6);
            }
            Err(ServiceError::OverCommit(_)) => over_commits += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(over_commits, 1);

    let need = h.services.needs.get(need_id).await.unwrap();
    assert_eq!(need.quantity_fulfilled, 6);
    assert_eq!(need.status, NeedStatus::Partial);
    assert_eq!(h.stores.ledger.list_by_need(need_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_many_unit_pledges_fill_exactly() {
    let h = harness().await;
    let camp_id = h.camp(10).await;
    let need_id = h.need(camp_id, 10).await;

    let tasks = 16;
    let barrier = Arc::new(Barrier::new(tasks));
    let mut handles = Vec::new();
    for _ in 0..tasks {
        let services = h.services.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            services
                .fulfillment
                .pledge_assistance(&ngo(), need_id, 1, None)
                .await
        }));
    }

    let successes = join_all(handles)
        .await
        .into_iter()
        .filter(|outcome| matches!(outcome, Ok(Ok(_))))
        .count();
    assert_eq!(successes, 10);

    let need = h.services.needs.get(need_id).await.unwrap();
    assert_eq!(need.quantity_fulfilled, 10);
    assert_eq!(need.status, NeedStatus::Fulfilled);
    let total: i64 = h
        .stores
        .ledger
        .list_by_need(need_id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.quantity)
        .sum();
    assert_eq!(total, 10, "ledger and need agree");
}

#[tokio::test]
async fn test_full_camp_rejects_seat_request() {
    let h = harness().await;
    let camp_id = h.camp(50).await;

    for _ in 0..50 {
        h.services
            .volunteers
            .register(&citizen(), camp_id, "general")
            .await
            .unwrap();
    }
    let camp = h.services.camps.get(camp_id).await.unwrap();
    assert_eq!(camp.occupied_seats, 50);
    assert_eq!(camp.status, CampStatus::Full);

    let err = h
        .services
        .volunteers
        .register(&citizen(), camp_id, "general")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::OverCommit(_)));

    let camp = h.services.camps.get(camp_id).await.unwrap();
    assert_eq!(camp.occupied_seats, 50, "capacity unchanged");
    assert_eq!(
        h.services.volunteers.list_by_camp(camp_id).await.unwrap().len(),
        50
    );
}

#[tokio::test]
async fn test_concurrent_registrations_respect_capacity() {
    let h = harness().await;
    let camp_id = h.camp(5).await;

    let tasks = 12;
    let barrier = Arc::new(Barrier::new(tasks));
    let mut handles = Vec::new();
    for _ in 0..tasks {
        let services = h.services.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            services
                .volunteers
                .register(&citizen(), camp_id, "general")
                .await
        }));
    }

    let mut joined = 0;
    for outcome in join_all(handles).await {
        match outcome.unwrap() {
            Ok(_) => joined += 1,
            Err(ServiceError::OverCommit(_)) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(joined, 5);

    let camp = h.services.camps.get(camp_id).await.unwrap();
    assert_eq!(camp.occupied_seats, 5);
    assert_eq!(camp.status, CampStatus::Full);
}

#[tokio::test]
async fn test_delivery_survives_camp_deletion() {
    let h = harness().await;
    let camp_id = h.camp(10).await;
    let need_id = h.need(camp_id, 10).await;
    let donor = ngo();

    let receipt = h
        .services
        .fulfillment
        .pledge_assistance(&donor, need_id, 3, Some("via road".to_string()))
        .await
        .unwrap();
    h.services.camps.delete(&h.admin, camp_id).await.unwrap();

    let mine = h.services.fulfillment.pledges_by_ngo(&donor).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].need_id, None);

    let entry = h
        .services
        .fulfillment
        .advance_delivery(
            &donor,
            receipt.assistance.id,
            DeliveryStatus::InTransit,
        )
        .await
        .unwrap();
    assert_eq!(entry.notes.as_deref(), Some("via road"));
}
