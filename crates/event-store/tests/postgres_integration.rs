//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and need a Docker daemon.
//! Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --ignored
//! ```

use std::sync::Arc;

use event_store::{
    AggregateId, AppendOptions, CommitId, EventEnvelope, EventStore, EventStoreError,
    EventStoreExt, PostgresEventStore, StreamAppend, Version,
};
use futures_util::StreamExt;
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_events_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresEventStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE events")
        .execute(&pool)
        .await
        .unwrap();

    PostgresEventStore::new(pool)
}

fn create_test_event(
    aggregate_id: AggregateId,
    version: Version,
    event_type: &str,
) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(aggregate_id)
        .aggregate_type("Product")
        .event_type(event_type)
        .version(version)
        .payload_raw(serde_json::json!({"test": true}))
        .build()
        .unwrap()
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn append_and_retrieve_events() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    let event = create_test_event(aggregate_id, Version::first(), "ProductListed");
    let version = store
        .append(vec![event], AppendOptions::expect_new())
        .await
        .unwrap();
    assert_eq!(version, Version::first());

    let events = store.get_events_for_aggregate(aggregate_id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "ProductListed");
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn optimistic_concurrency_conflict() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    store
        .append(
            vec![create_test_event(aggregate_id, Version::first(), "Event1")],
            AppendOptions::expect_new(),
        )
        .await
        .unwrap();

    let result = store
        .append(
            vec![create_test_event(aggregate_id, Version::new(2), "Event2")],
            AppendOptions::expect_version(Version::initial()),
        )
        .await;

    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn append_all_commits_every_stream_with_shared_commit_id() {
    let store = get_test_store().await;
    let product = AggregateId::new();
    let sale = AggregateId::new();
    let commit_id = CommitId::new();

    let product_event = EventEnvelope::builder()
        .aggregate_id(product)
        .aggregate_type("Product")
        .event_type("StockSold")
        .version(Version::first())
        .commit_id(commit_id)
        .payload_raw(serde_json::json!({}))
        .build()
        .unwrap();
    let sale_event = EventEnvelope::builder()
        .aggregate_id(sale)
        .aggregate_type("SaleTransaction")
        .event_type("SalePlaced")
        .version(Version::first())
        .commit_id(commit_id)
        .payload_raw(serde_json::json!({}))
        .build()
        .unwrap();

    let versions = store
        .append_all(vec![
            StreamAppend::new(vec![product_event], AppendOptions::expect_new()),
            StreamAppend::new(vec![sale_event], AppendOptions::expect_new()),
        ])
        .await
        .unwrap();
    assert_eq!(versions, vec![Version::first(), Version::first()]);

    let stored = store.get_events_for_aggregate(sale).await.unwrap();
    assert_eq!(stored[0].commit_id, commit_id);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn append_all_rolls_back_on_stale_stream() {
    let store = get_test_store().await;
    let product = AggregateId::new();
    let sale = AggregateId::new();

    store
        .append(
            vec![create_test_event(product, Version::first(), "ProductListed")],
            AppendOptions::expect_new(),
        )
        .await
        .unwrap();

    let result = store
        .append_all(vec![
            StreamAppend::new(
                vec![create_test_event(sale, Version::first(), "SalePlaced")],
                AppendOptions::expect_new(),
            ),
            StreamAppend::new(
                vec![create_test_event(product, Version::first(), "StockSold")],
                AppendOptions::expect_new(),
            ),
        ])
        .await;

    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));
    assert!(!store.aggregate_exists(sale).await.unwrap());
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn unique_constraint_maps_to_conflict() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    store
        .append(
            vec![create_test_event(aggregate_id, Version::first(), "Event1")],
            AppendOptions::new(),
        )
        .await
        .unwrap();

    let result = store
        .append(
            vec![create_test_event(aggregate_id, Version::first(), "Event2")],
            AppendOptions::new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn stream_all_events_in_commit_order() {
    let store = get_test_store().await;
    let first = AggregateId::new();
    let second = AggregateId::new();

    for id in [first, second] {
        store
            .append(
                vec![create_test_event(id, Version::first(), "ProductListed")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();
    }

    let events: Vec<_> = store.stream_all_events().await.unwrap().collect().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].as_ref().unwrap().aggregate_id, first);
    assert_eq!(events[1].as_ref().unwrap().aggregate_id, second);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn event_metadata_preserved() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    let event = EventEnvelope::builder()
        .aggregate_id(aggregate_id)
        .aggregate_type("Product")
        .event_type("ProductListed")
        .version(Version::first())
        .payload_raw(serde_json::json!({"data": "test"}))
        .metadata("operation", serde_json::json!("list_product"))
        .build()
        .unwrap();

    store
        .append(vec![event], AppendOptions::new())
        .await
        .unwrap();

    let events = store.get_events_for_aggregate(aggregate_id).await.unwrap();
    assert_eq!(
        events[0].metadata.get("operation"),
        Some(&serde_json::json!("list_product"))
    );
    assert_eq!(
        store.get_aggregate_version(aggregate_id).await.unwrap(),
        Some(Version::first())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
#[ignore = "requires docker"]
async fn concurrent_commits_occupy_contiguous_positions() {
    let store = get_test_store().await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                let commit_id = CommitId::new();
                let appends = (0..2)
                    .map(|_| {
                        let id = AggregateId::new();
                        let events = (1..=3)
                            .map(|v| {
                                EventEnvelope::builder()
                                    .aggregate_id(id)
                                    .aggregate_type("Product")
                                    .event_type("StockSold")
                                    .version(Version::new(v))
                                    .commit_id(commit_id)
                                    .payload_raw(serde_json::json!({}))
                                    .build()
                                    .unwrap()
                            })
                            .collect();
                        StreamAppend::new(events, AppendOptions::expect_new())
                    })
                    .collect();
                store.append_all(appends).await.unwrap();
                commit_id
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let commit_ids: Vec<CommitId> = store
        .stream_all_events()
        .await
        .unwrap()
        .map(|e| e.unwrap().commit_id)
        .collect()
        .await;
    assert_eq!(commit_ids.len(), 48);

    // Each commit is one unbroken run of six events in log order.
    for run in commit_ids.chunks(6) {
        assert!(run.iter().all(|id| *id == run[0]));
    }
}
