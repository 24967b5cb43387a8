use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{
    AppendOptions, CommitId, EventEnvelope, InMemoryEventStore, StreamAppend, Version,
    store::EventStore,
};

fn make_event(
    aggregate_id: AggregateId,
    aggregate_type: &str,
    version: i64,
    commit_id: CommitId,
) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(aggregate_id)
        .aggregate_type(aggregate_type)
        .event_type("StockSold")
        .version(Version::new(version))
        .commit_id(commit_id)
        .payload_raw(serde_json::json!({
            "type": "StockSold",
            "data": {
                "product_id": aggregate_id.to_string(),
                "quantity": 1
            }
        }))
        .build()
        .unwrap()
}

fn bench_append_single_event(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_single_event", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                let event = make_event(AggregateId::new(), "Product", 1, CommitId::new());
                store
                    .append(vec![event], AppendOptions::expect_new())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_append_all_sale_commit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    // One sale stream plus five product streams, the shape of a basket checkout.
    c.bench_function("event_store/append_all_6_streams", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                let commit_id = CommitId::new();
                let mut appends = vec![StreamAppend::new(
                    vec![make_event(AggregateId::new(), "SaleTransaction", 1, commit_id)],
                    AppendOptions::expect_new(),
                )];
                for _ in 0..5 {
                    appends.push(StreamAppend::new(
                        vec![make_event(AggregateId::new(), "Product", 1, commit_id)],
                        AppendOptions::expect_new(),
                    ));
                }
                store.append_all(appends).await.unwrap();
            });
        });
    });
}

fn bench_get_events_for_aggregate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let agg_id = AggregateId::new();

    rt.block_on(async {
        let commit_id = CommitId::new();
        let events: Vec<EventEnvelope> = (1..=100)
            .map(|v| make_event(agg_id, "Product", v, commit_id))
            .collect();
        store.append(events, AppendOptions::new()).await.unwrap();
    });

    c.bench_function("event_store/get_events_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.get_events_for_aggregate(agg_id).await.unwrap();
            });
        });
    });
}

fn bench_stream_all_events(c: &mut Criterion) {
    use futures_util::StreamExt;

    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();

    rt.block_on(async {
        for _ in 0..10 {
            let agg_id = AggregateId::new();
            let commit_id = CommitId::new();
            let events: Vec<EventEnvelope> = (1..=100)
                .map(|v| make_event(agg_id, "Product", v, commit_id))
                .collect();
            store.append(events, AppendOptions::new()).await.unwrap();
        }
    });

    c.bench_function("event_store/stream_1000_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut stream = store.stream_all_events().await.unwrap();
                let mut count = 0;
                while let Some(result) = stream.next().await {
                    result.unwrap();
                    count += 1;
                }
                assert_eq!(count, 1000);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_append_single_event,
    bench_append_all_sale_commit,
    bench_get_events_for_aggregate,
    bench_stream_all_events,
);
criterion_main!(benches);
