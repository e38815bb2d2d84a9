//! PostgreSQL-backed store tests.
//!
//! These need a live database (`DATABASE_URL`) and are ignored by default:
//! `cargo test -p vitals-db -- --ignored`.

use sqlx::PgPool;
use vitals_core::sample::{
    Batch, BatchMeta, ConnectionType, DeviceType, Dimensions, MetricSample, NavigationType,
};
use vitals_core::vitals::{Rating, VitalName};
use vitals_db::repositories::CwvSampleRepo;
use vitals_db::{CwvStore, PgCwvStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_sample(page_id: &str, name: VitalName, id: &str, value: f64, ts: i64) -> MetricSample {
    MetricSample {
        name,
        value,
        rating: Rating::classify(name, value),
        delta: value,
        id: id.to_string(),
        page_id: page_id.to_string(),
        site_id: "site-1".to_string(),
        device_type: DeviceType::Mobile,
        connection_type: ConnectionType::unknown(),
        timestamp: ts,
        url: format!("https://example.com/{page_id}"),
        navigation_type: NavigationType::Navigate,
    }
}

fn make_batch(metrics: Vec<MetricSample>) -> Batch {
    Batch {
        metrics,
        meta: BatchMeta {
            user_agent: "test-agent".to_string(),
            viewport: Dimensions {
                width: 390,
                height: 844,
            },
            screen: Dimensions {
                width: 390,
                height: 844,
            },
        },
    }
}

// ---------------------------------------------------------------------------
// Test: batch insert persists raw samples with batch meta
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn record_batch_persists_samples_with_meta(pool: PgPool) {
    let store = PgCwvStore::new(pool.clone());
    let batch = make_batch(vec![
        make_sample("p1", VitalName::Lcp, "l1", 1234.56, 10),
        make_sample("p1", VitalName::Cls, "c1", 0.12, 11),
    ]);

    let processed = store.record_batch(&batch).await.expect("insert should succeed");
    assert_eq!(processed, 2);

    let rows = CwvSampleRepo::list_for_page(&pool, "p1", 10)
        .await
        .expect("list should succeed");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.user_agent == "test-agent"));
    assert!(rows.iter().all(|r| r.viewport_width == 390));
    assert!(rows.iter().any(|r| r.vital == "LCP" && r.value == 1234.56));
}

// ---------------------------------------------------------------------------
// Test: aggregates merge across batches in any order
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn aggregates_merge_across_batches(pool: PgPool) {
    let store = PgCwvStore::new(pool);

    store
        .record_batch(&make_batch(vec![make_sample("p2", VitalName::Inp, "i2", 650.0, 20)]))
        .await
        .expect("second batch");
    store
        .record_batch(&make_batch(vec![make_sample("p2", VitalName::Inp, "i1", 120.0, 10)]))
        .await
        .expect("first batch");

    let status = store
        .page_status("p2")
        .await
        .expect("status query")
        .expect("page has data");

    let inp = &status.vitals[&VitalName::Inp];
    assert_eq!(inp.sample_count, 2);
    assert_eq!(inp.min, 120.0);
    assert_eq!(inp.max, 650.0);
    // The later client timestamp wins even though it arrived first.
    assert_eq!(inp.latest_value, 650.0);
    assert_eq!(inp.latest_rating, Rating::Poor);
    assert_eq!(status.overall, Some(Rating::Poor));
}

// ---------------------------------------------------------------------------
// Test: repeated reports of one instance count the same across batches
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn repeated_reports_aggregate_the_same_across_batches(pool: PgPool) {
    let store = PgCwvStore::new(pool);

    store
        .record_batch(&make_batch(vec![
            make_sample("single", VitalName::Cls, "cls-1", 0.02, 1),
            make_sample("single", VitalName::Cls, "cls-1", 0.3, 2),
        ]))
        .await
        .expect("single batch");
    store
        .record_batch(&make_batch(vec![make_sample("split", VitalName::Cls, "cls-1", 0.02, 1)]))
        .await
        .expect("first half");
    store
        .record_batch(&make_batch(vec![make_sample("split", VitalName::Cls, "cls-1", 0.3, 2)]))
        .await
        .expect("second half");

    let single = store.page_status("single").await.unwrap().expect("page has data");
    let split = store.page_status("split").await.unwrap().expect("page has data");

    assert_eq!(single.vitals, split.vitals);
    let cls = &split.vitals[&VitalName::Cls];
    assert_eq!(cls.sample_count, 2);
    assert_eq!(cls.distribution.good, 1);
    assert_eq!(cls.distribution.poor, 1);
}

// ---------------------------------------------------------------------------
// Test: unknown page has no status
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn unknown_page_has_no_status(pool: PgPool) {
    let store = PgCwvStore::new(pool);
    let status = store.page_status("never-seen").await.expect("status query");
    assert!(status.is_none());
}

// ---------------------------------------------------------------------------
// Test: retention deletes raw rows only
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn purge_removes_samples_but_keeps_aggregates(pool: PgPool) {
    let store = PgCwvStore::new(pool.clone());
    store
        .record_batch(&make_batch(vec![make_sample("p3", VitalName::Fcp, "f1", 900.0, 1)]))
        .await
        .expect("insert");

    let cutoff = chrono::Utc::now() + chrono::Duration::minutes(1);
    let purged = store
        .purge_samples_older_than(cutoff)
        .await
        .expect("purge should succeed");
    assert_eq!(purged, 1);

    let rows = CwvSampleRepo::list_for_page(&pool, "p3", 10).await.unwrap();
    assert!(rows.is_empty());
    assert!(store.page_status("p3").await.unwrap().is_some());
}
