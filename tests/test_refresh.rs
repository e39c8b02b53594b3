//! Pricing orchestration tests with an in-memory mock price source.

mod common;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use binder_sdk::models::{
    CardIdentity, CollectionFilter, Currency, Ownership, PricingSnapshot, RefreshOptions,
    RefreshStage,
};
use binder_sdk::pricing::PriceSource;
use binder_sdk::{BinderError, BinderSdk, CurrentSession, PricingService, Result};

// ---------------------------------------------------------------------------
// Mock price source
// ---------------------------------------------------------------------------

/// Serves canned USD prices by identity key and records every fetch.
#[derive(Clone, Default)]
struct MockSource {
    prices: HashMap<String, f64>,
    fail: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockSource {
    fn with_prices(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: prices.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            ..Self::default()
        }
    }

    fn failing(mut self, id: &str) -> Self {
        self.fail.insert(id.to_string());
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl PriceSource for MockSource {
    fn fetch(&self, source_id: &str) -> impl Future<Output = Result<PricingSnapshot>> + Send {
        self.calls.lock().unwrap().push(source_id.to_string());
        let result = if self.fail.contains(source_id) {
            Err(BinderError::NotFound(source_id.to_string()))
        } else {
            self.prices
                .get(source_id)
                .map(|&usd| common::snapshot(source_id, Some(usd), None))
                .ok_or_else(|| BinderError::NotFound(source_id.to_string()))
        };
        async move { result }
    }
}

fn service_with(
    sdk: BinderSdk,
    source: MockSource,
) -> (Arc<Mutex<BinderSdk>>, PricingService<MockSource>) {
    let shared = sdk.into_shared();
    let service = PricingService::with_source(shared.clone(), source)
        .batching(3, Duration::from_millis(10));
    (shared, service)
}

// ---------------------------------------------------------------------------
// refresh_collection
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn empty_collection_completes_without_fetching() {
    let (sdk, session) = common::setup_sdk();
    let source = MockSource::default();
    let (_shared, service) = service_with(sdk, source.clone());

    let run = service
        .refresh_collection(&session, RefreshOptions::default())
        .unwrap();
    let summary = run.finish().await.unwrap();

    assert_eq!(summary.updated, 0);
    assert_eq!(summary.total, 0);
    assert_eq!(source.call_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn refreshes_every_stale_entry_and_persists_snapshots() {
    let (sdk, session) = common::setup_sdk();
    {
        let collection = sdk.collection(&session);
        collection
            .add_card(common::lightning_bolt(), Ownership::default())
            .unwrap();
        collection
            .add_card(common::counterspell(), Ownership::default())
            .unwrap();
        collection
            .add_card(common::grizzly_bears(), Ownership::default())
            .unwrap();
        for i in 0..4 {
            collection
                .add_card(
                    common::card(&format!("Filler {i}"), Some(9000 + i), None, "Sorcery", 2.0, &["B"]),
                    Ownership::default(),
                )
                .unwrap();
        }
    }

    let source = MockSource::with_prices(&[
        ("129465", 1.50),
        ("cs-ext-0001", 2.25),
        ("94903", 0.10),
        ("9000", 0.05),
        ("9001", 0.05),
        ("9002", 0.05),
        ("9003", 0.05),
    ]);
    let (shared, service) = service_with(sdk, source.clone());

    let run = service
        .refresh_collection(&session, RefreshOptions::default())
        .unwrap();
    let summary = run.finish().await.unwrap();

    assert_eq!(summary.total, 7);
    assert_eq!(summary.updated, 7);
    assert_eq!(summary.skipped, 0);
    assert_eq!(source.call_count(), 7);

    let guard = shared.lock().unwrap();
    let entries = guard
        .collection(&session)
        .list(&CollectionFilter::default())
        .unwrap();
    assert!(entries.iter().all(|e| e.pricing.is_some()));
    assert!(entries.iter().all(|e| e.last_synced_at.is_some()));
}

#[tokio::test(flavor = "multi_thread")]
async fn a_failing_card_warns_but_does_not_abort_the_run() {
    let (sdk, session) = common::setup_sdk();
    {
        let collection = sdk.collection(&session);
        collection
            .add_card(common::lightning_bolt(), Ownership::default())
            .unwrap();
        collection
            .add_card(common::counterspell(), Ownership::default())
            .unwrap();
        collection
            .add_card(common::grizzly_bears(), Ownership::default())
            .unwrap();
    }

    let source = MockSource::with_prices(&[("129465", 1.50), ("94903", 0.10)])
        .failing("cs-ext-0001");
    let (_shared, service) = service_with(sdk, source);

    let mut run = service
        .refresh_collection(&session, RefreshOptions::default())
        .unwrap();

    let mut warnings = 0;
    let mut summary = None;
    while let Some(event) = run.next_event().await {
        match event.stage {
            RefreshStage::Warning => warnings += 1,
            RefreshStage::Complete => summary = event.summary,
            RefreshStage::Error => panic!("run must not abort on a per-card failure"),
            _ => {}
        }
    }

    assert_eq!(warnings, 1);
    let summary = summary.expect("terminal Complete event");
    assert_eq!(summary.total, 3);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn fresh_entries_are_skipped_unless_forced() {
    let (sdk, session) = common::setup_sdk();
    sdk.collection(&session)
        .add_card(common::lightning_bolt(), Ownership::default())
        .unwrap();

    let source = MockSource::with_prices(&[("129465", 1.50)]);
    let (_shared, service) = service_with(sdk, source.clone());

    let first = service
        .refresh_collection(&session, RefreshOptions::default())
        .unwrap()
        .finish()
        .await
        .unwrap();
    assert_eq!(first.updated, 1);
    assert_eq!(source.call_count(), 1);

    // Snapshot is fresh now; nothing to do.
    let second = service
        .refresh_collection(&session, RefreshOptions::default())
        .unwrap()
        .finish()
        .await
        .unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(source.call_count(), 1);

    // Force bypasses the staleness check.
    let forced = service
        .refresh_collection(
            &session,
            RefreshOptions {
                force_update: true,
                ..RefreshOptions::default()
            },
        )
        .unwrap()
        .finish()
        .await
        .unwrap();
    assert_eq!(forced.updated, 1);
    assert_eq!(source.call_count(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_user_document_ends_with_an_error_stage() {
    let (sdk, _) = common::setup_sdk();
    let ghost = CurrentSession::authenticated("ghost-user");
    let (_shared, service) = service_with(sdk, MockSource::default());

    let mut run = service
        .refresh_collection(&ghost, RefreshOptions::default())
        .unwrap();

    let mut stages = Vec::new();
    while let Some(event) = run.next_event().await {
        stages.push(event.stage);
    }
    assert_eq!(stages.first(), Some(&RefreshStage::Initializing));
    assert_eq!(stages.last(), Some(&RefreshStage::Error));
}

#[tokio::test(flavor = "multi_thread")]
async fn anonymous_session_cannot_start_a_refresh() {
    let (sdk, _) = common::setup_sdk();
    let (_shared, service) = service_with(sdk, MockSource::default());

    let err = service
        .refresh_collection(&CurrentSession::anonymous(), RefreshOptions::default())
        .unwrap_err();
    assert!(matches!(err, BinderError::Unauthenticated));
}

// ---------------------------------------------------------------------------
// refresh_one
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn refresh_one_updates_a_single_entry() {
    let (sdk, session) = common::setup_sdk();
    sdk.collection(&session)
        .add_card(common::lightning_bolt(), Ownership::default())
        .unwrap();

    let source = MockSource::with_prices(&[("129465", 1.50)]);
    let (shared, service) = service_with(sdk, source);

    let snapshot = service
        .refresh_one(&session, &CardIdentity::Multiverse(129465))
        .await
        .unwrap();
    assert_eq!(snapshot.prices.usd, Some(1.50));

    let guard = shared.lock().unwrap();
    let entry = guard
        .collection(&session)
        .get(&CardIdentity::Multiverse(129465))
        .unwrap();
    assert_eq!(entry.pricing.unwrap().prices.usd, Some(1.50));
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_one_fails_for_unowned_cards() {
    let (sdk, session) = common::setup_sdk();
    let (_shared, service) = service_with(sdk, MockSource::default());

    let err = service
        .refresh_one(&session, &CardIdentity::Multiverse(42))
        .await
        .unwrap_err();
    assert!(matches!(err, BinderError::NotFound(_)));
}

// ---------------------------------------------------------------------------
// Read-only aggregations
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn aggregations_report_value_coverage_and_top_cards() {
    let (sdk, session) = common::setup_sdk();
    {
        let collection = sdk.collection(&session);
        collection
            .add_card(
                common::lightning_bolt(),
                Ownership {
                    quantity: Some(4),
                    ..Ownership::default()
                },
            )
            .unwrap();
        collection
            .add_card(common::counterspell(), Ownership::default())
            .unwrap();
        // Never priced: drags coverage below 100%.
        collection
            .add_card(common::grizzly_bears(), Ownership::default())
            .unwrap();
    }

    let source = MockSource::with_prices(&[("129465", 2.00), ("cs-ext-0001", 10.00)])
        .failing("94903");
    let (_shared, service) = service_with(sdk, source);
    service
        .refresh_collection(&session, RefreshOptions::default())
        .unwrap()
        .finish()
        .await
        .unwrap();

    let value = service
        .collection_value(&session, Currency::Usd)
        .await
        .unwrap();
    assert!((value.total - 18.0).abs() < 1e-9);
    assert_eq!(value.unpriced_quantity, 1);

    let stats = service.pricing_stats(&session).await.unwrap();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.priced_entries, 2);
    assert!((stats.coverage_percent - 66.67).abs() < 0.01);
    assert_eq!(stats.stale_entries, 1);
    assert!(stats.last_updated.is_some());

    let top = service
        .top_valued_cards(&session, Currency::Usd, 1)
        .await
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, "Counterspell");
    assert!((top[0].total_value - 10.0).abs() < 1e-9);
}
