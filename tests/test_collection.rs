//! Collection store integration tests against an in-memory database.

mod common;

use binder_sdk::models::{
    CardIdentity, CollectionFilter, CollectionUpdate, Condition, Ownership,
};
use binder_sdk::{BinderError, CurrentSession};

// ---------------------------------------------------------------------------
// add_card
// ---------------------------------------------------------------------------

#[test]
fn add_card_applies_ownership_defaults() {
    let (sdk, session) = common::setup_sdk();
    let entry = sdk
        .collection(&session)
        .add_card(common::lightning_bolt(), Ownership::default())
        .unwrap();

    assert_eq!(entry.quantity, 1);
    assert_eq!(entry.condition, Condition::NearMint);
    assert!(!entry.foil);
    assert_eq!(entry.language, "English");
    assert!(entry.pricing.is_none());
}

#[test]
fn adding_same_identity_twice_merges_quantities() {
    let (sdk, session) = common::setup_sdk();
    let collection = sdk.collection(&session);

    collection
        .add_card(
            common::lightning_bolt(),
            Ownership {
                quantity: Some(2),
                ..Ownership::default()
            },
        )
        .unwrap();
    let merged = collection
        .add_card(
            common::lightning_bolt(),
            Ownership {
                quantity: Some(3),
                ..Ownership::default()
            },
        )
        .unwrap();

    assert_eq!(merged.quantity, 5);
    let entries = collection.list(&CollectionFilter::default()).unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn identity_prefers_multiverse_id_over_external_id() {
    let (sdk, session) = common::setup_sdk();
    let mut card = common::lightning_bolt();
    card.id = Some("bolt-ext-0001".to_string());

    let entry = sdk
        .collection(&session)
        .add_card(card, Ownership::default())
        .unwrap();
    assert_eq!(entry.identity, "129465");
}

#[test]
fn card_without_any_identity_is_rejected() {
    let (sdk, session) = common::setup_sdk();
    let card = common::card("Mystery Card", None, None, "Instant", 1.0, &[]);

    let err = sdk
        .collection(&session)
        .add_card(card, Ownership::default())
        .unwrap_err();
    assert!(matches!(err, BinderError::Validation(_)));
}

#[test]
fn add_card_normalizes_image_sources_in_priority_order() {
    let (sdk, session) = common::setup_sdk();
    let entry = sdk
        .collection(&session)
        .add_card(common::lightning_bolt(), Ownership::default())
        .unwrap();

    let sources = &entry.card.image_sources;
    assert_eq!(sources.len(), 3);
    assert_eq!(sources[0], "https://img.example.com/cards/lightning-bolt.png");
    assert!(sources[1].contains("multiverseid=129465"));
    assert!(sources[2].contains("/cards/a25/141"));
}

#[test]
fn add_card_backfills_missing_legalities_as_not_legal() {
    let (sdk, session) = common::setup_sdk();
    let entry = sdk
        .collection(&session)
        .add_card(common::lightning_bolt(), Ownership::default())
        .unwrap();

    let legality = |format: &str| {
        entry
            .card
            .legalities
            .iter()
            .find(|l| l.format == format)
            .map(|l| l.legality.clone())
    };
    // Explicit values survive, everything else defaults.
    assert_eq!(legality("modern").as_deref(), Some("Legal"));
    assert_eq!(legality("vintage").as_deref(), Some("Restricted"));
    assert_eq!(legality("standard").as_deref(), Some("Not Legal"));
    assert_eq!(legality("pauper").as_deref(), Some("Not Legal"));
}

// ---------------------------------------------------------------------------
// remove_card / update_card
// ---------------------------------------------------------------------------

#[test]
fn remove_card_deletes_the_entry() {
    let (sdk, session) = common::setup_sdk();
    let collection = sdk.collection(&session);
    collection
        .add_card(common::lightning_bolt(), Ownership::default())
        .unwrap();

    collection
        .remove_card(&CardIdentity::Multiverse(129465))
        .unwrap();
    assert!(collection.list(&CollectionFilter::default()).unwrap().is_empty());
}

#[test]
fn remove_card_on_missing_identity_fails_and_changes_nothing() {
    let (sdk, session) = common::setup_sdk();
    let collection = sdk.collection(&session);
    collection
        .add_card(common::lightning_bolt(), Ownership::default())
        .unwrap();

    let err = collection
        .remove_card(&CardIdentity::Multiverse(999_999))
        .unwrap_err();
    assert!(matches!(err, BinderError::NotFound(_)));
    assert_eq!(collection.list(&CollectionFilter::default()).unwrap().len(), 1);
}

#[test]
fn update_card_patches_fields_in_place() {
    let (sdk, session) = common::setup_sdk();
    let collection = sdk.collection(&session);
    let before = collection
        .add_card(common::lightning_bolt(), Ownership::default())
        .unwrap();

    let after = collection
        .update_card(
            &CardIdentity::Multiverse(129465),
            CollectionUpdate {
                quantity: Some(3),
                condition: Some(Condition::Played),
                acquired_price: Some(2.50),
                ..CollectionUpdate::default()
            },
        )
        .unwrap();

    assert_eq!(after.quantity, 3);
    assert_eq!(after.condition, Condition::Played);
    assert_eq!(after.acquired_price, Some(2.50));
    assert!(after.updated_at >= before.updated_at);
    // Untouched fields survive.
    assert_eq!(after.language, "English");
}

#[test]
fn update_card_on_missing_identity_fails() {
    let (sdk, session) = common::setup_sdk();
    let err = sdk
        .collection(&session)
        .update_card(
            &CardIdentity::External("nope".to_string()),
            CollectionUpdate::default(),
        )
        .unwrap_err();
    assert!(matches!(err, BinderError::NotFound(_)));
}

// ---------------------------------------------------------------------------
// list / clear / stats
// ---------------------------------------------------------------------------

#[test]
fn list_returns_newest_first() {
    let (sdk, session) = common::setup_sdk();
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

    let names: Vec<String> = collection
        .list(&CollectionFilter::default())
        .unwrap()
        .into_iter()
        .map(|e| e.card.name)
        .collect();
    assert_eq!(names, ["Grizzly Bears", "Counterspell", "Lightning Bolt"]);
}

#[test]
fn list_filters_by_substring_across_name_text_and_type() {
    let (sdk, session) = common::setup_sdk();
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

    let by_name = collection
        .list(&CollectionFilter {
            search: Some("bolt".to_string()),
        })
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].card.name, "Lightning Bolt");

    let by_text = collection
        .list(&CollectionFilter {
            search: Some("COUNTER TARGET".to_string()),
        })
        .unwrap();
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].card.name, "Counterspell");

    let by_type = collection
        .list(&CollectionFilter {
            search: Some("bear".to_string()),
        })
        .unwrap();
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type[0].card.name, "Grizzly Bears");
}

#[test]
fn clear_reports_how_many_entries_were_removed() {
    let (sdk, session) = common::setup_sdk();
    let collection = sdk.collection(&session);
    collection
        .add_card(common::lightning_bolt(), Ownership::default())
        .unwrap();
    collection
        .add_card(common::counterspell(), Ownership::default())
        .unwrap();

    assert_eq!(collection.clear().unwrap(), 2);
    assert_eq!(collection.clear().unwrap(), 0);
}

#[test]
fn stats_sum_quantities_and_acquired_value() {
    let (sdk, session) = common::setup_sdk();
    let collection = sdk.collection(&session);
    collection
        .add_card(
            common::lightning_bolt(),
            Ownership {
                quantity: Some(4),
                acquired_price: Some(1.25),
                ..Ownership::default()
            },
        )
        .unwrap();
    // No acquired price -- excluded from the value, counted in quantities.
    collection
        .add_card(
            common::counterspell(),
            Ownership {
                quantity: Some(2),
                ..Ownership::default()
            },
        )
        .unwrap();

    let stats = collection.stats().unwrap();
    assert_eq!(stats.total_cards, 6);
    assert_eq!(stats.unique_cards, 2);
    assert!((stats.acquired_value - 5.0).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[test]
fn anonymous_session_fails_before_anything_else() {
    let (sdk, _) = common::setup_sdk();
    let anonymous = CurrentSession::anonymous();
    let collection = sdk.collection(&anonymous);

    assert!(matches!(
        collection.add_card(common::lightning_bolt(), Ownership::default()),
        Err(BinderError::Unauthenticated)
    ));
    assert!(matches!(
        collection.list(&CollectionFilter::default()),
        Err(BinderError::Unauthenticated)
    ));
    assert!(matches!(
        collection.remove_card(&CardIdentity::Multiverse(1)),
        Err(BinderError::Unauthenticated)
    ));
}
