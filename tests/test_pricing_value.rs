//! Unit tests for the pure pricing helpers.

mod common;

use chrono::{Duration, Utc};

use binder_sdk::models::{CollectionEntry, Condition, Currency, Finish, Ownership};
use binder_sdk::pricing::value::{
    best_price, collection_value, format_price, is_stale, pricing_summary,
};

/// A detached collection entry (no database) for valuation tests.
fn entry(name: &str, quantity: i64, foil: bool, pricing: Option<binder_sdk::models::PricingSnapshot>) -> CollectionEntry {
    let now = Utc::now();
    CollectionEntry {
        identity: name.to_lowercase().replace(' ', "-"),
        card: common::card(name, Some(1), None, "Instant", 1.0, &["R"]),
        quantity,
        condition: Condition::NearMint,
        foil,
        language: "English".to_string(),
        notes: None,
        acquired_date: now,
        acquired_price: None,
        pricing,
        pricing_updated_at: None,
        added_at: now,
        updated_at: now,
        last_synced_at: None,
    }
}

// ---------------------------------------------------------------------------
// best_price
// ---------------------------------------------------------------------------

#[test]
fn prefer_foil_picks_foil_when_present() {
    let s = common::snapshot("a", Some(1.00), Some(5.00));
    let best = best_price(&s, true, Currency::Usd).unwrap();
    assert_eq!(best.amount, 5.00);
    assert_eq!(best.finish, Finish::Foil);
}

#[test]
fn prefer_foil_falls_back_to_etched_then_nonfoil() {
    let mut s = common::snapshot("a", Some(1.00), None);
    s.prices.usd_etched = Some(3.00);
    let best = best_price(&s, true, Currency::Usd).unwrap();
    assert_eq!(best.amount, 3.00);
    assert_eq!(best.finish, Finish::Etched);

    let plain = common::snapshot("a", Some(1.00), None);
    let best = best_price(&plain, true, Currency::Usd).unwrap();
    assert_eq!(best.amount, 1.00);
    assert_eq!(best.finish, Finish::Nonfoil);
}

#[test]
fn non_foil_preference_still_falls_back_to_any_price() {
    // Only a foil price exists; a nonfoil preference must still find it.
    let s = common::snapshot("a", None, Some(7.50));
    let best = best_price(&s, false, Currency::Usd).unwrap();
    assert_eq!(best.amount, 7.50);
    assert_eq!(best.finish, Finish::Foil);
}

#[test]
fn missing_currency_yields_none() {
    let s = common::snapshot("a", Some(1.00), Some(5.00));
    assert!(best_price(&s, false, Currency::Eur).is_none());
    assert!(best_price(&s, true, Currency::Tix).is_none());
}

#[test]
fn etched_only_exists_in_usd() {
    let mut s = common::snapshot("a", None, None);
    s.prices.usd_etched = Some(9.99);
    s.prices.eur = Some(2.00);
    // In EUR the etched price is invisible.
    let best = best_price(&s, true, Currency::Eur).unwrap();
    assert_eq!(best.amount, 2.00);
    assert_eq!(best.finish, Finish::Nonfoil);
}

// ---------------------------------------------------------------------------
// collection_value
// ---------------------------------------------------------------------------

#[test]
fn value_sums_best_price_times_quantity() {
    let entries = vec![
        entry("Bolt", 4, false, Some(common::snapshot("a", Some(1.50), None))),
        entry("Goyf", 1, true, Some(common::snapshot("b", Some(40.0), Some(90.0)))),
        entry("Unpriced", 3, false, None),
    ];

    let value = collection_value(&entries, Currency::Usd);
    assert!((value.total - 96.0).abs() < 1e-9);
    assert!((value.nonfoil_value - 6.0).abs() < 1e-9);
    assert!((value.foil_value - 90.0).abs() < 1e-9);
    assert_eq!(value.unpriced_quantity, 3);
}

#[test]
fn value_is_additive_and_order_independent() {
    let a = entry("A", 2, false, Some(common::snapshot("a", Some(1.23), None)));
    let b = entry("B", 5, false, Some(common::snapshot("b", Some(0.10), None)));

    let both = collection_value(&[a.clone(), b.clone()], Currency::Usd);
    let reversed = collection_value(&[b.clone(), a.clone()], Currency::Usd);
    let separate = collection_value(&[a], Currency::Usd).total
        + collection_value(&[b], Currency::Usd).total;

    assert_eq!(both.total, reversed.total);
    assert!((both.total - separate).abs() < 1e-9);
}

#[test]
fn value_rounds_to_two_decimals() {
    let entries = vec![entry(
        "Third",
        3,
        false,
        Some(common::snapshot("a", Some(0.333), None)),
    )];
    let value = collection_value(&entries, Currency::Usd);
    assert_eq!(value.total, 1.0);
}

// ---------------------------------------------------------------------------
// is_stale
// ---------------------------------------------------------------------------

#[test]
fn staleness_follows_the_max_age_threshold() {
    assert!(!is_stale(Some(Utc::now() - Duration::hours(1)), 24));
    assert!(is_stale(Some(Utc::now() - Duration::hours(25)), 24));
    assert!(is_stale(None, 24));
}

// ---------------------------------------------------------------------------
// format_price
// ---------------------------------------------------------------------------

#[test]
fn formats_by_currency_and_passes_through_none() {
    assert_eq!(format_price(Some(3.5), Currency::Usd).as_deref(), Some("$3.50"));
    assert_eq!(
        format_price(Some(12.0), Currency::Eur).as_deref(),
        Some("\u{20ac}12.00")
    );
    assert_eq!(format_price(Some(0.25), Currency::Tix).as_deref(), Some("0.25 TIX"));
    assert_eq!(format_price(None, Currency::Usd), None);
}

// ---------------------------------------------------------------------------
// pricing_summary
// ---------------------------------------------------------------------------

#[test]
fn summary_reports_finishes_and_min_max() {
    let mut s = common::snapshot("a", Some(2.00), Some(8.00));
    s.prices.usd_etched = Some(5.00);

    let summary = pricing_summary(&s, Currency::Usd);
    assert!(summary.has_price);
    assert_eq!(summary.nonfoil, Some(2.00));
    assert_eq!(summary.foil, Some(8.00));
    assert_eq!(summary.etched, Some(5.00));
    assert_eq!(summary.min, Some(2.00));
    assert_eq!(summary.max, Some(8.00));
}

#[test]
fn summary_without_prices_has_no_price() {
    let s = common::snapshot("a", None, None);
    let summary = pricing_summary(&s, Currency::Eur);
    assert!(!summary.has_price);
    assert_eq!(summary.min, None);
    assert_eq!(summary.max, None);
}
