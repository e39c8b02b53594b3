//! Shared fixtures for the binder-sdk integration tests.
//!
//! Provides `setup_sdk()` -- an in-memory SDK with one registered user and
//! an authenticated session -- plus sample card records and pricing
//! snapshots.

#![allow(dead_code)]

use chrono::{Duration, Utc};

use binder_sdk::models::{
    CardRecord, ForeignName, FormatLegality, PricePoints, PricingSnapshot,
};
use binder_sdk::{BinderSdk, CurrentSession};

/// In-memory SDK with one registered user; returns the SDK and an
/// authenticated session for that user.
pub fn setup_sdk() -> (BinderSdk, CurrentSession) {
    let sdk = BinderSdk::builder().in_memory().build().unwrap();
    let user = sdk.register_user("planeswalker@example.com", "Test Mage").unwrap();
    let session = CurrentSession::authenticated(user.id.clone());
    (sdk, session)
}

/// Minimal card with only the fields that matter for a test.
pub fn card(
    name: &str,
    multiverseid: Option<i64>,
    id: Option<&str>,
    type_line: &str,
    cmc: f64,
    colors: &[&str],
) -> CardRecord {
    CardRecord {
        name: name.to_string(),
        id: id.map(|s| s.to_string()),
        multiverseid,
        type_line: type_line.to_string(),
        types: Vec::new(),
        subtypes: Vec::new(),
        supertypes: Vec::new(),
        mana_cost: None,
        cmc,
        colors: colors.iter().map(|c| c.to_string()).collect(),
        color_identity: colors.iter().map(|c| c.to_string()).collect(),
        rarity: None,
        set: None,
        set_name: None,
        text: None,
        power: None,
        toughness: None,
        loyalty: None,
        artist: None,
        number: None,
        image_url: None,
        foreign_names: Vec::new(),
        legalities: Vec::new(),
        image_sources: Vec::new(),
    }
}

pub fn lightning_bolt() -> CardRecord {
    let mut c = card("Lightning Bolt", Some(129465), None, "Instant", 1.0, &["R"]);
    c.mana_cost = Some("{R}".to_string());
    c.text = Some("Lightning Bolt deals 3 damage to any target.".to_string());
    c.set = Some("A25".to_string());
    c.set_name = Some("Masters 25".to_string());
    c.number = Some("141".to_string());
    c.rarity = Some("Uncommon".to_string());
    c.image_url =
        Some("https://img.example.com/cards/lightning-bolt.png".to_string());
    c.legalities = vec![
        FormatLegality {
            format: "modern".to_string(),
            legality: "Legal".to_string(),
        },
        FormatLegality {
            format: "vintage".to_string(),
            legality: "Restricted".to_string(),
        },
    ];
    c
}

pub fn counterspell() -> CardRecord {
    let mut c = card(
        "Counterspell",
        None,
        Some("cs-ext-0001"),
        "Instant",
        2.0,
        &["U"],
    );
    c.mana_cost = Some("{U}{U}".to_string());
    c.text = Some("Counter target spell.".to_string());
    c.foreign_names = vec![ForeignName {
        name: "Gegenzauber".to_string(),
        language: "German".to_string(),
        multiverseid: None,
    }];
    c
}

pub fn grizzly_bears() -> CardRecord {
    let mut c = card(
        "Grizzly Bears",
        Some(94903),
        None,
        "Creature \u{2014} Bear",
        2.0,
        &["G"],
    );
    c.mana_cost = Some("{1}{G}".to_string());
    c.power = Some("2".to_string());
    c.toughness = Some("2".to_string());
    c
}

/// Snapshot with the given USD nonfoil/foil prices and an age in hours.
pub fn snapshot(source_id: &str, usd: Option<f64>, usd_foil: Option<f64>) -> PricingSnapshot {
    PricingSnapshot {
        source_id: source_id.to_string(),
        name: None,
        set: None,
        set_name: None,
        rarity: None,
        finishes: vec!["nonfoil".to_string(), "foil".to_string()],
        prices: PricePoints {
            usd,
            usd_foil,
            usd_etched: None,
            eur: None,
            eur_foil: None,
            tix: None,
        },
        purchase_uris: Default::default(),
        last_updated: Utc::now(),
    }
}

/// Snapshot whose `last_updated` lies `hours` in the past.
pub fn aged_snapshot(source_id: &str, usd: f64, hours: i64) -> PricingSnapshot {
    let mut s = snapshot(source_id, Some(usd), None);
    s.last_updated = Utc::now() - Duration::hours(hours);
    s
}
