use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::{CardIdentity, CardRecord};
use super::pricing::PricingSnapshot;

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Physical condition of an owned card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Mint,
    #[default]
    NearMint,
    Excellent,
    Good,
    LightPlayed,
    Played,
    Poor,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Mint => "mint",
            Condition::NearMint => "near_mint",
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::LightPlayed => "light_played",
            Condition::Played => "played",
            Condition::Poor => "poor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mint" => Some(Condition::Mint),
            "near_mint" => Some(Condition::NearMint),
            "excellent" => Some(Condition::Excellent),
            "good" => Some(Condition::Good),
            "light_played" => Some(Condition::LightPlayed),
            "played" => Some(Condition::Played),
            "poor" => Some(Condition::Poor),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CollectionEntry — one owned printing
// ---------------------------------------------------------------------------

/// One owned printing in a user's collection: the catalog attributes plus
/// ownership fields and an optional pricing snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntry {
    /// Dedup key within the collection (multiverse id, else catalog id).
    pub identity: String,
    pub card: CardRecord,
    pub quantity: i64,
    pub condition: Condition,
    pub foil: bool,
    pub language: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub acquired_date: DateTime<Utc>,
    #[serde(default)]
    pub acquired_price: Option<f64>,
    #[serde(default)]
    pub pricing: Option<PricingSnapshot>,
    #[serde(default)]
    pub pricing_updated_at: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl CollectionEntry {
    pub fn identity_key(&self) -> CardIdentity {
        CardIdentity::from_parts(self.card.multiverseid, self.card.id.as_deref())
            .unwrap_or_else(|| CardIdentity::External(self.identity.clone()))
    }
}

// ---------------------------------------------------------------------------
// Ownership input / update patch
// ---------------------------------------------------------------------------

/// Ownership fields supplied when adding a card. Everything defaults:
/// quantity 1, near-mint, non-foil, English, acquired now.
#[derive(Debug, Clone, Default)]
pub struct Ownership {
    pub quantity: Option<i64>,
    pub condition: Option<Condition>,
    pub foil: Option<bool>,
    pub language: Option<String>,
    pub notes: Option<String>,
    pub acquired_date: Option<DateTime<Utc>>,
    pub acquired_price: Option<f64>,
}

/// Field patch for `update_card`. Only present fields are written.
#[derive(Debug, Clone, Default)]
pub struct CollectionUpdate {
    pub quantity: Option<i64>,
    pub condition: Option<Condition>,
    pub foil: Option<bool>,
    pub language: Option<String>,
    pub notes: Option<String>,
    pub acquired_date: Option<DateTime<Utc>>,
    pub acquired_price: Option<f64>,
}

impl CollectionUpdate {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.condition.is_none()
            && self.foil.is_none()
            && self.language.is_none()
            && self.notes.is_none()
            && self.acquired_date.is_none()
            && self.acquired_price.is_none()
    }
}

// ---------------------------------------------------------------------------
// Filters and aggregates
// ---------------------------------------------------------------------------

/// Filter for listing a collection. `search` is a case-insensitive substring
/// match against name, rules text and type line.
#[derive(Debug, Clone, Default)]
pub struct CollectionFilter {
    pub search: Option<String>,
}

/// Collection aggregates based on what the user paid, not market value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    /// Sum of quantities across all entries.
    pub total_cards: i64,
    /// Number of distinct entries.
    pub unique_cards: i64,
    /// Sum of acquired price x quantity over entries with a recorded price.
    pub acquired_value: f64,
}
