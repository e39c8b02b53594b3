use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::card::CardRecord;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Play format a deck is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckFormat {
    #[default]
    Casual,
    Commander,
    Standard,
    Modern,
    Legacy,
    Vintage,
    Pioneer,
    Historic,
    Pauper,
    Limited,
}

impl DeckFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeckFormat::Casual => "casual",
            DeckFormat::Commander => "commander",
            DeckFormat::Standard => "standard",
            DeckFormat::Modern => "modern",
            DeckFormat::Legacy => "legacy",
            DeckFormat::Vintage => "vintage",
            DeckFormat::Pioneer => "pioneer",
            DeckFormat::Historic => "historic",
            DeckFormat::Pauper => "pauper",
            DeckFormat::Limited => "limited",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "casual" => Some(DeckFormat::Casual),
            "commander" => Some(DeckFormat::Commander),
            "standard" => Some(DeckFormat::Standard),
            "modern" => Some(DeckFormat::Modern),
            "legacy" => Some(DeckFormat::Legacy),
            "vintage" => Some(DeckFormat::Vintage),
            "pioneer" => Some(DeckFormat::Pioneer),
            "historic" => Some(DeckFormat::Historic),
            "pauper" => Some(DeckFormat::Pauper),
            "limited" => Some(DeckFormat::Limited),
            _ => None,
        }
    }
}

/// Which board of the deck a card sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckCategory {
    #[default]
    Mainboard,
    Sideboard,
    Maybeboard,
}

impl DeckCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeckCategory::Mainboard => "mainboard",
            DeckCategory::Sideboard => "sideboard",
            DeckCategory::Maybeboard => "maybeboard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mainboard" => Some(DeckCategory::Mainboard),
            "sideboard" => Some(DeckCategory::Sideboard),
            "maybeboard" => Some(DeckCategory::Maybeboard),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Deck
// ---------------------------------------------------------------------------

/// Denormalized display snapshot stored on the deck. Not validated against
/// the deck's contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverCard {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_sources: Vec<String>,
}

/// A named build owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub format: DeckFormat,
    pub is_public: bool,
    #[serde(default)]
    pub cover_card: Option<CoverCard>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_played_at: Option<DateTime<Utc>>,
}

/// Metadata for creating a deck. Only the name is required.
#[derive(Debug, Clone, Default)]
pub struct DeckFields {
    pub name: String,
    pub description: Option<String>,
    pub format: Option<DeckFormat>,
    pub is_public: Option<bool>,
}

/// Metadata patch for `update_deck`. Only present fields are written.
#[derive(Debug, Clone, Default)]
pub struct DeckUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub format: Option<DeckFormat>,
    pub is_public: Option<bool>,
    pub last_played_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// DeckCard
// ---------------------------------------------------------------------------

/// A quantity of one card within a deck. Non-basic cards reference the
/// owning user's collection; basic lands carry their own card data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckCard {
    /// Collection identity key, or `basic-<landname>` for basic lands.
    pub collection_card_id: String,
    #[serde(default)]
    pub multiverseid: Option<i64>,
    #[serde(default)]
    pub card_id: Option<String>,
    pub quantity: i64,
    pub category: DeckCategory,
    pub is_basic_land: bool,
    /// Embedded snapshot, present only for basic lands.
    #[serde(default)]
    pub card_data: Option<CardRecord>,
}

/// One basic-land request in a bulk add.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicLandRequest {
    pub land_name: String,
    pub quantity: i64,
}

/// A deck card joined against the collection at read time. Non-basic cards
/// whose collection entry is gone are absent from the populated view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckCardView {
    #[serde(flatten)]
    pub deck_card: DeckCard,
    pub card: CardRecord,
}

/// A deck with its cards resolved against the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckView {
    #[serde(flatten)]
    pub deck: Deck,
    pub cards: Vec<DeckCardView>,
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Mana curve over mainboard non-basic-land cards: exact buckets for cmc
/// 0..=9 and one bucket for 10 and above.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManaCurve {
    pub buckets: Vec<CurveBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveBucket {
    /// "0".."9" or "10+".
    pub label: String,
    pub count: i64,
}

/// Aggregations over a deck's mainboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckAnalytics {
    pub total_cards: i64,
    pub unique_cards: i64,
    pub mana_curve: ManaCurve,
    /// W/U/B/R/G/C counts, +1 per listed color per copy; C counts colorless
    /// copies. Basic lands excluded.
    pub color_distribution: HashMap<String, i64>,
    /// Each color bucket as a percentage of the summed color buckets.
    pub color_percentages: HashMap<String, f64>,
    /// creature/instant/sorcery/artifact/enchantment/planeswalker/land/other,
    /// first matching type wins. Basic lands count under "land".
    pub type_distribution: HashMap<String, i64>,
    /// Quantity-weighted mean cmc over non-basic-land cards, 2 decimals.
    pub average_cmc: f64,
}
