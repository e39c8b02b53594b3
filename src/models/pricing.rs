use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Currency / Finish
// ---------------------------------------------------------------------------

/// Currency a price is quoted in. `Tix` is the MTGO ticket price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Tix,
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "\u{20ac}",
            Currency::Tix => "",
        }
    }
}

/// Print finish a price applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finish {
    Nonfoil,
    Foil,
    Etched,
}

// ---------------------------------------------------------------------------
// PricingSnapshot
// ---------------------------------------------------------------------------

/// Per-finish market prices for one printable object, as quoted by the
/// pricing source. Absent finishes are `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PricePoints {
    #[serde(default)]
    pub usd: Option<f64>,
    #[serde(default)]
    pub usd_foil: Option<f64>,
    #[serde(default)]
    pub usd_etched: Option<f64>,
    #[serde(default)]
    pub eur: Option<f64>,
    #[serde(default)]
    pub eur_foil: Option<f64>,
    #[serde(default)]
    pub tix: Option<f64>,
}

/// Market data for one printable object, keyed by the pricing source's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PricingSnapshot {
    pub source_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub set: Option<String>,
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub finishes: Vec<String>,
    pub prices: PricePoints,
    /// Retailer name -> purchase link.
    #[serde(default)]
    pub purchase_uris: HashMap<String, String>,
    pub last_updated: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

/// The price chosen for display: amount plus the finish it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestPrice {
    pub amount: f64,
    pub finish: Finish,
}

/// All finish prices of a snapshot in one currency, for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSummary {
    pub has_price: bool,
    pub nonfoil: Option<f64>,
    pub foil: Option<f64>,
    pub etched: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Market value of a collection in one currency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionValue {
    pub currency: Currency,
    /// Sum of best price x quantity, rounded to 2 decimals.
    pub total: f64,
    pub nonfoil_value: f64,
    pub foil_value: f64,
    /// Total quantity of entries that have no price in this currency.
    pub unpriced_quantity: i64,
}

/// Pricing coverage over a collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingStats {
    pub total_entries: i64,
    pub priced_entries: i64,
    /// priced / total as a percentage, 0 when the collection is empty.
    pub coverage_percent: f64,
    pub stale_entries: i64,
    /// Most recent `last_updated` across all snapshots.
    pub last_updated: Option<DateTime<Utc>>,
}

/// One entry of the top-valued listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuedCard {
    pub identity: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_value: f64,
    pub finish: Finish,
}

// ---------------------------------------------------------------------------
// Refresh types
// ---------------------------------------------------------------------------

/// Options for a collection-wide pricing refresh.
#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    /// Refetch everything, ignoring staleness.
    pub force_update: bool,
    /// Staleness threshold override in hours.
    pub max_age_hours: Option<i64>,
    /// Batch size override.
    pub batch_size: Option<usize>,
}

/// Stage tag on a refresh progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStage {
    Initializing,
    Analyzing,
    Fetching,
    Updating,
    Finalizing,
    Complete,
    Error,
    Warning,
}

/// Outcome counters of a finished refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    /// Entries whose snapshot was replaced.
    pub updated: i64,
    /// Entries that were selected for refresh.
    pub total: i64,
    /// Entries skipped as fresh, plus per-card fetch failures.
    pub skipped: i64,
}

/// One progress event emitted during a collection refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshProgress {
    pub stage: RefreshStage,
    pub message: String,
    /// 0..=100.
    pub percent: u8,
    #[serde(default)]
    pub current_batch: Option<usize>,
    #[serde(default)]
    pub total_batches: Option<usize>,
    /// Present on the terminal `Complete` event.
    #[serde(default)]
    pub summary: Option<RefreshSummary>,
}
