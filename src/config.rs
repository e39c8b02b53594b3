use std::path::PathBuf;
use std::time::Duration;

/// Card catalog API (magicthegathering.io-shaped: multiverse ids, foreign
/// names, legality lists).
pub const CATALOG_API_BASE: &str = "https://api.magicthegathering.io/v1";

/// Pricing API (Scryfall-shaped: one print per id, per-finish price map).
pub const PRICING_API_BASE: &str = "https://api.scryfall.com";

/// Pricing snapshots older than this are considered stale and eligible for
/// refresh.
pub const DEFAULT_MAX_PRICE_AGE_HOURS: i64 = 24;

/// How many cards a collection refresh fetches concurrently per batch.
pub const PRICE_BATCH_SIZE: usize = 5;

/// Pause between refresh batches, on top of the queue's own pacing.
pub const PRICE_BATCH_DELAY: Duration = Duration::from_millis(1000);

/// Per-request timeout for both external APIs.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// The two external targets have different rate-limit budgets: catalog
// lookups tolerate more parallelism, pricing lookups need wider spacing.

pub const CATALOG_MAX_CONCURRENT: usize = 4;
pub const CATALOG_MIN_INTERVAL: Duration = Duration::from_millis(100);

pub const PRICING_MAX_CONCURRENT: usize = 2;
pub const PRICING_MIN_INTERVAL: Duration = Duration::from_millis(250);

pub fn default_data_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("binder-sdk")
    } else {
        PathBuf::from(".binder-sdk")
    }
}
