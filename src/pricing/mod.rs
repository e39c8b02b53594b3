//! Market pricing: the external source client, pure valuation helpers, and
//! the collection-wide refresh orchestration.

pub mod client;
pub mod refresh;
pub mod value;

pub use client::{PriceSource, ScryfallClient};
pub use refresh::{PricingService, RefreshRun};
