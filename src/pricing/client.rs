//! Client for the external pricing source.
//!
//! One request per card print, routed through the pricing [`RequestQueue`]
//! so the source's rate-limit budget is respected process-wide. Failures map
//! onto the crate error taxonomy and are never retried here -- retry policy
//! belongs to the caller.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::config;
use crate::error::{BinderError, Result};
use crate::models::{PricePoints, PricingSnapshot};
use crate::queue::RequestQueue;

// ---------------------------------------------------------------------------
// PriceSource
// ---------------------------------------------------------------------------

/// The pricing source contract: one snapshot per card-print id.
///
/// `NotFound` when the source doesn't know the id, `RateLimited` on a 429,
/// `Timeout` when the request times out.
pub trait PriceSource: Send + Sync {
    fn fetch(&self, source_id: &str) -> impl Future<Output = Result<PricingSnapshot>> + Send;
}

// ---------------------------------------------------------------------------
// ScryfallClient
// ---------------------------------------------------------------------------

/// Wire shape of one card from the pricing API. Prices arrive as decimal
/// strings or null.
#[derive(Debug, Deserialize)]
struct WireCard {
    id: String,
    name: Option<String>,
    set: Option<String>,
    set_name: Option<String>,
    rarity: Option<String>,
    #[serde(default)]
    finishes: Vec<String>,
    #[serde(default)]
    prices: WirePrices,
    #[serde(default)]
    purchase_uris: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePrices {
    usd: Option<String>,
    usd_foil: Option<String>,
    usd_etched: Option<String>,
    eur: Option<String>,
    eur_foil: Option<String>,
    tix: Option<String>,
}

fn parse_amount(s: &Option<String>) -> Option<f64> {
    s.as_deref().and_then(|s| s.parse().ok())
}

/// Pricing client against a Scryfall-shaped API.
pub struct ScryfallClient {
    http: reqwest::Client,
    queue: Arc<RequestQueue>,
    base_url: String,
}

impl ScryfallClient {
    /// Client against the default pricing API with the default pricing
    /// queue budget.
    pub fn new() -> Result<Self> {
        Self::with_base_url(
            config::PRICING_API_BASE,
            Arc::new(RequestQueue::new(
                config::PRICING_MAX_CONCURRENT,
                config::PRICING_MIN_INTERVAL,
            )),
        )
    }

    /// Client against a custom base URL sharing the given queue.
    pub fn with_base_url(base_url: impl Into<String>, queue: Arc<RequestQueue>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            queue,
            base_url: base_url.into(),
        })
    }

    /// Endpoint for one identity key: multiverse lookup for numeric keys,
    /// direct id lookup otherwise.
    fn card_url(&self, source_id: &str) -> String {
        if source_id.chars().all(|c| c.is_ascii_digit()) {
            format!("{}/cards/multiverse/{}", self.base_url, source_id)
        } else {
            format!("{}/cards/{}", self.base_url, source_id)
        }
    }
}

impl PriceSource for ScryfallClient {
    async fn fetch(&self, source_id: &str) -> Result<PricingSnapshot> {
        let url = self.card_url(source_id);
        tracing::debug!(source_id, "fetching pricing");

        let response = self
            .queue
            .enqueue(self.http.get(&url).send())
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BinderError::Timeout(source_id.to_string())
                } else {
                    BinderError::Http(e)
                }
            })?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(BinderError::NotFound(source_id.to_string()));
        }
        if status.as_u16() == 429 {
            return Err(BinderError::RateLimited);
        }
        let response = response.error_for_status()?;

        let card: WireCard = response.json().await?;
        tracing::debug!(source_id, name = card.name.as_deref(), "pricing received");

        Ok(PricingSnapshot {
            source_id: card.id,
            name: card.name,
            set: card.set,
            set_name: card.set_name,
            rarity: card.rarity,
            finishes: card.finishes,
            prices: PricePoints {
                usd: parse_amount(&card.prices.usd),
                usd_foil: parse_amount(&card.prices.usd_foil),
                usd_etched: parse_amount(&card.prices.usd_etched),
                eur: parse_amount(&card.prices.eur),
                eur_foil: parse_amount(&card.prices.eur_foil),
                tix: parse_amount(&card.prices.tix),
            },
            purchase_uris: card.purchase_uris,
            last_updated: Utc::now(),
        })
    }
}
