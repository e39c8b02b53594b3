//! Client for the external card catalog source.
//!
//! Lookups run through the general-purpose [`RequestQueue`] (a separate,
//! higher-throughput budget than the pricing queue). Responses map into
//! [`CardRecord`]s with image sources and legalities normalized, so callers
//! can hand results straight to the collection store.

use std::sync::Arc;

use serde::Deserialize;

use crate::config;
use crate::error::{BinderError, Result};
use crate::models::CardRecord;
use crate::queue::RequestQueue;

#[derive(Debug, Deserialize)]
struct CardsResponse {
    #[serde(default)]
    cards: Vec<CardRecord>,
}

/// Card catalog client against a magicthegathering.io-shaped API.
pub struct CatalogClient {
    http: reqwest::Client,
    queue: Arc<RequestQueue>,
    base_url: String,
}

impl CatalogClient {
    /// Client against the default catalog API with the default catalog
    /// queue budget.
    pub fn new() -> Result<Self> {
        Self::with_base_url(
            config::CATALOG_API_BASE,
            Arc::new(RequestQueue::new(
                config::CATALOG_MAX_CONCURRENT,
                config::CATALOG_MIN_INTERVAL,
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

    /// Search by card name. Exact matching quotes the name; otherwise the
    /// source does substring matching.
    pub async fn search_by_name(&self, name: &str, exact: bool) -> Result<Vec<CardRecord>> {
        let name_param = if exact {
            format!("\"{name}\"")
        } else {
            name.to_string()
        };
        self.fetch_cards(&[("name", name_param.as_str())]).await
    }

    /// Search by a localized card name, filtering on the source's
    /// foreign-name translations.
    pub async fn search_by_language(
        &self,
        name: &str,
        language: &str,
    ) -> Result<Vec<CardRecord>> {
        self.fetch_cards(&[("name", name), ("language", language)])
            .await
    }

    async fn fetch_cards(&self, params: &[(&str, &str)]) -> Result<Vec<CardRecord>> {
        let url = format!("{}/cards", self.base_url);
        tracing::debug!(?params, "catalog search");

        let request = self.http.get(&url).query(params).send();
        let response = self.queue.enqueue(request).await.map_err(|e| {
            if e.is_timeout() {
                BinderError::Timeout("catalog search".to_string())
            } else {
                BinderError::Http(e)
            }
        })?;

        if response.status().as_u16() == 429 {
            return Err(BinderError::RateLimited);
        }
        let response = response.error_for_status()?;

        let body: CardsResponse = response.json().await?;
        tracing::debug!(count = body.cards.len(), "catalog results");

        let mut cards = body.cards;
        for card in &mut cards {
            card.normalize();
        }
        Ok(cards)
    }
}
