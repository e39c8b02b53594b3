//! Collection-wide pricing refresh and read-only pricing aggregations.
//!
//! The refresh runs as a spawned task reporting progress through an event
//! stream; the sync DuckDB store is reached through `spawn_blocking` over a
//! shared handle so the runtime never blocks on storage. Per-card fetch
//! failures surface as warning events and never abort the run.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::collection::{load_entries, load_entry, write_pricing};
use crate::config;
use crate::error::{BinderError, Result};
use crate::models::{
    CardIdentity, CollectionEntry, CollectionValue, Currency, PricingSnapshot, PricingStats,
    RefreshOptions, RefreshProgress, RefreshStage, RefreshSummary, ValuedCard,
};
use crate::pricing::client::{PriceSource, ScryfallClient};
use crate::pricing::value;
use crate::session::CurrentSession;
use crate::BinderSdk;

// ---------------------------------------------------------------------------
// Store bridge
// ---------------------------------------------------------------------------

/// Run a sync store operation on the blocking thread pool.
async fn run_store<F, T>(sdk: &Arc<Mutex<BinderSdk>>, f: F) -> Result<T>
where
    F: FnOnce(&BinderSdk) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let sdk = sdk.clone();
    tokio::task::spawn_blocking(move || {
        let guard = sdk
            .lock()
            .map_err(|_| BinderError::Validation("store lock poisoned".into()))?;
        f(&guard)
    })
    .await
    .map_err(|e| BinderError::Validation(format!("task join error: {e}")))?
}

// ---------------------------------------------------------------------------
// PricingService
// ---------------------------------------------------------------------------

/// Session-scoped pricing actions over a shared [`BinderSdk`].
pub struct PricingService<P: PriceSource + 'static = ScryfallClient> {
    sdk: Arc<Mutex<BinderSdk>>,
    source: Arc<P>,
    max_age_hours: i64,
    batch_size: usize,
    batch_delay: Duration,
}

impl PricingService<ScryfallClient> {
    /// Service against the default pricing API.
    pub fn new(sdk: Arc<Mutex<BinderSdk>>) -> Result<Self> {
        Ok(Self::with_source(sdk, ScryfallClient::new()?))
    }
}

impl<P: PriceSource + 'static> PricingService<P> {
    /// Service with a custom pricing source (tests inject a mock here).
    pub fn with_source(sdk: Arc<Mutex<BinderSdk>>, source: P) -> Self {
        Self {
            sdk,
            source: Arc::new(source),
            max_age_hours: config::DEFAULT_MAX_PRICE_AGE_HOURS,
            batch_size: config::PRICE_BATCH_SIZE,
            batch_delay: config::PRICE_BATCH_DELAY,
        }
    }

    /// Override the staleness threshold.
    pub fn max_age_hours(mut self, hours: i64) -> Self {
        self.max_age_hours = hours;
        self
    }

    /// Override the batch size and inter-batch delay.
    pub fn batching(mut self, batch_size: usize, batch_delay: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.batch_delay = batch_delay;
        self
    }

    // -- Single-card refresh ------------------------------------------------

    /// Fetch a fresh snapshot for one owned printing and write it back.
    /// `NotFound` when the user doesn't own the printing.
    pub async fn refresh_one(
        &self,
        session: &CurrentSession,
        identity: &CardIdentity,
    ) -> Result<PricingSnapshot> {
        let user_id = session.user_id()?.to_string();
        let key = identity.key();

        let lookup_key = key.clone();
        let lookup_user = user_id.clone();
        let entry = run_store(&self.sdk, move |sdk| {
            load_entry(sdk.store(), &lookup_user, &lookup_key)
        })
        .await?
        .ok_or_else(|| BinderError::NotFound(format!("collection entry {key}")))?;

        let snapshot = self.source.fetch(&entry.identity).await?;

        let write_key = key.clone();
        let write_snapshot = snapshot.clone();
        run_store(&self.sdk, move |sdk| {
            write_pricing(sdk.store(), &user_id, &write_key, &write_snapshot)
        })
        .await?;

        Ok(snapshot)
    }

    // -- Collection refresh -------------------------------------------------

    /// Refresh pricing for every entry that needs it, in rate-limited
    /// batches.
    ///
    /// Returns a [`RefreshRun`]: an event stream of [`RefreshProgress`]
    /// whose terminal `Complete` event carries the summary. Dropping the run
    /// aborts the remaining work. Individual fetch failures emit `Warning`
    /// events and count as skipped; only a missing user document ends the
    /// run with an `Error` event.
    pub fn refresh_collection(
        &self,
        session: &CurrentSession,
        options: RefreshOptions,
    ) -> Result<RefreshRun> {
        let user_id = session.user_id()?.to_string();

        let (tx, rx) = mpsc::channel(32);
        let sdk = self.sdk.clone();
        let source = self.source.clone();
        let max_age_hours = options.max_age_hours.unwrap_or(self.max_age_hours);
        let batch_size = options.batch_size.unwrap_or(self.batch_size).max(1);
        let batch_delay = self.batch_delay;
        let force = options.force_update;

        let handle = tokio::spawn(async move {
            run_refresh(
                sdk,
                source,
                user_id,
                force,
                max_age_hours,
                batch_size,
                batch_delay,
                tx,
            )
            .await;
        });

        Ok(RefreshRun { events: rx, handle })
    }

    // -- Read-only aggregations ----------------------------------------------

    /// Market value of the user's collection in one currency.
    pub async fn collection_value(
        &self,
        session: &CurrentSession,
        currency: Currency,
    ) -> Result<CollectionValue> {
        let entries = self.load_user_entries(session).await?;
        Ok(value::collection_value(&entries, currency))
    }

    /// Pricing coverage: how much of the collection is priced, how much of
    /// that is stale, and the most recent snapshot time.
    pub async fn pricing_stats(&self, session: &CurrentSession) -> Result<PricingStats> {
        let entries = self.load_user_entries(session).await?;
        let max_age_hours = self.max_age_hours;

        let total_entries = entries.len() as i64;
        let priced_entries = entries.iter().filter(|e| e.pricing.is_some()).count() as i64;
        let stale_entries = entries
            .iter()
            .filter(|e| value::is_stale(e.pricing.as_ref().map(|p| p.last_updated), max_age_hours))
            .count() as i64;
        let last_updated = entries
            .iter()
            .filter_map(|e| e.pricing.as_ref().map(|p| p.last_updated))
            .max();

        let coverage_percent = if total_entries > 0 {
            (priced_entries as f64 / total_entries as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        Ok(PricingStats {
            total_entries,
            priced_entries,
            coverage_percent,
            stale_entries,
            last_updated,
        })
    }

    /// The `limit` most valuable entries by best price x quantity.
    pub async fn top_valued_cards(
        &self,
        session: &CurrentSession,
        currency: Currency,
        limit: usize,
    ) -> Result<Vec<ValuedCard>> {
        let entries = self.load_user_entries(session).await?;

        let mut valued: Vec<ValuedCard> = entries
            .iter()
            .filter_map(|e| {
                let best = value::best_price(e.pricing.as_ref()?, e.foil, currency)?;
                Some(ValuedCard {
                    identity: e.identity.clone(),
                    name: e.card.name.clone(),
                    quantity: e.quantity,
                    unit_price: best.amount,
                    total_value: best.amount * e.quantity as f64,
                    finish: best.finish,
                })
            })
            .collect();
        valued.sort_by(|a, b| {
            b.total_value
                .partial_cmp(&a.total_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        valued.truncate(limit);
        Ok(valued)
    }

    async fn load_user_entries(&self, session: &CurrentSession) -> Result<Vec<CollectionEntry>> {
        let user_id = session.user_id()?.to_string();
        run_store(&self.sdk, move |sdk| load_entries(sdk.store(), &user_id)).await
    }
}

// ---------------------------------------------------------------------------
// RefreshRun
// ---------------------------------------------------------------------------

/// A collection refresh in flight: an event stream plus the task driving it.
/// Dropping the run aborts the task.
#[derive(Debug)]
pub struct RefreshRun {
    events: mpsc::Receiver<RefreshProgress>,
    handle: JoinHandle<()>,
}

impl RefreshRun {
    /// Next progress event, `None` once the run has ended.
    pub async fn next_event(&mut self) -> Option<RefreshProgress> {
        self.events.recv().await
    }

    /// Drain the remaining events and return the final summary.
    ///
    /// An `Error`-stage event ends the run with `NotFound` (the user
    /// document was missing).
    pub async fn finish(mut self) -> Result<RefreshSummary> {
        let mut summary = None;
        let mut error = None;
        while let Some(event) = self.events.recv().await {
            match event.stage {
                RefreshStage::Complete => summary = event.summary,
                RefreshStage::Error => error = Some(event.message),
                _ => {}
            }
        }
        if let Some(message) = error {
            return Err(BinderError::NotFound(message));
        }
        summary.ok_or_else(|| BinderError::Validation("refresh ended without a result".into()))
    }
}

impl Drop for RefreshRun {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// The refresh task
// ---------------------------------------------------------------------------

fn progress(stage: RefreshStage, message: impl Into<String>, percent: u8) -> RefreshProgress {
    RefreshProgress {
        stage,
        message: message.into(),
        percent,
        current_batch: None,
        total_batches: None,
        summary: None,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_refresh<P: PriceSource + 'static>(
    sdk: Arc<Mutex<BinderSdk>>,
    source: Arc<P>,
    user_id: String,
    force: bool,
    max_age_hours: i64,
    batch_size: usize,
    batch_delay: Duration,
    tx: mpsc::Sender<RefreshProgress>,
) {
    let _ = tx
        .send(progress(
            RefreshStage::Initializing,
            "Loading collection",
            0,
        ))
        .await;

    let load_user = user_id.clone();
    let loaded = run_store(&sdk, move |sdk| {
        let user = sdk.store().get_user(&load_user)?;
        let entries = match user {
            Some(_) => Some(load_entries(sdk.store(), &load_user)?),
            None => None,
        };
        Ok(entries)
    })
    .await;

    let entries = match loaded {
        Ok(Some(entries)) => entries,
        Ok(None) => {
            let _ = tx
                .send(progress(
                    RefreshStage::Error,
                    format!("user {user_id} not found"),
                    100,
                ))
                .await;
            return;
        }
        Err(e) => {
            let _ = tx
                .send(progress(RefreshStage::Error, e.to_string(), 100))
                .await;
            return;
        }
    };

    let _ = tx
        .send(progress(
            RefreshStage::Analyzing,
            format!("Checking {} cards for stale pricing", entries.len()),
            5,
        ))
        .await;

    let selected: Vec<CollectionEntry> = entries
        .iter()
        .filter(|e| {
            force || value::is_stale(e.pricing.as_ref().map(|p| p.last_updated), max_age_hours)
        })
        .cloned()
        .collect();

    let total = selected.len() as i64;
    let fresh = entries.len() as i64 - total;

    if selected.is_empty() {
        let mut done = progress(RefreshStage::Complete, "All pricing is up to date", 100);
        done.summary = Some(RefreshSummary {
            updated: 0,
            total: 0,
            skipped: fresh,
        });
        let _ = tx.send(done).await;
        return;
    }

    let batches: Vec<Vec<CollectionEntry>> = selected
        .chunks(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect();
    let total_batches = batches.len();

    let mut updated = 0i64;
    let mut failed = 0i64;

    for (batch_index, batch) in batches.into_iter().enumerate() {
        let batch_no = batch_index + 1;
        let percent = (10 + batch_index * 80 / total_batches) as u8;

        let mut fetching = progress(
            RefreshStage::Fetching,
            format!("Fetching prices, batch {batch_no} of {total_batches}"),
            percent,
        );
        fetching.current_batch = Some(batch_no);
        fetching.total_batches = Some(total_batches);
        let _ = tx.send(fetching).await;

        // All fetches of one batch run concurrently; the source's own queue
        // paces the actual dispatches.
        let mut set: JoinSet<(String, Result<PricingSnapshot>)> = JoinSet::new();
        for entry in &batch {
            let source = source.clone();
            let identity = entry.identity.clone();
            set.spawn(async move {
                let result = source.fetch(&identity).await;
                (identity, result)
            });
        }

        let mut fetched: Vec<(String, PricingSnapshot)> = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((identity, Ok(snapshot))) => fetched.push((identity, snapshot)),
                Ok((identity, Err(e))) => {
                    failed += 1;
                    tracing::warn!(identity = %identity, error = %e, "pricing fetch failed");
                    let _ = tx
                        .send(progress(
                            RefreshStage::Warning,
                            format!("Could not price {identity}: {e}"),
                            percent,
                        ))
                        .await;
                }
                Err(e) => {
                    failed += 1;
                    let _ = tx
                        .send(progress(
                            RefreshStage::Warning,
                            format!("Pricing task failed: {e}"),
                            percent,
                        ))
                        .await;
                }
            }
        }

        let mut updating = progress(
            RefreshStage::Updating,
            format!("Saving batch {batch_no} of {total_batches}"),
            percent.saturating_add(4),
        );
        updating.current_batch = Some(batch_no);
        updating.total_batches = Some(total_batches);
        let _ = tx.send(updating).await;

        let write_user = user_id.clone();
        let write_result = run_store(&sdk, move |sdk| {
            let mut written = 0i64;
            for (identity, snapshot) in &fetched {
                match write_pricing(sdk.store(), &write_user, identity, snapshot) {
                    Ok(()) => written += 1,
                    Err(e) => {
                        tracing::warn!(identity = %identity, error = %e, "pricing write failed")
                    }
                }
            }
            Ok(written)
        })
        .await;

        match write_result {
            Ok(written) => updated += written,
            Err(e) => {
                let _ = tx
                    .send(progress(
                        RefreshStage::Warning,
                        format!("Could not save batch {batch_no}: {e}"),
                        percent,
                    ))
                    .await;
            }
        }

        if batch_no < total_batches {
            tokio::time::sleep(batch_delay).await;
        }
    }

    let _ = tx
        .send(progress(RefreshStage::Finalizing, "Wrapping up", 95))
        .await;

    let mut done = progress(
        RefreshStage::Complete,
        format!("Updated pricing for {updated} of {total} cards"),
        100,
    );
    done.summary = Some(RefreshSummary {
        updated,
        total,
        skipped: fresh + failed,
    });
    let _ = tx.send(done).await;
}
