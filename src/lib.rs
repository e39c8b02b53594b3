//! Personal Magic: The Gathering collection SDK.
//!
//! Tracks a card collection with quantities and conditions, builds decks
//! over it, and values it against market pricing. Data lives in a local
//! DuckDB database; card data and pricing come from external APIs behind
//! rate-limited request queues.
//!
//! # Quick start
//!
//! ```no_run
//! use binder_sdk::models::{CollectionFilter, Ownership};
//! use binder_sdk::{BinderSdk, CatalogClient, CurrentSession};
//!
//! # async fn example() -> binder_sdk::Result<()> {
//! let sdk = BinderSdk::builder().build()?;
//! let user = sdk.register_user("mage@example.com", "Mage")?;
//! let session = CurrentSession::authenticated(user.id.clone());
//!
//! // Look a card up in the catalog and add a playset to the collection.
//! let catalog = CatalogClient::new()?;
//! let card = catalog
//!     .search_by_name("Lightning Bolt", true)
//!     .await?
//!     .into_iter()
//!     .next()
//!     .expect("card not found");
//! sdk.collection(&session).add_card(
//!     card,
//!     Ownership {
//!         quantity: Some(4),
//!         ..Ownership::default()
//!     },
//! )?;
//!
//! let entries = sdk.collection(&session).list(&CollectionFilter::default())?;
//! println!("{} entries", entries.len());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod collection;
pub mod config;
pub mod decks;
pub mod error;
pub mod models;
pub mod outcome;
pub mod pricing;
pub mod queue;
pub mod scan;
pub mod session;
pub mod store;

pub use catalog::CatalogClient;
pub use collection::CollectionStore;
pub use decks::DeckStore;
pub use error::{BinderError, Result};
pub use outcome::ActionOutcome;
pub use pricing::{PriceSource, PricingService, RefreshRun, ScryfallClient};
pub use queue::RequestQueue;
pub use session::CurrentSession;
pub use store::Store;

use duckdb::types::Value as SqlValue;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use models::User;

// ---------------------------------------------------------------------------
// BinderSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`BinderSdk`] instance.
///
/// Use [`BinderSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](BinderSdkBuilder::build) to create the SDK.
#[derive(Default)]
pub struct BinderSdkBuilder {
    data_dir: Option<PathBuf>,
    in_memory: bool,
}

impl BinderSdkBuilder {
    /// Set a custom data directory.
    ///
    /// If not set, the platform-appropriate default data directory is used
    /// (e.g. `~/.local/share/binder-sdk` on Linux).
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep everything in memory. Nothing survives the process; used by
    /// tests and throwaway tooling.
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    /// Build the SDK, opening the database and creating the schema.
    pub fn build(self) -> Result<BinderSdk> {
        let store = if self.in_memory {
            Store::open_in_memory()?
        } else {
            Store::open(self.data_dir.unwrap_or_else(config::default_data_dir))?
        };
        Ok(BinderSdk { store })
    }
}

// ---------------------------------------------------------------------------
// BinderSdk
// ---------------------------------------------------------------------------

/// The main entry point: owns the store and hands out session-scoped store
/// accessors as lightweight borrowing wrappers.
///
/// Created via [`BinderSdk::builder()`]. For async pricing work, move the
/// SDK into a shared handle with [`into_shared()`](Self::into_shared) and
/// construct a [`PricingService`] over it.
pub struct BinderSdk {
    store: Store,
}

impl BinderSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> BinderSdkBuilder {
        BinderSdkBuilder::default()
    }

    // -- Store accessors ---------------------------------------------------

    /// Access the collection store for the session's user.
    pub fn collection<'a>(&'a self, session: &'a CurrentSession) -> CollectionStore<'a> {
        CollectionStore::new(&self.store, session)
    }

    /// Access the deck store for the session's user.
    pub fn decks<'a>(&'a self, session: &'a CurrentSession) -> DeckStore<'a> {
        DeckStore::new(&self.store, session)
    }

    // -- Users -------------------------------------------------------------

    /// Create the root user document, as done at registration or first
    /// external sign-in.
    pub fn register_user(&self, email: &str, name: &str) -> Result<User> {
        self.store.register_user(email, name)
    }

    /// Look up a user document by id.
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.store.get_user(user_id)
    }

    // -- Utility -----------------------------------------------------------

    /// Execute a raw SQL query against the database.
    ///
    /// Escape-hatch access for queries not covered by the store interfaces.
    /// `?` placeholders bind the given parameters in order.
    pub fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let values: Vec<SqlValue> = params.iter().map(|p| SqlValue::Text(p.clone())).collect();
        self.store.query_rows(query, &values)
    }

    /// Move the SDK into a shared handle for async use (see
    /// [`PricingService`]).
    pub fn into_shared(self) -> Arc<Mutex<BinderSdk>> {
        Arc::new(Mutex::new(self))
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for BinderSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let users = self.store.user_count().unwrap_or(0);
        match self.store.data_dir() {
            Some(dir) => write!(f, "BinderSdk(data_dir={}, users={})", dir.display(), users),
            None => write!(f, "BinderSdk(in-memory, users={})", users),
        }
    }
}
