//! Collection store: the embedded card collection of one user.
//!
//! Entries are deduplicated by printing identity (multiverse id, else the
//! catalog id); adding a card that is already owned increments its quantity
//! in a single atomic upsert rather than creating a second entry.

use chrono::Utc;
use duckdb::types::Value as SqlValue;
use std::collections::HashMap;

use crate::error::{BinderError, Result};
use crate::models::{
    CardIdentity, CardRecord, CollectionEntry, CollectionFilter, CollectionStats,
    CollectionUpdate, Condition, Ownership, PricingSnapshot,
};
use crate::session::CurrentSession;
use crate::store::{
    row_bool, row_datetime, row_i64, row_json, row_opt_datetime, row_opt_f64, row_opt_json,
    row_opt_str, row_str, Store,
};

const ENTRY_COLUMNS: &str = "identity, card_data, quantity, condition, foil, language, notes, \
     acquired_date, acquired_price, pricing, pricing_updated_at, added_at, updated_at, \
     last_synced_at";

// ---------------------------------------------------------------------------
// CollectionStore
// ---------------------------------------------------------------------------

/// Store actions over the current user's collection.
pub struct CollectionStore<'a> {
    store: &'a Store,
    session: &'a CurrentSession,
}

impl<'a> CollectionStore<'a> {
    pub(crate) fn new(store: &'a Store, session: &'a CurrentSession) -> Self {
        Self { store, session }
    }

    /// Add a printing to the collection.
    ///
    /// If the identity is already owned the existing entry's quantity grows
    /// by the requested amount; otherwise a new entry is appended with the
    /// catalog attributes normalized (image sources, legality backfill) and
    /// ownership defaults filled in. Returns the resulting entry.
    pub fn add_card(&self, card: CardRecord, ownership: Ownership) -> Result<CollectionEntry> {
        let user_id = self.session.user_id()?;

        let mut card = card;
        let identity = card
            .identity()
            .ok_or_else(|| BinderError::Validation("card has no usable identity".into()))?;
        card.normalize();

        let quantity = ownership.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(BinderError::Validation("quantity must be at least 1".into()));
        }

        let now = Utc::now();
        let acquired = ownership.acquired_date.unwrap_or(now);
        let condition = ownership.condition.unwrap_or_default();

        self.store.execute(
            "INSERT INTO collection_entries \
                 (user_id, identity, card_data, quantity, condition, foil, language, notes, \
                  acquired_date, acquired_price, added_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, identity) DO UPDATE SET \
                 quantity = quantity + excluded.quantity, \
                 updated_at = excluded.updated_at",
            &[
                SqlValue::Text(user_id.to_string()),
                SqlValue::Text(identity.key()),
                SqlValue::Text(serde_json::to_string(&card)?),
                SqlValue::BigInt(quantity),
                SqlValue::Text(condition.as_str().to_string()),
                SqlValue::Boolean(ownership.foil.unwrap_or(false)),
                SqlValue::Text(ownership.language.unwrap_or_else(|| "English".to_string())),
                opt_text(ownership.notes),
                SqlValue::Text(acquired.to_rfc3339()),
                opt_double(ownership.acquired_price),
                SqlValue::Text(now.to_rfc3339()),
                SqlValue::Text(now.to_rfc3339()),
            ],
        )?;

        self.get(&identity)
    }

    /// Look up one entry by identity. `NotFound` when the user doesn't own
    /// the printing.
    pub fn get(&self, identity: &CardIdentity) -> Result<CollectionEntry> {
        let user_id = self.session.user_id()?;
        load_entry(self.store, user_id, &identity.key())?
            .ok_or_else(|| BinderError::NotFound(format!("collection entry {identity}")))
    }

    /// Remove an entry wholesale. `NotFound` when no entry matches; the
    /// collection is left untouched in that case.
    pub fn remove_card(&self, identity: &CardIdentity) -> Result<()> {
        let user_id = self.session.user_id()?;
        let removed = self.store.execute(
            "DELETE FROM collection_entries WHERE user_id = ? AND identity = ?",
            &[
                SqlValue::Text(user_id.to_string()),
                SqlValue::Text(identity.key()),
            ],
        )?;
        if removed == 0 {
            return Err(BinderError::NotFound(format!("collection entry {identity}")));
        }
        Ok(())
    }

    /// Apply a field patch to one entry, bumping its `updated_at`.
    pub fn update_card(
        &self,
        identity: &CardIdentity,
        patch: CollectionUpdate,
    ) -> Result<CollectionEntry> {
        let user_id = self.session.user_id()?;

        if let Some(q) = patch.quantity {
            if q < 1 {
                return Err(BinderError::Validation("quantity must be at least 1".into()));
            }
        }

        let mut sets: Vec<&str> = vec!["updated_at = ?"];
        let mut params: Vec<SqlValue> = vec![SqlValue::Text(Utc::now().to_rfc3339())];

        if let Some(q) = patch.quantity {
            sets.push("quantity = ?");
            params.push(SqlValue::BigInt(q));
        }
        if let Some(c) = patch.condition {
            sets.push("condition = ?");
            params.push(SqlValue::Text(c.as_str().to_string()));
        }
        if let Some(f) = patch.foil {
            sets.push("foil = ?");
            params.push(SqlValue::Boolean(f));
        }
        if let Some(l) = patch.language {
            sets.push("language = ?");
            params.push(SqlValue::Text(l));
        }
        if let Some(n) = patch.notes {
            sets.push("notes = ?");
            params.push(SqlValue::Text(n));
        }
        if let Some(d) = patch.acquired_date {
            sets.push("acquired_date = ?");
            params.push(SqlValue::Text(d.to_rfc3339()));
        }
        if let Some(p) = patch.acquired_price {
            sets.push("acquired_price = ?");
            params.push(SqlValue::Double(p));
        }

        params.push(SqlValue::Text(user_id.to_string()));
        params.push(SqlValue::Text(identity.key()));

        let sql = format!(
            "UPDATE collection_entries SET {} WHERE user_id = ? AND identity = ?",
            sets.join(", ")
        );
        let changed = self.store.execute(&sql, &params)?;
        if changed == 0 {
            return Err(BinderError::NotFound(format!("collection entry {identity}")));
        }

        self.get(identity)
    }

    /// List the collection, newest first, optionally filtered by a
    /// case-insensitive substring match against name, rules text and type
    /// line.
    pub fn list(&self, filter: &CollectionFilter) -> Result<Vec<CollectionEntry>> {
        let user_id = self.session.user_id()?;
        let entries = load_entries(self.store, user_id)?;

        let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
        else {
            return Ok(entries);
        };
        let needle = search.to_lowercase();

        Ok(entries
            .into_iter()
            .filter(|e| {
                let card = &e.card;
                card.name.to_lowercase().contains(&needle)
                    || card
                        .text
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&needle))
                    || card.type_line.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// Empty the collection, returning how many entries were removed.
    pub fn clear(&self) -> Result<i64> {
        let user_id = self.session.user_id()?;
        let removed = self.store.execute(
            "DELETE FROM collection_entries WHERE user_id = ?",
            &[SqlValue::Text(user_id.to_string())],
        )?;
        Ok(removed as i64)
    }

    /// Quantity, unique-entry and acquired-value aggregates.
    pub fn stats(&self) -> Result<CollectionStats> {
        let user_id = self.session.user_id()?;
        let rows = self.store.query_rows(
            "SELECT \
                 COALESCE(SUM(quantity), 0) AS total_cards, \
                 COUNT(*) AS unique_cards, \
                 COALESCE(SUM(CASE WHEN acquired_price IS NOT NULL \
                                   THEN acquired_price * quantity ELSE 0 END), 0) AS acquired_value \
             FROM collection_entries WHERE user_id = ?",
            &[SqlValue::Text(user_id.to_string())],
        )?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| BinderError::NotFound("collection stats".into()))?;
        Ok(CollectionStats {
            total_cards: row_i64(&row, "total_cards")?,
            unique_cards: row_i64(&row, "unique_cards")?,
            acquired_value: row_opt_f64(&row, "acquired_value").unwrap_or(0.0),
        })
    }
}

// ---------------------------------------------------------------------------
// Shared loading / persistence (also used by decks and pricing refresh)
// ---------------------------------------------------------------------------

fn opt_text(v: Option<String>) -> SqlValue {
    v.map(SqlValue::Text).unwrap_or(SqlValue::Null)
}

fn opt_double(v: Option<f64>) -> SqlValue {
    v.map(SqlValue::Double).unwrap_or(SqlValue::Null)
}

pub(crate) fn load_entries(store: &Store, user_id: &str) -> Result<Vec<CollectionEntry>> {
    let rows = store.query_rows(
        &format!(
            "SELECT {ENTRY_COLUMNS} FROM collection_entries \
             WHERE user_id = ? ORDER BY seq DESC"
        ),
        &[SqlValue::Text(user_id.to_string())],
    )?;
    rows.iter().map(entry_from_row).collect()
}

pub(crate) fn load_entry(
    store: &Store,
    user_id: &str,
    identity_key: &str,
) -> Result<Option<CollectionEntry>> {
    let rows = store.query_rows(
        &format!(
            "SELECT {ENTRY_COLUMNS} FROM collection_entries \
             WHERE user_id = ? AND identity = ?"
        ),
        &[
            SqlValue::Text(user_id.to_string()),
            SqlValue::Text(identity_key.to_string()),
        ],
    )?;
    rows.first().map(entry_from_row).transpose()
}

/// Write a fresh pricing snapshot onto one entry. `NotFound` when the entry
/// is gone.
pub(crate) fn write_pricing(
    store: &Store,
    user_id: &str,
    identity_key: &str,
    snapshot: &PricingSnapshot,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let changed = store.execute(
        "UPDATE collection_entries SET \
             pricing = ?, pricing_updated_at = ?, last_synced_at = ?, updated_at = ? \
         WHERE user_id = ? AND identity = ?",
        &[
            SqlValue::Text(serde_json::to_string(snapshot)?),
            SqlValue::Text(snapshot.last_updated.to_rfc3339()),
            SqlValue::Text(now.clone()),
            SqlValue::Text(now),
            SqlValue::Text(user_id.to_string()),
            SqlValue::Text(identity_key.to_string()),
        ],
    )?;
    if changed == 0 {
        return Err(BinderError::NotFound(format!(
            "collection entry {identity_key}"
        )));
    }
    Ok(())
}

fn entry_from_row(row: &HashMap<String, serde_json::Value>) -> Result<CollectionEntry> {
    let condition = row_str(row, "condition")?;
    Ok(CollectionEntry {
        identity: row_str(row, "identity")?,
        card: row_json(row, "card_data")?,
        quantity: row_i64(row, "quantity")?,
        condition: Condition::parse(&condition).unwrap_or_default(),
        foil: row_bool(row, "foil")?,
        language: row_str(row, "language")?,
        notes: row_opt_str(row, "notes"),
        acquired_date: row_datetime(row, "acquired_date")?,
        acquired_price: row_opt_f64(row, "acquired_price"),
        pricing: row_opt_json(row, "pricing")?,
        pricing_updated_at: row_opt_datetime(row, "pricing_updated_at"),
        added_at: row_datetime(row, "added_at")?,
        updated_at: row_datetime(row, "updated_at")?,
        last_synced_at: row_opt_datetime(row, "last_synced_at"),
    })
}
