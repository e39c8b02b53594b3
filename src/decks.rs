//! Deck store: named builds over the user's collection.
//!
//! Deck cards reference collection entries by identity and are joined
//! against the collection when a deck is read; a reference whose entry is
//! gone simply drops out of the populated view. Basic lands are the one
//! exception -- they carry their own embedded card data and never touch the
//! collection.

use chrono::Utc;
use duckdb::types::Value as SqlValue;
use std::collections::HashMap;
use uuid::Uuid;

use crate::collection::load_entries;
use crate::error::{BinderError, Result};
use crate::models::{
    BasicLandRequest, CardIdentity, CardRecord, CoverCard, CurveBucket, Deck, DeckAnalytics,
    DeckCard, DeckCardView, DeckCategory, DeckFields, DeckFormat, DeckUpdate, DeckView, ManaCurve,
};
use crate::session::CurrentSession;
use crate::store::{
    row_bool, row_datetime, row_i64, row_opt_datetime, row_opt_i64, row_opt_json, row_opt_str,
    row_str, Store,
};

/// First-matching-type-wins order for the type distribution.
const TYPE_ORDER: &[&str] = &[
    "creature",
    "instant",
    "sorcery",
    "artifact",
    "enchantment",
    "planeswalker",
    "land",
];

// ---------------------------------------------------------------------------
// DeckStore
// ---------------------------------------------------------------------------

/// Store actions over the current user's decks.
pub struct DeckStore<'a> {
    store: &'a Store,
    session: &'a CurrentSession,
}

impl<'a> DeckStore<'a> {
    pub(crate) fn new(store: &'a Store, session: &'a CurrentSession) -> Self {
        Self { store, session }
    }

    // -- Deck CRUD ---------------------------------------------------------

    /// Create a deck. Only the name is required.
    pub fn create_deck(&self, fields: DeckFields) -> Result<Deck> {
        let user_id = self.session.user_id()?;

        let name = fields.name.trim().to_string();
        if name.is_empty() {
            return Err(BinderError::Validation("deck name is required".into()));
        }

        let now = Utc::now();
        let deck = Deck {
            id: Uuid::new_v4().to_string(),
            name,
            description: fields.description.unwrap_or_default(),
            format: fields.format.unwrap_or_default(),
            is_public: fields.is_public.unwrap_or(false),
            cover_card: None,
            created_at: now,
            updated_at: now,
            last_played_at: None,
        };

        self.store.execute(
            "INSERT INTO decks \
                 (id, user_id, name, description, format, is_public, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            &[
                SqlValue::Text(deck.id.clone()),
                SqlValue::Text(user_id.to_string()),
                SqlValue::Text(deck.name.clone()),
                SqlValue::Text(deck.description.clone()),
                SqlValue::Text(deck.format.as_str().to_string()),
                SqlValue::Boolean(deck.is_public),
                SqlValue::Text(now.to_rfc3339()),
                SqlValue::Text(now.to_rfc3339()),
            ],
        )?;
        Ok(deck)
    }

    /// All of the user's decks in creation order.
    pub fn list_decks(&self) -> Result<Vec<Deck>> {
        let user_id = self.session.user_id()?;
        let rows = self.store.query_rows(
            "SELECT id, name, description, format, is_public, cover_card, \
                    created_at, updated_at, last_played_at \
             FROM decks WHERE user_id = ? ORDER BY created_at",
            &[SqlValue::Text(user_id.to_string())],
        )?;
        rows.iter().map(deck_from_row).collect()
    }

    /// One deck with its cards resolved against the collection.
    pub fn get_deck(&self, deck_id: &str) -> Result<DeckView> {
        let user_id = self.session.user_id()?;
        let deck = self.require_deck(user_id, deck_id)?;
        let cards = self.populated_cards(user_id, deck_id)?;
        Ok(DeckView { deck, cards })
    }

    /// Patch deck metadata, bumping `updated_at`.
    pub fn update_deck(&self, deck_id: &str, patch: DeckUpdate) -> Result<Deck> {
        let user_id = self.session.user_id()?;

        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(BinderError::Validation("deck name is required".into()));
            }
        }

        let mut sets: Vec<&str> = vec!["updated_at = ?"];
        let mut params: Vec<SqlValue> = vec![SqlValue::Text(Utc::now().to_rfc3339())];

        if let Some(name) = patch.name {
            sets.push("name = ?");
            params.push(SqlValue::Text(name.trim().to_string()));
        }
        if let Some(description) = patch.description {
            sets.push("description = ?");
            params.push(SqlValue::Text(description));
        }
        if let Some(format) = patch.format {
            sets.push("format = ?");
            params.push(SqlValue::Text(format.as_str().to_string()));
        }
        if let Some(is_public) = patch.is_public {
            sets.push("is_public = ?");
            params.push(SqlValue::Boolean(is_public));
        }
        if let Some(played) = patch.last_played_at {
            sets.push("last_played_at = ?");
            params.push(SqlValue::Text(played.to_rfc3339()));
        }

        params.push(SqlValue::Text(deck_id.to_string()));
        params.push(SqlValue::Text(user_id.to_string()));

        let sql = format!(
            "UPDATE decks SET {} WHERE id = ? AND user_id = ?",
            sets.join(", ")
        );
        let changed = self.store.execute(&sql, &params)?;
        if changed == 0 {
            return Err(BinderError::NotFound(format!("deck {deck_id}")));
        }
        self.require_deck(user_id, deck_id)
    }

    /// Delete a deck and its cards.
    pub fn delete_deck(&self, deck_id: &str) -> Result<()> {
        let user_id = self.session.user_id()?;
        let removed = self.store.execute(
            "DELETE FROM decks WHERE id = ? AND user_id = ?",
            &[
                SqlValue::Text(deck_id.to_string()),
                SqlValue::Text(user_id.to_string()),
            ],
        )?;
        if removed == 0 {
            return Err(BinderError::NotFound(format!("deck {deck_id}")));
        }
        self.store.execute(
            "DELETE FROM deck_cards WHERE deck_id = ?",
            &[SqlValue::Text(deck_id.to_string())],
        )?;
        Ok(())
    }

    // -- Card membership ---------------------------------------------------

    /// Add a quantity of an owned card to a deck board.
    ///
    /// The card must exist in the user's collection. An existing deck card
    /// with the same identity and board grows by the requested amount.
    pub fn add_card(
        &self,
        deck_id: &str,
        identity: &CardIdentity,
        quantity: i64,
        category: DeckCategory,
    ) -> Result<()> {
        let user_id = self.session.user_id()?;
        if quantity < 1 {
            return Err(BinderError::Validation("quantity must be at least 1".into()));
        }
        self.require_deck(user_id, deck_id)?;

        let entry = crate::collection::load_entry(self.store, user_id, &identity.key())?
            .ok_or_else(|| BinderError::NotInCollection(identity.key()))?;

        self.store.execute(
            "INSERT INTO deck_cards \
                 (deck_id, identity, category, multiverse_id, card_id, quantity, is_basic_land) \
             VALUES (?, ?, ?, ?, ?, ?, false) \
             ON CONFLICT (deck_id, identity, category) DO UPDATE SET \
                 quantity = quantity + excluded.quantity",
            &[
                SqlValue::Text(deck_id.to_string()),
                SqlValue::Text(identity.key()),
                SqlValue::Text(category.as_str().to_string()),
                entry
                    .card
                    .multiverseid
                    .map(SqlValue::BigInt)
                    .unwrap_or(SqlValue::Null),
                entry
                    .card
                    .id
                    .clone()
                    .map(SqlValue::Text)
                    .unwrap_or(SqlValue::Null),
                SqlValue::BigInt(quantity),
            ],
        )?;

        self.touch_deck(deck_id)
    }

    /// Remove a card from a deck board.
    ///
    /// With `quantity: None` the deck card is removed entirely; otherwise its
    /// quantity is decremented and the card is pruned once it reaches zero.
    pub fn remove_card(
        &self,
        deck_id: &str,
        identity_key: &str,
        quantity: Option<i64>,
        category: DeckCategory,
    ) -> Result<()> {
        let user_id = self.session.user_id()?;
        self.require_deck(user_id, deck_id)?;

        let matched = match quantity {
            None => self.store.execute(
                "DELETE FROM deck_cards WHERE deck_id = ? AND identity = ? AND category = ?",
                &[
                    SqlValue::Text(deck_id.to_string()),
                    SqlValue::Text(identity_key.to_string()),
                    SqlValue::Text(category.as_str().to_string()),
                ],
            )?,
            Some(n) => {
                let changed = self.store.execute(
                    "UPDATE deck_cards SET quantity = quantity - ? \
                     WHERE deck_id = ? AND identity = ? AND category = ?",
                    &[
                        SqlValue::BigInt(n),
                        SqlValue::Text(deck_id.to_string()),
                        SqlValue::Text(identity_key.to_string()),
                        SqlValue::Text(category.as_str().to_string()),
                    ],
                )?;
                self.store.execute(
                    "DELETE FROM deck_cards \
                     WHERE deck_id = ? AND identity = ? AND category = ? AND quantity <= 0",
                    &[
                        SqlValue::Text(deck_id.to_string()),
                        SqlValue::Text(identity_key.to_string()),
                        SqlValue::Text(category.as_str().to_string()),
                    ],
                )?;
                changed
            }
        };

        if matched == 0 {
            return Err(BinderError::NotFound(format!("deck card {identity_key}")));
        }
        self.touch_deck(deck_id)
    }

    /// Bulk-add basic lands to the mainboard.
    ///
    /// Lands are synthesized with embedded card data (they have no
    /// collection backing) under the identity `basic-<landname>`; repeats
    /// merge by quantity. Unknown land names are skipped with a warning --
    /// the rest of the batch still applies. Returns how many requests were
    /// applied.
    pub fn add_basic_lands(&self, deck_id: &str, requests: &[BasicLandRequest]) -> Result<usize> {
        let user_id = self.session.user_id()?;
        self.require_deck(user_id, deck_id)?;

        let mut applied = 0;
        for request in requests {
            let Some(card) = basic_land_template(&request.land_name) else {
                tracing::warn!(land = %request.land_name, "skipping unknown basic land");
                continue;
            };
            if request.quantity < 1 {
                tracing::warn!(land = %request.land_name, "skipping non-positive quantity");
                continue;
            }

            let identity = format!("basic-{}", card.name.to_lowercase());
            self.store.execute(
                "INSERT INTO deck_cards \
                     (deck_id, identity, category, quantity, is_basic_land, card_data) \
                 VALUES (?, ?, ?, ?, true, ?) \
                 ON CONFLICT (deck_id, identity, category) DO UPDATE SET \
                     quantity = quantity + excluded.quantity",
                &[
                    SqlValue::Text(deck_id.to_string()),
                    SqlValue::Text(identity),
                    SqlValue::Text(DeckCategory::Mainboard.as_str().to_string()),
                    SqlValue::BigInt(request.quantity),
                    SqlValue::Text(serde_json::to_string(&card)?),
                ],
            )?;
            applied += 1;
        }

        if applied > 0 {
            self.touch_deck(deck_id)?;
        }
        Ok(applied)
    }

    /// Store a display snapshot on the deck. Membership is not validated.
    pub fn set_cover_card(&self, deck_id: &str, cover: CoverCard) -> Result<()> {
        let user_id = self.session.user_id()?;
        let changed = self.store.execute(
            "UPDATE decks SET cover_card = ?, updated_at = ? WHERE id = ? AND user_id = ?",
            &[
                SqlValue::Text(serde_json::to_string(&cover)?),
                SqlValue::Text(Utc::now().to_rfc3339()),
                SqlValue::Text(deck_id.to_string()),
                SqlValue::Text(user_id.to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(BinderError::NotFound(format!("deck {deck_id}")));
        }
        Ok(())
    }

    // -- Analytics ---------------------------------------------------------

    /// Mainboard aggregations: counts, mana curve, color and type
    /// distributions, average cmc.
    pub fn analytics(&self, deck_id: &str) -> Result<DeckAnalytics> {
        let user_id = self.session.user_id()?;
        self.require_deck(user_id, deck_id)?;

        let cards: Vec<DeckCardView> = self
            .populated_cards(user_id, deck_id)?
            .into_iter()
            .filter(|c| c.deck_card.category == DeckCategory::Mainboard)
            .collect();

        let total_cards: i64 = cards.iter().map(|c| c.deck_card.quantity).sum();
        let unique_cards = cards.len() as i64;

        // Mana curve: non-basic-land cards, cmc 0..=9 exact, 10+ pooled.
        let mut curve = [0i64; 11];
        for card in cards.iter().filter(|c| !c.deck_card.is_basic_land) {
            let bucket = (card.card.cmc.max(0.0) as usize).min(10);
            curve[bucket] += card.deck_card.quantity;
        }
        let mana_curve = ManaCurve {
            buckets: curve
                .iter()
                .enumerate()
                .map(|(i, &count)| CurveBucket {
                    label: if i < 10 { i.to_string() } else { "10+".to_string() },
                    count,
                })
                .collect(),
        };

        // Color distribution: +1 per listed color per copy, C for colorless.
        // Basic lands excluded.
        let mut colors: HashMap<String, i64> =
            ["W", "U", "B", "R", "G", "C"]
                .iter()
                .map(|c| (c.to_string(), 0))
                .collect();
        for card in cards.iter().filter(|c| !c.deck_card.is_basic_land) {
            let letters: Vec<&str> = card
                .card
                .colors
                .iter()
                .filter_map(|c| color_letter(c))
                .collect();
            if letters.is_empty() {
                *colors.entry("C".to_string()).or_default() += card.deck_card.quantity;
            } else {
                for letter in letters {
                    *colors.entry(letter.to_string()).or_default() += card.deck_card.quantity;
                }
            }
        }
        let color_total: i64 = colors.values().sum();
        let color_percentages: HashMap<String, f64> = colors
            .iter()
            .map(|(k, &v)| {
                let pct = if color_total > 0 {
                    v as f64 / color_total as f64 * 100.0
                } else {
                    0.0
                };
                (k.clone(), pct)
            })
            .collect();

        // Type distribution: first matching type wins; basic lands count
        // here (under "land").
        let mut types: HashMap<String, i64> = HashMap::new();
        for card in &cards {
            let type_line = card.card.type_line.to_lowercase();
            let bucket = TYPE_ORDER
                .iter()
                .find(|t| type_line.contains(**t))
                .copied()
                .unwrap_or("other");
            *types.entry(bucket.to_string()).or_default() += card.deck_card.quantity;
        }

        // Average cmc over non-basic-land cards, quantity-weighted.
        let (cmc_sum, cmc_quantity) = cards
            .iter()
            .filter(|c| !c.deck_card.is_basic_land)
            .fold((0.0, 0i64), |(sum, qty), c| {
                (
                    sum + c.card.cmc * c.deck_card.quantity as f64,
                    qty + c.deck_card.quantity,
                )
            });
        let average_cmc = if cmc_quantity > 0 {
            ((cmc_sum / cmc_quantity as f64) * 100.0).round() / 100.0
        } else {
            0.0
        };

        Ok(DeckAnalytics {
            total_cards,
            unique_cards,
            mana_curve,
            color_distribution: colors,
            color_percentages,
            type_distribution: types,
            average_cmc,
        })
    }

    // -- Internals ---------------------------------------------------------

    fn require_deck(&self, user_id: &str, deck_id: &str) -> Result<Deck> {
        let rows = self.store.query_rows(
            "SELECT id, name, description, format, is_public, cover_card, \
                    created_at, updated_at, last_played_at \
             FROM decks WHERE id = ? AND user_id = ?",
            &[
                SqlValue::Text(deck_id.to_string()),
                SqlValue::Text(user_id.to_string()),
            ],
        )?;
        rows.first()
            .map(deck_from_row)
            .transpose()?
            .ok_or_else(|| BinderError::NotFound(format!("deck {deck_id}")))
    }

    fn touch_deck(&self, deck_id: &str) -> Result<()> {
        self.store.execute(
            "UPDATE decks SET updated_at = ? WHERE id = ?",
            &[
                SqlValue::Text(Utc::now().to_rfc3339()),
                SqlValue::Text(deck_id.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Deck cards joined against the collection. Basic lands resolve from
    /// their embedded data; other cards resolve from the collection and are
    /// dropped (not deleted) when the entry is gone.
    fn populated_cards(&self, user_id: &str, deck_id: &str) -> Result<Vec<DeckCardView>> {
        let rows = self.store.query_rows(
            "SELECT identity, category, multiverse_id, card_id, quantity, is_basic_land, \
                    card_data \
             FROM deck_cards WHERE deck_id = ? ORDER BY seq",
            &[SqlValue::Text(deck_id.to_string())],
        )?;

        let collection: HashMap<String, CardRecord> = load_entries(self.store, user_id)?
            .into_iter()
            .map(|e| (e.identity.clone(), e.card))
            .collect();

        let mut views = Vec::new();
        for row in &rows {
            let deck_card = deck_card_from_row(row)?;
            let card = if deck_card.is_basic_land {
                deck_card.card_data.clone()
            } else {
                collection.get(&deck_card.collection_card_id).cloned()
            };
            if let Some(card) = card {
                views.push(DeckCardView { deck_card, card });
            }
        }
        Ok(views)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn deck_from_row(row: &HashMap<String, serde_json::Value>) -> Result<Deck> {
    let format = row_str(row, "format")?;
    Ok(Deck {
        id: row_str(row, "id")?,
        name: row_str(row, "name")?,
        description: row_str(row, "description")?,
        format: DeckFormat::parse(&format).unwrap_or_default(),
        is_public: row_bool(row, "is_public")?,
        cover_card: row_opt_json(row, "cover_card")?,
        created_at: row_datetime(row, "created_at")?,
        updated_at: row_datetime(row, "updated_at")?,
        last_played_at: row_opt_datetime(row, "last_played_at"),
    })
}

fn deck_card_from_row(row: &HashMap<String, serde_json::Value>) -> Result<DeckCard> {
    let category = row_str(row, "category")?;
    Ok(DeckCard {
        collection_card_id: row_str(row, "identity")?,
        multiverseid: row_opt_i64(row, "multiverse_id"),
        card_id: row_opt_str(row, "card_id"),
        quantity: row_i64(row, "quantity")?,
        category: DeckCategory::parse(&category).unwrap_or_default(),
        is_basic_land: row_bool(row, "is_basic_land")?,
        card_data: row_opt_json(row, "card_data")?,
    })
}

// ---------------------------------------------------------------------------
// Basic lands
// ---------------------------------------------------------------------------

fn color_letter(color: &str) -> Option<&'static str> {
    match color {
        "W" | "White" | "white" => Some("W"),
        "U" | "Blue" | "blue" => Some("U"),
        "B" | "Black" | "black" => Some("B"),
        "R" | "Red" | "red" => Some("R"),
        "G" | "Green" | "green" => Some("G"),
        _ => None,
    }
}

/// Embedded card data for one of the five basic lands, or `None` for
/// anything else.
fn basic_land_template(land_name: &str) -> Option<CardRecord> {
    let (name, letter) = match land_name.trim().to_lowercase().as_str() {
        "plains" => ("Plains", "W"),
        "island" => ("Island", "U"),
        "swamp" => ("Swamp", "B"),
        "mountain" => ("Mountain", "R"),
        "forest" => ("Forest", "G"),
        _ => return None,
    };

    Some(CardRecord {
        name: name.to_string(),
        id: None,
        multiverseid: None,
        type_line: format!("Basic Land \u{2014} {name}"),
        types: vec!["Land".to_string()],
        subtypes: vec![name.to_string()],
        supertypes: vec!["Basic".to_string()],
        mana_cost: None,
        cmc: 0.0,
        colors: Vec::new(),
        color_identity: vec![letter.to_string()],
        rarity: Some("Common".to_string()),
        set: None,
        set_name: None,
        text: Some(format!("{{T}}: Add {{{letter}}}.")),
        power: None,
        toughness: None,
        loyalty: None,
        artist: None,
        number: None,
        image_url: None,
        foreign_names: Vec::new(),
        legalities: Vec::new(),
        image_sources: Vec::new(),
    })
}
