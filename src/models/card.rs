use serde::{Deserialize, Serialize};

/// Formats the catalog is expected to report on. Anything the source omits
/// is backfilled as "Not Legal" so downstream consumers never see a gap.
pub const KNOWN_FORMATS: &[&str] = &[
    "standard",
    "pioneer",
    "modern",
    "legacy",
    "vintage",
    "commander",
    "pauper",
    "historic",
];

// ---------------------------------------------------------------------------
// CardIdentity — the dedup key for a printing within one user's collection
// ---------------------------------------------------------------------------

/// Identity of one printing: the multiverse id when the catalog assigned one,
/// else the catalog's own string id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CardIdentity {
    Multiverse(i64),
    External(String),
}

impl CardIdentity {
    /// Build an identity from the optional id pair, multiverse id preferred.
    pub fn from_parts(multiverse_id: Option<i64>, card_id: Option<&str>) -> Option<Self> {
        match (multiverse_id, card_id) {
            (Some(m), _) => Some(CardIdentity::Multiverse(m)),
            (None, Some(id)) if !id.is_empty() => Some(CardIdentity::External(id.to_string())),
            _ => None,
        }
    }

    /// The storage key: decimal form of the multiverse id, or the raw
    /// external id.
    pub fn key(&self) -> String {
        match self {
            CardIdentity::Multiverse(m) => m.to_string(),
            CardIdentity::External(id) => id.clone(),
        }
    }

    pub fn multiverse_id(&self) -> Option<i64> {
        match self {
            CardIdentity::Multiverse(m) => Some(*m),
            CardIdentity::External(_) => None,
        }
    }

    pub fn external_id(&self) -> Option<&str> {
        match self {
            CardIdentity::Multiverse(_) => None,
            CardIdentity::External(id) => Some(id),
        }
    }
}

impl std::fmt::Display for CardIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

// ---------------------------------------------------------------------------
// Sub-objects
// ---------------------------------------------------------------------------

/// A localized printing name as reported by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignName {
    pub name: String,
    pub language: String,
    #[serde(default)]
    pub multiverseid: Option<i64>,
}

/// Legality of the card in one format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatLegality {
    pub format: String,
    pub legality: String,
}

// ---------------------------------------------------------------------------
// CardRecord — catalog attributes of one printing
// ---------------------------------------------------------------------------

/// Catalog attributes of one printing, as returned by the card catalog
/// source and embedded into collection entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub multiverseid: Option<i64>,
    #[serde(rename = "type", default)]
    pub type_line: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub subtypes: Vec<String>,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub cmc: f64,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub color_identity: Vec<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub set: Option<String>,
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub power: Option<String>,
    #[serde(default)]
    pub toughness: Option<String>,
    #[serde(default)]
    pub loyalty: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub foreign_names: Vec<ForeignName>,
    #[serde(default)]
    pub legalities: Vec<FormatLegality>,
    /// Ordered display candidates, first is preferred. Populated by
    /// [`normalize`](CardRecord::normalize).
    #[serde(default)]
    pub image_sources: Vec<String>,
}

impl CardRecord {
    /// The dedup identity of this printing, if the catalog gave it any id.
    pub fn identity(&self) -> Option<CardIdentity> {
        CardIdentity::from_parts(self.multiverseid, self.id.as_deref())
    }

    /// Backfill the record so no downstream consumer sees missing data:
    /// the image-source list is rebuilt in priority order and every known
    /// format gets an explicit legality.
    pub fn normalize(&mut self) {
        self.image_sources = self.candidate_image_sources();
        self.backfill_legalities();
    }

    /// Ordered, deduplicated image candidates: the catalog's own URL first,
    /// then a multiverse-id Gatherer fallback, then a set + collector-number
    /// Scryfall fallback.
    fn candidate_image_sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        let mut push = |url: String| {
            if !url.is_empty() && !sources.contains(&url) {
                sources.push(url);
            }
        };

        if let Some(url) = &self.image_url {
            push(url.clone());
        }
        if let Some(m) = self.multiverseid {
            push(format!(
                "https://gatherer.wizards.com/Handlers/Image.ashx?multiverseid={m}&type=card"
            ));
        }
        if let (Some(set), Some(number)) = (&self.set, &self.number) {
            push(format!(
                "https://api.scryfall.com/cards/{}/{}?format=image",
                set.to_lowercase(),
                number
            ));
        }
        sources
    }

    fn backfill_legalities(&mut self) {
        for format in KNOWN_FORMATS {
            let present = self
                .legalities
                .iter()
                .any(|l| l.format.eq_ignore_ascii_case(format));
            if !present {
                self.legalities.push(FormatLegality {
                    format: format.to_string(),
                    legality: "Not Legal".to_string(),
                });
            }
        }
    }
}
