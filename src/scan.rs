//! Card-name extraction from scanned card images.
//!
//! The OCR engine itself is external; it hands back a raw text blob plus a
//! confidence score. This module's job is picking the card name out of that
//! blob: OCR output for a card photo is the title line buried among mana
//! costs, type lines, rules text and collector numbers.

use crate::error::Result;

/// Raw OCR output for one image.
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
    /// 0..=1.
    pub confidence: f64,
}

/// The external OCR engine contract: image bytes in, text blob out.
pub trait OcrEngine {
    fn recognize(&self, image: &[u8]) -> Result<OcrResult>;
}

/// A card-name candidate extracted from a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanCandidate {
    pub name: String,
    pub confidence: f64,
}

/// Run OCR on an image and extract the most likely card name.
pub fn scan_card_name<E: OcrEngine>(engine: &E, image: &[u8]) -> Result<Option<ScanCandidate>> {
    let ocr = engine.recognize(image)?;
    Ok(extract_card_name(&ocr.text).map(|name| ScanCandidate {
        name,
        confidence: ocr.confidence,
    }))
}

/// Line prefixes that identify type lines and rules text rather than names.
const SKIP_PREFIXES: &[&str] = &[
    "basic land",
    "legendary",
    "creature",
    "instant",
    "sorcery",
    "artifact",
    "enchantment",
    "planeswalker",
    "land",
    "token",
    "flying",
    "trample",
    "haste",
    "vigilance",
    "first strike",
    "deathtouch",
    "lifelink",
    "hexproof",
    "defender",
    "reach",
    "flash",
    "menace",
    "when ",
    "whenever ",
    "at the beginning",
    "{t}:",
    "tap:",
];

/// Pick the first line of an OCR blob that looks like a card name.
///
/// Skips lines that look like mana costs, pure numbers, power/toughness
/// pairs, or known type-line/rules-text prefixes. The winner must contain a
/// letter and be at least 3 characters long.
pub fn extract_card_name(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_mana_cost(line))
        .filter(|line| !is_pure_number(line))
        .filter(|line| !is_power_toughness(line))
        .filter(|line| {
            let lower = line.to_lowercase();
            !SKIP_PREFIXES.iter().any(|p| lower.starts_with(p))
        })
        .find(|line| line.len() >= 3 && line.chars().any(|c| c.is_alphabetic()))
        .map(|line| line.to_string())
}

/// A line made purely of mana symbols, e.g. `2WW` or `{2}{W}{W}`.
fn is_mana_cost(line: &str) -> bool {
    let stripped: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    !stripped.is_empty()
        && stripped
            .chars()
            .all(|c| matches!(c, 'W' | 'U' | 'B' | 'R' | 'G' | 'X' | 'C' | '{' | '}' | '/')
                || c.is_ascii_digit())
}

fn is_pure_number(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

/// A power/toughness pair like `3/3`, `*/4` or `1+*/2`.
fn is_power_toughness(line: &str) -> bool {
    let Some((power, toughness)) = line.split_once('/') else {
        return false;
    };
    let half_ok = |half: &str| {
        !half.is_empty()
            && half
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '*' | '+' | '-'))
    };
    half_ok(power.trim()) && half_ok(toughness.trim())
}
