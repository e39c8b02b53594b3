//! Pure pricing helpers: best-price selection, collection valuation,
//! staleness, display formatting.

use chrono::{DateTime, Duration, Utc};

use crate::models::{
    BestPrice, CollectionEntry, CollectionValue, Currency, Finish, PricePoints, PricingSnapshot,
    PricingSummary,
};

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// The finish prices of a snapshot in one currency, in the fixed order
/// nonfoil, foil, etched. Etched prices only exist in USD.
fn finish_prices(prices: &PricePoints, currency: Currency) -> [(Finish, Option<f64>); 3] {
    match currency {
        Currency::Usd => [
            (Finish::Nonfoil, prices.usd),
            (Finish::Foil, prices.usd_foil),
            (Finish::Etched, prices.usd_etched),
        ],
        Currency::Eur => [
            (Finish::Nonfoil, prices.eur),
            (Finish::Foil, prices.eur_foil),
            (Finish::Etched, None),
        ],
        Currency::Tix => [
            (Finish::Nonfoil, prices.tix),
            (Finish::Foil, None),
            (Finish::Etched, None),
        ],
    }
}

/// Pick the price to display for a card.
///
/// With `prefer_foil`, the first available foil or etched price wins;
/// otherwise (or when no foil price exists) the nonfoil price is used,
/// falling back to the first available price of any finish. `None` when the
/// snapshot has no price in this currency at all.
pub fn best_price(
    snapshot: &PricingSnapshot,
    prefer_foil: bool,
    currency: Currency,
) -> Option<BestPrice> {
    let candidates = finish_prices(&snapshot.prices, currency);

    if prefer_foil {
        for (finish, amount) in candidates {
            if finish != Finish::Nonfoil {
                if let Some(amount) = amount {
                    return Some(BestPrice { amount, finish });
                }
            }
        }
    }

    if let (Finish::Nonfoil, Some(amount)) = candidates[0] {
        return Some(BestPrice {
            amount,
            finish: Finish::Nonfoil,
        });
    }

    candidates
        .into_iter()
        .find_map(|(finish, amount)| amount.map(|amount| BestPrice { amount, finish }))
}

/// Market value of a set of entries in one currency.
///
/// Sums best price x quantity over priced entries; entries with no price in
/// the currency are reported as unpriced quantity. Additive over disjoint
/// entry sets and independent of entry order.
pub fn collection_value(entries: &[CollectionEntry], currency: Currency) -> CollectionValue {
    let mut value = CollectionValue {
        currency,
        ..CollectionValue::default()
    };

    for entry in entries {
        if entry.quantity <= 0 {
            continue;
        }
        let best = entry
            .pricing
            .as_ref()
            .and_then(|p| best_price(p, entry.foil, currency));
        match best {
            Some(best) => {
                let line = best.amount * entry.quantity as f64;
                value.total += line;
                match best.finish {
                    Finish::Nonfoil => value.nonfoil_value += line,
                    Finish::Foil | Finish::Etched => value.foil_value += line,
                }
            }
            None => value.unpriced_quantity += entry.quantity,
        }
    }

    value.total = round2(value.total);
    value.nonfoil_value = round2(value.nonfoil_value);
    value.foil_value = round2(value.foil_value);
    value
}

/// Whether a snapshot taken at `last_updated` is older than `max_age_hours`.
/// A missing timestamp is always stale.
pub fn is_stale(last_updated: Option<DateTime<Utc>>, max_age_hours: i64) -> bool {
    match last_updated {
        None => true,
        Some(ts) => Utc::now() - ts > Duration::hours(max_age_hours),
    }
}

/// Display string for an amount in a currency, `None` for a missing amount.
pub fn format_price(amount: Option<f64>, currency: Currency) -> Option<String> {
    let amount = amount?;
    Some(match currency {
        Currency::Usd | Currency::Eur => format!("{}{:.2}", currency.symbol(), amount),
        Currency::Tix => format!("{amount:.2} TIX"),
    })
}

/// All finish prices of a snapshot in one currency plus min/max, for display.
pub fn pricing_summary(snapshot: &PricingSnapshot, currency: Currency) -> PricingSummary {
    let [(_, nonfoil), (_, foil), (_, etched)] = finish_prices(&snapshot.prices, currency);

    let present: Vec<f64> = [nonfoil, foil, etched].into_iter().flatten().collect();
    let min = present.iter().cloned().fold(None, |acc: Option<f64>, x| {
        Some(acc.map_or(x, |a| a.min(x)))
    });
    let max = present.iter().cloned().fold(None, |acc: Option<f64>, x| {
        Some(acc.map_or(x, |a| a.max(x)))
    });

    PricingSummary {
        has_price: !present.is_empty(),
        nonfoil,
        foil,
        etched,
        min,
        max,
    }
}
