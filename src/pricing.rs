// Deterministic pricing from aggregate contract counts

use serde::{Deserialize, Serialize};

use crate::models::Side;

/// Prices and implied probabilities for both sides of a market.
///
/// Price and probability are numerically identical: a contract costs its
/// implied probability in tokens and a winning contract always pays 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub yes_price: u64,
    pub no_price: u64,
    pub yes_prob: u64,
    pub no_prob: u64,
}

/// Quote for the given aggregate counts. Zero volume quotes a uniform
/// 50/50 prior. Recomputed on every read, never cached.
pub fn quote(yes_count: u64, no_count: u64) -> Quote {
    let total = yes_count + no_count;
    if total == 0 {
        return Quote {
            yes_price: 50,
            no_price: 50,
            yes_prob: 50,
            no_prob: 50,
        };
    }

    let yes_prob = ((yes_count as f64 / total as f64) * 100.0).round() as u64;
    let no_prob = 100 - yes_prob;

    Quote {
        yes_price: yes_prob,
        no_price: no_prob,
        yes_prob,
        no_prob,
    }
}

/// Current cost of one contract on the given side
pub fn unit_price(yes_count: u64, no_count: u64, side: Side) -> u64 {
    let q = quote(yes_count, no_count);
    match side {
        Side::Yes => q.yes_price,
        Side::No => q.no_price,
    }
}
