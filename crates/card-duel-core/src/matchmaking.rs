use rand::RngExt;
use thiserror::Error;

use crate::card::CardRating;

/// Opponents are searched within this many rating points first.
pub const RATING_WINDOW: f64 = 200.0;

/// One step of the opponent search. Tiers are tried in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairingTier {
    /// Closest rating within `window` points; ties broken at random.
    NearestInWindow { window: f64 },
    /// Any other card, uniformly at random.
    AnyOther,
}

/// Windowed-nearest first, then unrestricted.
pub const DEFAULT_TIERS: [PairingTier; 2] = [
    PairingTier::NearestInWindow {
        window: RATING_WINDOW,
    },
    PairingTier::AnyOther,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("need at least two cards to build a pair, found {available}")]
pub struct NotEnoughData {
    pub available: usize,
}

/// Indices into the rating pool, plus the tier that produced `second`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pairing {
    pub first: usize,
    pub second: usize,
    pub tier: PairingTier,
}

/// Pick a pair from `pool` using [`DEFAULT_TIERS`].
pub fn select_pair<R: RngExt + ?Sized>(
    pool: &[CardRating],
    rng: &mut R,
) -> Result<Pairing, NotEnoughData> {
    select_pair_with(pool, &DEFAULT_TIERS, rng)
}

/// Pick the first card uniformly, then an opponent through `tiers`.
pub fn select_pair_with<R: RngExt + ?Sized>(
    pool: &[CardRating],
    tiers: &[PairingTier],
    rng: &mut R,
) -> Result<Pairing, NotEnoughData> {
    if pool.len() < 2 {
        return Err(NotEnoughData {
            available: pool.len(),
        });
    }

    let first = rng.random_range(0..pool.len());
    pick_opponent(pool, first, tiers, rng)
}

/// Find an opponent for `pool[first]`. Falls back to [`PairingTier::AnyOther`]
/// when none of `tiers` yields a candidate.
pub fn pick_opponent<R: RngExt + ?Sized>(
    pool: &[CardRating],
    first: usize,
    tiers: &[PairingTier],
    rng: &mut R,
) -> Result<Pairing, NotEnoughData> {
    let not_enough = NotEnoughData {
        available: pool.len(),
    };
    let Some(anchor) = pool.get(first) else {
        return Err(not_enough);
    };

    for tier in tiers.iter().chain(std::iter::once(&PairingTier::AnyOther)) {
        let candidates = tier.candidates(pool, first, anchor);
        if candidates.is_empty() {
            continue;
        }
        let second = candidates[rng.random_range(0..candidates.len())];
        return Ok(Pairing {
            first,
            second,
            tier: *tier,
        });
    }

    // Every card shares the anchor's id.
    Err(not_enough)
}

impl PairingTier {
    /// Indices of equally good opponents for `anchor` under this tier.
    fn candidates(&self, pool: &[CardRating], first: usize, anchor: &CardRating) -> Vec<usize> {
        let others = pool
            .iter()
            .enumerate()
            .filter(|(i, c)| *i != first && c.card_id != anchor.card_id);

        match *self {
            PairingTier::AnyOther => others.map(|(i, _)| i).collect(),
            PairingTier::NearestInWindow { window } => {
                let mut best = Vec::new();
                let mut best_distance = f64::INFINITY;
                for (i, card) in others {
                    let distance = (card.rating - anchor.rating).abs();
                    // NaN distances fail both comparisons and are skipped.
                    if !(distance <= window) {
                        continue;
                    }
                    if distance < best_distance {
                        best_distance = distance;
                        best.clear();
                        best.push(i);
                    } else if distance == best_distance {
                        best.push(i);
                    }
                }
                best
            }
        }
    }
}
