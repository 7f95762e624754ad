use serde::{Deserialize, Serialize};

use crate::card::{CardRating, RatingError};

/// Starting rating for cards that have never dueled
pub const DEFAULT_RATING: f64 = 1000.0;

/// Ratings at or above this use the reduced K-factor.
pub const MASTER_RATING: f64 = 2400.0;

/// Cards with fewer games than this are still provisional.
pub const PROVISIONAL_GAMES: u32 = 30;

const K_MASTER: f64 = 16.0;
const K_PROVISIONAL: f64 = 32.0;
const K_ESTABLISHED: f64 = 24.0;

/// Probability-like score `rating` is expected to take against `opponent_rating`.
pub fn expected_score(rating: f64, opponent_rating: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent_rating - rating) / 400.0))
}

/// K-factor of a card, from its own rating and experience only.
pub fn k_factor(rating: f64, games_played: u32) -> f64 {
    if rating >= MASTER_RATING {
        K_MASTER
    } else if games_played < PROVISIONAL_GAMES {
        K_PROVISIONAL
    } else {
        K_ESTABLISHED
    }
}

/// Rating change applied to each side of a duel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DuelDelta {
    pub winner: f64,
    pub loser: f64,
}

/// Both cards after a duel, plus what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct DuelResult {
    pub winner: CardRating,
    pub loser: CardRating,
    pub delta: DuelDelta,
}

/// Deltas for `winner` beating `loser`. Each side is scaled by its own K.
pub fn duel_delta(winner: &CardRating, loser: &CardRating) -> DuelDelta {
    let expected_winner = expected_score(winner.rating, loser.rating);
    let expected_loser = expected_score(loser.rating, winner.rating);
    let k_winner = k_factor(winner.rating, winner.games_played);
    let k_loser = k_factor(loser.rating, loser.games_played);

    DuelDelta {
        winner: k_winner * (1.0 - expected_winner),
        loser: k_loser * (0.0 - expected_loser),
    }
}

/// Apply one duel outcome to both cards.
pub fn rate_duel(winner: &CardRating, loser: &CardRating) -> Result<DuelResult, RatingError> {
    if winner.card_id == loser.card_id {
        return Err(RatingError::SameCard(winner.card_id.clone()));
    }

    let delta = duel_delta(winner, loser);
    Ok(DuelResult {
        winner: winner.record_win(delta.winner)?,
        loser: loser.record_loss(delta.loser)?,
        delta,
    })
}
