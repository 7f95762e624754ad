use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::elo::DEFAULT_RATING;

/// Rating state of a single card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRating {
    pub card_id: String,
    pub rating: f64,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingError {
    #[error("a card cannot duel itself ({0})")]
    SameCard(String),
    #[error("rating of card {0} would become non-finite")]
    NonFinite(String),
    #[error("game counters of card {0} overflowed")]
    CounterOverflow(String),
}

impl CardRating {
    /// A fresh card: default rating, no games.
    pub fn new(card_id: impl Into<String>) -> Self {
        Self {
            card_id: card_id.into(),
            rating: DEFAULT_RATING,
            games_played: 0,
            wins: 0,
            losses: 0,
        }
    }

    /// `wins + losses == games_played`
    pub fn is_consistent(&self) -> bool {
        self.wins.checked_add(self.losses) == Some(self.games_played)
    }

    /// Record after winning a duel worth `delta` rating points.
    pub fn record_win(&self, delta: f64) -> Result<CardRating, RatingError> {
        let mut next = self.shifted(delta)?;
        next.wins = self
            .wins
            .checked_add(1)
            .ok_or_else(|| RatingError::CounterOverflow(self.card_id.clone()))?;
        Ok(next)
    }

    /// Record after losing a duel; `delta` is expected to be <= 0.
    pub fn record_loss(&self, delta: f64) -> Result<CardRating, RatingError> {
        let mut next = self.shifted(delta)?;
        next.losses = self
            .losses
            .checked_add(1)
            .ok_or_else(|| RatingError::CounterOverflow(self.card_id.clone()))?;
        Ok(next)
    }

    fn shifted(&self, delta: f64) -> Result<CardRating, RatingError> {
        let rating = self.rating + delta;
        if !rating.is_finite() {
            return Err(RatingError::NonFinite(self.card_id.clone()));
        }
        let games_played = self
            .games_played
            .checked_add(1)
            .ok_or_else(|| RatingError::CounterOverflow(self.card_id.clone()))?;
        Ok(CardRating {
            rating,
            games_played,
            ..self.clone()
        })
    }
}

#[cfg(test)]
impl CardRating {
    /// Fixture with history; all past games are counted as wins.
    pub(crate) fn with_rating(card_id: impl Into<String>, rating: f64, games_played: u32) -> Self {
        Self {
            card_id: card_id.into(),
            rating,
            games_played,
            wins: games_played,
            losses: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_card_uses_defaults() {
        let card = CardRating::new("base1-4");
        assert_eq!(card.rating, 1000.0);
        assert_eq!(card.games_played, 0);
        assert!(card.is_consistent());
    }

    #[test]
    fn win_and_loss_bump_the_right_counters() {
        let card = CardRating::new("base1-4");
        let won = card.record_win(16.0).unwrap();
        assert_eq!(won.rating, 1016.0);
        assert_eq!((won.games_played, won.wins, won.losses), (1, 1, 0));

        let lost = won.record_loss(-10.0).unwrap();
        assert_eq!(lost.rating, 1006.0);
        assert_eq!((lost.games_played, lost.wins, lost.losses), (2, 1, 1));
        assert!(lost.is_consistent());
    }

    #[test]
    fn non_finite_rating_is_refused() {
        let card = CardRating::new("base1-4");
        assert_eq!(
            card.record_win(f64::NAN),
            Err(RatingError::NonFinite("base1-4".into()))
        );
        assert!(card.record_loss(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn counter_overflow_is_refused() {
        let mut card = CardRating::new("x");
        card.games_played = u32::MAX;
        card.wins = u32::MAX;
        assert_eq!(
            card.record_win(1.0),
            Err(RatingError::CounterOverflow("x".into()))
        );
    }
}
