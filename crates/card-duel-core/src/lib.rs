pub mod card;
pub mod elo;
pub mod matchmaking;
pub mod protocol;

pub use card::{CardRating, RatingError};
pub use elo::{DEFAULT_RATING, DuelDelta, DuelResult, rate_duel};
pub use matchmaking::{NotEnoughData, PairingTier, select_pair};
pub use protocol::{Card, DuelRequest, DuelResponse, PairResponse};
