use sqlx::SqlitePool;
use tracing::debug;

use card_duel_core::matchmaking::select_pair;
use card_duel_core::{Card, PairResponse};

use crate::db;
use crate::error::{AppError, Result};

/// Draw two distinct cards, favoring close ratings. Read-only.
pub async fn draw_pair(pool: &SqlitePool) -> Result<PairResponse> {
    let ratings = db::load_ratings(pool).await?;

    let pairing = {
        let mut rng = rand::rng();
        select_pair(&ratings, &mut rng)?
    };
    let first = &ratings[pairing.first];
    let second = &ratings[pairing.second];
    debug!(
        a = %first.card_id,
        b = %second.card_id,
        tier = ?pairing.tier,
        "pair drawn"
    );

    let mut conn = pool.acquire().await?;
    let a = fetch(&mut conn, &first.card_id).await?;
    let b = fetch(&mut conn, &second.card_id).await?;
    Ok(PairResponse { a, b })
}

async fn fetch(conn: &mut sqlx::SqliteConnection, id: &str) -> Result<Card> {
    db::get_card(conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("card {id} disappeared while pairing")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{add_card, memory_store};

    #[tokio::test]
    async fn empty_and_single_card_stores_have_no_pair() {
        let pool = memory_store().await;
        let err = draw_pair(&pool).await.unwrap_err();
        assert_eq!(err.kind(), "NotEnoughData");

        add_card(&pool, "only", 1000.0, 0).await;
        let err = draw_pair(&pool).await.unwrap_err();
        assert_eq!(err.kind(), "NotEnoughData");
    }

    #[tokio::test]
    async fn distant_cards_are_still_paired() {
        let pool = memory_store().await;
        add_card(&pool, "low", 800.0, 0).await;
        add_card(&pool, "high", 2200.0, 0).await;

        for _ in 0..20 {
            let pair = draw_pair(&pool).await.unwrap();
            assert_ne!(pair.a.id, pair.b.id);
        }
    }

    #[tokio::test]
    async fn drawing_does_not_mutate_the_store() {
        let pool = memory_store().await;
        for (i, rating) in [1000.0, 1050.0, 1500.0, 990.0].iter().enumerate() {
            add_card(&pool, &format!("c{i}"), *rating, i as u32).await;
        }
        let before = db::load_ratings(&pool).await.unwrap();

        for _ in 0..10 {
            draw_pair(&pool).await.unwrap();
        }
        assert_eq!(db::load_ratings(&pool).await.unwrap(), before);
    }

    #[tokio::test]
    async fn pair_carries_display_metadata() {
        let pool = memory_store().await;
        add_card(&pool, "a", 1000.0, 0).await;
        add_card(&pool, "b", 1010.0, 0).await;

        let pair = draw_pair(&pool).await.unwrap();
        assert_eq!(pair.a.set_name, "Base");
        assert!(pair.a.name.starts_with("Card "));
        assert!(pair.b.elo == 1000.0 || pair.b.elo == 1010.0);
    }
}
