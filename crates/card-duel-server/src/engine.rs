//! Rating Engine: applies one duel outcome to the Rating Store.
//!
//! A request moves through `Received -> Validated -> Locked -> Computed ->
//! Committed`. Validation failures stop before the store is touched; any
//! failure after the lock rolls the whole transaction back.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use card_duel_core::{Card, DuelRequest, DuelResponse, rate_duel};

use crate::db;
use crate::error::{AppError, Result};

/// Check ids before any store access. Returns `(winner, loser)`.
pub fn validate(request: &DuelRequest) -> Result<(&str, &str)> {
    let winner = request.winner_id.as_deref().map(str::trim).unwrap_or("");
    let loser = request.loser_id.as_deref().map(str::trim).unwrap_or("");

    if winner.is_empty() || loser.is_empty() {
        return Err(AppError::InvalidInput(
            "both winnerId and loserId are required".into(),
        ));
    }
    if winner == loser {
        return Err(AppError::InvalidInput(format!(
            "winner and loser must differ (both are {winner})"
        )));
    }
    Ok((winner, loser))
}

/// Apply `winner beats loser` atomically and return both updated cards.
pub async fn apply_duel(pool: &SqlitePool, request: &DuelRequest) -> Result<DuelResponse> {
    let (winner_id, loser_id) = validate(request)?;
    debug!(winner_id, loser_id, "duel validated");

    let mut tx = pool.begin().await.map_err(AppError::transaction)?;

    match duel_in_tx(&mut tx, winner_id, loser_id).await {
        Ok(response) => {
            tx.commit().await.map_err(AppError::transaction)?;
            info!(
                winner_id,
                loser_id,
                delta_winner = response.delta.winner,
                delta_loser = response.delta.loser,
                "duel committed"
            );
            Ok(response)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(winner_id, loser_id, "rollback failed: {rollback}");
            }
            warn!(winner_id, loser_id, kind = err.kind(), "duel rolled back");
            Err(err)
        }
    }
}

async fn duel_in_tx(
    conn: &mut SqliteConnection,
    winner_id: &str,
    loser_id: &str,
) -> Result<DuelResponse> {
    // Sorted so every transaction claims rows in the same order.
    let mut ids = [winner_id, loser_id];
    ids.sort_unstable();

    let claimed = db::lock_cards(conn, &ids)
        .await
        .map_err(AppError::transaction)?;

    let rows = db::ratings_for(conn, &ids)
        .await
        .map_err(AppError::transaction)?;
    if claimed != 2 || rows.len() != 2 {
        let missing: Vec<&str> = ids
            .iter()
            .copied()
            .filter(|id| !rows.iter().any(|r| r.card_id == *id))
            .collect();
        return Err(AppError::NotFound(format!(
            "card(s) not found: {}",
            missing.join(", ")
        )));
    }
    debug!(winner_id, loser_id, "duel locked");

    let (winner, loser) = if rows[0].card_id == winner_id {
        (&rows[0], &rows[1])
    } else {
        (&rows[1], &rows[0])
    };
    let result = rate_duel(winner, loser)?;
    debug!(
        winner_id,
        loser_id,
        winner_rating = result.winner.rating,
        loser_rating = result.loser.rating,
        "duel computed"
    );

    for updated in [&result.winner, &result.loser] {
        let stored = db::store_rating(conn, updated)
            .await
            .map_err(AppError::transaction)?;
        if !stored {
            return Err(AppError::TransactionFailed(format!(
                "card {} vanished mid-transaction",
                updated.card_id
            )));
        }
    }

    let a = reload(conn, winner_id).await?;
    let b = reload(conn, loser_id).await?;
    Ok(DuelResponse {
        a,
        b,
        delta: result.delta,
    })
}

async fn reload(conn: &mut SqliteConnection, id: &str) -> Result<Card> {
    db::get_card(conn, id)
        .await
        .map_err(AppError::transaction)?
        .ok_or_else(|| AppError::TransactionFailed(format!("card {id} vanished mid-transaction")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{add_card, memory_store};

    fn duel(winner: &str, loser: &str) -> DuelRequest {
        DuelRequest {
            winner_id: Some(winner.into()),
            loser_id: Some(loser.into()),
        }
    }

    async fn card(pool: &SqlitePool, id: &str) -> Card {
        let mut conn = pool.acquire().await.unwrap();
        db::get_card(&mut conn, id).await.unwrap().unwrap()
    }

    #[test]
    fn validation_rejects_missing_and_equal_ids() {
        assert!(matches!(
            validate(&DuelRequest::default()),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate(&duel("a", "  ")),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate(&duel("a", "a")),
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(validate(&duel(" a ", "b")).unwrap(), ("a", "b"));
    }

    #[tokio::test]
    async fn equal_cards_trade_sixteen_points() {
        let pool = memory_store().await;
        add_card(&pool, "a", 1000.0, 10).await;
        add_card(&pool, "b", 1000.0, 10).await;

        let response = apply_duel(&pool, &duel("a", "b")).await.unwrap();
        assert!((response.delta.winner - 16.0).abs() < 1e-9);
        assert!((response.delta.loser + 16.0).abs() < 1e-9);
        assert!((response.a.elo - 1016.0).abs() < 1e-9);
        assert!((response.b.elo - 984.0).abs() < 1e-9);

        let a = card(&pool, "a").await;
        let b = card(&pool, "b").await;
        assert_eq!((a.games_played, a.wins, a.losses), (11, 11, 0));
        assert_eq!((b.games_played, b.wins, b.losses), (11, 10, 1));
        assert_eq!(a, response.a);
        assert_eq!(b, response.b);
    }

    #[tokio::test]
    async fn loser_order_does_not_matter() {
        let pool = memory_store().await;
        add_card(&pool, "zz", 1000.0, 0).await;
        add_card(&pool, "aa", 1000.0, 0).await;

        let response = apply_duel(&pool, &duel("zz", "aa")).await.unwrap();
        assert_eq!(response.a.id, "zz");
        assert_eq!(response.b.id, "aa");
        assert!(response.a.elo > response.b.elo);
    }

    #[tokio::test]
    async fn master_card_gains_almost_nothing() {
        let pool = memory_store().await;
        add_card(&pool, "master", 2500.0, 200).await;
        add_card(&pool, "novice", 1000.0, 3).await;

        let response = apply_duel(&pool, &duel("master", "novice")).await.unwrap();
        assert!(response.delta.winner > 0.0 && response.delta.winner < 0.01);
        assert!(response.delta.loser < 0.0);
        assert!(response.delta.loser.abs() > response.delta.winner);
    }

    #[tokio::test]
    async fn self_duel_is_rejected_without_touching_store() {
        let pool = memory_store().await;
        add_card(&pool, "a", 1000.0, 0).await;

        let err = apply_duel(&pool, &duel("a", "a")).await.unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
        assert_eq!(card(&pool, "a").await.games_played, 0);
    }

    #[tokio::test]
    async fn missing_loser_rolls_back() {
        let pool = memory_store().await;
        add_card(&pool, "a", 1100.0, 4).await;

        let err = apply_duel(&pool, &duel("a", "ghost")).await.unwrap_err();
        assert_eq!(err.kind(), "NotFound");
        assert!(err.to_string().contains("ghost"));

        let a = card(&pool, "a").await;
        assert_eq!(a.elo, 1100.0);
        assert_eq!(a.games_played, 4);
    }

    #[tokio::test]
    async fn corrupt_rating_rolls_back() {
        let pool = memory_store().await;
        add_card(&pool, "a", 1000.0, 0).await;
        add_card(&pool, "b", 1000.0, 0).await;
        sqlx::query("UPDATE cards SET games_played = -1 WHERE id = 'b'")
            .execute(&pool)
            .await
            .unwrap();

        let err = apply_duel(&pool, &duel("a", "b")).await.unwrap_err();
        assert_eq!(err.kind(), "TransactionFailed");
        assert_eq!(card(&pool, "a").await.games_played, 0);
    }

    #[tokio::test]
    async fn repeated_duels_keep_counters_consistent() {
        let pool = memory_store().await;
        add_card(&pool, "a", 1000.0, 0).await;
        add_card(&pool, "b", 1000.0, 0).await;

        for i in 0..10 {
            let (w, l) = if i % 3 == 0 { ("b", "a") } else { ("a", "b") };
            apply_duel(&pool, &duel(w, l)).await.unwrap();
        }

        let a = card(&pool, "a").await;
        let b = card(&pool, "b").await;
        assert_eq!(a.games_played, 10);
        assert_eq!(b.games_played, 10);
        assert_eq!(a.wins + a.losses, a.games_played);
        assert_eq!(b.wins + b.losses, b.games_played);
        // Both stay provisional, so every duel is zero-sum.
        assert!((a.elo + b.elo - 2000.0).abs() < 1e-6);
    }
}
