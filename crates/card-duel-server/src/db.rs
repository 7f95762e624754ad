use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use card_duel_core::{Card, CardRating};

/// Card columns with rating defaults applied. Expects `cards c` joined to
/// `card_sets s`.
pub(crate) const CARD_COLUMNS: &str = "c.id, c.name,
    COALESCE(c.image_url_large, '') AS image,
    NULLIF(TRIM(c.artist), '') AS artist,
    COALESCE(s.name, '') AS set_name,
    COALESCE(s.series, '') AS series,
    CAST(COALESCE(c.rating, 1000.0) AS REAL) AS elo,
    COALESCE(c.games_played, 0) AS games_played,
    COALESCE(c.wins, 0) AS wins,
    COALESCE(c.losses, 0) AS losses";

pub(crate) const CARD_SOURCE: &str = "cards c LEFT JOIN card_sets s ON s.id = c.set_id";

/// Create all tables if they don't exist.
pub async fn init_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS card_sets (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            series TEXT,
            release_date TEXT,
            logo_image TEXT
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS cards (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            supertype TEXT,
            rarity TEXT,
            types TEXT,
            artist TEXT,
            image_url_large TEXT,
            set_id TEXT REFERENCES card_sets(id),
            rating REAL DEFAULT 1000.0,
            games_played INTEGER DEFAULT 0,
            wins INTEGER DEFAULT 0,
            losses INTEGER DEFAULT 0
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cards_rating ON cards (rating)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cards_set ON cards (set_id)")
        .execute(pool)
        .await?;

    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct NewSet {
    pub id: String,
    pub name: String,
    pub series: Option<String>,
    /// `YYYY-MM-DD`
    pub release_date: Option<String>,
    pub logo_image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCard {
    pub id: String,
    pub name: String,
    pub supertype: Option<String>,
    pub rarity: Option<String>,
    pub types: Option<String>,
    pub artist: Option<String>,
    pub image: Option<String>,
    pub set_id: Option<String>,
}

/// Insert or refresh a set's metadata.
pub async fn upsert_set(pool: &SqlitePool, set: &NewSet) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO card_sets (id, name, series, release_date, logo_image)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            name = ?2, series = ?3, release_date = ?4, logo_image = ?5",
    )
    .bind(&set.id)
    .bind(&set.name)
    .bind(&set.series)
    .bind(&set.release_date)
    .bind(&set.logo_image)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert or refresh a card's metadata. Rating state of an existing card is
/// left alone; a new card starts with the column defaults.
pub async fn upsert_card(pool: &SqlitePool, card: &NewCard) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cards (id, name, supertype, rarity, types, artist, image_url_large, set_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
            name = ?2, supertype = ?3, rarity = ?4, types = ?5,
            artist = ?6, image_url_large = ?7, set_id = ?8",
    )
    .bind(&card.id)
    .bind(&card.name)
    .bind(&card.supertype)
    .bind(&card.rarity)
    .bind(&card.types)
    .bind(&card.artist)
    .bind(&card.image)
    .bind(&card.set_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Rating state of every card, defaults applied.
pub async fn load_ratings(pool: &SqlitePool) -> Result<Vec<CardRating>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id,
                CAST(COALESCE(rating, 1000.0) AS REAL) AS rating,
                COALESCE(games_played, 0) AS games_played,
                COALESCE(wins, 0) AS wins,
                COALESCE(losses, 0) AS losses
         FROM cards",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(rating_from_row).collect()
}

/// Claim write ownership of the given cards inside the current transaction.
///
/// On SQLite the first write of a transaction takes the database write lock
/// (waiting out the busy timeout), so issuing this before any read makes the
/// following reads see the latest committed values. Returns how many of the
/// rows exist.
pub async fn lock_cards(conn: &mut SqliteConnection, ids: &[&str; 2]) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE cards SET games_played = games_played WHERE id IN (?1, ?2)")
        .bind(ids[0])
        .bind(ids[1])
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Rating state of the given cards, ordered by id.
pub async fn ratings_for(
    conn: &mut SqliteConnection,
    ids: &[&str; 2],
) -> Result<Vec<CardRating>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id,
                CAST(COALESCE(rating, 1000.0) AS REAL) AS rating,
                COALESCE(games_played, 0) AS games_played,
                COALESCE(wins, 0) AS wins,
                COALESCE(losses, 0) AS losses
         FROM cards
         WHERE id IN (?1, ?2)
         ORDER BY id",
    )
    .bind(ids[0])
    .bind(ids[1])
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(rating_from_row).collect()
}

/// Overwrite a card's rating state. Returns false if the card is gone.
pub async fn store_rating(
    conn: &mut SqliteConnection,
    rating: &CardRating,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE cards SET rating = ?1, games_played = ?2, wins = ?3, losses = ?4 WHERE id = ?5",
    )
    .bind(rating.rating)
    .bind(i64::from(rating.games_played))
    .bind(i64::from(rating.wins))
    .bind(i64::from(rating.losses))
    .bind(&rating.card_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Get a card with display metadata.
pub async fn get_card(conn: &mut SqliteConnection, id: &str) -> Result<Option<Card>, sqlx::Error> {
    let sql = format!("SELECT {CARD_COLUMNS} FROM {CARD_SOURCE} WHERE c.id = ?1");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(card_from_row).transpose()
}

pub(crate) fn card_from_row(r: &SqliteRow) -> Result<Card, sqlx::Error> {
    Ok(Card {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        image: r.try_get("image")?,
        artist: r.try_get("artist")?,
        set_name: r.try_get("set_name")?,
        series: r.try_get("series")?,
        elo: r.try_get("elo")?,
        games_played: counter(r, "games_played")?,
        wins: counter(r, "wins")?,
        losses: counter(r, "losses")?,
    })
}

fn rating_from_row(r: &SqliteRow) -> Result<CardRating, sqlx::Error> {
    Ok(CardRating {
        card_id: r.try_get("id")?,
        rating: r.try_get("rating")?,
        games_played: counter(r, "games_played")?,
        wins: counter(r, "wins")?,
        losses: counter(r, "losses")?,
    })
}

fn counter(r: &SqliteRow, column: &str) -> Result<u32, sqlx::Error> {
    let value: i64 = r.try_get(column)?;
    u32::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn new_cards_get_default_rating() {
        let pool = memory_store().await;
        upsert_card(
            &pool,
            &NewCard {
                id: "base1-4".into(),
                name: "Charizard".into(),
                artist: Some("Mitsuhiro Arita".into()),
                set_id: Some("base1".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let card = get_card(&mut conn, "base1-4").await.unwrap().unwrap();
        assert_eq!(card.elo, 1000.0);
        assert_eq!((card.games_played, card.wins, card.losses), (0, 0, 0));
        assert_eq!(card.set_name, "Base");
        assert_eq!(card.series, "Original");
        assert_eq!(card.artist.as_deref(), Some("Mitsuhiro Arita"));
    }

    #[tokio::test]
    async fn null_rating_columns_read_as_defaults() {
        let pool = memory_store().await;
        sqlx::query(
            "INSERT INTO cards (id, name, rating, games_played, wins, losses)
             VALUES ('legacy', 'Legacy', NULL, NULL, NULL, NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let ratings = load_ratings(&pool).await.unwrap();
        assert_eq!(ratings, vec![CardRating::new("legacy")]);

        let mut conn = pool.acquire().await.unwrap();
        let card = get_card(&mut conn, "legacy").await.unwrap().unwrap();
        assert_eq!(card.set_name, "");
        assert_eq!(card.artist, None);
    }

    #[tokio::test]
    async fn upsert_keeps_rating_state() {
        let pool = memory_store().await;
        add_card(&pool, "a", 1234.5, 3).await;
        upsert_card(
            &pool,
            &NewCard {
                id: "a".into(),
                name: "Renamed".into(),
                set_id: Some("base1".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let card = get_card(&mut conn, "a").await.unwrap().unwrap();
        assert_eq!(card.name, "Renamed");
        assert_eq!(card.elo, 1234.5);
        assert_eq!(card.games_played, 3);
    }

    #[tokio::test]
    async fn lock_counts_existing_rows() {
        let pool = memory_store().await;
        add_card(&pool, "a", 1000.0, 0).await;

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(lock_cards(&mut conn, &["a", "missing"]).await.unwrap(), 1);
        assert_eq!(ratings_for(&mut conn, &["a", "missing"]).await.unwrap().len(), 1);
        assert!(get_card(&mut conn, "missing").await.unwrap().is_none());
    }
}
