//! Read-only reporting queries: leaderboards, search, statistics, sets.

use std::collections::HashMap;

use sqlx::{Row, SqlitePool};

use card_duel_core::Card;
use card_duel_core::protocol::{
    CardList, LeaderboardPage, SeriesGroup, SetCard, SetSummary, StatBucket, StatsReport,
    WinRateEntry,
};

use crate::db::{self, CARD_COLUMNS, CARD_SOURCE};

pub const DEFAULT_PAGE_SIZE: i64 = 25;
pub const MAX_PAGE_SIZE: i64 = 200;
pub const SEARCH_LIMIT: i64 = 50;
pub const DEFAULT_MIN_ARTIST_CARDS: i64 = 3;

const UNKNOWN: &str = "Unknown";
const UNDATED: &str = "9999-12-31";

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Cards ordered by rating, one page at a time.
pub async fn leaderboard(
    pool: &SqlitePool,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<LeaderboardPage, sqlx::Error> {
    let sql = format!(
        "SELECT {CARD_COLUMNS} FROM {CARD_SOURCE}
         ORDER BY elo DESC, c.id ASC
         LIMIT ?1 OFFSET ?2"
    );
    let rows = sqlx::query(&sql)
        .bind(clamp_limit(limit))
        .bind(offset.unwrap_or(0).max(0))
        .fetch_all(pool)
        .await?;
    let items = rows.iter().map(db::card_from_row).collect::<Result<_, _>>()?;

    let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM cards")
        .fetch_one(pool)
        .await?
        .try_get("total")?;

    Ok(LeaderboardPage { items, total })
}

/// Legacy ranking by share of duels won.
pub async fn win_rate_leaderboard(
    pool: &SqlitePool,
    min_games: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<WinRateEntry>, sqlx::Error> {
    let sql = format!(
        "SELECT {CARD_COLUMNS},
                CAST(COALESCE(c.wins, 0) AS REAL) / c.games_played AS win_rate
         FROM {CARD_SOURCE}
         WHERE COALESCE(c.games_played, 0) >= ?1 AND c.games_played > 0
         ORDER BY win_rate DESC, games_played DESC, c.id ASC
         LIMIT ?2"
    );
    let rows = sqlx::query(&sql)
        .bind(min_games.unwrap_or(1).max(1))
        .bind(clamp_limit(limit))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|r| {
            Ok(WinRateEntry {
                card: db::card_from_row(r)?,
                win_rate: r.try_get("win_rate")?,
            })
        })
        .collect()
}

pub async fn card(pool: &SqlitePool, id: &str) -> Result<Option<Card>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    db::get_card(&mut conn, id).await
}

/// Case-insensitive substring search over card name, set name and artist.
pub async fn search(pool: &SqlitePool, query: &str) -> Result<CardList, sqlx::Error> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(CardList::default());
    }

    let pattern = format!("%{}%", escape_like(query));
    let sql = format!(
        "SELECT {CARD_COLUMNS} FROM {CARD_SOURCE}
         WHERE c.name LIKE ?1 ESCAPE '\\'
            OR s.name LIKE ?1 ESCAPE '\\'
            OR c.artist LIKE ?1 ESCAPE '\\'
         ORDER BY elo DESC, c.id ASC
         LIMIT ?2"
    );
    let rows = sqlx::query(&sql)
        .bind(pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(pool)
        .await?;

    let items = rows.iter().map(db::card_from_row).collect::<Result<_, _>>()?;
    Ok(CardList { items })
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub async fn stats_by_set(pool: &SqlitePool) -> Result<StatsReport, sqlx::Error> {
    stats(
        pool,
        "SELECT s.name AS label,
                AVG(COALESCE(c.rating, 1000.0)) AS avg_elo,
                COUNT(*) AS count
         FROM cards c
         JOIN card_sets s ON s.id = c.set_id
         GROUP BY s.name
         ORDER BY avg_elo DESC, label ASC",
        None,
    )
    .await
}

/// Blank or missing rarities are grouped under `Unknown`.
pub async fn stats_by_rarity(pool: &SqlitePool) -> Result<StatsReport, sqlx::Error> {
    stats(
        pool,
        "SELECT COALESCE(NULLIF(TRIM(c.rarity), ''), 'Unknown') AS label,
                AVG(COALESCE(c.rating, 1000.0)) AS avg_elo,
                COUNT(*) AS count
         FROM cards c
         GROUP BY label
         ORDER BY avg_elo DESC, label ASC",
        None,
    )
    .await
}

/// Artists with fewer than `min_cards` cards are left out. Blank or missing
/// artists are grouped under `Unknown`.
pub async fn stats_by_artist(
    pool: &SqlitePool,
    min_cards: Option<i64>,
) -> Result<StatsReport, sqlx::Error> {
    stats(
        pool,
        "SELECT COALESCE(NULLIF(TRIM(c.artist), ''), 'Unknown') AS label,
                AVG(COALESCE(c.rating, 1000.0)) AS avg_elo,
                COUNT(*) AS count
         FROM cards c
         GROUP BY label
         HAVING COUNT(*) >= ?1
         ORDER BY avg_elo DESC, label ASC",
        Some(min_cards.unwrap_or(DEFAULT_MIN_ARTIST_CARDS)),
    )
    .await
}

/// Release year of the card's set; undated sets are skipped.
pub async fn stats_by_year(pool: &SqlitePool) -> Result<StatsReport, sqlx::Error> {
    stats(
        pool,
        "SELECT CAST(substr(s.release_date, 1, 4) AS TEXT) AS label,
                AVG(COALESCE(c.rating, 1000.0)) AS avg_elo,
                COUNT(*) AS count
         FROM cards c
         JOIN card_sets s ON s.id = c.set_id
         WHERE s.release_date IS NOT NULL AND TRIM(s.release_date) <> ''
         GROUP BY label
         ORDER BY label ASC",
        None,
    )
    .await
}

async fn stats(
    pool: &SqlitePool,
    sql: &str,
    threshold: Option<i64>,
) -> Result<StatsReport, sqlx::Error> {
    let mut query = sqlx::query(sql);
    if let Some(threshold) = threshold {
        query = query.bind(threshold);
    }
    let rows = query.fetch_all(pool).await?;

    let mut buckets = Vec::with_capacity(rows.len());
    for r in &rows {
        let label: Option<String> = r.try_get("label")?;
        let avg_elo: Option<f64> = r.try_get("avg_elo")?;
        buckets.push((
            label.unwrap_or_else(|| UNKNOWN.to_string()),
            StatBucket {
                avg_elo: avg_elo.unwrap_or(0.0),
                count: r.try_get("count")?,
            },
        ));
    }
    Ok(StatsReport(buckets))
}

/// Sets grouped by series, oldest first.
pub async fn sets_tree(pool: &SqlitePool) -> Result<Vec<SeriesGroup>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, name, series, NULLIF(TRIM(release_date), '') AS release_date, logo_image
         FROM card_sets
         ORDER BY release_date IS NULL, release_date ASC, name ASC",
    )
    .fetch_all(pool)
    .await?;

    let mut groups: Vec<SeriesGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for r in &rows {
        let series = r
            .try_get::<Option<String>, _>("series")?
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let set = SetSummary {
            id: r.try_get("id")?,
            name: r.try_get("name")?,
            series: series.clone(),
            release_date: r.try_get("release_date")?,
            logo_image: r.try_get("logo_image")?,
        };

        let slot = *index.entry(series.clone()).or_insert_with(|| {
            groups.push(SeriesGroup {
                series,
                release_date: None,
                sets: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        if let Some(date) = &set.release_date {
            if group.release_date.as_ref().is_none_or(|d| date < d) {
                group.release_date = Some(date.clone());
            }
        }
        group.sets.push(set);
    }

    groups.sort_by(|a, b| {
        date_key(&a.release_date, &a.series).cmp(&date_key(&b.release_date, &b.series))
    });
    for group in &mut groups {
        group.sets.sort_by(|a, b| {
            date_key(&a.release_date, &a.name).cmp(&date_key(&b.release_date, &b.name))
        });
    }
    Ok(groups)
}

fn date_key<'a>(date: &'a Option<String>, name: &'a str) -> (&'a str, &'a str) {
    (date.as_deref().unwrap_or(UNDATED), name)
}

/// Orderings accepted by the set listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetCardSort {
    #[default]
    EloDesc,
    EloAsc,
    IdAsc,
    IdDesc,
}

impl SetCardSort {
    /// Unknown values fall back to [`SetCardSort::EloDesc`].
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("elo_asc") => SetCardSort::EloAsc,
            Some("id_asc") => SetCardSort::IdAsc,
            Some("id_desc") => SetCardSort::IdDesc,
            _ => SetCardSort::EloDesc,
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            SetCardSort::EloDesc => "elo DESC, c.id ASC",
            SetCardSort::EloAsc => "elo ASC, c.id ASC",
            SetCardSort::IdAsc => "c.id ASC",
            SetCardSort::IdDesc => "c.id DESC",
        }
    }
}

pub async fn set_cards(
    pool: &SqlitePool,
    set_id: &str,
    sort: SetCardSort,
) -> Result<Vec<SetCard>, sqlx::Error> {
    let sql = format!(
        "SELECT c.id, c.name,
                COALESCE(c.image_url_large, '') AS image,
                NULLIF(TRIM(c.artist), '') AS artist,
                CAST(COALESCE(c.rating, 1000.0) AS REAL) AS elo,
                s.name AS set_name,
                COALESCE(s.series, '') AS series
         FROM cards c
         JOIN card_sets s ON s.id = c.set_id
         WHERE c.set_id = ?1
         ORDER BY {}",
        sort.order_by()
    );
    let rows = sqlx::query(&sql).bind(set_id).fetch_all(pool).await?;

    rows.iter()
        .map(|r| {
            Ok(SetCard {
                id: r.try_get("id")?,
                name: r.try_get("name")?,
                image: r.try_get("image")?,
                artist: r.try_get("artist")?,
                elo: r.try_get("elo")?,
                set_name: r.try_get("set_name")?,
                series: r.try_get("series")?,
            })
        })
        .collect()
}
