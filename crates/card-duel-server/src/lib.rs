pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod matchmaker;
pub mod reports;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::state::AppState;

/// Open the pool and make sure the schema exists.
pub async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let mut options = SqlitePoolOptions::new().max_connections(config.max_connections);
    if config.is_in_memory() {
        // An in-memory database lives only as long as its connection.
        options = options
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
    }
    let pool = options.connect(&config.database_url).await?;

    db::init_db(&pool).await?;
    info!(url = %config.database_url, "database ready");
    Ok(pool)
}

/// Build a fully configured Router + shared state.
pub async fn build_app(config: &Config) -> Result<(Router, Arc<AppState>), sqlx::Error> {
    let pool = connect(config).await?;
    let state = Arc::new(AppState { db: pool });
    Ok((router(state.clone()), state))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/pair", get(routes::pair))
        .route("/api/duel", post(routes::duel))
        .route("/api/leaderboard", get(routes::leaderboard))
        .route("/api/leaderboard/winrate", get(routes::win_rate))
        .route("/api/cards/{id}", get(routes::card))
        .route("/api/search", get(routes::search))
        .route("/api/stats/sets", get(routes::stats_sets))
        .route("/api/stats/rarities", get(routes::stats_rarities))
        .route("/api/stats/artists", get(routes::stats_artists))
        .route("/api/stats/years", get(routes::stats_years))
        .route("/api/sets_tree", get(routes::sets_tree))
        .route("/api/sets/{id}/cards", get(routes::set_cards))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
