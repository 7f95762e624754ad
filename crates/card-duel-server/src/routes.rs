use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use card_duel_core::protocol::{
    CardList, LeaderboardPage, SeriesGroup, SetCardList, StatsReport, WinRateEntry,
};
use card_duel_core::{Card, DuelRequest, DuelResponse, PairResponse};

use crate::error::{AppError, Result};
use crate::reports::{self, SetCardSort};
use crate::state::AppState;
use crate::{engine, matchmaker};

// ── Health ──────────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

// ── Duel game ───────────────────────────────────────────────────────────

pub async fn pair(State(state): State<Arc<AppState>>) -> Result<Json<PairResponse>> {
    Ok(Json(matchmaker::draw_pair(&state.db).await?))
}

pub async fn duel(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<DuelRequest>, JsonRejection>,
) -> Result<Json<DuelResponse>> {
    let Json(request) = body?;
    Ok(Json(engine::apply_duel(&state.db, &request).await?))
}

// ── Leaderboards ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<LeaderboardPage>> {
    let Query(q) = query?;
    Ok(Json(reports::leaderboard(&state.db, q.limit, q.offset).await?))
}

#[derive(Debug, Deserialize)]
pub struct WinRateQuery {
    pub min_games: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn win_rate(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<WinRateQuery>, QueryRejection>,
) -> Result<Json<Vec<WinRateEntry>>> {
    let Query(q) = query?;
    Ok(Json(
        reports::win_rate_leaderboard(&state.db, q.min_games, q.limit).await?,
    ))
}

// ── Cards ───────────────────────────────────────────────────────────────

pub async fn card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Card>> {
    reports::card(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("card {id} not found")))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<CardList>> {
    let Query(q) = query?;
    let text = q.query.unwrap_or_default();
    Ok(Json(reports::search(&state.db, &text).await?))
}

// ── Statistics ──────────────────────────────────────────────────────────

pub async fn stats_sets(State(state): State<Arc<AppState>>) -> Result<Json<StatsReport>> {
    Ok(Json(reports::stats_by_set(&state.db).await?))
}

pub async fn stats_rarities(State(state): State<Arc<AppState>>) -> Result<Json<StatsReport>> {
    Ok(Json(reports::stats_by_rarity(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct ArtistQuery {
    pub min_cards: Option<i64>,
}

pub async fn stats_artists(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ArtistQuery>, QueryRejection>,
) -> Result<Json<StatsReport>> {
    let Query(q) = query?;
    Ok(Json(reports::stats_by_artist(&state.db, q.min_cards).await?))
}

pub async fn stats_years(State(state): State<Arc<AppState>>) -> Result<Json<StatsReport>> {
    Ok(Json(reports::stats_by_year(&state.db).await?))
}

// ── Sets ────────────────────────────────────────────────────────────────

pub async fn sets_tree(State(state): State<Arc<AppState>>) -> Result<Json<Vec<SeriesGroup>>> {
    Ok(Json(reports::sets_tree(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct SetCardsQuery {
    pub sort: Option<String>,
}

pub async fn set_cards(
    State(state): State<Arc<AppState>>,
    Path(set_id): Path<String>,
    query: std::result::Result<Query<SetCardsQuery>, QueryRejection>,
) -> Result<Json<SetCardList>> {
    let Query(q) = query?;
    let sort = SetCardSort::parse(q.sort.as_deref());
    let items = reports::set_cards(&state.db, &set_id, sort).await?;
    Ok(Json(SetCardList { items }))
}
