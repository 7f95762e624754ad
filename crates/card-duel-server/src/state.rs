use sqlx::SqlitePool;

/// Shared application state.
pub struct AppState {
    /// Rating Store handle; connections are checked out per request.
    pub db: SqlitePool,
}
