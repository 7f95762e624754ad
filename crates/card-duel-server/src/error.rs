use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use card_duel_core::protocol::ErrorBody;
use card_duel_core::{NotEnoughData, RatingError};

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or degenerate request; the store is never touched.
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    NotEnoughData(#[from] NotEnoughData),

    /// The rating transaction was rolled back.
    #[error("rating update failed: {0}")]
    TransactionFailed(String),

    /// A read-only query failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::NotEnoughData(_) => "NotEnoughData",
            AppError::TransactionFailed(_) => "TransactionFailed",
            AppError::StoreUnavailable(_) => "StoreUnavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotEnoughData(_) => StatusCode::CONFLICT,
            AppError::TransactionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub(crate) fn transaction(err: sqlx::Error) -> Self {
        AppError::TransactionFailed(err.to_string())
    }
}

impl From<RatingError> for AppError {
    fn from(err: RatingError) -> Self {
        match err {
            RatingError::SameCard(_) => AppError::InvalidInput(err.to_string()),
            RatingError::NonFinite(_) | RatingError::CounterOverflow(_) => {
                AppError::TransactionFailed(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), "{self}");
        } else {
            warn!(kind = self.kind(), "{self}");
        }

        let body = ErrorBody {
            kind: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
