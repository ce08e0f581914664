use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Postgres SQLSTATE for "relation does not exist".
const UNDEFINED_TABLE: &str = "42P01";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid unit name: {0}")]
    InvalidUnit(String),

    #[error("unit not initialized: {0}")]
    UnitNotInitialized(String),

    #[error("token not found")]
    TokenNotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("qr encoding error: {0}")]
    Qr(#[from] qrcode::types::QrError),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Turn a missing `<unit>_urls` relation into `UnitNotInitialized`,
    /// leaving every other database error untouched.
    pub fn from_unit_query(err: sqlx::Error, table: &str) -> Self {
        let missing_table = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == UNDEFINED_TABLE);

        if missing_table {
            AppError::UnitNotInitialized(table.to_string())
        } else {
            AppError::Database(err)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidUnit(_) => StatusCode::BAD_REQUEST,
            AppError::UnitNotInitialized(_) | AppError::TokenNotFound => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Qr(_)
            | AppError::Image(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::InvalidUnit(_) => self.to_string(),
            AppError::UnitNotInitialized(table) => {
                tracing::debug!(table = %table, "lookup against uninitialized unit");
                "Not Found".to_string()
            }
            AppError::TokenNotFound => "Not Found".to_string(),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal Server Error".to_string()
            }
            AppError::Qr(e) => {
                tracing::error!("QR encoding error: {}", e);
                "Internal Server Error".to_string()
            }
            AppError::Image(e) => {
                tracing::error!("Image encoding error: {}", e);
                "Internal Server Error".to_string()
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                "Internal Server Error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                "Internal Server Error".to_string()
            }
        };

        (status, body).into_response()
    }
}
