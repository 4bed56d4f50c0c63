use crate::middleware::error_handling;
use crate::store::StoreError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        error_handling::into_response(self)
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    /// Missing, malformed, badly signed or expired credential
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Caller is not a participant of the target conversation
    #[error("not a participant of this conversation")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal server error")]
    Internal,
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Validation(format!("malformed payload: {e}"))
    }
}

impl AppError {
    /// Returns HTTP status code
    pub fn status(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Authentication(_) => 401,
            AppError::Unauthorized => 403,
            AppError::NotFound(_) => 404,
            AppError::Database(_)
            | AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Internal => 500,
        }
    }

    /// Message safe to hand back to a client.
    ///
    /// Storage and startup failures are logged in full but never leak their
    /// details over the wire.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Database(_)
            | AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Internal => AppError::Internal.to_string(),
            other => other.to_string(),
        }
    }
}
