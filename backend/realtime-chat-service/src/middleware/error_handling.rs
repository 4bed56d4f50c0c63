use crate::error::AppError;
use actix_web::{http::StatusCode, HttpResponse};
use error_types::{error_codes, error_types as kinds, reason_phrase, ErrorResponse};

/// Map domain errors to the shared HTTP error body
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::Validation(reason) if reason.starts_with("message content") => {
            (kinds::VALIDATION_ERROR, error_codes::INVALID_MESSAGE)
        }
        AppError::Validation(_) => (kinds::VALIDATION_ERROR, error_codes::INVALID_REQUEST),
        AppError::Authentication(reason) => (kinds::AUTHENTICATION_ERROR, token_code(reason)),
        AppError::Unauthorized => (
            kinds::AUTHORIZATION_ERROR,
            error_codes::NOT_CONVERSATION_MEMBER,
        ),
        AppError::NotFound(what) if what == "user" => {
            (kinds::NOT_FOUND_ERROR, error_codes::USER_NOT_FOUND)
        }
        AppError::NotFound(_) => (kinds::NOT_FOUND_ERROR, error_codes::CONVERSATION_NOT_FOUND),
        AppError::Database(_) => (kinds::SERVER_ERROR, error_codes::DATABASE_ERROR),
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
            (kinds::SERVER_ERROR, error_codes::INTERNAL_SERVER_ERROR)
        }
    };

    let response = ErrorResponse::new(
        reason_phrase(status.as_u16()),
        &err.client_message(),
        status.as_u16(),
        error_type,
        code,
    );

    (status, response)
}

fn token_code(reason: &str) -> &'static str {
    match reason {
        "token missing" => error_codes::TOKEN_MISSING,
        "token expired" => error_codes::TOKEN_EXPIRED,
        _ => error_codes::TOKEN_INVALID,
    }
}

pub fn into_response(err: &AppError) -> HttpResponse {
    if err.status() >= 500 {
        tracing::error!(error = %err, "request failed");
    }
    let (status, body) = map_error(err);
    HttpResponse::build(status).json(body)
}
