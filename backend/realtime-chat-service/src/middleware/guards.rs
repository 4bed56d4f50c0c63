//! Request extractors that enforce authentication at the type level

use std::future::{ready, Ready};

use actix_web::{web, Error, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::bearer_token;
use crate::state::AppState;

/// Authenticated caller resolved from the bearer token
#[derive(Debug, Clone, Copy)]
pub struct User {
    pub id: Uuid,
}

impl FromRequest for User {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(authenticate(req).map_err(Error::from))
    }
}

fn authenticate(req: &HttpRequest) -> Result<User, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or(AppError::Internal)?;
    let token =
        bearer_token(req).ok_or_else(|| AppError::Authentication("token missing".into()))?;
    let id = state.verifier.verify(&token)?;
    Ok(User { id })
}
