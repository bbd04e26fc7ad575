use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{env, fmt};
use uuid::Uuid;

pub mod middleware;

pub use middleware::CurrentUser;

#[derive(Debug)]
pub enum AuthError {
    InvalidToken,
    TokenExpired,
    MissingSecret,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "Invalid token"),
            Self::TokenExpired => write!(f, "Token expired"),
            Self::MissingSecret => write!(f, "JWT_SECRET is not set"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "Token has expired"),
            Self::MissingSecret => (StatusCode::INTERNAL_SERVER_ERROR, "Error processing request"),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Claims issued by the external identity provider. The backend only ever
/// validates tokens; it never mints them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

pub fn validate_jwt(token: &str) -> Result<CurrentUser, AuthError> {
    let secret = env::var("JWT_SECRET").map_err(|_| AuthError::MissingSecret)?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    let id = Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)?;

    Ok(CurrentUser {
        id,
        username: data.claims.username,
    })
}
