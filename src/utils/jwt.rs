// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, models::identity::Identity};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - identity-provider user id, or the admin username.
    pub sub: String,
    /// User's role ('user' or 'admin').
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity {
            is_admin: claims.role == ROLE_ADMIN,
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
        }
    }
}

/// Signs a new JWT for the given identity.
pub fn sign_jwt(
    identity: &Identity,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: identity.user_id.clone(),
        role: if identity.is_admin { ROLE_ADMIN } else { ROLE_USER }.to_owned(),
        name: identity.name.clone(),
        email: identity.email.clone(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

fn bearer_identity(req: &Request<Body>, secret: &str) -> Option<Result<Identity, AppError>> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    let token = match auth_header.strip_prefix("Bearer ") {
        Some(token) => token,
        None => return Some(Err(AppError::AuthError("Invalid token".to_string()))),
    };

    Some(verify_jwt(token, secret).map(Identity::from))
}

/// Axum Middleware: Optional Identity.
///
/// Injects an `Identity` into the request extensions when a valid
/// 'Authorization: Bearer <token>' header is present. Requests without the
/// header pass through anonymously; a malformed or invalid token is rejected.
pub async fn identity_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    match bearer_identity(&req, &config.jwt_secret) {
        Some(Ok(identity)) => {
            req.extensions_mut().insert(identity);
        }
        Some(Err(_)) => return Err(StatusCode::UNAUTHORIZED),
        None => {}
    }

    Ok(next.run(req).await)
}

/// Axum Middleware: Authentication.
///
/// Like `identity_middleware`, but a missing token is a 401.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    match bearer_identity(&req, &config.jwt_secret) {
        Some(Ok(identity)) => {
            req.extensions_mut().insert(identity);
            Ok(next.run(req).await)
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Checks that the injected `Identity` is an admin.
/// If not, returns 403 Forbidden.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !identity.is_admin {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_identity() {
        let identity = Identity {
            user_id: "google-123".to_string(),
            name: Some("Meera".to_string()),
            email: Some("meera@example.com".to_string()),
            is_admin: false,
        };

        let token = sign_jwt(&identity, "secret", 60).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();

        assert_eq!(claims.role, ROLE_USER);
        assert_eq!(Identity::from(claims), identity);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let identity = Identity {
            user_id: "admin".to_string(),
            name: None,
            email: None,
            is_admin: true,
        };

        let token = sign_jwt(&identity, "secret", 60).unwrap();
        assert!(matches!(
            verify_jwt(&token, "other"),
            Err(AppError::AuthError(_))
        ));
    }
}
