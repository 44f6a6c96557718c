// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::identity::{AdminLoginRequest, Identity, IdentityLoginRequest},
    utils::jwt::sign_jwt,
};

/// Signs a candidate in with the identity provider's result.
///
/// The provider is trusted; its user id becomes the token subject.
pub async fn login(
    State(config): State<Config>,
    Json(payload): Json<IdentityLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let identity = Identity {
        user_id: payload.uid.clone(),
        name: payload.display_name(),
        email: payload.email.clone(),
        is_admin: false,
    };

    let token = sign_jwt(&identity, &config.jwt_secret, config.jwt_expiration)?;
    tracing::info!(user_id = %identity.user_id, "candidate signed in");

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": identity
    })))
}

/// Checks the static admin credentials and issues an admin token.
pub async fn admin_login(
    State(config): State<Config>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invalid = || AppError::AuthError("Invalid username or password".to_string());

    if payload.validate().is_err() {
        return Err(invalid());
    }

    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        tracing::error!("Admin credentials are not configured");
        return Err(invalid());
    };

    if payload.username.trim() != username.as_str() || payload.password != *password {
        tracing::warn!("Rejected admin login attempt");
        return Err(invalid());
    }

    let identity = Identity {
        user_id: username.clone(),
        name: Some(username.clone()),
        email: None,
        is_admin: true,
    };

    let token = sign_jwt(&identity, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": identity
    })))
}
