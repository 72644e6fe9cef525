use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::auth::{LoginRequest, LoginResponse};
use crate::utils::{verify_password, Password, ValidatedJson};
use crate::AppState;

#[tracing::instrument(skip(state, req), fields(username = %req.username))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let username_matches = req.username == state.credentials.username;
    // Verified regardless of the username outcome.
    let password_matches =
        verify_password(&Password::new(req.password), &state.credentials.password_hash).is_ok();

    if !(username_matches && password_matches) {
        tracing::warn!("Login rejected");
        return Err(AppError::Unauthorized(anyhow::anyhow!("Invalid credentials")));
    }

    let token = state.jwt.issue(&req.username)?;
    tracing::info!("Login successful");

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expiry_seconds(),
    }))
}
