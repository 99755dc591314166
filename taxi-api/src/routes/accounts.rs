/// Account endpoints
///
/// - `POST /accounts/login/`: start a session, then redirect to `next`
/// - `POST /accounts/logout/`: end the session
/// - `POST /v1/auth/token`: exchange credentials for a bearer token
///
/// # Login request
///
/// ```json
/// { "username": "admin", "password": "1qazcde3", "next": "/cars/" }
/// ```

use axum::{extract::State, response::Redirect, Json};
use serde::{Deserialize, Serialize};
use taxi_shared::auth::{jwt, password};
use taxi_shared::models::Driver;
use tower_sessions::Session;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, LOGIN_URL},
    middleware::auth::SESSION_DRIVER_KEY,
};

/// Credentials, plus where to go after a browser login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,

    pub next: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,

    /// Seconds until the token expires
    pub expires_in: i64,
}

/// Only same-site absolute paths are followed after login
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

async fn authenticate(state: &AppState, req: &LoginRequest) -> ApiResult<Driver> {
    req.validate()?;

    let driver = state.store.find_driver_by_username(req.username.trim()).await?;
    let Some(driver) = driver else {
        warn!("Login attempt for unknown username");
        return Err(ApiError::Unauthorized(
            "Please enter a correct username and password.".to_string(),
        ));
    };

    if !password::verify_password(&req.password, &driver.password_hash)? {
        warn!(driver_id = %driver.id, "Login attempt with wrong password");
        return Err(ApiError::Unauthorized(
            "Please enter a correct username and password.".to_string(),
        ));
    }

    Ok(driver)
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Redirect> {
    let driver = authenticate(&state, &req).await?;

    // new session id on privilege change
    session.cycle_id().await?;
    session.insert(SESSION_DRIVER_KEY, driver.id).await?;

    info!(driver_id = %driver.id, "Driver logged in");
    Ok(Redirect::to(safe_next(req.next.as_deref())))
}

pub async fn logout(session: Session) -> ApiResult<Redirect> {
    session.flush().await?;
    Ok(Redirect::to(LOGIN_URL))
}

pub async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let driver = authenticate(&state, &req).await?;

    let claims = jwt::Claims::new(driver.id);
    let access_token = jwt::create_token(&claims, &state.config.auth.jwt_secret)?;

    info!(driver_id = %driver.id, "Issued access token");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: claims.expires_in(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(None), "/");
        assert_eq!(safe_next(Some("/cars/?page=2")), "/cars/?page=2");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
    }
}
