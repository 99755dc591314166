/// Login-required middleware
///
/// Every fleet route sits behind [`login_required`]. A request is
/// authenticated by either:
///
/// 1. the session cookie set by `POST /accounts/login/`, or
/// 2. an `Authorization: Bearer <token>` header from `POST /v1/auth/token`.
///
/// On success the handler receives an [`AuthContext`] extension carrying
/// the logged-in driver. Otherwise, including for an invalid or expired
/// token, the client is redirected to the login page with the requested
/// path in `next`.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use taxi_shared::auth::jwt;
use taxi_shared::models::Driver;
use taxi_shared::store::{Fetcher, StoreError};
use tower_sessions::Session;
use tracing::debug;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

/// Session key holding the logged-in driver id
pub const SESSION_DRIVER_KEY: &str = "driver_id";

/// How the request was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Session,
    Jwt,
}

/// The authenticated driver, inserted into request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub driver_id: Uuid,
    pub method: AuthMethod,
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn requested_path(req: &Request) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

/// Rejects anonymous requests with a redirect to the login page
pub async fn login_required(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let next_path = requested_path(&req);

    let (driver_id, method) = match session.get::<Uuid>(SESSION_DRIVER_KEY).await? {
        Some(id) => (id, AuthMethod::Session),
        None => match bearer_token(&req) {
            Some(token) => match jwt::validate_token(token, &state.config.auth.jwt_secret) {
                Ok(claims) => (claims.sub, AuthMethod::Jwt),
                Err(e) => {
                    debug!(path = %next_path, error = %e, "Rejected bearer token");
                    return Err(ApiError::AuthenticationRequired { next: next_path });
                }
            },
            None => {
                debug!(path = %next_path, "Anonymous request redirected to login");
                return Err(ApiError::AuthenticationRequired { next: next_path });
            }
        },
    };

    // The account may have been deleted since login
    match Fetcher::<Driver>::fetch(state.store.as_ref(), driver_id).await {
        Ok(_) => {}
        Err(StoreError::NotFound { .. }) => {
            if method == AuthMethod::Session {
                session.flush().await?;
            }
            return Err(ApiError::AuthenticationRequired { next: next_path });
        }
        Err(e) => return Err(e.into()),
    }

    req.extensions_mut().insert(AuthContext { driver_id, method });
    Ok(next.run(req).await)
}
