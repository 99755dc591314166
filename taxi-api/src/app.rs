/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taxi_api::{app::{build_router, AppState}, config::Config};
/// use taxi_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::login_required, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taxi_shared::store::FleetStore;
use time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tower_sessions::{Expiry, MemoryStore as SessionStore, SessionManagerLayer};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Fleet records
    pub store: Arc<dyn FleetStore>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn FleetStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete router with all routes and middleware
///
/// ```text
/// /health                              public
/// /accounts/login/ , /accounts/logout/ public
/// /v1/auth/token                       public
/// /                                    login required
/// /manufacturers/...                   login required
/// /cars/...                            login required
/// /drivers/...                         login required
/// ```
///
/// Middleware, outermost first: security headers, CORS, tracing, sessions,
/// then login-required on the fleet routes only.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/accounts/login/", post(routes::accounts::login))
        .route("/accounts/logout/", post(routes::accounts::logout))
        .route("/v1/auth/token", post(routes::accounts::issue_token));

    let fleet_routes = Router::new()
        .route("/", get(routes::index::index))
        .route("/manufacturers/", get(routes::manufacturers::list))
        .route("/manufacturers/create/", post(routes::manufacturers::create))
        .route("/manufacturers/:id/update/", post(routes::manufacturers::update))
        .route("/manufacturers/:id/delete/", post(routes::manufacturers::delete))
        .route("/cars/", get(routes::cars::list))
        .route("/cars/create/", post(routes::cars::create))
        .route("/cars/:id/", get(routes::cars::detail))
        .route("/cars/:id/update/", post(routes::cars::update))
        .route("/cars/:id/delete/", post(routes::cars::delete))
        .route("/cars/:id/toggle-assign/", post(routes::cars::toggle_assign))
        .route("/drivers/", get(routes::drivers::list))
        .route("/drivers/create/", post(routes::drivers::create))
        .route("/drivers/:id/", get(routes::drivers::detail))
        .route("/drivers/:id/update/", post(routes::drivers::update))
        .route("/drivers/:id/delete/", post(routes::drivers::delete))
        .route_layer(from_fn_with_state(state.clone(), login_required));

    let sessions = SessionManagerLayer::new(SessionStore::default())
        .with_secure(state.config.auth.secure_cookies)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            state.config.auth.session_idle_seconds,
        )));

    Router::new()
        .merge(public_routes)
        .merge(fleet_routes)
        .layer(sessions)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
