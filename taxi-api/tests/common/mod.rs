//! Common test utilities for router integration tests
//!
//! Every test gets its own in-memory store and router, seeded with one
//! logged-in driver. Requests go through the full middleware stack with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use taxi_api::app::{build_router, AppState};
use taxi_api::config::{ApiConfig, AuthConfig, Config, LogFormat, StorageBackend, StorageConfig};
use taxi_shared::auth::password::hash_password;
use taxi_shared::models::{Car, CarData, Driver, Manufacturer, ManufacturerForm, NewDriver};
use taxi_shared::store::{memory::MemoryStore, Creator};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "1qazcde3";

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            database_url: None,
            max_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: JWT_SECRET.to_string(),
            session_idle_seconds: 3600,
            secure_cookies: false,
        },
        log_format: LogFormat::Text,
    }
}

/// Test context: router, its store, and a logged-in driver
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub admin: Driver,

    /// `name=value` of the admin's session cookie
    pub cookie: String,
}

impl TestApp {
    /// Builds the router and logs the admin driver in
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let admin = create_driver(&store, ADMIN_USERNAME, ADMIN_PASSWORD, "ADM00001").await;

        let app = build_router(AppState::new(store.clone(), test_config()));
        let mut ctx = Self {
            app,
            store,
            admin,
            cookie: String::new(),
        };
        ctx.cookie = ctx
            .login(ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .expect("admin login should succeed");
        ctx
    }

    /// Logs in and returns the session cookie, or `None` if rejected
    pub async fn login(&self, username: &str, password: &str) -> Option<String> {
        let response = self
            .send(json_request(
                "POST",
                "/accounts/login/",
                None,
                serde_json::json!({ "username": username, "password": password }),
            ))
            .await;
        if response.status() != StatusCode::SEE_OTHER {
            return None;
        }
        session_cookie(&response)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Authenticated GET
    pub async fn get(&self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, &self.cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Authenticated POST with a JSON body
    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.send(json_request("POST", uri, Some(&self.cookie), body))
            .await
    }

    pub async fn manufacturer(&self, name: &str, country: &str) -> Manufacturer {
        Creator::<Manufacturer, ManufacturerForm>::create(
            self.store.as_ref(),
            ManufacturerForm {
                name: name.to_string(),
                country: country.to_string(),
            },
        )
        .await
        .unwrap()
    }

    pub async fn driver(&self, username: &str, license: &str) -> Driver {
        Creator::<Driver, NewDriver>::create(
            self.store.as_ref(),
            NewDriver {
                username: username.to_string(),
                password_hash: "unused".to_string(),
                first_name: "John".to_string(),
                last_name: "Doe".to_string(),
                email: None,
                license_number: license.to_string(),
            },
        )
        .await
        .unwrap()
    }

    pub async fn car(&self, model: &str, manufacturer: &Manufacturer, drivers: &[Uuid]) -> Car {
        Creator::<Car, CarData>::create(
            self.store.as_ref(),
            CarData {
                model: model.to_string(),
                manufacturer_id: manufacturer.id,
                driver_ids: drivers.to_vec(),
            },
        )
        .await
        .unwrap()
    }
}

pub async fn create_driver(store: &MemoryStore, username: &str, password: &str, license: &str) -> Driver {
    Creator::<Driver, NewDriver>::create(
        store,
        NewDriver {
            username: username.to_string(),
            password_hash: hash_password(password).unwrap(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            email: Some("admin@example.com".to_string()),
            license_number: license.to_string(),
        },
    )
    .await
    .unwrap()
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// `name=value` part of the response's `Set-Cookie` header
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Decoded `next` of a redirect to the login page
pub fn login_next(response: &Response) -> Option<String> {
    let (path, query) = location(response).split_once('?')?;
    assert_eq!(path, "/accounts/login/");
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "next")
        .map(|(_, value)| value.into_owned())
}

pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Field names listed in a 422 response
pub async fn error_fields(response: Response) -> Vec<String> {
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    body_json(response).await["details"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|d| d["field"].as_str().map(str::to_string))
        .collect()
}
