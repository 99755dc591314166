/// Integration tests for the login gate, sessions and bearer tokens

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{
    body_json, json_request, location, login_next, TestApp, ADMIN_PASSWORD, ADMIN_USERNAME,
    JWT_SECRET,
};
use serde_json::json;
use taxi_shared::auth::jwt;
use taxi_shared::models::Driver;
use taxi_shared::store::Deleter;
use uuid::Uuid;

#[tokio::test]
async fn test_protected_routes_redirect_to_login() {
    let ctx = TestApp::new().await;
    let id = Uuid::new_v4();

    let gets = vec![
        "/".to_string(),
        "/manufacturers/".to_string(),
        "/cars/".to_string(),
        "/drivers/".to_string(),
        format!("/cars/{}/", id),
        format!("/drivers/{}/", id),
    ];
    for uri in gets {
        let response = ctx
            .send(Request::builder().uri(&uri).body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::FOUND, "GET {}", uri);
        assert_eq!(login_next(&response).as_deref(), Some(uri.as_str()));
    }

    let posts = vec![
        "/manufacturers/create/".to_string(),
        format!("/manufacturers/{}/update/", id),
        format!("/manufacturers/{}/delete/", id),
        "/cars/create/".to_string(),
        format!("/cars/{}/update/", id),
        format!("/cars/{}/delete/", id),
        format!("/cars/{}/toggle-assign/", id),
        "/drivers/create/".to_string(),
        format!("/drivers/{}/update/", id),
        format!("/drivers/{}/delete/", id),
    ];
    for uri in posts {
        let response = ctx.send(json_request("POST", &uri, None, json!({}))).await;
        assert_eq!(response.status(), StatusCode::FOUND, "POST {}", uri);
        assert_eq!(login_next(&response).as_deref(), Some(uri.as_str()));
    }
}

#[tokio::test]
async fn test_next_keeps_query_string() {
    let ctx = TestApp::new().await;
    let response = ctx
        .send(
            Request::builder()
                .uri("/cars/?model=a&page=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "/accounts/login/?next=%2Fcars%2F%3Fmodel%3Da%26page%3D2"
    );
    assert_eq!(login_next(&response).as_deref(), Some("/cars/?model=a&page=2"));
}

#[tokio::test]
async fn test_public_routes_need_no_login() {
    let ctx = TestApp::new().await;
    let response = ctx
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let ctx = TestApp::new().await;
    assert!(ctx.login(ADMIN_USERNAME, "wrong-password").await.is_none());
    assert!(ctx.login("nobody", ADMIN_PASSWORD).await.is_none());

    let response = ctx
        .send(json_request(
            "POST",
            "/accounts/login/",
            None,
            json!({ "username": "nobody", "password": "whatever1" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_redirects_to_next() {
    let ctx = TestApp::new().await;
    let response = ctx
        .send(json_request(
            "POST",
            "/accounts/login/",
            None,
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD, "next": "/cars/" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cars/");

    let response = ctx
        .send(json_request(
            "POST",
            "/accounts/login/",
            None,
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD, "next": "//evil.example/" }),
        ))
        .await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let ctx = TestApp::new().await;
    assert_eq!(ctx.get("/").await.status(), StatusCode::OK);

    let response = ctx.post("/accounts/logout/", json!({})).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/accounts/login/");

    assert_eq!(ctx.get("/").await.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_deleted_driver_loses_access() {
    let ctx = TestApp::new().await;
    Deleter::<Driver>::delete(ctx.store.as_ref(), ctx.admin.id)
        .await
        .unwrap();

    let response = ctx.get("/cars/").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/accounts/login/?next=%2Fcars%2F");
}

#[tokio::test]
async fn test_visit_counter_is_per_session() {
    let ctx = TestApp::new().await;

    let first = body_json(ctx.get("/").await).await;
    assert_eq!(first["num_visits"], 1);
    assert_eq!(first["num_drivers"], 1);
    assert_eq!(first["num_cars"], 0);

    let second = body_json(ctx.get("/").await).await;
    assert_eq!(second["num_visits"], 2);

    // a fresh login starts a fresh session
    let other = ctx.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
    let response = ctx
        .send(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, other)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(body_json(response).await["num_visits"], 1);
}

#[tokio::test]
async fn test_bearer_token_grants_access() {
    let ctx = TestApp::new().await;
    let response = ctx
        .send(json_request(
            "POST",
            "/v1/auth/token",
            None,
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = ctx
        .send(
            Request::builder()
                .uri("/cars/")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .send(
            Request::builder()
                .uri("/cars/")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(login_next(&response).as_deref(), Some("/cars/"));
}

#[tokio::test]
async fn test_expired_token_redirects_to_login() {
    let ctx = TestApp::new().await;
    let mut claims = jwt::Claims::new(ctx.admin.id);
    claims.exp = claims.iat - 3600;
    let token = jwt::create_token(&claims, JWT_SECRET).unwrap();

    let response = ctx
        .send(
            Request::builder()
                .uri("/drivers/")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(login_next(&response).as_deref(), Some("/drivers/"));
}
