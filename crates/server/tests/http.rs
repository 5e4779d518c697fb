use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use connectors::{MxClient, OpenAiClient, PineconeClient};
use engine::notify::NoopNotifier;
use engine::{AuthTokens, Engine, MemoryCache, NewUser, User, credentials};
use migration::MigratorTrait;
use server::{ServerState, router};

async fn test_state() -> (ServerState, Arc<Engine>) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Arc::new(Engine::builder().database(db).build());

    let http = reqwest::Client::new();
    // Points at a closed port; tests below never reach the aggregator.
    let mx = MxClient::new(
        http.clone(),
        "http://127.0.0.1:1".to_string(),
        "client".to_string(),
        "key".to_string(),
    );
    let openai = OpenAiClient::new(
        http.clone(),
        "http://127.0.0.1:1".to_string(),
        "key".to_string(),
        "gpt-4o".to_string(),
        "text-embedding-3-small".to_string(),
        "gpt-4o-realtime-preview-2024-12-17".to_string(),
    );
    let pinecone = PineconeClient::new(
        http,
        "http://127.0.0.1:1".to_string(),
        "key".to_string(),
    );

    let auth = AuthTokens::new("access-secret", "refresh-secret", "moneta", "moneta-clients");
    let state = ServerState::new(
        engine.clone(),
        auth,
        mx,
        openai,
        pinecone,
        Arc::new(MemoryCache::new()),
        Arc::new(NoopNotifier),
    );
    (state, engine)
}

async fn seeded_user(engine: &Engine, email: &str, verified: bool) -> User {
    let user = engine
        .create_user(NewUser {
            email: email.to_string(),
            full_name: "Alice Example".to_string(),
            password_hash: credentials::hash_password("correct horse").unwrap(),
            phone_number: None,
            verification_method: "EMAIL".to_string(),
        })
        .await
        .unwrap();
    if verified {
        engine.mark_user_verified(user.id).await.unwrap();
    }
    engine.user_by_id(user.id).await.unwrap()
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, email: &str) -> (String, String) {
    let (status, body) = call(
        app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["data"]["access_token"].as_str().unwrap().to_string(),
        body["data"]["refresh_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn signup_rejects_invalid_payloads_with_field_errors() {
    let (state, _) = test_state().await;
    let app = router(state);

    let (status, body) = call(
        &app,
        "POST",
        "/v1/auth/signup",
        None,
        Some(json!({
            "email": "not-an-email",
            "password": "short",
            "full_name": "",
            "otp_delivery_method": "EMAIL"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["errors"].as_array().unwrap().len() >= 3);
}

#[tokio::test]
async fn signup_with_existing_email_is_a_conflict() {
    let (state, engine) = test_state().await;
    seeded_user(&engine, "alice@example.com", true).await;
    let app = router(state);

    let (status, body) = call(
        &app,
        "POST",
        "/v1/auth/signup",
        None,
        Some(json!({
            "email": "alice@example.com",
            "password": "correct horse",
            "full_name": "Alice Example",
            "otp_delivery_method": "EMAIL"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
}

#[tokio::test]
async fn login_rejects_unknown_users_and_wrong_passwords() {
    let (state, engine) = test_state().await;
    seeded_user(&engine, "alice@example.com", true).await;
    let app = router(state);

    let (status, _) = call(
        &app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "whatever" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_requires_a_verified_account() {
    let (state, engine) = test_state().await;
    seeded_user(&engine, "alice@example.com", false).await;
    let app = router(state);

    let (status, _) = call(
        &app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn otp_verification_consumes_the_token() {
    let (state, engine) = test_state().await;
    let user = seeded_user(&engine, "alice@example.com", false).await;
    engine
        .issue_otp(user.id, "123456", credentials::otp_expiry())
        .await
        .unwrap();
    let app = router(state);

    let (status, _) = call(
        &app,
        "POST",
        "/v1/auth/verify-otp",
        None,
        Some(json!({ "otp": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(engine.user_by_id(user.id).await.unwrap().is_verified);

    // A second attempt with the consumed token fails.
    let (status, _) = call(
        &app,
        "POST",
        "/v1/auth/verify-otp",
        None,
        Some(json!({ "otp": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_rotation_invalidates_the_old_token() {
    let (state, engine) = test_state().await;
    seeded_user(&engine, "alice@example.com", true).await;
    let app = router(state);

    let (_, refresh) = login(&app, "alice@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/v1/auth/refresh-token",
        None,
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access_token"].as_str().is_some());

    // The rotated-out token no longer works.
    let (status, _) = call(
        &app,
        "POST",
        "/v1/auth/refresh-token",
        None,
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let (state, _) = test_state().await;
    let app = router(state);

    let (status, _) = call(&app, "GET", "/v1/settings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/v1/settings", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn settings_round_trip() {
    let (state, engine) = test_state().await;
    seeded_user(&engine, "alice@example.com", true).await;
    let app = router(state);
    let (access, _) = login(&app, "alice@example.com").await;

    let (status, body) = call(&app, "GET", "/v1/settings", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["voice"], "verse");

    let (status, body) = call(
        &app,
        "PATCH",
        "/v1/settings",
        Some(&access),
        Some(json!({ "voice": "alloy" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["voice"], "alloy");

    let (status, _) = call(
        &app,
        "PATCH",
        "/v1/settings",
        Some(&access),
        Some(json!({ "voice": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn conversation_lifecycle_and_ownership() {
    let (state, engine) = test_state().await;
    seeded_user(&engine, "alice@example.com", true).await;
    seeded_user(&engine, "mallory@example.com", true).await;
    let app = router(state);
    let (alice, _) = login(&app, "alice@example.com").await;
    let (mallory, _) = login(&app, "mallory@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/v1/conversations",
        Some(&alice),
        Some(json!({
            "messages": [{
                "role": "user",
                "content": "How much did I spend on food?",
                "timestamp": "2025-07-01T12:00:00Z"
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert!(body["data"]["title"].as_str().unwrap().starts_with("conv_"));

    let (status, body) = call(&app, "GET", "/v1/conversations", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let uri = format!("/v1/conversations/{id}");
    let (status, body) = call(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["messages"].as_array().unwrap().len(), 1);

    // Another user cannot read, edit, or delete it.
    let (status, _) = call(&app, "GET", &uri, Some(&mallory), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(
        &app,
        "PATCH",
        &uri,
        Some(&mallory),
        Some(json!({ "title": "stolen" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "PATCH",
        &uri,
        Some(&alice),
        Some(json!({ "title": "Food questions" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let message_uri = format!("/v1/conversations/{id}/messages");
    let (status, _) = call(
        &app,
        "POST",
        &message_uri,
        Some(&alice),
        Some(json!({
            "role": "ai",
            "content": "You spent $60 on food.",
            "timestamp": "2025-07-01T12:00:05Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(body["data"]["messages"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["title"], "Food questions");

    let (status, _) = call(&app, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, "GET", "/v1/conversations", Some(&alice), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = call(
        &app,
        "GET",
        &format!("/v1/conversations/{}", uuid::Uuid::new_v4()),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn query_transactions_requires_a_query() {
    let (state, engine) = test_state().await;
    seeded_user(&engine, "alice@example.com", true).await;
    let app = router(state);
    let (access, _) = login(&app, "alice@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/v1/ai/query-transactions",
        Some(&access),
        Some(json!({ "query": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "query");
}

#[tokio::test]
async fn bank_routes_need_an_aggregator_link() {
    let (state, engine) = test_state().await;
    seeded_user(&engine, "alice@example.com", true).await;
    let app = router(state);
    let (access, _) = login(&app, "alice@example.com").await;

    // No linked aggregator user yet: 404, not an upstream call.
    let (status, _) = call(&app, "POST", "/v1/bank/connect", Some(&access), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
