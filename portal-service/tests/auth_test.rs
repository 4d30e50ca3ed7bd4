mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{spawn_app, spawn_app_with_repos, test_config, FlakyRepository, PASSWORD, PAYSTACK_SECRET};
use portal_service::policy::{Audience, Role};
use portal_service::services::{MockEmailService, MockPaymentGateway, Notification, Repositories};
use serde_json::json;

fn login_body(email: &str, password: &str) -> serde_json::Value {
    json!({ "email": email, "password": password })
}

#[tokio::test]
async fn register_verify_then_login_after_approval() {
    let app = spawn_app().await;

    let res = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "name": "Ngozi",
                "email": "Ngozi@Example.org",
                "password": PASSWORD
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user"]["role"], "pending");
    assert_eq!(res.body["user"]["email"], "ngozi@example.org");
    assert!(res.body["user"].get("passwordHash").is_none());

    // Unverified pending accounts cannot sign in.
    let early = app
        .post("/api/auth/login", None, login_body("ngozi@example.org", PASSWORD))
        .await;
    assert_eq!(early.status, StatusCode::FORBIDDEN);

    let sent = app.email.sent();
    let link = match sent.as_slice() {
        [Notification::Verification { link, .. }] => link.clone(),
        other => panic!("expected one verification mail, got {:?}", other),
    };
    let token = link.split("token=").nth(1).unwrap();

    let verified = app
        .get(&format!("/api/auth/verify?token={}", token), None)
        .await;
    assert_eq!(verified.status, StatusCode::OK);

    let reused = app
        .get(&format!("/api/auth/verify?token={}", token), None)
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let app = spawn_app().await;
    app.seed_user("taken@example.org", Role::Member, true).await;

    let res = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "Again", "email": "TAKEN@example.org", "password": PASSWORD }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_validates_fields() {
    let app = spawn_app().await;

    let res = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "Short", "email": "not-an-email", "password": "short" }),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.error().contains("email:"));
    assert!(res.error().contains("password:"));
}

#[tokio::test]
async fn verify_without_token_is_bad_request() {
    let app = spawn_app().await;
    let res = app.get("/api/auth/verify", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blocked_user_is_refused_whatever_the_password() {
    let app = spawn_app().await;
    app.seed_user("blocked@example.org", Role::Blocked, true).await;

    for password in [PASSWORD, "wrong-password-entirely"] {
        let res = app
            .post("/api/auth/login", None, login_body("blocked@example.org", password))
            .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_both_401() {
    let app = spawn_app().await;
    app.seed_user("member@example.org", Role::Member, true).await;

    let wrong = app
        .post("/api/auth/login", None, login_body("member@example.org", "not-the-password"))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let unknown = app
        .post("/api/auth/login", None, login_body("nobody@example.org", PASSWORD))
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.error(), unknown.error());
}

#[tokio::test]
async fn login_sets_a_strict_http_only_cookie_and_returns_the_token() {
    let app = spawn_app().await;
    app.seed_user("member@example.org", Role::Member, true).await;

    let res = app
        .post("/api/auth/login", None, login_body("member@example.org", PASSWORD))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["role"], "member");
    let token = res.body["token"].as_str().unwrap();
    assert_eq!(app.jwt.verify(token).unwrap().role, Role::Member);

    let cookie = res
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with(&format!("token={}", token)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(cookie.contains("Path=/"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn me_requires_a_session() {
    let app = spawn_app().await;
    let (user, token) = app.signed_in("member@example.org", Role::Member).await;

    let anonymous = app.get("/api/auth/me", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let me = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["id"], user.id.as_str());
}

#[tokio::test]
async fn cookie_takes_precedence_over_bearer_header() {
    let app = spawn_app().await;
    let (_, member) = app.signed_in("member@example.org", Role::Member).await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/users")
        .header(header::COOKIE, format!("token={}", member))
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::empty())
        .unwrap();
    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/users")
        .header(header::COOKIE, format!("token={}", admin))
        .body(Body::empty())
        .unwrap();
    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let app = spawn_app().await;

    let res = app.call(Method::POST, "/api/auth/logout", None, None).await;

    assert_eq!(res.status, StatusCode::OK);
    let cookie = res
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn login_is_rate_limited_per_ip() {
    let mut config = common::test_config();
    config.rate_limit.login_attempts = 2;
    let app = common::spawn_app_with_config(config).await;

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(
                login_body("nobody@example.org", PASSWORD).to_string(),
            ))
            .unwrap();
        statuses.push(app.send(request).await.status);
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::UNAUTHORIZED,
            StatusCode::UNAUTHORIZED,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = spawn_app().await;
    let res = app.get("/health", None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.headers.contains_key("x-request-id"));
    assert_eq!(
        res.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn unreadable_user_store_degrades_sessions_to_anonymous() {
    let mut repos = Repositories::in_memory();
    let users = FlakyRepository::new(repos.users.clone());
    repos.users = users.clone();
    let app = spawn_app_with_repos(
        test_config(),
        repos,
        MockEmailService::new(),
        MockPaymentGateway::new(PAYSTACK_SECRET),
    )
    .await;
    app.seed_event("Open day", &[Audience::Public]).await;
    app.seed_event("Members dinner", &[Audience::Member]).await;
    let (_, member) = app.signed_in("member@example.org", Role::Member).await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;

    users.fail_reads();

    let events = app.get("/api/events", Some(&member)).await;
    assert_eq!(events.status, StatusCode::OK);
    assert_eq!(events.body["pagination"]["total"], 1);
    assert_eq!(events.body["data"][0]["title"], "Open day");

    let listing = app.get("/api/users", Some(&admin)).await;
    assert_eq!(listing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(listing.error(), "Invalid token");
}
