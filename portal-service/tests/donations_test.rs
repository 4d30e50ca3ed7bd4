mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{spawn_app, spawn_app_with_config, test_config, TestApp, TestResponse, CRON_TOKEN};
use portal_service::models::{PaymentStatus, SubscriptionStatus};
use portal_service::policy::Role;
use portal_service::services::payments::GatewayStatus;
use portal_service::services::{MockPaymentGateway, ListFilter};
use secrecy::Secret;
use serde_json::{json, Value};

async fn deliver_webhook(app: &TestApp, body: &Value, signature: Option<&str>) -> TestResponse {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/donations/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-paystack-signature", signature);
    }
    app.send(builder.body(Body::from(body.to_string())).unwrap())
        .await
}

async fn run_sweep(app: &TestApp, token: Option<&str>) -> TestResponse {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/billing/sweep");
    if let Some(token) = token {
        builder = builder.header("x-cron-token", token);
    }
    app.send(builder.body(Body::empty()).unwrap()).await
}

fn charge_success(reference: &str, amount: i64) -> Value {
    json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "status": "success",
            "amount": amount,
            "authorization": { "authorization_code": "AUTH_card", "reusable": true }
        }
    })
}

#[tokio::test]
async fn one_off_donation_settles_on_verification() {
    let app = spawn_app().await;

    let created = app
        .post(
            "/api/donations",
            None,
            json!({ "email": "Donor@Example.org", "name": "Donor", "amount": 500000 }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let reference = created.body["reference"].as_str().unwrap().to_string();
    assert!(reference.starts_with("DON-"));
    assert!(created.body["authorizationUrl"]
        .as_str()
        .unwrap()
        .ends_with(&reference));
    assert!(created.body["subscriptionId"].is_null());

    let verified = app
        .post("/api/donations/verify", None, json!({ "reference": reference }))
        .await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["status"], "success");
    assert_eq!(verified.body["email"], "donor@example.org");
    assert!(verified.body["paidAt"].is_string());
}

#[tokio::test]
async fn abandoned_checkout_stays_pending() {
    let app = spawn_app().await;
    let created = app
        .post("/api/donations", None, json!({ "email": "donor@example.org", "amount": 1000 }))
        .await;
    let reference = created.body["reference"].as_str().unwrap();
    app.payments.set_outcome(reference, GatewayStatus::Pending);

    let verified = app
        .post("/api/donations/verify", None, json!({ "reference": reference }))
        .await;

    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["status"], "pending");
}

#[tokio::test]
async fn donations_below_the_minimum_are_rejected() {
    let app = spawn_app().await;

    let res = app
        .post("/api/donations", None, json!({ "email": "donor@example.org", "amount": 50 }))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.error().starts_with("amount:"));
}

#[tokio::test]
async fn signed_webhook_activates_a_recurring_donation() {
    let app = spawn_app().await;
    let created = app
        .post(
            "/api/donations",
            None,
            json!({ "email": "donor@example.org", "amount": 250000, "interval": "monthly" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let reference = created.body["reference"].as_str().unwrap();
    let subscription_id = created.body["subscriptionId"].as_str().unwrap();

    let body = charge_success(reference, 250000);
    let signature = app.payments.sign(body.to_string().as_bytes()).unwrap();
    let res = deliver_webhook(&app, &body, Some(&signature)).await;
    assert_eq!(res.status, StatusCode::OK);

    let subscription = app
        .state
        .repos
        .subscriptions
        .get(subscription_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert_eq!(subscription.authorization_code.as_deref(), Some("AUTH_card"));
    assert!(subscription.next_charge_at.is_some());

    let payment = app
        .state
        .repos
        .payments
        .find_one(&ListFilter::new().eq("reference", reference))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);

    // Redelivery changes nothing.
    let again = deliver_webhook(&app, &body, Some(&signature)).await;
    assert_eq!(again.status, StatusCode::OK);
}

#[tokio::test]
async fn unsigned_or_forged_webhooks_are_rejected() {
    let app = spawn_app().await;
    let created = app
        .post("/api/donations", None, json!({ "email": "donor@example.org", "amount": 1000 }))
        .await;
    let reference = created.body["reference"].as_str().unwrap();
    let body = charge_success(reference, 1000);

    let missing = deliver_webhook(&app, &body, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let forged = MockPaymentGateway::new("sk_attacker")
        .sign(body.to_string().as_bytes())
        .unwrap();
    let bad = deliver_webhook(&app, &body, Some(&forged)).await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);

    let payment = app
        .state
        .repos
        .payments
        .find_one(&ListFilter::new().eq("reference", reference))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn webhook_for_an_unknown_reference_is_acknowledged() {
    let app = spawn_app().await;
    let body = charge_success("DON-unknown", 1000);
    let signature = app.payments.sign(body.to_string().as_bytes()).unwrap();

    let res = deliver_webhook(&app, &body, Some(&signature)).await;

    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn payment_ledger_is_for_admins() {
    let app = spawn_app().await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;
    let (_, member) = app.signed_in("member@example.org", Role::Member).await;
    app.post("/api/donations", None, json!({ "email": "a@example.org", "amount": 1000 }))
        .await;
    let settled = app
        .post("/api/donations", None, json!({ "email": "b@example.org", "amount": 2000 }))
        .await;
    app.post(
        "/api/donations/verify",
        None,
        json!({ "reference": settled.body["reference"] }),
    )
    .await;

    assert_eq!(app.get("/api/donations", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/api/donations", Some(&member)).await.status, StatusCode::FORBIDDEN);

    let all = app.get("/api/donations", Some(&admin)).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["pagination"]["total"], 2);

    let success = app.get("/api/donations?status=success", Some(&admin)).await;
    assert_eq!(success.body["pagination"]["total"], 1);
    assert_eq!(success.body["data"][0]["email"], "b@example.org");
}

#[tokio::test]
async fn billing_sweep_requires_the_cron_token() {
    let app = spawn_app().await;

    assert_eq!(run_sweep(&app, None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(run_sweep(&app, Some("guess")).await.status, StatusCode::UNAUTHORIZED);

    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;
    let bearer_only = app.post("/api/billing/sweep", Some(&admin), json!({})).await;
    assert_eq!(bearer_only.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn billing_sweep_is_disabled_without_a_configured_token() {
    let mut config = test_config();
    config.billing.cron_token = Secret::new(String::new());
    let app = spawn_app_with_config(config).await;

    let res = run_sweep(&app, Some("")).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.error(), "Billing sweep is not enabled");
}

#[tokio::test]
async fn billing_sweep_charges_due_subscriptions() {
    let app = spawn_app().await;
    let created = app
        .post(
            "/api/donations",
            None,
            json!({ "email": "donor@example.org", "amount": 250000, "interval": "monthly" }),
        )
        .await;
    let reference = created.body["reference"].as_str().unwrap();
    let subscription_id = created.body["subscriptionId"].as_str().unwrap();
    app.post("/api/donations/verify", None, json!({ "reference": reference }))
        .await;

    let nothing_due = run_sweep(&app, Some(CRON_TOKEN)).await;
    assert_eq!(nothing_due.status, StatusCode::OK);
    assert_eq!(nothing_due.body, json!({ "due": 0, "charged": 0, "pending": 0, "failed": 0 }));

    let mut subscription = app
        .state
        .repos
        .subscriptions
        .get(subscription_id)
        .await
        .unwrap()
        .unwrap();
    subscription.next_charge_at = Some(mongodb::bson::DateTime::from_chrono(
        Utc::now() - Duration::hours(1),
    ));
    app.state.repos.subscriptions.replace(&subscription).await.unwrap();

    let swept = run_sweep(&app, Some(CRON_TOKEN)).await;
    assert_eq!(swept.status, StatusCode::OK);
    assert_eq!(swept.body, json!({ "due": 1, "charged": 1, "pending": 0, "failed": 0 }));

    let charges = app.payments.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].amount, 250000);
    assert_eq!(charges[0].authorization_code, MockPaymentGateway::AUTHORIZATION_CODE);

    let renewed = app
        .state
        .repos
        .subscriptions
        .get(subscription_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!renewed.is_due(Utc::now()));

    let payments = app.state.repos.payments.find_all(&ListFilter::new()).await.unwrap();
    assert_eq!(payments.len(), 2);
    assert!(payments
        .iter()
        .any(|p| p.reference.starts_with("SUB-") && p.status == PaymentStatus::Success));
}
