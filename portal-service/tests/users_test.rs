mod common;

use axum::http::StatusCode;
use common::{spawn_app, spawn_app_with, spawn_app_with_config, test_config, PASSWORD, PAYSTACK_SECRET};
use portal_service::policy::Role;
use portal_service::services::{MockEmailService, MockPaymentGateway, Notification};
use serde_json::json;

#[tokio::test]
async fn approving_a_pending_user_lets_them_sign_in_as_member() {
    let app = spawn_app().await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;
    let pending = app.seed_user("applicant@example.org", Role::Pending, true).await;

    let res = app
        .post(
            &format!("/api/users/{}/approve", pending.id),
            Some(&admin),
            json!({ "membershipId": "EKO-123" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["role"], "member");
    assert_eq!(res.body["membershipId"], "EKO-123");

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "applicant@example.org", "password": PASSWORD }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["user"]["role"], "member");
    let token = login.body["token"].as_str().unwrap();
    assert_eq!(app.jwt.verify(token).unwrap().role, Role::Member);

    assert!(app.email.sent().iter().any(|n| matches!(
        n,
        Notification::Approved { membership_id, .. } if membership_id == "EKO-123"
    )));
}

#[tokio::test]
async fn approval_without_membership_id_changes_nothing() {
    let app = spawn_app().await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;
    let pending = app.seed_user("applicant@example.org", Role::Pending, true).await;
    let uri = format!("/api/users/{}/approve", pending.id);

    for body in [json!({}), json!({ "membershipId": "   " })] {
        let res = app.post(&uri, Some(&admin), body).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.error(),
            "membershipId: membershipId is required to approve a member"
        );
    }

    let stored = app.state.repos.users.get(&pending.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Pending);
    assert!(stored.membership_id.is_none());
    assert!(app.email.sent().is_empty());
}

#[tokio::test]
async fn only_verified_pending_users_can_be_approved() {
    let app = spawn_app().await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;
    let member = app.seed_user("member@example.org", Role::Member, true).await;
    let unverified = app.seed_user("fresh@example.org", Role::Pending, false).await;

    for id in [&member.id, &unverified.id] {
        let res = app
            .post(
                &format!("/api/users/{}/approve", id),
                Some(&admin),
                json!({ "membershipId": "EKO-9" }),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    let missing = app
        .post(
            "/api/users/missing/approve",
            Some(&admin),
            json!({ "membershipId": "EKO-9" }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn declined_users_are_blocked_until_an_admin_edits_them() {
    let app = spawn_app().await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;
    let pending = app.seed_user("applicant@example.org", Role::Pending, true).await;

    let declined = app
        .post(
            &format!("/api/users/{}/decline", pending.id),
            Some(&admin),
            json!({}),
        )
        .await;
    assert_eq!(declined.status, StatusCode::OK);
    assert_eq!(declined.body["role"], "blocked");
    assert!(matches!(
        app.email.sent().as_slice(),
        [Notification::Declined { .. }]
    ));

    let approve = app
        .post(
            &format!("/api/users/{}/approve", pending.id),
            Some(&admin),
            json!({ "membershipId": "EKO-1" }),
        )
        .await;
    assert_eq!(approve.status, StatusCode::BAD_REQUEST);

    let restored = app
        .patch(
            &format!("/api/users/{}", pending.id),
            Some(&admin),
            json!({ "role": "member", "membershipId": "EKO-77" }),
        )
        .await;
    assert_eq!(restored.status, StatusCode::OK);
    assert_eq!(restored.body["role"], "member");
}

#[tokio::test]
async fn public_is_not_an_assignable_role() {
    let app = spawn_app().await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;
    let member = app.seed_user("member@example.org", Role::Member, true).await;

    let res = app
        .patch(
            &format!("/api/users/{}", member.id),
            Some(&admin),
            json!({ "role": "public" }),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn superadmin_is_admitted_by_every_admin_route() {
    let app = spawn_app().await;
    let (_, root) = app.signed_in("root@example.org", Role::Superadmin).await;
    let pending = app.seed_user("applicant@example.org", Role::Pending, true).await;

    for uri in [
        "/api/users",
        "/api/registrations",
        "/api/newsletter/subscribers",
        "/api/donations",
    ] {
        let res = app.get(uri, Some(&root)).await;
        assert_eq!(res.status, StatusCode::OK, "{}", uri);
    }

    let approve = app
        .post(
            &format!("/api/users/{}/approve", pending.id),
            Some(&root),
            json!({ "membershipId": "EKO-5" }),
        )
        .await;
    assert_eq!(approve.status, StatusCode::OK);

    let sponsor = app
        .post("/api/sponsors", Some(&root), json!({ "name": "Acme" }))
        .await;
    assert_eq!(sponsor.status, StatusCode::CREATED);
}

#[tokio::test]
async fn superadmin_follows_the_configured_policy_table() {
    let mut config = test_config();
    config.policy.admin_roles = vec![Role::Admin];
    let app = spawn_app_with_config(config).await;
    let (_, root) = app.signed_in("root@example.org", Role::Superadmin).await;

    for uri in ["/api/users", "/api/registrations", "/api/donations"] {
        let res = app.get(uri, Some(&root)).await;
        assert_eq!(res.status, StatusCode::FORBIDDEN, "{}", uri);
    }
}

#[tokio::test]
async fn admin_routes_distinguish_anonymous_from_unprivileged() {
    let app = spawn_app().await;
    let (_, member) = app.signed_in("member@example.org", Role::Member).await;
    let (_, exco) = app.signed_in("exco@example.org", Role::Exco).await;

    assert_eq!(app.get("/api/users", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.get("/api/users", Some("not-a-token")).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(app.get("/api/users", Some(&member)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/api/users", Some(&exco)).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn demoted_admin_loses_access_on_the_next_request() {
    let app = spawn_app().await;
    let (mut admin, token) = app.signed_in("admin@example.org", Role::Admin).await;
    assert_eq!(app.get("/api/users", Some(&token)).await.status, StatusCode::OK);

    admin.role = Role::Member;
    app.state.repos.users.replace(&admin).await.unwrap();

    assert_eq!(app.get("/api/users", Some(&token)).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn without_reverification_the_token_role_is_trusted() {
    let mut config = test_config();
    config.session.reverify_role = false;
    let app = spawn_app_with_config(config).await;
    let (mut admin, token) = app.signed_in("admin@example.org", Role::Admin).await;

    admin.role = Role::Member;
    app.state.repos.users.replace(&admin).await.unwrap();

    assert_eq!(app.get("/api/users", Some(&token)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn failed_notification_does_not_undo_the_approval() {
    let app = spawn_app_with(
        test_config(),
        MockEmailService::failing(),
        MockPaymentGateway::new(PAYSTACK_SECRET),
    )
    .await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;
    let pending = app.seed_user("applicant@example.org", Role::Pending, true).await;

    let res = app
        .post(
            &format!("/api/users/{}/approve", pending.id),
            Some(&admin),
            json!({ "membershipId": "EKO-123" }),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    let stored = app.state.repos.users.get(&pending.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Member);
    assert_eq!(stored.membership_id.as_deref(), Some("EKO-123"));
}

#[tokio::test]
async fn user_list_filters_by_role_and_paginates() {
    let app = spawn_app().await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;
    for i in 0..3 {
        app.seed_user(&format!("p{}@example.org", i), Role::Pending, true).await;
    }
    app.seed_user("m@example.org", Role::Member, true).await;

    let res = app.get("/api/users?role=pending&limit=2", Some(&admin)).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["pagination"]["total"], 3);
    assert_eq!(res.body["pagination"]["pages"], 2);
    assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admins_cannot_delete_themselves() {
    let app = spawn_app().await;
    let (admin_user, admin) = app.signed_in("admin@example.org", Role::Admin).await;
    let other = app.seed_user("member@example.org", Role::Member, true).await;

    let own = app.delete(&format!("/api/users/{}", admin_user.id), Some(&admin)).await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);

    let res = app.delete(&format!("/api/users/{}", other.id), Some(&admin)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(app.state.repos.users.get(&other.id).await.unwrap().is_none());
}

#[tokio::test]
async fn invitations_send_a_registration_link() {
    let app = spawn_app().await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;
    app.seed_user("member@example.org", Role::Member, true).await;

    let res = app
        .post(
            "/api/users/invite",
            Some(&admin),
            json!({ "email": "guest@example.org", "name": "Guest" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::ACCEPTED);
    assert!(matches!(
        app.email.sent().as_slice(),
        [Notification::Invite { link, .. }]
            if link == "http://localhost:3000/register?email=guest%40example.org"
    ));

    let existing = app
        .post(
            "/api/users/invite",
            Some(&admin),
            json!({ "email": "member@example.org" }),
        )
        .await;
    assert_eq!(existing.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invitation_links_encode_the_address() {
    let app = spawn_app().await;
    let (_, admin) = app.signed_in("admin@example.org", Role::Admin).await;

    let res = app
        .post(
            "/api/users/invite",
            Some(&admin),
            json!({ "email": "first+club&co@example.org" }),
        )
        .await;

    assert_eq!(res.status, StatusCode::ACCEPTED);
    assert!(matches!(
        app.email.sent().as_slice(),
        [Notification::Invite { link, .. }]
            if link.ends_with("?email=first%2Bclub%26co%40example.org")
    ));
}
