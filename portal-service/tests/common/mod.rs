#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use portal_service::{
    build_router,
    config::{
        BillingConfig, Environment, MongoConfig, PaystackConfig, PolicyConfig, PortalConfig,
        RateLimitConfig, SecurityConfig, SessionConfig, SiteConfig, SmtpConfig,
    },
    models::{Event, EventCategory, Resource, User},
    policy::{Audience, Role},
    services::{
        EmailProvider, JwtService, ListFilter, MockEmailService, MockPaymentGateway, Page,
        PageRequest, PaymentGateway, Repositories, Repository, SessionClaims,
    },
    utils::hash_password,
    AppState,
};
use secrecy::Secret;
use serde_json::Value;
use service_core::error::AppError;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const PAYSTACK_SECRET: &str = "sk_test_portal";
pub const CRON_TOKEN: &str = "cron-test-token";
pub const PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> PortalConfig {
    PortalConfig {
        common: service_core::config::Config {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        environment: Environment::Dev,
        service_name: "portal-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        mongodb: MongoConfig {
            uri: "mongodb://unused".to_string(),
            database: "unused".to_string(),
        },
        session: SessionConfig {
            jwt_secret: Secret::new(JWT_SECRET.to_string()),
            ttl_days: 7,
            cookie_name: "token".to_string(),
            cookie_secure: false,
            reverify_role: true,
        },
        policy: PolicyConfig {
            admin_roles: vec![Role::Admin, Role::Superadmin],
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: String::new(),
            password: Secret::new(String::new()),
            from_address: "Portal <no-reply@example.org>".to_string(),
        },
        paystack: PaystackConfig {
            secret_key: Secret::new(PAYSTACK_SECRET.to_string()),
            api_base_url: "http://paystack.invalid".to_string(),
            callback_url: "http://localhost:3000/donate/callback".to_string(),
            currency: "NGN".to_string(),
        },
        billing: BillingConfig {
            cron_token: Secret::new(CRON_TOKEN.to_string()),
        },
        site: SiteConfig {
            frontend_url: "http://localhost:3000".to_string(),
            organization_name: "The Club".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
            register_attempts: 100,
            register_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub email: Arc<MockEmailService>,
    pub payments: Arc<MockPaymentGateway>,
    pub jwt: JwtService,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(), MockEmailService::new(), MockPaymentGateway::new(PAYSTACK_SECRET)).await
}

pub async fn spawn_app_with_config(config: PortalConfig) -> TestApp {
    spawn_app_with(config, MockEmailService::new(), MockPaymentGateway::new(PAYSTACK_SECRET)).await
}

pub async fn spawn_app_with(
    config: PortalConfig,
    email: MockEmailService,
    payments: MockPaymentGateway,
) -> TestApp {
    spawn_app_with_repos(config, Repositories::in_memory(), email, payments).await
}

pub async fn spawn_app_with_repos(
    config: PortalConfig,
    repos: Repositories,
    email: MockEmailService,
    payments: MockPaymentGateway,
) -> TestApp {
    let email = Arc::new(email);
    let payments = Arc::new(payments);
    let state = AppState::new(
        config,
        repos,
        None,
        email.clone() as Arc<dyn EmailProvider>,
        payments.clone() as Arc<dyn PaymentGateway>,
    );
    let router = build_router(state.clone()).await.expect("router builds");

    TestApp {
        router,
        jwt: state.jwt.clone(),
        state,
        email,
        payments,
    }
}

/// Wraps a store whose reads can be switched to fail, as if the database
/// went away after the fixtures were written.
pub struct FlakyRepository<T: Resource> {
    inner: Arc<dyn Repository<T>>,
    down: AtomicBool,
}

impl<T: Resource> FlakyRepository<T> {
    pub fn new(inner: Arc<dyn Repository<T>>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            down: AtomicBool::new(false),
        })
    }

    pub fn fail_reads(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "{} is unavailable",
                T::COLLECTION
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Resource> Repository<T> for FlakyRepository<T> {
    async fn list(&self, filter: &ListFilter, page: PageRequest) -> Result<Page<T>, AppError> {
        self.check()?;
        self.inner.list(filter, page).await
    }

    async fn find_all(&self, filter: &ListFilter) -> Result<Vec<T>, AppError> {
        self.check()?;
        self.inner.find_all(filter).await
    }

    async fn find_one(&self, filter: &ListFilter) -> Result<Option<T>, AppError> {
        self.check()?;
        self.inner.find_one(filter).await
    }

    async fn get(&self, id: &str) -> Result<Option<T>, AppError> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn insert(&self, item: &T) -> Result<(), AppError> {
        self.inner.insert(item).await
    }

    async fn replace(&self, item: &T) -> Result<bool, AppError> {
        self.inner.replace(item).await
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        self.inner.delete(id).await
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Sends a request, authenticated with a bearer token when given.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.call(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.call(Method::DELETE, uri, token, None).await
    }

    /// Stores a user with the given role. Pending users are stored with a
    /// verified email unless `email_verified` says otherwise.
    pub async fn seed_user(&self, email: &str, role: Role, email_verified: bool) -> User {
        let mut user = User::new_pending(
            email.split('@').next().unwrap_or("user").to_string(),
            email,
            hash_password(PASSWORD).expect("password hashes"),
            None,
        );
        user.role = role;
        user.email_verified = email_verified;
        if email_verified {
            user.verification_token = None;
        }
        self.state.repos.users.insert(&user).await.expect("user stored");
        user
    }

    /// Seeds a user and returns it with a valid session token.
    pub async fn signed_in(&self, email: &str, role: Role) -> (User, String) {
        let user = self.seed_user(email, role, true).await;
        let token = self.jwt.issue(&user.id, role).expect("token issues");
        (user, token)
    }

    pub async fn seed_event(&self, title: &str, meant_for: &[Audience]) -> Event {
        let now = Utc::now();
        let event = Event {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: String::new(),
            venue: "Main hall".to_string(),
            date_from: now,
            date_to: now + Duration::hours(2),
            meant_for: meant_for.to_vec(),
            category: EventCategory::General,
            convention_type: None,
            video: None,
            videos: Vec::new(),
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        self.state.repos.events.insert(&event).await.expect("event stored");
        event
    }
}

/// A correctly signed token whose expiry has passed.
pub fn expired_token(user_id: &str, role: Role) -> String {
    let past = Utc::now() - Duration::days(8);
    let claims = SessionClaims {
        sub: user_id.to_string(),
        role,
        iat: past.timestamp(),
        exp: (past + Duration::days(7)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token encodes")
}

/// Titles of a paginated list response, in order.
pub fn titles(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["title"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
