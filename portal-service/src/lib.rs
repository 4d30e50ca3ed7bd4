pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod policy;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use service_core::observability::make_request_span;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::PortalConfig;
use crate::handlers::billing::CRON_TOKEN_HEADER;
use crate::policy::{Access, PolicyTable};
use crate::services::{EmailProvider, JwtService, MongoDb, PaymentGateway, Repositories};

#[derive(Clone)]
pub struct AppState {
    pub config: PortalConfig,
    pub repos: Repositories,
    /// Present when running against MongoDB; used by the readiness probe.
    pub db: Option<MongoDb>,
    pub jwt: JwtService,
    pub policy: PolicyTable,
    pub email: Arc<dyn EmailProvider>,
    pub payments: Arc<dyn PaymentGateway>,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Derives the session service, policy table and rate limiters from
    /// `config`.
    pub fn new(
        config: PortalConfig,
        repos: Repositories,
        db: Option<MongoDb>,
        email: Arc<dyn EmailProvider>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );
        let register_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.register_attempts,
            config.rate_limit.register_window_seconds,
        );

        Self {
            jwt: JwtService::new(&config.session),
            policy: config.policy.table(),
            config,
            repos,
            db,
            email,
            payments,
            login_rate_limiter,
            register_rate_limiter,
        }
    }
}

fn guarded(state: &AppState, access: Access, routes: Router<AppState>) -> Router<AppState> {
    routes.layer(from_fn_with_state(
        (state.clone(), access),
        middleware::authorize,
    ))
}

fn cors_layer(config: &PortalConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(CRON_TOKEN_HEADER),
        ])
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    use handlers::{
        auth, billing, documents, donations, events, health, meetings, minutes, newsletter,
        registrations, sponsors, users,
    };

    let login_route = Router::new()
        .route("/api/auth/login", post(auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let register_route = Router::new()
        .route("/api/auth/register", post(auth::register))
        .layer(from_fn_with_state(
            state.register_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    // Readable by anyone; tagged content is filtered per caller.
    let open_routes = Router::new()
        .merge(login_route)
        .merge(register_route)
        .route("/api/auth/verify", get(auth::verify_email))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/events", get(events::list_events))
        .route("/api/events/:id", get(events::get_event))
        .route("/api/meetings", get(meetings::list_meetings))
        .route("/api/meetings/:id", get(meetings::get_meeting))
        .route("/api/minutes", get(minutes::list_minutes))
        .route("/api/minutes/:id", get(minutes::get_minute))
        .route("/api/documents", get(documents::list_documents))
        .route("/api/documents/:id", get(documents::get_document))
        .route("/api/sponsors", get(sponsors::list_sponsors))
        .route("/api/registrations", post(registrations::create_registration))
        .route("/api/newsletter/subscribe", post(newsletter::subscribe))
        .route("/api/newsletter/unsubscribe", post(newsletter::unsubscribe))
        .route("/api/donations", post(donations::create_donation))
        .route("/api/donations/verify", post(donations::verify_donation))
        .route("/api/donations/webhook", post(donations::webhook));

    let session_routes = Router::new().route("/api/auth/me", get(auth::me));

    let admin_routes = Router::new()
        .route("/api/users", get(users::list_users))
        .route("/api/users/invite", post(users::invite_user))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/users/:id/approve", post(users::approve_user))
        .route("/api/users/:id/decline", post(users::decline_user))
        .route("/api/events", post(events::create_event))
        .route(
            "/api/events/:id",
            patch(events::update_event).delete(events::delete_event),
        )
        .route("/api/meetings", post(meetings::create_meeting))
        .route(
            "/api/meetings/:id",
            patch(meetings::update_meeting).delete(meetings::delete_meeting),
        )
        .route("/api/minutes", post(minutes::create_minute))
        .route(
            "/api/minutes/:id",
            patch(minutes::update_minute).delete(minutes::delete_minute),
        )
        .route("/api/documents", post(documents::create_document))
        .route(
            "/api/documents/:id",
            patch(documents::update_document).delete(documents::delete_document),
        )
        .route("/api/sponsors", post(sponsors::create_sponsor))
        .route(
            "/api/sponsors/:id",
            patch(sponsors::update_sponsor).delete(sponsors::delete_sponsor),
        )
        .route("/api/registrations", get(registrations::list_registrations))
        .route(
            "/api/registrations/:id",
            get(registrations::get_registration)
                .patch(registrations::update_registration)
                .delete(registrations::delete_registration),
        )
        .route(
            "/api/registrations/:id/verify",
            post(registrations::verify_registration),
        )
        .route(
            "/api/newsletter/subscribers",
            get(newsletter::list_subscribers),
        )
        .route("/api/donations", get(donations::list_payments));

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        // Authenticated by the cron token, not by a session.
        .route("/api/billing/sweep", post(billing::run_sweep))
        .merge(guarded(&state, Access::Open, open_routes))
        .merge(guarded(&state, Access::Authenticated, session_routes))
        .merge(guarded(&state, Access::Admin, admin_routes))
        .with_state(state.clone())
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config));

    Ok(app)
}
