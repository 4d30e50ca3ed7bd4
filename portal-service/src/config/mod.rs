use secrecy::Secret;
use service_core::config::{self as core_config, get_env, parse_env};
use service_core::error::AppError;
use std::env;

use crate::policy::{PolicyTable, Role};

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub mongodb: MongoConfig,
    pub session: SessionConfig,
    pub policy: PolicyConfig,
    pub smtp: SmtpConfig,
    pub paystack: PaystackConfig,
    pub billing: BillingConfig,
    pub site: SiteConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" | "local" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub jwt_secret: Secret<String>,
    pub ttl_days: i64,
    pub cookie_name: String,
    /// Adds the `Secure` attribute to the session cookie.
    pub cookie_secure: bool,
    /// Re-read the caller's role from the store on every request instead of
    /// trusting the role embedded in the token.
    pub reverify_role: bool,
}

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub admin_roles: Vec<Role>,
}

impl PolicyConfig {
    pub fn table(&self) -> PolicyTable {
        PolicyTable::new(self.admin_roles.iter().copied())
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret<String>,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub secret_key: Secret<String>,
    pub api_base_url: String,
    pub callback_url: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub cron_token: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Public origin used when building links in outgoing emails.
    pub frontend_url: String,
    pub organization_name: String,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub register_attempts: u32,
    pub register_window_seconds: u64,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let environment: Environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Prod;

        let admin_roles = PolicyTable::from_list(&get_env(
            "ADMIN_ROLES",
            Some("admin,superadmin"),
            false,
        )?)?
        .admin_roles()
        .collect();

        Ok(PortalConfig {
            common,
            environment,
            service_name: get_env("SERVICE_NAME", Some("portal-service"), false)?,
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("portal"), is_prod)?,
            },
            session: SessionConfig {
                jwt_secret: Secret::new(get_env("JWT_SECRET", Some("dev-only-secret"), is_prod)?),
                ttl_days: parse_env(
                    "SESSION_TTL_DAYS",
                    &get_env("SESSION_TTL_DAYS", Some("7"), false)?,
                )?,
                cookie_name: get_env("SESSION_COOKIE_NAME", Some("token"), false)?,
                cookie_secure: is_prod,
                reverify_role: parse_env(
                    "SESSION_REVERIFY_ROLE",
                    &get_env("SESSION_REVERIFY_ROLE", Some("true"), false)?,
                )?,
            },
            policy: PolicyConfig { admin_roles },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("localhost"), is_prod)?,
                port: parse_env("SMTP_PORT", &get_env("SMTP_PORT", Some("587"), false)?)?,
                username: get_env("SMTP_USERNAME", Some(""), is_prod)?,
                password: Secret::new(get_env("SMTP_PASSWORD", Some(""), is_prod)?),
                from_address: get_env(
                    "SMTP_FROM_ADDRESS",
                    Some("Portal <no-reply@localhost>"),
                    is_prod,
                )?,
            },
            paystack: PaystackConfig {
                secret_key: Secret::new(get_env("PAYSTACK_SECRET_KEY", Some(""), is_prod)?),
                api_base_url: get_env(
                    "PAYSTACK_API_BASE_URL",
                    Some("https://api.paystack.co"),
                    false,
                )?,
                callback_url: get_env(
                    "PAYSTACK_CALLBACK_URL",
                    Some("http://localhost:3000/donate/callback"),
                    is_prod,
                )?,
                currency: get_env("PAYSTACK_CURRENCY", Some("NGN"), false)?,
            },
            billing: BillingConfig {
                cron_token: Secret::new(get_env("BILLING_CRON_TOKEN", Some(""), is_prod)?),
            },
            site: SiteConfig {
                frontend_url: get_env("FRONTEND_URL", Some("http://localhost:3000"), is_prod)?,
                organization_name: get_env("ORGANIZATION_NAME", Some("The Club"), false)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
            rate_limit: RateLimitConfig {
                login_attempts: parse_env(
                    "RATE_LIMIT_LOGIN_ATTEMPTS",
                    &get_env("RATE_LIMIT_LOGIN_ATTEMPTS", Some("5"), false)?,
                )?,
                login_window_seconds: parse_env(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    &get_env("RATE_LIMIT_LOGIN_WINDOW_SECONDS", Some("900"), false)?,
                )?,
                register_attempts: parse_env(
                    "RATE_LIMIT_REGISTER_ATTEMPTS",
                    &get_env("RATE_LIMIT_REGISTER_ATTEMPTS", Some("5"), false)?,
                )?,
                register_window_seconds: parse_env(
                    "RATE_LIMIT_REGISTER_WINDOW_SECONDS",
                    &get_env("RATE_LIMIT_REGISTER_WINDOW_SECONDS", Some("3600"), false)?,
                )?,
            },
        })
    }

    pub fn is_prod(&self) -> bool {
        self.environment == Environment::Prod
    }
}
