use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{SiteConfig, SmtpConfig};

/// An email triggered by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Verification {
        to: String,
        name: String,
        link: String,
    },
    Approved {
        to: String,
        name: String,
        membership_id: String,
    },
    Declined {
        to: String,
        name: String,
    },
    Invite {
        to: String,
        name: Option<String>,
        link: String,
    },
    RegistrationVerified {
        to: String,
        name: String,
        event_title: Option<String>,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Verification { .. } => "verification",
            Notification::Approved { .. } => "approved",
            Notification::Declined { .. } => "declined",
            Notification::Invite { .. } => "invite",
            Notification::RegistrationVerified { .. } => "registration_verified",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::Verification { to, .. }
            | Notification::Approved { to, .. }
            | Notification::Declined { to, .. }
            | Notification::Invite { to, .. }
            | Notification::RegistrationVerified { to, .. } => to,
        }
    }

    /// Subject and plain-text body.
    pub fn render(&self, organization: &str) -> (String, String) {
        match self {
            Notification::Verification { name, link, .. } => (
                format!("Verify your email for {}", organization),
                format!(
                    "Hello {},\n\nThank you for registering with {}. Please confirm your email address by visiting:\n\n{}\n\nOnce verified, an administrator will review your membership.",
                    name, organization, link
                ),
            ),
            Notification::Approved {
                name,
                membership_id,
                ..
            } => (
                format!("Welcome to {}", organization),
                format!(
                    "Hello {},\n\nYour membership has been approved. Your membership ID is {}.\n\nYou can now sign in to the members portal.",
                    name, membership_id
                ),
            ),
            Notification::Declined { name, .. } => (
                format!("Your {} membership application", organization),
                format!(
                    "Hello {},\n\nAfter review, your membership application was not approved. Please contact the secretariat if you believe this is a mistake.",
                    name
                ),
            ),
            Notification::Invite { name, link, .. } => (
                format!("You're invited to join {}", organization),
                format!(
                    "Hello {},\n\nYou have been invited to join {}. Create your account here:\n\n{}",
                    name.as_deref().unwrap_or("there"),
                    organization,
                    link
                ),
            ),
            Notification::RegistrationVerified {
                name, event_title, ..
            } => (
                "Your registration is confirmed".to_string(),
                match event_title {
                    Some(title) => format!(
                        "Hello {},\n\nYour registration for {} has been verified. We look forward to seeing you.",
                        name, title
                    ),
                    None => format!(
                        "Hello {},\n\nYour registration has been verified. We look forward to seeing you.",
                        name
                    ),
                },
            ),
        }
    }
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SmtpEmailService {
    mailer: SmtpTransport,
    from_address: String,
    organization: String,
}

impl SmtpEmailService {
    pub fn new(smtp: &SmtpConfig, site: &SiteConfig) -> Result<Self, AppError> {
        let mut builder = SmtpTransport::starttls_relay(&smtp.host)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e.to_string())))?
            .port(smtp.port)
            .timeout(Some(Duration::from_secs(10)));

        if !smtp.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                smtp.username.clone(),
                smtp.password.expose_secret().clone(),
            ));
        }

        tracing::info!(host = %smtp.host, port = smtp.port, "Email service initialized with SMTP relay");

        Ok(Self {
            mailer: builder.build(),
            from_address: smtp.from_address.clone(),
            organization: site.organization_name.clone(),
        })
    }
}

#[async_trait]
impl EmailProvider for SmtpEmailService {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        let (subject, body) = notification.render(&self.organization);
        let to = notification.recipient();

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e: lettre::address::AddressError| AppError::ConfigError(e.into()))?,
            )
            .to(to
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::BadRequest(format!("email: {}", e)))?)
            .subject(subject.as_str())
            .multipart(
                MultiPart::alternative().singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(body),
                ),
            )
            .map_err(|e| AppError::InternalError(e.into()))?;

        // SmtpTransport is blocking.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to, subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => Err(AppError::UpstreamError(anyhow::anyhow!(
                "SMTP delivery failed: {}",
                e
            ))),
        }
    }
}

/// Records notifications instead of sending them.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<Vec<Notification>>,
    failing: bool,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every send fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        if self.failing {
            return Err(AppError::UpstreamError(anyhow::anyhow!(
                "mock email provider is down"
            )));
        }
        self.sent
            .lock()
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("mock mailbox poisoned")))?
            .push(notification.clone());
        Ok(())
    }
}
