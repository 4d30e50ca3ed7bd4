//! Settling donations and charging recurring subscriptions.
//!
//! Payment and subscription records live in separate collections and are
//! written one after the other. A failure after the payment is settled is
//! logged; the settled payment is kept.

use chrono::{DateTime, Utc};
use service_core::error::AppError;

use crate::models::{Payment, PaymentStatus, Subscription, SubscriptionStatus};
use crate::services::payments::{ChargeRequest, GatewayStatus, PaymentGateway, Transaction};
use crate::services::repository::{ListFilter, Repositories};

/// Prefix of references created for one-off and first-time donations.
pub const DONATION_PREFIX: &str = "DON";
/// Prefix of references created by the recurring billing sweep.
pub const RENEWAL_PREFIX: &str = "SUB";

pub fn new_reference(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Applies a gateway verdict to the payment it refers to.
///
/// Settling an already successful payment is a no-op, so the verify call
/// and the webhook may both deliver the same outcome.
pub async fn settle(repos: &Repositories, transaction: &Transaction) -> Result<Payment, AppError> {
    let mut payment = repos
        .payments
        .find_one(&ListFilter::new().eq("reference", transaction.reference.as_str()))
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    if payment.status == PaymentStatus::Success {
        return Ok(payment);
    }

    let now = Utc::now();
    payment.status = match transaction.status {
        GatewayStatus::Success if transaction.amount != payment.amount => {
            tracing::error!(
                reference = %payment.reference,
                expected = payment.amount,
                reported = transaction.amount,
                "Gateway amount does not match the recorded payment"
            );
            PaymentStatus::Failed
        }
        GatewayStatus::Success => PaymentStatus::Success,
        GatewayStatus::Failed => PaymentStatus::Failed,
        GatewayStatus::Pending => return Ok(payment),
    };
    if payment.status == PaymentStatus::Success {
        payment.paid_at = Some(mongodb::bson::DateTime::from_chrono(now));
    }
    payment.updated_at = now;
    repos.payments.replace(&payment).await?;

    metrics::counter!("donations_total", "outcome" => payment.status.as_str()).increment(1);
    tracing::info!(
        reference = %payment.reference,
        status = payment.status.as_str(),
        "Payment settled"
    );

    if payment.status == PaymentStatus::Success {
        if let Some(subscription_id) = payment.subscription_id.clone() {
            if let Err(e) = activate(repos, &subscription_id, transaction, now).await {
                tracing::error!(
                    error = %e,
                    subscription_id = %subscription_id,
                    reference = %payment.reference,
                    "Payment settled but subscription activation failed"
                );
            }
        }
    }

    Ok(payment)
}

async fn activate(
    repos: &Repositories,
    subscription_id: &str,
    transaction: &Transaction,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let mut subscription = repos
        .subscriptions
        .get(subscription_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

    if subscription.status != SubscriptionStatus::Pending {
        return Ok(());
    }

    subscription.status = SubscriptionStatus::Active;
    subscription.authorization_code = transaction.authorization_code.clone();
    subscription.schedule_next(now);
    repos.subscriptions.replace(&subscription).await?;

    tracing::info!(subscription_id = %subscription.id, "Subscription activated");
    Ok(())
}

/// Tally of one billing sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub due: u64,
    pub charged: u64,
    /// Charges the gateway has not settled yet; the webhook finishes them.
    pub pending: u64,
    pub failed: u64,
}

/// Charges every subscription due at `now`.
///
/// Each subscription is handled on its own; one failing charge never stops
/// the rest of the sweep.
pub async fn sweep(
    repos: &Repositories,
    gateway: &dyn PaymentGateway,
    now: DateTime<Utc>,
) -> Result<SweepReport, AppError> {
    let active = repos
        .subscriptions
        .find_all(&ListFilter::new().eq("status", "active"))
        .await?;

    let mut report = SweepReport::default();
    for mut subscription in active.into_iter().filter(|s| s.is_due(now)) {
        report.due += 1;
        match renew(repos, gateway, &mut subscription, now).await {
            Ok(PaymentStatus::Success) => report.charged += 1,
            Ok(PaymentStatus::Pending) => report.pending += 1,
            Ok(PaymentStatus::Failed) => report.failed += 1,
            Err(e) => {
                report.failed += 1;
                tracing::error!(
                    error = %e,
                    subscription_id = %subscription.id,
                    "Subscription renewal failed"
                );
            }
        }
    }

    metrics::counter!("billing_charges_total", "outcome" => "success").increment(report.charged);
    metrics::counter!("billing_charges_total", "outcome" => "failed").increment(report.failed);
    tracing::info!(
        due = report.due,
        charged = report.charged,
        pending = report.pending,
        failed = report.failed,
        "Billing sweep finished"
    );

    Ok(report)
}

/// Charges one period and returns the status of its payment.
///
/// A pending charge still claims the period: the schedule advances so the
/// next sweep does not bill it again while the gateway settles.
async fn renew(
    repos: &Repositories,
    gateway: &dyn PaymentGateway,
    subscription: &mut Subscription,
    now: DateTime<Utc>,
) -> Result<PaymentStatus, AppError> {
    let authorization_code = subscription
        .authorization_code
        .clone()
        .ok_or_else(|| AppError::BadRequest("Subscription has no authorization".to_string()))?;

    let mut payment = Payment::pending(
        new_reference(RENEWAL_PREFIX),
        &subscription.email,
        subscription.name.clone(),
        subscription.amount,
        &subscription.currency,
        Some(subscription.id.clone()),
    );
    repos.payments.insert(&payment).await?;

    let transaction = gateway
        .charge_authorization(&ChargeRequest {
            email: subscription.email.clone(),
            amount: subscription.amount,
            currency: subscription.currency.clone(),
            reference: payment.reference.clone(),
            authorization_code,
        })
        .await?;

    payment.status = match transaction.status {
        GatewayStatus::Success => PaymentStatus::Success,
        GatewayStatus::Failed => PaymentStatus::Failed,
        GatewayStatus::Pending => PaymentStatus::Pending,
    };
    if payment.status == PaymentStatus::Success {
        payment.paid_at = Some(mongodb::bson::DateTime::from_chrono(now));
    }
    payment.updated_at = Utc::now();
    repos.payments.replace(&payment).await?;

    match payment.status {
        PaymentStatus::Failed => {
            tracing::warn!(
                subscription_id = %subscription.id,
                reference = %payment.reference,
                "Recurring charge was declined"
            );
            return Ok(payment.status);
        }
        PaymentStatus::Pending => tracing::info!(
            subscription_id = %subscription.id,
            reference = %payment.reference,
            "Recurring charge awaiting gateway confirmation"
        ),
        PaymentStatus::Success => {}
    }

    subscription.schedule_next(now);
    repos.subscriptions.replace(subscription).await?;
    Ok(payment.status)
}
