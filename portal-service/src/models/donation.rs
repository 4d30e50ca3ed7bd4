//! Donations: one-off payments and recurring subscriptions.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Quarterly,
    Yearly,
}

impl BillingInterval {
    fn months(&self) -> u32 {
        match self {
            BillingInterval::Monthly => 1,
            BillingInterval::Quarterly => 3,
            BillingInterval::Yearly => 12,
        }
    }

    /// The charge date one interval after `from`.
    pub fn advance(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let months = self.months();
        from.checked_add_months(Months::new(months))
            .unwrap_or_else(|| from + Duration::days(30 * i64::from(months)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
}

/// A gateway transaction, keyed by our own `reference`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    pub reference: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub paid_at: Option<mongodb::bson::DateTime>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn pending(
        reference: String,
        email: &str,
        name: Option<String>,
        amount: i64,
        currency: &str,
        subscription_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            reference,
            email: email.trim().to_lowercase(),
            name,
            amount,
            currency: currency.to_string(),
            status: PaymentStatus::Pending,
            subscription_id,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Minor currency units charged per interval.
    pub amount: i64,
    pub currency: String,
    pub interval: BillingInterval,
    pub status: SubscriptionStatus,
    /// Reusable card authorization returned by the gateway after the first
    /// successful charge.
    #[serde(default)]
    pub authorization_code: Option<String>,
    #[serde(default)]
    pub next_charge_at: Option<mongodb::bson::DateTime>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn pending(
        email: &str,
        name: Option<String>,
        amount: i64,
        currency: &str,
        interval: BillingInterval,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            email: email.trim().to_lowercase(),
            name,
            amount,
            currency: currency.to_string(),
            interval,
            status: SubscriptionStatus::Pending,
            authorization_code: None,
            next_charge_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Active, holding an authorization, and scheduled at or before `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.authorization_code.is_some()
            && self
                .next_charge_at
                .map(|at| at.to_chrono() <= now)
                .unwrap_or(false)
    }

    pub fn schedule_next(&mut self, from: DateTime<Utc>) {
        self.next_charge_at = Some(mongodb::bson::DateTime::from_chrono(
            self.interval.advance(from),
        ));
        self.updated_at = Utc::now();
    }
}

impl Resource for Payment {
    const COLLECTION: &'static str = "payments";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Resource for Subscription {
    const COLLECTION: &'static str = "subscriptions";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn intervals_advance_by_calendar_months() {
        let from = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        assert_eq!(
            BillingInterval::Monthly.advance(from),
            Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap()
        );
        assert_eq!(
            BillingInterval::Yearly.advance(from),
            Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn only_active_authorized_overdue_subscriptions_are_due() {
        let now = Utc::now();
        let mut sub = Subscription::pending("a@b.org", None, 5000, "NGN", BillingInterval::Monthly);
        sub.next_charge_at = Some(mongodb::bson::DateTime::from_chrono(now - Duration::days(1)));
        assert!(!sub.is_due(now));

        sub.status = SubscriptionStatus::Active;
        assert!(!sub.is_due(now));

        sub.authorization_code = Some("AUTH_1".into());
        assert!(sub.is_due(now));

        sub.schedule_next(now);
        assert!(!sub.is_due(now));
    }
}
