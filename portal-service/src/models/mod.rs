pub mod content;
pub mod donation;
pub mod registration;
pub mod sponsor;
pub mod subscriber;
pub mod user;

pub use content::{ConventionType, Document, Event, EventCategory, Meeting, Minute};
pub use donation::{BillingInterval, Payment, PaymentStatus, Subscription, SubscriptionStatus};
pub use registration::{Contribution, ContributionType, Registration, RegistrationStatus};
pub use sponsor::Sponsor;
pub use subscriber::Subscriber;
pub use user::User;

use crate::policy::Audience;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// A record stored in its own collection, keyed by a string `_id`.
pub trait Resource: Serialize + DeserializeOwned + Clone + Unpin + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;
}

/// A resource carrying a `meantFor` visibility tag set.
pub trait Tagged: Resource {
    fn meant_for(&self) -> &[Audience];
}

/// Collections whose records carry `meantFor` tags.
pub const TAGGED_COLLECTIONS: [&str; 4] = [
    Event::COLLECTION,
    Meeting::COLLECTION,
    Minute::COLLECTION,
    Document::COLLECTION,
];

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
