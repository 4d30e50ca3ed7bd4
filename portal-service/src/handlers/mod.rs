//! HTTP handlers, one module per resource.

pub mod auth;
pub mod billing;
pub mod documents;
pub mod donations;
pub mod events;
pub mod health;
pub mod meetings;
pub mod minutes;
pub mod newsletter;
pub mod registrations;
pub mod sponsors;
pub mod users;
