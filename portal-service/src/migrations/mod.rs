//! One-off data migrations, run at startup. Each is idempotent.

pub mod v1_audience_tags;

pub use v1_audience_tags::{migrate_audience_tags, AudienceMigrationResult};
