//! Rewrites legacy plural `meantFor` tags (`members`, `excos`) to their
//! singular form and drops the duplicates this can create.
//!
//! Reads already accept both spellings, so the service is correct before
//! this has run; the migration only normalizes what is stored.

use mongodb::bson::{doc, Bson, Document};
use service_core::error::AppError;

use crate::models::TAGGED_COLLECTIONS;
use crate::policy::Audience;
use crate::services::repository::AUDIENCE_FIELD;
use crate::services::MongoDb;

#[derive(Debug, Default)]
pub struct AudienceMigrationResult {
    pub collections_processed: u64,
    pub documents_updated: u64,
}

/// `(legacy, canonical)` spellings.
fn legacy_spellings() -> Vec<(&'static str, &'static str)> {
    Audience::ALL
        .iter()
        .filter_map(|tag| tag.legacy_alias().map(|alias| (alias, tag.as_str())))
        .collect()
}

fn legacy_filter() -> Document {
    let aliases: Vec<Bson> = legacy_spellings()
        .into_iter()
        .map(|(legacy, _)| Bson::from(legacy))
        .collect();
    let mut filter = Document::new();
    filter.insert(AUDIENCE_FIELD, doc! { "$in": aliases });
    filter
}

/// Update pipeline mapping every legacy tag to its canonical spelling,
/// then removing repeats while keeping first-seen order.
fn rewrite_pipeline() -> Vec<Document> {
    let branches: Vec<Bson> = legacy_spellings()
        .into_iter()
        .map(|(legacy, canonical)| {
            Bson::Document(doc! { "case": { "$eq": ["$$t", legacy] }, "then": canonical })
        })
        .collect();
    let field_ref = format!("${}", AUDIENCE_FIELD);

    let canonical = doc! {
        "$reduce": {
            "input": {
                "$map": {
                    "input": field_ref,
                    "as": "t",
                    "in": { "$switch": { "branches": branches, "default": "$$t" } }
                }
            },
            "initialValue": [],
            "in": {
                "$cond": [
                    { "$in": ["$$this", "$$value"] },
                    "$$value",
                    { "$concatArrays": ["$$value", ["$$this"]] }
                ]
            }
        }
    };

    let mut set = Document::new();
    set.insert(AUDIENCE_FIELD, canonical);
    vec![doc! { "$set": set }]
}

pub async fn migrate_audience_tags(db: &MongoDb) -> Result<AudienceMigrationResult, AppError> {
    tracing::info!("Starting audience tag migration");
    let mut result = AudienceMigrationResult::default();

    for name in TAGGED_COLLECTIONS {
        let collection = db.database().collection::<Document>(name);
        let outcome = collection
            .update_many(legacy_filter(), rewrite_pipeline(), None)
            .await
            .map_err(AppError::from)?;

        result.collections_processed += 1;
        result.documents_updated += outcome.modified_count;
        if outcome.modified_count > 0 {
            tracing::info!(
                collection = name,
                updated = outcome.modified_count,
                "Normalized legacy audience tags"
            );
        }
    }

    tracing::info!(
        collections = result.collections_processed,
        updated = result.documents_updated,
        "Audience tag migration complete"
    );
    Ok(result)
}
