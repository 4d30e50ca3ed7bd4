//! Visibility-aware reads shared by every tagged collection.

use service_core::error::AppError;

use crate::models::Tagged;
use crate::policy::{PolicyTable, Principal};
use crate::services::repository::{ListFilter, Page, PageRequest, Repository};

/// Lists the records `principal` may see. The restriction is part of the
/// store query, so `total` never counts hidden records.
pub async fn list_visible<T: Tagged>(
    repo: &dyn Repository<T>,
    policy: &PolicyTable,
    principal: &Principal,
    page: PageRequest,
) -> Result<Page<T>, AppError> {
    let filter = ListFilter::new().visible_to(policy.visible_tags(principal.role));
    repo.list(&filter, page).await
}

/// Fetches one record and applies the view policy to its tags.
pub async fn get_visible<T: Tagged>(
    repo: &dyn Repository<T>,
    policy: &PolicyTable,
    principal: &Principal,
    id: &str,
    label: &str,
) -> Result<T, AppError> {
    let item = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", label)))?;

    policy.authorize_view(principal, item.meant_for()).map_err(|e| {
        metrics::counter!("authz_decisions_total", "kind" => "view", "outcome" => "deny")
            .increment(1);
        e
    })?;

    Ok(item)
}
