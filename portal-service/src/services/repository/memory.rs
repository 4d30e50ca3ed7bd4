use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{FilterValue, ListFilter, Page, PageRequest, Repository, AUDIENCE_FIELD};
use crate::models::Resource;
use crate::policy::Audience;

/// In-process store with the same filtering semantics as the MongoDB one.
pub struct MemoryRepository<T> {
    items: RwLock<HashMap<String, T>>,
}

impl<T: Resource> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned() -> AppError {
        AppError::InternalError(anyhow::anyhow!(
            "{} repository lock poisoned",
            T::COLLECTION
        ))
    }

    /// Matching records, newest first.
    fn matching(&self, filter: &ListFilter) -> Result<Vec<T>, AppError> {
        let items = self.items.read().map_err(|_| Self::poisoned())?;
        let mut found = Vec::new();
        for item in items.values() {
            if matches(item, filter)? {
                found.push(item.clone());
            }
        }
        found.sort_by_key(|item| std::cmp::Reverse(item.created_at()));
        Ok(found)
    }
}

fn matches<T: Resource>(item: &T, filter: &ListFilter) -> Result<bool, AppError> {
    let value = serde_json::to_value(item).map_err(|e| AppError::InternalError(e.into()))?;

    if let Some(visible) = filter.audience {
        let tags: Vec<Audience> = match value.get(AUDIENCE_FIELD) {
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|e| AppError::InternalError(e.into()))?,
            None => Vec::new(),
        };
        if !tags.iter().any(|t| visible.contains(t)) {
            return Ok(false);
        }
    }

    for (field, expected) in &filter.equals {
        let actual = value.get(*field);
        let hit = match expected {
            FilterValue::Str(s) => actual.and_then(|v| v.as_str()) == Some(s.as_str()),
            FilterValue::Bool(b) => actual.and_then(|v| v.as_bool()) == Some(*b),
        };
        if !hit {
            return Ok(false);
        }
    }

    Ok(true)
}

#[async_trait]
impl<T: Resource> Repository<T> for MemoryRepository<T> {
    async fn list(&self, filter: &ListFilter, page: PageRequest) -> Result<Page<T>, AppError> {
        let found = self.matching(filter)?;
        let total = found.len() as u64;
        let items = found
            .into_iter()
            .skip(usize::try_from(page.skip()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
            .collect();
        Ok(Page { items, total })
    }

    async fn find_all(&self, filter: &ListFilter) -> Result<Vec<T>, AppError> {
        self.matching(filter)
    }

    async fn find_one(&self, filter: &ListFilter) -> Result<Option<T>, AppError> {
        Ok(self.matching(filter)?.into_iter().next())
    }

    async fn get(&self, id: &str) -> Result<Option<T>, AppError> {
        let items = self.items.read().map_err(|_| Self::poisoned())?;
        Ok(items.get(id).cloned())
    }

    async fn insert(&self, item: &T) -> Result<(), AppError> {
        let mut items = self.items.write().map_err(|_| Self::poisoned())?;
        if items.contains_key(item.id()) {
            return Err(AppError::Conflict(
                "A record with these details already exists".to_string(),
            ));
        }
        items.insert(item.id().to_string(), item.clone());
        Ok(())
    }

    async fn replace(&self, item: &T) -> Result<bool, AppError> {
        let mut items = self.items.write().map_err(|_| Self::poisoned())?;
        match items.get_mut(item.id()) {
            Some(slot) => {
                *slot = item.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut items = self.items.write().map_err(|_| Self::poisoned())?;
        Ok(items.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Resource};
    use crate::policy::{expand, Role};
    use chrono::{Duration, Utc};

    fn document(id: &str, tags: Vec<Audience>, age_minutes: i64) -> Document {
        let at = Utc::now() - Duration::minutes(age_minutes);
        Document {
            id: id.to_string(),
            title: format!("Doc {}", id),
            description: None,
            file_url: format!("https://files.example/{}.pdf", id),
            meant_for: tags,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn list_counts_only_visible_records() {
        let repo = MemoryRepository::<Document>::new();
        repo.insert(&document("a", vec![Audience::Public], 3)).await.unwrap();
        repo.insert(&document("b", vec![Audience::Member], 2)).await.unwrap();
        repo.insert(&document("c", vec![Audience::Admin], 1)).await.unwrap();

        let filter = ListFilter::new().visible_to(Some(expand(Role::Member)));
        let page = repo.list(&filter, PageRequest::new(Some(1), Some(1))).await.unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id(), "b");
    }

    #[tokio::test]
    async fn replace_and_delete_report_missing_records() {
        let repo = MemoryRepository::<Document>::new();
        let doc = document("a", vec![Audience::Public], 0);

        assert!(!repo.replace(&doc).await.unwrap());
        repo.insert(&doc).await.unwrap();
        assert!(repo.replace(&doc).await.unwrap());
        assert!(repo.delete("a").await.unwrap());
        assert!(!repo.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_ids_conflict() {
        let repo = MemoryRepository::<Document>::new();
        let doc = document("a", vec![Audience::Public], 0);
        repo.insert(&doc).await.unwrap();
        assert!(matches!(repo.insert(&doc).await, Err(AppError::Conflict(_))));
    }
}
