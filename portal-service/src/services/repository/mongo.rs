use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::FindOptions,
    Collection,
};
use service_core::error::AppError;

use super::{FilterValue, ListFilter, Page, PageRequest, Repository, AUDIENCE_FIELD};
use crate::models::Resource;
use crate::services::MongoDb;

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoRepository<T: Resource> {
    collection: Collection<T>,
}

impl<T: Resource> MongoRepository<T> {
    pub fn new(db: &MongoDb) -> Self {
        Self {
            collection: db.collection::<T>(),
        }
    }
}

/// Translates a [`ListFilter`] into a query document.
///
/// Legacy plural spellings are matched alongside the canonical tags so
/// records written before the tag migration stay visible.
pub fn to_query(filter: &ListFilter) -> Document {
    let mut query = Document::new();

    if let Some(tags) = filter.audience {
        let mut values: Vec<Bson> = Vec::new();
        for tag in tags {
            values.push(Bson::from(tag.as_str()));
            if let Some(alias) = tag.legacy_alias() {
                values.push(Bson::from(alias));
            }
        }
        query.insert(AUDIENCE_FIELD, doc! { "$in": values });
    }

    for (field, value) in &filter.equals {
        let value = match value {
            FilterValue::Str(s) => Bson::from(s.as_str()),
            FilterValue::Bool(b) => Bson::from(*b),
        };
        query.insert(*field, value);
    }

    query
}

fn map_write_error(collection: &str, e: mongodb::error::Error) -> AppError {
    if let ErrorKind::Write(WriteFailure::WriteError(ref write)) = *e.kind {
        if write.code == DUPLICATE_KEY {
            return AppError::Conflict("A record with these details already exists".to_string());
        }
    }
    tracing::error!("Write to {} collection failed: {}", collection, e);
    AppError::from(e)
}

#[async_trait]
impl<T: Resource> Repository<T> for MongoRepository<T> {
    async fn list(&self, filter: &ListFilter, page: PageRequest) -> Result<Page<T>, AppError> {
        let query = to_query(filter);

        let total = self
            .collection
            .count_documents(query.clone(), None)
            .await
            .map_err(AppError::from)?;

        let find_options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(page.skip())
            .limit(page.limit as i64)
            .build();

        let mut cursor = self
            .collection
            .find(query, find_options)
            .await
            .map_err(AppError::from)?;

        let mut items = Vec::new();
        while let Some(item) = cursor.try_next().await.map_err(AppError::from)? {
            items.push(item);
        }

        Ok(Page { items, total })
    }

    async fn find_all(&self, filter: &ListFilter) -> Result<Vec<T>, AppError> {
        let find_options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();

        let mut cursor = self
            .collection
            .find(to_query(filter), find_options)
            .await
            .map_err(AppError::from)?;

        let mut items = Vec::new();
        while let Some(item) = cursor.try_next().await.map_err(AppError::from)? {
            items.push(item);
        }
        Ok(items)
    }

    async fn find_one(&self, filter: &ListFilter) -> Result<Option<T>, AppError> {
        self.collection
            .find_one(to_query(filter), None)
            .await
            .map_err(AppError::from)
    }

    async fn get(&self, id: &str) -> Result<Option<T>, AppError> {
        self.collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(AppError::from)
    }

    async fn insert(&self, item: &T) -> Result<(), AppError> {
        self.collection
            .insert_one(item, None)
            .await
            .map_err(|e| map_write_error(T::COLLECTION, e))?;
        Ok(())
    }

    async fn replace(&self, item: &T) -> Result<bool, AppError> {
        let result = self
            .collection
            .replace_one(doc! { "_id": item.id() }, item, None)
            .await
            .map_err(|e| map_write_error(T::COLLECTION, e))?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(AppError::from)?;
        Ok(result.deleted_count > 0)
    }
}
