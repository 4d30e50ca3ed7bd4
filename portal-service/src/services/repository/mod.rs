//! Resource accessors.
//!
//! Every collection is reached through [`Repository`], so handlers never
//! touch the driver directly. Audience restrictions travel inside the
//! [`ListFilter`] and are applied by the store query itself; `Page::total`
//! therefore only counts records the caller may see.

pub mod memory;
pub mod mongo;

pub use memory::MemoryRepository;
pub use mongo::MongoRepository;

use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;

use crate::models::{
    Document, Event, Meeting, Minute, Payment, Registration, Resource, Sponsor, Subscriber,
    Subscription, User,
};
use crate::policy::{Audience, Role};
use crate::services::MongoDb;

/// Field holding the visibility tags on tagged collections.
pub const AUDIENCE_FIELD: &str = "meantFor";

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Str(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Str(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<Role> for FilterValue {
    fn from(value: Role) -> Self {
        FilterValue::Str(value.as_str().to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// `None` means unrestricted. `Some` keeps records tagged with at least
    /// one of the listed audiences.
    pub audience: Option<&'static [Audience]>,
    pub equals: Vec<(&'static str, FilterValue)>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible_to(mut self, tags: Option<&'static [Audience]>) -> Self {
        self.audience = tags;
        self
    }

    pub fn eq(mut self, field: &'static str, value: impl Into<FilterValue>) -> Self {
        self.equals.push((field, value.into()));
        self
    }

    pub fn eq_opt<V: Into<FilterValue>>(self, field: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u64 = 10;
    pub const MAX_LIMIT: u64 = 100;
    /// Pages past this are clamped; the skip stays well inside `i64`.
    pub const MAX_PAGE: u64 = 1_000_000;

    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, Self::MAX_PAGE),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Store access for one collection. Lists are newest first.
#[async_trait]
pub trait Repository<T: Resource>: Send + Sync {
    async fn list(&self, filter: &ListFilter, page: PageRequest) -> Result<Page<T>, AppError>;

    async fn find_all(&self, filter: &ListFilter) -> Result<Vec<T>, AppError>;

    async fn find_one(&self, filter: &ListFilter) -> Result<Option<T>, AppError>;

    async fn get(&self, id: &str) -> Result<Option<T>, AppError>;

    async fn insert(&self, item: &T) -> Result<(), AppError>;

    /// Replaces the stored record with the same id. `false` if none existed.
    async fn replace(&self, item: &T) -> Result<bool, AppError>;

    /// `false` if no record had this id.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}

/// One accessor per collection.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn Repository<User>>,
    pub events: Arc<dyn Repository<Event>>,
    pub meetings: Arc<dyn Repository<Meeting>>,
    pub minutes: Arc<dyn Repository<Minute>>,
    pub documents: Arc<dyn Repository<Document>>,
    pub sponsors: Arc<dyn Repository<Sponsor>>,
    pub registrations: Arc<dyn Repository<Registration>>,
    pub subscribers: Arc<dyn Repository<Subscriber>>,
    pub payments: Arc<dyn Repository<Payment>>,
    pub subscriptions: Arc<dyn Repository<Subscription>>,
}

impl Repositories {
    pub fn mongo(db: &MongoDb) -> Self {
        Self {
            users: Arc::new(MongoRepository::new(db)),
            events: Arc::new(MongoRepository::new(db)),
            meetings: Arc::new(MongoRepository::new(db)),
            minutes: Arc::new(MongoRepository::new(db)),
            documents: Arc::new(MongoRepository::new(db)),
            sponsors: Arc::new(MongoRepository::new(db)),
            registrations: Arc::new(MongoRepository::new(db)),
            subscribers: Arc::new(MongoRepository::new(db)),
            payments: Arc::new(MongoRepository::new(db)),
            subscriptions: Arc::new(MongoRepository::new(db)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(MemoryRepository::new()),
            events: Arc::new(MemoryRepository::new()),
            meetings: Arc::new(MemoryRepository::new()),
            minutes: Arc::new(MemoryRepository::new()),
            documents: Arc::new(MemoryRepository::new()),
            sponsors: Arc::new(MemoryRepository::new()),
            registrations: Arc::new(MemoryRepository::new()),
            subscribers: Arc::new(MemoryRepository::new()),
            payments: Arc::new(MemoryRepository::new()),
            subscriptions: Arc::new(MemoryRepository::new()),
        }
    }
}
