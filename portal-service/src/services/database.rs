use crate::models::{
    Payment, Registration, Resource, Subscriber, Subscription, User, TAGGED_COLLECTIONS,
};
use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for portal-service");

        self.create_index(User::COLLECTION, doc! { "email": 1 }, "email_unique", true)
            .await?;
        self.create_index(
            User::COLLECTION,
            doc! { "verificationToken": 1 },
            "verification_token_lookup",
            false,
        )
        .await?;

        for collection in TAGGED_COLLECTIONS {
            self.create_index(
                collection,
                doc! { "meantFor": 1, "createdAt": -1 },
                "audience_recent",
                false,
            )
            .await?;
        }

        self.create_index(
            Subscriber::COLLECTION,
            doc! { "email": 1 },
            "email_unique",
            true,
        )
        .await?;
        self.create_index(
            Payment::COLLECTION,
            doc! { "reference": 1 },
            "reference_unique",
            true,
        )
        .await?;
        self.create_index(
            Subscription::COLLECTION,
            doc! { "status": 1, "nextChargeAt": 1 },
            "due_lookup",
            false,
        )
        .await?;
        self.create_index(
            Registration::COLLECTION,
            doc! { "eventId": 1, "createdAt": -1 },
            "event_recent",
            false,
        )
        .await?;

        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        keys: Document,
        name: &str,
        unique: bool,
    ) -> Result<(), AppError> {
        let index = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .name(name.to_string())
                    .unique(unique)
                    .build(),
            )
            .build();

        self.db
            .collection::<Document>(collection)
            .create_index(index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create index {} on {} collection: {}",
                    name,
                    collection,
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!("Created index {}.{}", collection, name);
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn collection<T: Resource>(&self) -> Collection<T> {
        self.db.collection(T::COLLECTION)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
