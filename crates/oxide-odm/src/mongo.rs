//! MongoDB document store.

use bson::Document;
use futures::TryStreamExt;
use mongodb::options::FindOptions as DriverFindOptions;
use mongodb::{Client, Database};
use tracing::info;

use crate::error::{OdmError, Result};
use crate::store::{DocumentStore, FindOptions};

/// A [`DocumentStore`] backed by a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connects to `uri` and uses `database`.
    ///
    /// # Errors
    ///
    /// Fails if the connection string is invalid.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await.map_err(OdmError::store)?;
        info!(database, "connected to MongoDB");
        Ok(Self::new(client.database(database)))
    }

    /// Wraps an existing database handle.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the database handle.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }
}

fn driver_options(options: &FindOptions) -> Result<DriverFindOptions> {
    let mut driver = DriverFindOptions::default();
    driver.projection.clone_from(&options.projection);
    driver.sort.clone_from(&options.sort);
    driver.skip = options.skip;
    driver.limit = options
        .limit
        .map(i64::try_from)
        .transpose()
        .map_err(|_| OdmError::InvalidPaging("limit out of range".into()))?;
    Ok(driver)
}

impl DocumentStore for MongoStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        let options = driver_options(options)?;
        let cursor = self
            .db
            .collection::<Document>(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(OdmError::store)?;
        cursor.try_collect().await.map_err(OdmError::store)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64> {
        self.db
            .collection::<Document>(collection)
            .count_documents(filter)
            .await
            .map_err(OdmError::store)
    }
}
