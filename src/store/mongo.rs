//! Production `StoreGateway`, backed by the official async driver.

use async_trait::async_trait;
use bson::Document;
use futures::stream::StreamExt;
use mongodb::options::AggregateOptions;
use mongodb::{Client, Cursor};

use super::{RawCursor, RecordCursor, StoreGateway};
use crate::error::Result;
use crate::model::RawMergedInterval;

/// Opens aggregation cursors against a shared, process-scoped `Client`
/// (spec §9: no global client registry, one handle threaded through).
pub struct MongoStoreGateway {
    client: Client,
}

impl MongoStoreGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn aggregate_options() -> AggregateOptions {
        // The coalescing stages may spill to disk on large domains (spec §4.1).
        AggregateOptions::builder().allow_disk_use(true).build()
    }

    async fn open(&self, database: &str, collection: &str, pipeline: Vec<Document>) -> Result<Cursor<Document>> {
        let coll = self
            .client
            .database(database)
            .collection::<Document>(collection);
        let cursor = coll.aggregate(pipeline, Self::aggregate_options()).await?;
        Ok(cursor)
    }
}

#[async_trait]
impl StoreGateway for MongoStoreGateway {
    async fn open_aggregation(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Box<dyn RecordCursor>> {
        let cursor = self.open(database, collection, pipeline).await?;
        Ok(Box::new(MongoRecordCursor { cursor }))
    }

    async fn open_raw(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Box<dyn RawCursor>> {
        let cursor = self.open(database, collection, pipeline).await?;
        Ok(Box::new(MongoRawCursor { cursor }))
    }
}

struct MongoRecordCursor {
    cursor: Cursor<Document>,
}

#[async_trait]
impl RecordCursor for MongoRecordCursor {
    async fn decode_next(&mut self) -> Option<Result<RawMergedInterval>> {
        let doc = self.cursor.next().await?;
        Some(match doc {
            Ok(doc) => bson::from_document(doc).map_err(Into::into),
            Err(err) => Err(err.into()),
        })
    }

    async fn close(&mut self) {
        // Dropping the cursor exhausts its killCursors on the server side;
        // there is no explicit close on the driver's `Cursor`. Calling this
        // more than once is a no-op either way.
    }
}

struct MongoRawCursor {
    cursor: Cursor<Document>,
}

#[async_trait]
impl RawCursor for MongoRawCursor {
    async fn decode_next(&mut self) -> Option<Result<Document>> {
        let doc = self.cursor.next().await?;
        Some(doc.map_err(Into::into))
    }

    async fn close(&mut self) {}
}
