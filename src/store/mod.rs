//! Store Gateway (C1): opens aggregation cursors and decodes documents.
//!
//! The rest of the core depends on nothing but the contract that a cursor
//! is a finite, forward-only, cancellable iterator whose `close()` is
//! idempotent (spec §4.1). `mongo` provides the production implementation;
//! `fake` provides a deterministic one for tests that don't have a live
//! MongoDB deployment to run against.

mod mongo;
pub mod fake;

pub use mongo::MongoStoreGateway;

use async_trait::async_trait;
use bson::Document;

use crate::error::Result;
use crate::model::RawMergedInterval;

/// A decoded merged-interval cursor, as produced by the coalescing pipeline.
#[async_trait]
pub trait RecordCursor: Send {
    /// Decodes the next record, or `None` on exhaustion.
    async fn decode_next(&mut self) -> Option<Result<RawMergedInterval>>;

    /// Closes the cursor, releasing store-side resources. Idempotent.
    async fn close(&mut self);
}

/// A raw document cursor, used by the snapshot compatibility endpoint
/// which does not coalesce (spec §6).
#[async_trait]
pub trait RawCursor: Send {
    async fn decode_next(&mut self) -> Option<Result<Document>>;
    async fn close(&mut self);
}

/// Opens aggregation cursors against named collections (spec §4.1).
#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn open_aggregation(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Box<dyn RecordCursor>>;

    async fn open_raw(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Box<dyn RawCursor>>;
}
