//! Deterministic store doubles, shared by unit and integration tests that
//! have no live MongoDB deployment to run against.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bson::Document;
use serde::de::Error as _;

use super::{RawCursor, RecordCursor, StoreGateway};
use crate::error::{Error, Result};
use crate::model::RawMergedInterval;

/// A gateway that serves a fixed, pre-recorded set of records per
/// `(database, collection)` pair regardless of the pipeline passed in.
/// Good enough to exercise C2's consumers without re-implementing the
/// aggregation semantics those consumers don't control.
pub struct FakeStoreGateway {
    records: Mutex<Vec<(String, String, VecDeque<Result<RawMergedInterval>>)>>,
    raw: Mutex<Vec<(String, String, VecDeque<Result<Document>>)>>,
    fail_open: bool,
}

impl FakeStoreGateway {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            raw: Mutex::new(Vec::new()),
            fail_open: false,
        }
    }

    /// A gateway whose `open_aggregation`/`open_raw` calls always fail,
    /// used to exercise the non-fatal store-error path of a runner.
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            raw: Mutex::new(Vec::new()),
            fail_open: true,
        }
    }

    pub fn with_records(
        mut self,
        database: &str,
        collection: &str,
        records: Vec<RawMergedInterval>,
    ) -> Self {
        self.records.get_mut().unwrap().push((
            database.to_string(),
            collection.to_string(),
            records.into_iter().map(Ok).collect(),
        ));
        self
    }

    pub fn with_decode_error(mut self, database: &str, collection: &str) -> Self {
        self.records.get_mut().unwrap().push((
            database.to_string(),
            collection.to_string(),
            VecDeque::from([Err(Error::Decode(
                bson::de::Error::custom("fake decode failure"),
            ))]),
        ));
        self
    }

    pub fn with_raw(mut self, database: &str, collection: &str, docs: Vec<Document>) -> Self {
        self.raw.get_mut().unwrap().push((
            database.to_string(),
            collection.to_string(),
            docs.into_iter().map(Ok).collect(),
        ));
        self
    }
}

impl Default for FakeStoreGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreGateway for FakeStoreGateway {
    async fn open_aggregation(
        &self,
        database: &str,
        collection: &str,
        _pipeline: Vec<Document>,
    ) -> Result<Box<dyn RecordCursor>> {
        if self.fail_open {
            return Err(Error::Decode(bson::de::Error::custom("fake open failure")));
        }
        let mut records = self.records.lock().unwrap();
        let queue = records
            .iter_mut()
            .find(|(db, coll, _)| db == database && coll == collection)
            .map(|(_, _, q)| std::mem::take(q))
            .unwrap_or_default();
        Ok(Box::new(FakeRecordCursor { queue }))
    }

    async fn open_raw(
        &self,
        database: &str,
        collection: &str,
        _pipeline: Vec<Document>,
    ) -> Result<Box<dyn RawCursor>> {
        if self.fail_open {
            return Err(Error::Decode(bson::de::Error::custom("fake open failure")));
        }
        let mut raw = self.raw.lock().unwrap();
        let queue = raw
            .iter_mut()
            .find(|(db, coll, _)| db == database && coll == collection)
            .map(|(_, _, q)| std::mem::take(q))
            .unwrap_or_default();
        Ok(Box::new(FakeRawCursor { queue }))
    }
}

pub struct FakeRecordCursor {
    queue: VecDeque<Result<RawMergedInterval>>,
}

#[async_trait]
impl RecordCursor for FakeRecordCursor {
    async fn decode_next(&mut self) -> Option<Result<RawMergedInterval>> {
        self.queue.pop_front()
    }

    async fn close(&mut self) {
        self.queue.clear();
    }
}

pub struct FakeRawCursor {
    queue: VecDeque<Result<Document>>,
}

#[async_trait]
impl RawCursor for FakeRawCursor {
    async fn decode_next(&mut self) -> Option<Result<Document>> {
        self.queue.pop_front()
    }

    async fn close(&mut self) {
        self.queue.clear();
    }
}
