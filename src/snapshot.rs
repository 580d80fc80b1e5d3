//! Snapshot compatibility endpoint (spec §6): a single, non-coalescing
//! read of all four families over a window, for the external collaborator
//! that polls rather than subscribes.

use std::sync::Arc;
use std::time::Duration;

use bson::Document;

use crate::error::{Error, Result};
use crate::model::ArtifactFamily;
use crate::pipeline::window_match_stage;
use crate::store::StoreGateway;

/// Callers get at most this long before the snapshot gives up and returns
/// whatever failed to answer in time as an error (spec §6).
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn snapshot(
    store: Arc<dyn StoreGateway>,
    site_id: i64,
    channel_id: i64,
    domain_min: i64,
    domain_max: i64,
) -> Result<serde_json::Value> {
    let fut = fetch_all(store, site_id, channel_id, domain_min, domain_max);
    match tokio::time::timeout(SNAPSHOT_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::SnapshotTimeout),
    }
}

async fn fetch_all(
    store: Arc<dyn StoreGateway>,
    site_id: i64,
    channel_id: i64,
    domain_min: i64,
    domain_max: i64,
) -> Result<serde_json::Value> {
    let mut body = serde_json::Map::new();

    for family in ArtifactFamily::ALL {
        let pipeline = vec![window_match_stage(domain_min, domain_max)];
        let database = family.database();
        let collection = family.collection(site_id, channel_id);

        let mut cursor = store.open_raw(database, &collection, pipeline).await?;
        let mut docs = Vec::new();
        while let Some(doc) = cursor.decode_next().await {
            docs.push(document_to_value(doc?)?);
        }
        cursor.close().await;

        body.insert(family.type_tag().to_string(), serde_json::Value::Array(docs));
    }

    Ok(serde_json::Value::Object(body))
}

fn document_to_value(doc: Document) -> Result<serde_json::Value> {
    serde_json::to_value(doc).map_err(Error::InvalidCommand)
}
