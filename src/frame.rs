//! Frame Writer (C6): serializes outbound frames onto the shared socket.
//!
//! All writes funnel through one `Mutex`-guarded sink because two
//! concurrently running family runners (C3) can try to write at once;
//! axum's `SplitSink` is not `Clone`, and frames must not interleave
//! mid-write.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::SinkExt;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{ArtifactFamily, MergedInterval, ViewportCommand};

/// Shared handle to the socket's write half. Cheap to clone; every clone
/// writes through the same mutex.
#[derive(Clone)]
pub struct FrameWriter {
    sink: Arc<Mutex<SplitSink<WebSocket, Message>>>,
}

fn tagged(kind: &str, body: Value) -> Value {
    let mut frame = Map::with_capacity(2);
    frame.insert("type".to_string(), Value::String(kind.to_string()));
    frame.insert(kind.to_string(), body);
    Value::Object(frame)
}

impl FrameWriter {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    async fn send_json(&self, value: Value) -> Result<()> {
        let text = value.to_string();
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text))
            .await
            .map_err(|_| Error::WriteFailed)
    }

    /// Outer `status:start` frame, emitted before the fan-out spawns (spec §4.4).
    pub async fn send_status_start(
        &self,
        site_id: i64,
        channel_id: i64,
        command: &ViewportCommand,
    ) -> Result<()> {
        self.send_json(tagged(
            "status",
            serde_json::json!({
                "status": "start",
                "command": command,
                "siteId": site_id,
                "channelId": channel_id,
            }),
        ))
        .await
    }

    /// Outer `status:done` frame, carrying the per-family forwarded counts.
    pub async fn send_status_done(
        &self,
        site_id: i64,
        channel_id: i64,
        command: &ViewportCommand,
        counts: BTreeMap<&'static str, usize>,
    ) -> Result<()> {
        self.send_json(tagged(
            "status",
            serde_json::json!({
                "status": "done",
                "command": command,
                "siteId": site_id,
                "channelId": channel_id,
                "counts": counts,
            }),
        ))
        .await
    }

    /// Per-family `<family>:start` frame (spec §4.3).
    pub async fn send_family_start(&self, family: ArtifactFamily, command_id: &str) -> Result<()> {
        self.send_family_status(family, "start", command_id).await
    }

    /// Per-family `<family>:done` frame.
    pub async fn send_family_done(&self, family: ArtifactFamily, command_id: &str) -> Result<()> {
        self.send_family_status(family, "done", command_id).await
    }

    /// Per-family `<family>:error` frame; the connection stays open (spec §7).
    pub async fn send_family_error(&self, family: ArtifactFamily, command_id: &str) -> Result<()> {
        self.send_family_status(family, "error", command_id).await
    }

    async fn send_family_status(
        &self,
        family: ArtifactFamily,
        status: &str,
        command_id: &str,
    ) -> Result<()> {
        self.send_json(tagged(
            family.type_tag(),
            serde_json::json!({ "status": status, "commandId": command_id }),
        ))
        .await
    }

    /// A batch of up to `BATCH_SIZE` merged intervals for one family.
    pub async fn send_family_data(
        &self,
        family: ArtifactFamily,
        batch: &[MergedInterval],
    ) -> Result<()> {
        let body = batch
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::InvalidCommand)?;
        self.send_json(tagged(family.type_tag(), Value::Array(body)))
            .await
    }

    /// A malformed-command error frame, sent before the connection closes
    /// (spec §7: fatal errors).
    pub async fn send_error(&self, message: &str) -> Result<()> {
        self.send_json(tagged("error", Value::String(message.to_string())))
            .await
    }
}
