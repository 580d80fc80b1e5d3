//! Command Session (C5): the per-connection state machine of spec §4.5.
//!
//! Exactly one `ViewportCommand` is ever in flight per connection. A new
//! valid command cancels whatever is still running and takes its place; a
//! malformed command is fatal to the connection; an otherwise well-formed
//! command with an invalid time range is reported and the connection
//! carries on with whatever was already running.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::coordinator::run_command;
use crate::frame::FrameWriter;
use crate::model::ViewportCommand;
use crate::pipeline::GapThresholdPolicy;
use crate::store::StoreGateway;

pub struct CommandSession {
    store: Arc<dyn StoreGateway>,
    gap_policy: Arc<dyn GapThresholdPolicy>,
    site_id: i64,
    channel_id: i64,
    writer: FrameWriter,
    /// Cancelled when the connection itself closes; every per-command token
    /// is a child of this one so closing the connection cancels everything
    /// in flight without the reverse ever being true (spec §9: no cyclic
    /// cancel handles).
    connection_token: CancellationToken,
    current: Option<CancellationToken>,
}

impl CommandSession {
    pub fn new(
        store: Arc<dyn StoreGateway>,
        gap_policy: Arc<dyn GapThresholdPolicy>,
        site_id: i64,
        channel_id: i64,
        writer: FrameWriter,
        parent: &CancellationToken,
    ) -> Self {
        Self {
            store,
            gap_policy,
            site_id,
            channel_id,
            writer,
            connection_token: parent.child_token(),
            current: None,
        }
    }

    /// Drives the session until the connection closes or a fatal error
    /// tears it down early.
    pub async fn run(&mut self, mut stream: SplitStream<WebSocket>) {
        loop {
            tokio::select! {
                biased;
                _ = self.connection_token.cancelled() => {
                    break;
                }
                message = stream.next() => {
                    match message {
                        None => break,
                        Some(Err(_)) => break,
                        Some(Ok(Message::Close(_))) => break,
                        Some(Ok(Message::Text(text))) => {
                            if self.handle_text(&text).await {
                                break;
                            }
                        }
                        Some(Ok(_)) => {
                            // Binary/ping/pong frames carry no commands.
                        }
                    }
                }
            }
        }

        self.connection_token.cancel();
    }

    /// Returns `true` if the connection should be torn down.
    async fn handle_text(&mut self, text: &str) -> bool {
        let command: ViewportCommand = match serde_json::from_str(text) {
            Ok(command) => command,
            Err(err) => {
                let _ = self.writer.send_error(&format!("invalid command: {err}")).await;
                return true;
            }
        };

        if let Err(err) = command.validate() {
            let _ = self.writer.send_error(&err.to_string()).await;
            return false;
        }

        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        let command_token = self.connection_token.child_token();
        self.current = Some(command_token.clone());

        tokio::spawn(run_command(
            self.store.clone(),
            self.gap_policy.clone(),
            self.site_id,
            self.channel_id,
            command,
            self.writer.clone(),
            command_token,
        ));

        false
    }
}
