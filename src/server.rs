//! HTTP/WebSocket wiring: one axum `Router` exposing the streaming
//! endpoint (spec §4) and the snapshot compatibility endpoint (spec §6).

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use futures::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::frame::FrameWriter;
use crate::params::parse_site_and_channel;
use crate::pipeline::GapThresholdPolicy;
use crate::session::CommandSession;
use crate::snapshot::snapshot;
use crate::store::StoreGateway;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoreGateway>,
    pub gap_policy: Arc<dyn GapThresholdPolicy>,
    /// Cancelled on shutdown; every connection's own token is a child of
    /// this one so a graceful shutdown tears every open session down.
    pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/timeline/site/{site_id}/channel/{channel_id}",
            get(timeline_ws),
        )
        .route(
            "/timeline/site/{site_id}/channel/{channel_id}/snapshot",
            get(timeline_snapshot),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn timeline_ws(
    State(state): State<AppState>,
    Path((site_id, channel_id)): Path<(String, String)>,
    ws: WebSocketUpgrade,
) -> Response {
    let (site_id, channel_id) = match parse_site_and_channel(&site_id, &channel_id) {
        Ok(pair) => pair,
        Err(err) => return err.to_string().into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(state, site_id, channel_id, socket))
}

async fn handle_socket(
    state: AppState,
    site_id: i64,
    channel_id: i64,
    socket: axum::extract::ws::WebSocket,
) {
    let (sink, stream) = socket.split();
    let writer = FrameWriter::new(sink);
    let mut session = CommandSession::new(
        state.store.clone(),
        state.gap_policy.clone(),
        site_id,
        channel_id,
        writer,
        &state.shutdown,
    );
    session.run(stream).await;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotQuery {
    domain_min: i64,
    domain_max: i64,
}

async fn timeline_snapshot(
    State(state): State<AppState>,
    Path((site_id, channel_id)): Path<(String, String)>,
    Query(query): Query<SnapshotQuery>,
) -> Response {
    let (site_id, channel_id) = match parse_site_and_channel(&site_id, &channel_id) {
        Ok(pair) => pair,
        Err(err) => return err.to_string().into_response(),
    };

    match snapshot(
        state.store.clone(),
        site_id,
        channel_id,
        query.domain_min,
        query.domain_max,
    )
    .await
    {
        Ok(body) => Json(body).into_response(),
        Err(err) => err.to_string().into_response(),
    }
}
