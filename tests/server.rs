use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use timeline_streamer::model::{ArtifactFamily, RawMergedInterval};
use timeline_streamer::pipeline::LinearGapThreshold;
use timeline_streamer::server::{router, AppState};
use timeline_streamer::store::fake::FakeStoreGateway;

fn interval(group_id: i64, start: i64, end: i64, count: i64) -> RawMergedInterval {
    RawMergedInterval {
        group_id,
        start_timestamp: start,
        end_timestamp: end,
        object_count: count,
    }
}

fn test_store() -> FakeStoreGateway {
    FakeStoreGateway::new()
        .with_records(
            ArtifactFamily::Recording.database(),
            &ArtifactFamily::Recording.collection(1, 2),
            vec![interval(0, 0, 1_000, 0)],
        )
        .with_records(
            ArtifactFamily::Event.database(),
            &ArtifactFamily::Event.collection(1, 2),
            vec![interval(0, 0, 1_000, 3)],
        )
}

async fn spawn_server_with(store: FakeStoreGateway) -> (std::net::SocketAddr, CancellationToken) {
    let shutdown = CancellationToken::new();
    let state = AppState {
        store: Arc::new(store),
        gap_policy: Arc::new(LinearGapThreshold),
        shutdown: shutdown.clone(),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state);
    let shutdown_for_serve = shutdown.clone();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown_for_serve.cancelled().await })
            .await
            .unwrap();
    });

    (addr, shutdown)
}

async fn spawn_test_server() -> (std::net::SocketAddr, CancellationToken) {
    spawn_server_with(test_store()).await
}

#[tokio::test]
async fn streams_status_and_family_frames_for_a_valid_command() {
    let (addr, shutdown) = spawn_test_server().await;
    let url = format!("ws://{addr}/timeline/site/1/channel/2");
    let (mut socket, _response) = tokio_tungstenite::connect_async(url).await.unwrap();

    let command = json!({
        "commandId": "cmd-1",
        "pivotPoint": 500,
        "displayMin": 0,
        "displayMax": 1000,
        "domainMin": 0,
        "domainMax": 1000,
    });
    socket
        .send(WsMessage::Text(command.to_string()))
        .await
        .unwrap();

    let mut types_seen = Vec::new();
    let mut outer_done = None;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if tokio::time::Instant::now() > deadline {
            break;
        }
        let next = tokio::time::timeout(Duration::from_secs(1), socket.next()).await;
        let Ok(Some(Ok(WsMessage::Text(text)))) = next else {
            continue;
        };
        let frame: Value = serde_json::from_str(&text).unwrap();
        let frame_type = frame["type"].as_str().unwrap().to_string();
        let is_outer_done = frame_type == "status" && frame["status"]["status"] == "done";
        if is_outer_done {
            outer_done = Some(frame.clone());
        }
        types_seen.push(frame_type);
        if is_outer_done {
            break;
        }
    }

    assert!(types_seen.contains(&"status".to_string()));
    assert!(types_seen.contains(&"recordings".to_string()));
    assert!(types_seen.contains(&"events".to_string()));

    // The outer `done` frame must carry the command and connection identity
    // for correlation (spec §3, §4.4, §6), not just a bare status flag.
    let outer_done = outer_done.expect("no outer status:done frame observed");
    assert_eq!(outer_done["status"]["command"]["commandId"], "cmd-1");
    assert_eq!(outer_done["status"]["siteId"], 1);
    assert_eq!(outer_done["status"]["channelId"], 2);

    shutdown.cancel();
}

#[tokio::test]
async fn malformed_command_closes_the_connection() {
    let (addr, shutdown) = spawn_test_server().await;
    let url = format!("ws://{addr}/timeline/site/1/channel/2");
    let (mut socket, _response) = tokio_tungstenite::connect_async(url).await.unwrap();

    socket
        .send(WsMessage::Text("not json".to_string()))
        .await
        .unwrap();

    let mut saw_error = false;
    loop {
        match tokio::time::timeout(Duration::from_secs(2), socket.next()).await {
            Ok(Some(Ok(WsMessage::Text(text)))) => {
                let frame: Value = serde_json::from_str(&text).unwrap();
                if frame["type"] == "error" {
                    saw_error = true;
                }
            }
            Ok(Some(Ok(WsMessage::Close(_)))) | Ok(None) | Err(_) => break,
            _ => continue,
        }
    }

    assert!(saw_error);
    shutdown.cancel();
}

#[tokio::test]
async fn store_failure_emits_a_family_error_but_keeps_the_connection_open() {
    let (addr, shutdown) = spawn_server_with(FakeStoreGateway::failing()).await;
    let url = format!("ws://{addr}/timeline/site/1/channel/2");
    let (mut socket, _response) = tokio_tungstenite::connect_async(url).await.unwrap();

    let command = json!({
        "commandId": "cmd-2",
        "pivotPoint": 500,
        "displayMin": 0,
        "displayMax": 1000,
        "domainMin": 0,
        "domainMax": 1000,
    });
    socket
        .send(WsMessage::Text(command.to_string()))
        .await
        .unwrap();

    let mut saw_family_error = false;
    let mut saw_outer_done = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        let next = tokio::time::timeout(Duration::from_secs(1), socket.next()).await;
        let Ok(Some(Ok(WsMessage::Text(text)))) = next else {
            continue;
        };
        let frame: Value = serde_json::from_str(&text).unwrap();
        if frame["type"] == "recordings" && frame["recordings"]["status"] == "error" {
            saw_family_error = true;
        }
        if frame["type"] == "status" && frame["status"]["status"] == "done" {
            saw_outer_done = true;
            break;
        }
    }

    assert!(saw_family_error);
    assert!(saw_outer_done);

    // The connection itself must still be usable after a non-fatal error.
    socket.send(WsMessage::Ping(Vec::new())).await.unwrap();

    shutdown.cancel();
}
