//! Collection Runner (C3): drains one family's cursor into batched frames.
//!
//! One runner owns exactly one cursor for exactly one family of exactly one
//! in-flight command. The Fan-Out Coordinator (C4) spawns four of these per
//! valid `ViewportCommand` and tolerates any of them failing independently.

use tokio_util::sync::CancellationToken;

use crate::frame::FrameWriter;
use crate::model::ArtifactFamily;
use crate::store::StoreGateway;

/// Frames are flushed every this-many merged intervals, or at cursor
/// exhaustion, whichever comes first (spec §4.3).
pub const BATCH_SIZE: usize = 200;

/// Drains `family`'s cursor for `command_id`, emitting batched frames
/// through `writer`, and returns the number of intervals forwarded.
///
/// A store or decode error is non-fatal to the connection: it ends this
/// runner only, after emitting a family-scoped error frame (spec §7). A
/// cancellation (a newer command superseding this one) ends the runner
/// silently, with no `done` frame, since the client has already moved on.
pub async fn run_collection(
    store: &dyn StoreGateway,
    family: ArtifactFamily,
    database: &str,
    collection: &str,
    pipeline: Vec<bson::Document>,
    command_id: &str,
    writer: &FrameWriter,
    cancel: &CancellationToken,
) -> usize {
    let mut cursor = match store.open_aggregation(database, collection, pipeline).await {
        Ok(cursor) => cursor,
        Err(err) => {
            tracing::warn!(family = family.type_tag(), %err, "failed to open aggregation cursor");
            let _ = writer.send_family_error(family, command_id).await;
            return 0;
        }
    };

    let mut started = false;
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut forwarded = 0usize;

    loop {
        if cancel.is_cancelled() {
            cursor.close().await;
            return forwarded;
        }

        match cursor.decode_next().await {
            None => break,
            Some(Ok(raw)) => {
                if !started {
                    if writer.send_family_start(family, command_id).await.is_err() {
                        cursor.close().await;
                        return forwarded;
                    }
                    started = true;
                }
                // Tag copies every field rather than aliasing the decode
                // target, so a batch flush never sees a later record's data.
                batch.push(raw.tag(command_id));
                if batch.len() == BATCH_SIZE {
                    if writer.send_family_data(family, &batch).await.is_err() {
                        cursor.close().await;
                        return forwarded + batch.len();
                    }
                    forwarded += batch.len();
                    batch.clear();
                }
            }
            Some(Err(err)) => {
                tracing::warn!(family = family.type_tag(), %err, "cursor decode failed");
                cursor.close().await;
                let _ = writer.send_family_error(family, command_id).await;
                return forwarded;
            }
        }
    }

    if !batch.is_empty() {
        forwarded += batch.len();
        if writer.send_family_data(family, &batch).await.is_err() {
            return forwarded;
        }
    }

    let _ = writer.send_family_done(family, command_id).await;
    forwarded
}
