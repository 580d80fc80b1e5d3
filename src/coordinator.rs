//! Fan-Out Coordinator (C4): turns one valid `ViewportCommand` into four
//! concurrent collection runners and reports their aggregate outcome.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::frame::FrameWriter;
use crate::model::{ArtifactFamily, ViewportCommand};
use crate::pipeline::{GapThresholdPolicy, PipelineBuilder, PipelineScope};
use crate::runner::run_collection;
use crate::store::StoreGateway;

/// Runs the four family collections for one command to completion (or
/// cancellation), reporting outer `status:start`/`status:done` frames
/// around them (spec §4.4).
pub async fn run_command(
    store: Arc<dyn StoreGateway>,
    gap_policy: Arc<dyn GapThresholdPolicy>,
    site_id: i64,
    channel_id: i64,
    command: ViewportCommand,
    writer: FrameWriter,
    cancel: CancellationToken,
) {
    let command_id = command.command_id.clone();

    if writer
        .send_status_start(site_id, channel_id, &command)
        .await
        .is_err()
    {
        return;
    }

    let tasks = ArtifactFamily::ALL.map(|family| {
        let store = store.clone();
        let gap_policy = gap_policy.clone();
        let writer = writer.clone();
        let cancel = cancel.clone();
        let command_id = command_id.clone();
        let domain_min = command.domain_min;
        let domain_max = command.domain_max;

        tokio::spawn(async move {
            let scope = if family.is_global_scope() {
                PipelineScope::Global {
                    site_id,
                    channel_id,
                }
            } else {
                PipelineScope::PerChannel
            };
            let pipeline =
                PipelineBuilder::new(domain_min, domain_max, scope, gap_policy.as_ref()).build();
            let database = family.database();
            let collection = family.collection(site_id, channel_id);

            let forwarded = run_collection(
                store.as_ref(),
                family,
                database,
                &collection,
                pipeline,
                &command_id,
                &writer,
                &cancel,
            )
            .await;

            (family, forwarded)
        })
    });

    let mut counts = BTreeMap::new();
    for task in tasks {
        match task.await {
            Ok((family, forwarded)) => {
                counts.insert(family.count_key(), forwarded);
            }
            Err(join_err) => {
                tracing::error!(%join_err, "collection runner panicked");
            }
        }
    }

    // A command superseded mid-flight has already been told nothing further
    // is coming for it; don't also claim it finished (spec §4.5).
    if cancel.is_cancelled() {
        return;
    }

    let _ = writer
        .send_status_done(site_id, channel_id, &command, counts)
        .await;
}
