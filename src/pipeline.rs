//! Gap-coalescing aggregation pipeline builder (C2).
//!
//! Mirrors the accumulator style of a change-stream pipeline builder: a
//! small struct gathers the parameters that vary per call and `build()`
//! produces the ordered list of stages once, rather than mutating a
//! pipeline in place.

use bson::{doc, Document};

/// Where a family's documents live relative to the identity of the
/// connection. Per-channel families encode `siteId`/`channelId` in their
/// collection name; the shared `event` collection needs an explicit match.
#[derive(Debug, Clone, Copy)]
pub enum PipelineScope {
    PerChannel,
    Global { site_id: i64, channel_id: i64 },
}

/// The gap-threshold policy is kept behind a small interface so it can be
/// swapped, per spec §9: the source's commented-out bucketed switch and the
/// live linear formula disagree, and guessing intent is out of scope.
pub trait GapThresholdPolicy: Send + Sync {
    fn gap_threshold_ms(&self, window_ms: i64) -> i64;
}

/// The formula the live code uses: one pixel of merge tolerance at five
/// thousand pixels of horizontal resolution, floored at 100ms.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearGapThreshold;

impl GapThresholdPolicy for LinearGapThreshold {
    fn gap_threshold_ms(&self, window_ms: i64) -> i64 {
        std::cmp::max(100, window_ms / 5000)
    }
}

/// Builds the window-match stage shared by the streaming pipeline and the
/// snapshot compatibility endpoint (spec §4.2 step 2, §6).
pub fn window_match_stage(domain_min: i64, domain_max: i64) -> Document {
    doc! {
        "$match": {
            "$or": [
                { "startTimestamp": { "$gte": domain_min, "$lte": domain_max } },
                { "endTimestamp": { "$gte": domain_min, "$lte": domain_max } },
                {
                    "$and": [
                        { "startTimestamp": { "$lte": domain_min } },
                        { "endTimestamp": { "$gte": domain_max } },
                    ]
                },
            ]
        }
    }
}

fn identity_match_stage(site_id: i64, channel_id: i64) -> Document {
    doc! {
        "$match": { "siteId": site_id, "channelId": channel_id }
    }
}

/// Accumulates the parameters of one gap-coalescing aggregation and
/// produces its nine stages.
pub struct PipelineBuilder<'a> {
    domain_min: i64,
    domain_max: i64,
    scope: PipelineScope,
    gap_threshold: &'a dyn GapThresholdPolicy,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(
        domain_min: i64,
        domain_max: i64,
        scope: PipelineScope,
        gap_threshold: &'a dyn GapThresholdPolicy,
    ) -> Self {
        Self {
            domain_min,
            domain_max,
            scope,
            gap_threshold,
        }
    }

    pub fn gap_threshold_ms(&self) -> i64 {
        self.gap_threshold
            .gap_threshold_ms(self.domain_max - self.domain_min)
    }

    pub fn build(self) -> Vec<Document> {
        let gap = self.gap_threshold_ms();
        let mut stages = Vec::with_capacity(9);

        if let PipelineScope::Global {
            site_id,
            channel_id,
        } = self.scope
        {
            stages.push(identity_match_stage(site_id, channel_id));
        }

        stages.push(window_match_stage(self.domain_min, self.domain_max));
        stages.push(doc! { "$sort": { "startTimestamp": 1 } });
        stages.push(doc! {
            "$set": { "effectiveEndTimestamp": { "$add": ["$endTimestamp", gap] } }
        });
        stages.push(doc! {
            "$setWindowFields": {
                "sortBy": { "startTimestamp": 1 },
                "output": {
                    "prevEffectiveEndTimestamp": {
                        "$shift": { "output": "$effectiveEndTimestamp", "by": -1 }
                    }
                }
            }
        });
        stages.push(doc! {
            "$set": {
                "boundary": {
                    "$cond": [
                        {
                            "$or": [
                                { "$eq": ["$prevEffectiveEndTimestamp", null] },
                                { "$lt": ["$prevEffectiveEndTimestamp", "$startTimestamp"] },
                            ]
                        },
                        1,
                        0,
                    ]
                }
            }
        });
        stages.push(doc! {
            "$setWindowFields": {
                "sortBy": { "startTimestamp": 1 },
                "output": {
                    "groupId": {
                        "$sum": "$boundary",
                        "window": { "documents": ["unbounded", "current"] }
                    }
                }
            }
        });
        stages.push(doc! {
            "$group": {
                "_id": "$groupId",
                "startTimestamp": { "$first": "$startTimestamp" },
                "endTimestamp": { "$last": "$endTimestamp" },
                "objectCount": { "$sum": { "$ifNull": ["$objectCount", 0] } },
            }
        });
        stages.push(doc! { "$sort": { "startTimestamp": 1 } });

        stages
    }
}
