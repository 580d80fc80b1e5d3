use timeline_streamer::pipeline::{
    GapThresholdPolicy, LinearGapThreshold, PipelineBuilder, PipelineScope,
};

#[test]
fn gap_threshold_floors_at_one_hundred_milliseconds() {
    let policy = LinearGapThreshold;
    assert_eq!(policy.gap_threshold_ms(1_000), 100);
    assert_eq!(policy.gap_threshold_ms(0), 100);
}

#[test]
fn gap_threshold_scales_linearly_above_the_floor() {
    let policy = LinearGapThreshold;
    assert_eq!(policy.gap_threshold_ms(500_000), 100);
    assert_eq!(policy.gap_threshold_ms(5_000_000), 1_000);
}

#[test]
fn per_channel_pipeline_has_no_leading_identity_match() {
    let policy = LinearGapThreshold;
    let stages = PipelineBuilder::new(0, 1_000, PipelineScope::PerChannel, &policy).build();
    assert_eq!(stages.len(), 8);
    assert!(stages[0].contains_key("$match"));
    assert!(!stages[0].get_document("$match").unwrap().contains_key("siteId"));
}

#[test]
fn global_pipeline_prepends_an_identity_match() {
    let policy = LinearGapThreshold;
    let stages = PipelineBuilder::new(
        0,
        1_000,
        PipelineScope::Global {
            site_id: 7,
            channel_id: 2,
        },
        &policy,
    )
    .build();
    assert_eq!(stages.len(), 9);
    let identity = stages[0].get_document("$match").unwrap();
    assert_eq!(identity.get_i64("siteId").unwrap(), 7);
    assert_eq!(identity.get_i64("channelId").unwrap(), 2);
}

#[test]
fn pipeline_ends_with_an_ascending_sort() {
    let policy = LinearGapThreshold;
    let stages = PipelineBuilder::new(0, 1_000, PipelineScope::PerChannel, &policy).build();
    let last = stages.last().unwrap();
    assert_eq!(
        last.get_document("$sort").unwrap().get_i32("startTimestamp").unwrap(),
        1
    );
}
