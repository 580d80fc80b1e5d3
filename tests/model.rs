use bson::doc;
use timeline_streamer::error::Error;
use timeline_streamer::model::{ArtifactFamily, RawMergedInterval, ViewportCommand};

fn command(domain_min: i64, domain_max: i64) -> ViewportCommand {
    ViewportCommand {
        command_id: "cmd-1".to_string(),
        pivot_point: 0,
        display_min: 0,
        display_max: 100,
        domain_min,
        domain_max,
    }
}

#[test]
fn validate_accepts_equal_domain_bounds() {
    assert!(command(10, 10).validate().is_ok());
}

#[test]
fn validate_rejects_inverted_domain() {
    let err = command(100, 10).validate().unwrap_err();
    assert!(matches!(err, Error::InvalidTimeRange));
}

#[test]
fn window_ms_is_the_domain_span() {
    assert_eq!(command(1_000, 6_000).window_ms(), 5_000);
}

#[test]
fn tag_copies_rather_than_aliases_the_source_record() {
    let raw = RawMergedInterval {
        group_id: 3,
        start_timestamp: 10,
        end_timestamp: 20,
        object_count: 4,
    };
    let tagged_a = raw.tag("cmd-a");
    let tagged_b = raw.tag("cmd-b");

    assert_eq!(tagged_a.command_id, "cmd-a");
    assert_eq!(tagged_b.command_id, "cmd-b");
    assert_eq!(tagged_a.group_id, tagged_b.group_id);
    assert_eq!(tagged_a.start_timestamp, raw.start_timestamp);
}

#[test]
fn object_count_defaults_to_zero_when_absent() {
    let doc = doc! { "_id": 1i64, "startTimestamp": 0i64, "endTimestamp": 5i64 };
    let raw: RawMergedInterval = bson::from_document(doc).unwrap();
    assert_eq!(raw.object_count, 0);
}

#[test]
fn only_the_event_family_is_globally_scoped() {
    for family in ArtifactFamily::ALL {
        assert_eq!(family.is_global_scope(), matches!(family, ArtifactFamily::Event));
    }
}

#[test]
fn per_channel_collections_carry_site_and_channel_in_their_name() {
    assert_eq!(
        ArtifactFamily::Recording.collection(7, 2),
        "vVideoClips_7_2"
    );
    assert_eq!(ArtifactFamily::Event.collection(7, 2), "dasEvents");
}
