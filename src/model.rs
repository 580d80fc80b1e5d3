//! Artifact families and the wire shapes of spec §3.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One of the four artifact families sharing a common spatial/temporal
/// header. Families differ only by their source collection (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactFamily {
    Recording,
    Human,
    Vehicle,
    Event,
}

impl ArtifactFamily {
    pub const ALL: [ArtifactFamily; 4] = [
        ArtifactFamily::Recording,
        ArtifactFamily::Human,
        ArtifactFamily::Vehicle,
        ArtifactFamily::Event,
    ];

    /// The `type` discriminator used on every outbound frame for this family.
    pub fn type_tag(&self) -> &'static str {
        match self {
            ArtifactFamily::Recording => "recordings",
            ArtifactFamily::Human => "humans",
            ArtifactFamily::Vehicle => "vehicles",
            ArtifactFamily::Event => "events",
        }
    }

    /// Key used in the outer `status:done` counts map.
    pub fn count_key(&self) -> &'static str {
        match self {
            ArtifactFamily::Recording => "recording",
            ArtifactFamily::Human => "human",
            ArtifactFamily::Vehicle => "vehicle",
            ArtifactFamily::Event => "event",
        }
    }

    pub fn database(&self) -> &'static str {
        match self {
            ArtifactFamily::Recording => "ivms_30",
            ArtifactFamily::Human | ArtifactFamily::Vehicle => "pvaDB",
            ArtifactFamily::Event => "dasDB",
        }
    }

    /// Collection name for this family, given the connection's site/channel.
    pub fn collection(&self, site_id: i64, channel_id: i64) -> String {
        match self {
            ArtifactFamily::Recording => format!("vVideoClips_{site_id}_{channel_id}"),
            ArtifactFamily::Human => format!("pva_HUMAN_{site_id}_{channel_id}"),
            ArtifactFamily::Vehicle => format!("pva_VEHICLE_{site_id}_{channel_id}"),
            ArtifactFamily::Event => "dasEvents".to_string(),
        }
    }

    /// Per-channel families encode identity in the collection name; only the
    /// shared `event` collection needs an identity match stage prepended.
    pub fn is_global_scope(&self) -> bool {
        matches!(self, ArtifactFamily::Event)
    }
}

/// A client-originated viewport command. Only `domain_min`/`domain_max`
/// drive the query; the rest are carried through for correlation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportCommand {
    pub command_id: String,
    pub pivot_point: i64,
    pub display_min: i64,
    pub display_max: i64,
    pub domain_min: i64,
    pub domain_max: i64,
}

impl ViewportCommand {
    /// Validates the domain invariant of spec §3: `domainMax >= domainMin`.
    pub fn validate(&self) -> Result<()> {
        if self.domain_max < self.domain_min {
            return Err(Error::InvalidTimeRange);
        }
        Ok(())
    }

    pub fn window_ms(&self) -> i64 {
        self.domain_max - self.domain_min
    }
}

/// The shape a Collection Runner decodes off the wire, before the
/// `commandId` is stamped on. Mirrors the `$group` stage output of the
/// coalescing pipeline (spec §4.2 step 8).
#[derive(Debug, Clone, Deserialize)]
pub struct RawMergedInterval {
    #[serde(rename = "_id")]
    pub group_id: i64,
    #[serde(rename = "startTimestamp")]
    pub start_timestamp: i64,
    #[serde(rename = "endTimestamp")]
    pub end_timestamp: i64,
    #[serde(rename = "objectCount", default)]
    pub object_count: i64,
}

impl RawMergedInterval {
    /// Stamps this interval with a `commandId`, copying rather than aliasing
    /// a reused decode target (spec §4.3 / §9).
    pub fn tag(&self, command_id: &str) -> MergedInterval {
        MergedInterval {
            group_id: self.group_id,
            start_timestamp: self.start_timestamp,
            end_timestamp: self.end_timestamp,
            object_count: self.object_count,
            command_id: command_id.to_string(),
        }
    }
}

/// A merged interval as it appears on the wire, tagged with the command
/// that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedInterval {
    #[serde(rename = "_id")]
    pub group_id: i64,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub object_count: i64,
    pub command_id: String,
}
