//! Crate-wide error type and the fatal/non-fatal disposition rules of spec §7.

use thiserror::Error;

/// The error kinds a connection or command can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// The `siteId` path segment did not parse as an integer.
    #[error("invalid siteId")]
    InvalidSiteId,

    /// The `channelId` path segment did not parse as an integer.
    #[error("invalid channelId")]
    InvalidChannelId,

    /// The inbound command payload could not be parsed as JSON.
    #[error("invalid command")]
    InvalidCommand(#[source] serde_json::Error),

    /// `domainMax < domainMin` on an otherwise well-formed command.
    #[error("invalid time range")]
    InvalidTimeRange,

    /// Opening an aggregation cursor against the store failed.
    #[error("store error: {0}")]
    Store(#[from] mongodb::error::Error),

    /// A cursor batch could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] bson::de::Error),

    /// A write to the connection's frame writer failed; the connection is
    /// assumed dead.
    #[error("write failed, connection closed")]
    WriteFailed,

    /// The snapshot compatibility endpoint's deadline elapsed (spec §6).
    #[error("snapshot timed out")]
    SnapshotTimeout,
}

/// Whether an error should tear down the connection (`Fatal`) or just the
/// current command/runner (`NonFatal`). See spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Fatal,
    NonFatal,
}

impl Error {
    pub fn disposition(&self) -> Disposition {
        match self {
            Error::InvalidSiteId | Error::InvalidChannelId => Disposition::Fatal,
            Error::InvalidCommand(_) => Disposition::Fatal,
            Error::InvalidTimeRange => Disposition::NonFatal,
            Error::Store(_) => Disposition::NonFatal,
            Error::Decode(_) => Disposition::NonFatal,
            Error::WriteFailed => Disposition::Fatal,
            Error::SnapshotTimeout => Disposition::NonFatal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
