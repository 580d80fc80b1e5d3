//! Parameter Extractor (C7): parses the `siteId`/`channelId` path segments.
//!
//! Kept as a plain function rather than an axum typed-path extractor so a
//! parse failure can be answered with the same error-frame shape as every
//! other fatal condition, instead of axum's default rejection response.

use crate::error::{Error, Result};

pub fn parse_site_and_channel(site_id_raw: &str, channel_id_raw: &str) -> Result<(i64, i64)> {
    let site_id: i64 = site_id_raw.parse().map_err(|_| Error::InvalidSiteId)?;
    let channel_id: i64 = channel_id_raw.parse().map_err(|_| Error::InvalidChannelId)?;
    Ok((site_id, channel_id))
}
