//! # Listing Parser
//!
//! Normalizes the creator video listing payload into `VideoRecord`s. The
//! listing endpoint has returned several shapes over time; they are all
//! matched here so callers only ever see the canonical record.

use serde_json::Value;

use crate::types::{RawVideo, RawVideoList, VideoRecord};

/// Parses one listing payload into video records.
///
/// # Parameters
/// * `payload`: the `data` member of the listing response (or the whole body
///   for endpoints that return a bare array).
///
/// # Returns
/// The records in payload order. Unknown shapes yield an empty list, which
/// the lister treats as "no more pages".
#[tracing::instrument(skip(payload))]
pub fn parse_video_list(payload: Value) -> Vec<VideoRecord> {
    let raw = serde_json::from_value::<RawVideoList>(payload).unwrap_or(RawVideoList::Other(Value::Null));

    let items = match raw {
        RawVideoList::Nested { list } => list.vlist,
        RawVideoList::Flat { data } => data,
        RawVideoList::Legacy(items) => items,
        RawVideoList::Other(value) => {
            tracing::warn!(payload = %value, "Unrecognized video listing shape");
            Vec::new()
        }
    };

    items.into_iter().map(parse_video).collect()
}

fn parse_video(item: Value) -> VideoRecord {
    let raw = serde_json::from_value::<RawVideo>(item)
        .inspect_err(|e| tracing::debug!(error = %e, "Malformed listing item, using empty fields"))
        .unwrap_or_default();

    VideoRecord::from(raw)
}

impl From<RawVideo> for VideoRecord {
    fn from(
        RawVideo {
            bvid,
            title,
            desc,
            description,
            pubdate,
            created,
        }: RawVideo,
    ) -> Self {
        let description = desc
            .filter(|d| !d.is_empty())
            .or(description)
            .unwrap_or_default();

        VideoRecord::new(
            bvid.unwrap_or_default(),
            title.unwrap_or_default(),
            description,
            pubdate.or(created).unwrap_or(0),
        )
    }
}
