use std::{collections::HashSet, time::Duration};

use serde_json::Value;

use crate::{
    bili::{ListQuery, VideoSource},
    error::PlatformError,
    parser::parse_video_list,
    types::VideoRecord,
};

#[derive(Debug, Clone)]
pub struct ListOptions {
    pub page_size: u32,
    pub max_count: usize,
    pub delay: Duration,
}

/// Collects up to `options.max_count` videos for `creator_id`, page by page.
///
/// Stops when the quota is reached or a page yields no new records. A page
/// that fails for any reason other than a parameter rejection triggers a
/// single unpaginated catalog fetch, after which listing ends. When every
/// parameter set is rejected, the catalog request has already been tried and
/// listing ends with what was collected. Errors never reach the caller; the
/// worst case is an empty list.
#[tracing::instrument(skip(source, options), fields(max_count = options.max_count))]
pub async fn list_videos<V: VideoSource>(
    source: &V,
    creator_id: &str,
    options: &ListOptions,
) -> Vec<VideoRecord> {
    let mut collected = Vec::new();
    let mut seen = HashSet::new();
    let mut page = 1;
    // index into the degradation ladder of the narrowest accepted query so far
    let mut rung = 0;

    while collected.len() < options.max_count {
        let (query, payload) = match fetch_page(source, creator_id, page, options.page_size, rung).await {
            Ok(fetched) => fetched,
            Err(e) if e.is_rejection() => {
                tracing::warn!(error = %e, page, "Every parameter set was rejected, listing complete");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, page, "Failed to fetch video page, trying the full catalog");
                let remaining = options.max_count - collected.len();
                let catalog = fetch_catalog(source, creator_id, remaining, &mut seen).await;
                collected.extend(catalog);
                break;
            }
        };
        rung = rung.max(ladder_position(&query));

        let mut new_records = 0;
        for video in parse_video_list(payload) {
            if collected.len() >= options.max_count {
                break;
            }
            if !video.id.is_empty() && !seen.insert(video.id.clone()) {
                continue;
            }
            tracing::debug!(id = %video.id, title = %video.title, "Collected video");
            collected.push(video);
            new_records += 1;
        }

        if new_records == 0 {
            tracing::info!(page, "No new videos on page, listing complete");
            break;
        }
        if !query.is_paged() || collected.len() >= options.max_count {
            break;
        }

        page += 1;
        tokio::time::sleep(options.delay).await;
    }

    tracing::info!(count = collected.len(), "Collected videos");
    collected
}

/// Fetches `page`, narrowing the parameter set each time the platform rejects it.
async fn fetch_page<V: VideoSource>(
    source: &V,
    creator_id: &str,
    page: u32,
    page_size: u32,
    start_rung: usize,
) -> Result<(ListQuery, Value), PlatformError> {
    let ladder = ListQuery::ladder(page, page_size);
    let mut last_rejection = None;

    for query in ladder.into_iter().skip(start_rung) {
        match source.fetch_videos(creator_id, query).await {
            Ok(payload) => return Ok((query, payload)),
            Err(e) if e.is_rejection() => {
                tracing::debug!(error = %e, ?query, "Parameters rejected, narrowing");
                last_rejection = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_rejection.unwrap_or(PlatformError::Malformed("no query accepted")))
}

/// The one-shot fallback: the whole catalog minus what `seen` already holds,
/// truncated to `remaining`.
async fn fetch_catalog<V: VideoSource>(
    source: &V,
    creator_id: &str,
    remaining: usize,
    seen: &mut HashSet<String>,
) -> Vec<VideoRecord> {
    match source.fetch_videos(creator_id, ListQuery::Catalog).await {
        Ok(payload) => parse_video_list(payload)
            .into_iter()
            .filter(|video| video.id.is_empty() || seen.insert(video.id.clone()))
            .take(remaining)
            .collect(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch the full catalog");
            Vec::new()
        }
    }
}

fn ladder_position(query: &ListQuery) -> usize {
    match query {
        ListQuery::Paged { .. } => 0,
        ListQuery::PageSize { .. } => 1,
        ListQuery::LegacyPageSize { .. } => 2,
        ListQuery::Catalog => 3,
    }
}
