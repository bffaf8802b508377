// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use futures_util::Stream;
use futures_util::stream;

use crate::notion::traits::{Destination, NotionError, SyncRecord};

/// Lazily walk all changed pages, one query per item of the stream.
///
/// Starts at `start_cursor` (or the beginning) and ends after the first
/// response without a continuation cursor.
pub fn changed_records(
    destination: &dyn Destination,
    since: DateTime<Utc>,
    start_cursor: Option<String>,
) -> impl Stream<Item = Result<Vec<SyncRecord>, NotionError>> + Send + '_ {
    // Outer None: exhausted. Inner None: first page.
    stream::try_unfold(Some(start_cursor), move |state| async move {
        let Some(cursor) = state else {
            return Ok(None);
        };

        let page = destination.query_changed(since, cursor).await?;
        Ok(Some((page.records, page.next_cursor.map(Some))))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeDestination;
    use futures_util::TryStreamExt;

    #[tokio::test]
    async fn test_walks_every_page() {
        let destination = FakeDestination::with_page_size(2);
        for i in 0..5 {
            destination.add_page(&format!("page-{i}"), 100 + i, "user-1");
        }

        let pages: Vec<Vec<SyncRecord>> =
            changed_records(&destination, DateTime::<Utc>::UNIX_EPOCH, None)
                .try_collect()
                .await
                .unwrap();

        assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
        assert_eq!(destination.query_count(), 3);
    }

    #[tokio::test]
    async fn test_restarts_from_cursor() {
        let destination = FakeDestination::with_page_size(2);
        for i in 0..5 {
            destination.add_page(&format!("page-{i}"), 100 + i, "user-1");
        }

        let pages: Vec<Vec<SyncRecord>> =
            changed_records(&destination, DateTime::<Utc>::UNIX_EPOCH, Some("2".to_string()))
                .try_collect()
                .await
                .unwrap();

        let ids: Vec<u32> = pages.into_iter().flatten().map(|r| r.app_id).collect();
        assert_eq!(ids, vec![102, 103, 104]);
    }

    #[tokio::test]
    async fn test_empty_result_is_one_query() {
        let destination = FakeDestination::with_page_size(2);
        let pages: Vec<Vec<SyncRecord>> =
            changed_records(&destination, DateTime::<Utc>::UNIX_EPOCH, None)
                .try_collect()
                .await
                .unwrap();

        assert_eq!(pages, vec![Vec::<SyncRecord>::new()]);
        assert_eq!(destination.query_count(), 1);
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let destination = FakeDestination::with_page_size(2);
        destination.fail_queries(true);
        let result: Result<Vec<Vec<SyncRecord>>, _> =
            changed_records(&destination, DateTime::<Utc>::UNIX_EPOCH, None)
                .try_collect()
                .await;
        assert!(result.is_err());
    }
}
