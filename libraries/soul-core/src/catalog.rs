//! Catalog iteration
//!
//! A catalog is a lazy, finite, non-restartable pull sequence of
//! provider-shaped items. Each pull yields the next item, ends the sequence,
//! or fails with a source error after which the sequence is over.
//!
//! Pagination stays behind this contract: [`paginate`] turns a
//! "fetch page N" function into a flat stream so consumers never see page
//! sizes or offsets.

use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::future::Future;

use crate::error::Result;
use crate::types::MediaItem;

/// Lazy sequence of catalog items
pub type CatalogStream<'a> = BoxStream<'a, Result<MediaItem>>;

struct PageState<F> {
    fetch_page: F,
    next_page: u32,
    buffer: VecDeque<MediaItem>,
    done: bool,
}

/// Flatten a paged source into a [`CatalogStream`]
///
/// Pages are requested from 0 upwards, one at a time and only when the
/// previous page has been consumed. The first empty page ends the stream.
/// A failed page fetch is yielded once and terminates the stream.
pub fn paginate<'a, F, Fut>(fetch_page: F) -> CatalogStream<'a>
where
    F: FnMut(u32) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Vec<MediaItem>>> + Send + 'a,
{
    let initial_state = PageState {
        fetch_page,
        next_page: 0,
        buffer: VecDeque::new(),
        done: false,
    };

    stream::try_unfold(initial_state, |mut state| async move {
        loop {
            if let Some(item) = state.buffer.pop_front() {
                return Ok(Some((item, state)));
            }

            if state.done {
                return Ok(None);
            }

            let page = (state.fetch_page)(state.next_page).await?;
            state.next_page += 1;
            if page.is_empty() {
                state.done = true;
            } else {
                state.buffer = VecDeque::from(page);
            }
        }
    })
    .boxed()
}

/// Catalog over items that are already in memory
pub fn from_items<'a>(items: Vec<MediaItem>) -> CatalogStream<'a> {
    stream::iter(items.into_iter().map(Ok)).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SoulError;
    use crate::types::MediaType;
    use futures::TryStreamExt;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn track(id: &str) -> MediaItem {
        MediaItem::new(MediaType::Track, id, "test", "test--1", id)
    }

    #[tokio::test]
    async fn test_paginate_concatenates_until_empty_page() {
        let pages = vec![
            vec![track("1"), track("2")],
            vec![track("3")],
            vec![],
            vec![track("never")],
        ];
        let stream = paginate(move |page| {
            let items = pages.get(page as usize).cloned().unwrap_or_default();
            async move { Ok(items) }
        });

        let ids: Vec<String> = stream
            .map_ok(|item| item.item_id)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_paginate_fetches_lazily() {
        let fetched = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fetched);
        let mut stream = paginate(move |page| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(vec![track(&format!("p{page}"))]) }
        });

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.item_id, "p0");
        assert_eq!(fetched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_paginate_error_terminates_stream() {
        let mut stream = paginate(|page| async move {
            if page == 0 {
                Ok(vec![track("1")])
            } else {
                Err(SoulError::provider("page 1 failed"))
            }
        });

        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }
}
