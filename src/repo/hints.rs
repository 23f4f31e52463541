// src/repo/hints.rs

//! Search history.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use futures::StreamExt;

use crate::error::Result;
use crate::models::SearchHint;
use crate::storage::{LiveQuery, PostStore, watch_hints};
use crate::utils::now_millis;

/// Recent search terms, oldest first.
pub struct HintRepository {
    store: Arc<dyn PostStore>,
    last_time: AtomicI64,
}

impl HintRepository {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self {
            store,
            last_time: AtomicI64::new(0),
        }
    }

    /// Live list of hint texts, ascending by time.
    pub fn hints(&self) -> LiveQuery<Vec<String>> {
        watch_hints(Arc::clone(&self.store))
            .map(|hints| hints.map(|hints| hints.into_iter().map(|h| h.text).collect()))
            .boxed()
    }

    /// Record `text`, moving it to the most recent position if present.
    pub async fn add_hint(&self, text: &str) -> Result<()> {
        let hint = SearchHint {
            text: text.to_string(),
            time: self.next_time(),
        };
        log::debug!("Recording search hint {:?}", hint.text);
        self.store.insert_hint(&hint).await
    }

    pub async fn clear_all_hints(&self) -> Result<()> {
        log::info!("Clearing search history");
        self.store.delete_hints().await
    }

    /// Current time in milliseconds, bumped past the last handed-out value.
    fn next_time(&self) -> i64 {
        let now = now_millis();
        let previous = self
            .last_time
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}
