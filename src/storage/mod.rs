//! Storage abstractions for favorites and search history.
//!
//! The store is the single writer-of-record for two tables:
//!
//! ```text
//! post(id PRIMARY KEY, title, body)   # favorites
//! hint(text PRIMARY KEY, time)        # search history
//! ```
//!
//! Writes replace on key conflict. Every write bumps a per-table change
//! counter so live queries can re-run and re-emit.

pub mod sqlite;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;

use crate::error::Result;
use crate::models::{FavoritePost, SearchHint};

// Re-export for convenience
pub use sqlite::SqliteStore;

/// A query result stream that re-emits after every change to its table.
pub type LiveQuery<T> = BoxStream<'static, Result<T>>;

/// Trait for local store backends.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert or replace a favorite.
    async fn insert_favorite(&self, post: &FavoritePost) -> Result<()>;

    /// Delete a favorite; absent ids are ignored.
    async fn delete_favorite(&self, id: i64) -> Result<()>;

    /// Look up a single favorite.
    async fn favorite(&self, id: i64) -> Result<Option<FavoritePost>>;

    /// All favorites.
    async fn favorites(&self) -> Result<Vec<FavoritePost>>;

    /// Insert or replace a hint.
    async fn insert_hint(&self, hint: &SearchHint) -> Result<()>;

    /// Delete every hint.
    async fn delete_hints(&self) -> Result<()>;

    /// All hints, ascending by time.
    async fn hints(&self) -> Result<Vec<SearchHint>>;

    /// Change counter for the favorites table.
    fn favorites_changed(&self) -> watch::Receiver<u64>;

    /// Change counter for the hints table.
    fn hints_changed(&self) -> watch::Receiver<u64>;
}

/// Run `fetch` once, then again after every change notification.
///
/// The stream ends when the change sender is dropped.
pub fn live_query<T, F, Fut>(changes: watch::Receiver<u64>, fetch: F) -> LiveQuery<T>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    stream::unfold(
        (changes, fetch, true),
        |(mut changes, fetch, first)| async move {
            if first {
                let _ = changes.borrow_and_update();
            } else {
                changes.changed().await.ok()?;
            }
            let value = fetch().await;
            Some((value, (changes, fetch, false)))
        },
    )
    .boxed()
}

/// Live view of the favorites table.
pub fn watch_favorites(store: Arc<dyn PostStore>) -> LiveQuery<Vec<FavoritePost>> {
    let changes = store.favorites_changed();
    live_query(changes, move || {
        let store = Arc::clone(&store);
        async move { store.favorites().await }
    })
}

/// Live view of the hints table.
pub fn watch_hints(store: Arc<dyn PostStore>) -> LiveQuery<Vec<SearchHint>> {
    let changes = store.hints_changed();
    live_query(changes, move || {
        let store = Arc::clone(&store);
        async move { store.hints().await }
    })
}
