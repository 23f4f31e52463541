// src/repo/posts.rs

//! Posts: remote listing, single lookups, local favorites.

use std::sync::Arc;

use crate::cache::KeyedCache;
use crate::error::{AppError, Result};
use crate::models::{FavoritePost, Post};
use crate::paging::{Pager, PagingSource, PagingSourceFactory, PostPagingSource};
use crate::services::PostApi;
use crate::storage::{LiveQuery, PostStore, watch_favorites};

/// Aggregates the remote listing and the local favorites table.
pub struct PostRepository {
    api: Arc<dyn PostApi>,
    store: Arc<dyn PostStore>,
    pagers: KeyedCache<Option<String>, Arc<Pager<Post>>>,
}

impl PostRepository {
    pub fn new(api: Arc<dyn PostApi>, store: Arc<dyn PostStore>, page_size: usize) -> Self {
        let listing_api = Arc::clone(&api);
        let pagers = KeyedCache::new(move |query: &Option<String>| {
            let api = Arc::clone(&listing_api);
            let query = query.clone();
            let factory: PagingSourceFactory<Post> = Arc::new(move || {
                let source: Arc<dyn PagingSource<Post>> = Arc::new(PostPagingSource::new(
                    Arc::clone(&api),
                    page_size,
                    query.clone(),
                ));
                source
            });
            Arc::new(Pager::new(page_size, factory))
        });

        Self { api, store, pagers }
    }

    /// The pager for `query`, shared by every caller asking for the same query.
    ///
    /// The query is expected to be normalized already (trimmed, blank as `None`).
    pub fn list_posts(&self, query: Option<&str>) -> Arc<Pager<Post>> {
        self.pagers.get(&query.map(str::to_string))
    }

    /// Fetch one post from the remote.
    pub async fn get_post(&self, id: i64) -> Result<Post> {
        let posts = self.api.get_post(id).await?;
        posts.into_iter().next().ok_or(AppError::PostNotFound(id))
    }

    /// Look up a favorite in the local store only.
    pub async fn get_favorite(&self, id: i64) -> Result<Option<FavoritePost>> {
        self.store.favorite(id).await
    }

    /// Live view of all favorites.
    pub fn favorites(&self) -> LiveQuery<Vec<FavoritePost>> {
        watch_favorites(Arc::clone(&self.store))
    }

    /// Save `post` as a favorite, replacing any previous copy.
    pub async fn add_favorite(&self, post: &Post) -> Result<()> {
        log::info!("Adding post {} to favorites", post.id);
        self.store.insert_favorite(&FavoritePost::from(post)).await
    }

    pub async fn remove_favorite(&self, id: i64) -> Result<()> {
        log::info!("Removing post {} from favorites", id);
        self.store.delete_favorite(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    use crate::services::fake::{FakePostApi, posts};
    use crate::storage::SqliteStore;

    async fn repository(api: FakePostApi) -> (Arc<FakePostApi>, PostRepository) {
        let api = Arc::new(api);
        let store: Arc<dyn PostStore> = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let dyn_api: Arc<dyn PostApi> = api.clone();
        (api, PostRepository::new(dyn_api, store, 3))
    }

    #[tokio::test]
    async fn test_list_posts_reuses_pager_per_query() {
        let (_, repo) = repository(FakePostApi::new()).await;

        let a = repo.list_posts(Some("rust"));
        let b = repo.list_posts(Some("rust"));
        let c = repo.list_posts(None);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_list_posts_forwards_query() {
        let (api, repo) = repository(FakePostApi::new().with_page(0, posts(1, 2))).await;

        let pager = repo.list_posts(Some("lorem"));
        pager.refresh().await;

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query.as_deref(), Some("lorem"));
        assert_eq!(calls[0].size, 3);
    }

    #[tokio::test]
    async fn test_get_post_takes_first_element() {
        let post = Post {
            id: 7,
            title: Some("seven".to_string()),
            body: None,
        };
        let (_, repo) = repository(FakePostApi::new().with_item(post.clone())).await;

        assert_eq!(repo.get_post(7).await.unwrap(), post);
    }

    #[tokio::test]
    async fn test_get_post_empty_is_not_found() {
        let (_, repo) = repository(FakePostApi::new()).await;
        assert!(matches!(
            repo.get_post(9).await,
            Err(AppError::PostNotFound(9))
        ));
    }

    #[tokio::test]
    async fn test_get_post_error_surfaces() {
        let (_, repo) = repository(FakePostApi::new().with_item_error(9, 503)).await;
        let err = repo.get_post(9).await.unwrap_err();
        assert!(matches!(err, AppError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_add_favorite_coerces_missing_fields() {
        let (_, repo) = repository(FakePostApi::new()).await;
        let post = Post {
            id: 4,
            title: None,
            body: Some("text".to_string()),
        };

        repo.add_favorite(&post).await.unwrap();
        let stored = repo.get_favorite(4).await.unwrap().unwrap();
        assert_eq!(stored.title, "");
        assert_eq!(stored.body, "text");

        repo.remove_favorite(4).await.unwrap();
        assert_eq!(repo.get_favorite(4).await.unwrap(), None);
        repo.remove_favorite(4).await.unwrap();
    }

    #[tokio::test]
    async fn test_favorites_reemit_after_add() {
        let (_, repo) = repository(FakePostApi::new()).await;
        let mut live = repo.favorites();
        assert!(live.next().await.unwrap().unwrap().is_empty());

        repo.add_favorite(&posts(2, 1)[0]).await.unwrap();
        let after = live.next().await.unwrap().unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, 2);
    }
}
