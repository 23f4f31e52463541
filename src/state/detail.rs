// src/state/detail.rs

//! Post detail: cached favorite first, remote result second.

use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt, future};
use tokio::sync::watch;

use crate::cache::{Emitter, KeyedCache, Scope, SharedFlow};
use crate::error::{AppError, Result};
use crate::models::Post;
use crate::repo::PostRepository;
use crate::state::resource::{Operation, Resource};

/// View state for single posts, shared per post id.
///
/// For each id the detail flow emits `Loading(None)`, then
/// `Loading(favorite)` when a local copy exists, then the remote outcome.
/// A failed remote fetch keeps the local copy alongside the error.
pub struct DetailState {
    posts: Arc<PostRepository>,
    scope: Scope,
    details: KeyedCache<i64, SharedFlow<Resource<Post>>>,
    statuses: KeyedCache<i64, SharedFlow<Option<bool>>>,
    toggles: Operation<bool>,
}

impl DetailState {
    pub fn new(posts: Arc<PostRepository>, keep_alive: Duration) -> Result<Self> {
        let scope = Scope::new()?;

        let details = {
            let posts = Arc::clone(&posts);
            let scope = scope.clone();
            KeyedCache::new(move |&id: &i64| {
                let posts = Arc::clone(&posts);
                SharedFlow::new(&scope, keep_alive, Resource::loading(None), move |emitter| {
                    let posts = Arc::clone(&posts);
                    async move { load_detail(&posts, id, &emitter).await }.boxed()
                })
            })
        };

        let statuses = {
            let posts = Arc::clone(&posts);
            let scope = scope.clone();
            KeyedCache::new(move |&id: &i64| {
                let posts = Arc::clone(&posts);
                SharedFlow::from_stream(&scope, keep_alive, None, move || {
                    posts.favorites().filter_map(move |favorites| {
                        future::ready(match favorites {
                            Ok(favorites) => Some(Some(favorites.iter().any(|f| f.id == id))),
                            Err(e) => {
                                log::warn!("Failed to read favorite status of {}: {}", id, e);
                                None
                            }
                        })
                    })
                })
            })
        };

        let toggles = Operation::new(&scope);
        Ok(Self {
            posts,
            scope,
            details,
            statuses,
            toggles,
        })
    }

    /// Detail flow for post `id`.
    pub fn post(&self, id: i64) -> SharedFlow<Resource<Post>> {
        self.details.get(&id)
    }

    /// Whether post `id` is a favorite; `None` until the store has answered.
    pub fn is_favorite(&self, id: i64) -> SharedFlow<Option<bool>> {
        self.statuses.get(&id)
    }

    /// Add or remove post `id` from favorites. Returns the new status.
    ///
    /// Fails with `AppError::Precondition` while the post is loading, when no
    /// post data is available, or while the favorite status is unresolved.
    pub async fn toggle_favorite(&self, id: i64) -> Result<bool> {
        toggle(
            &self.posts,
            self.post(id).current(),
            self.is_favorite(id).current(),
        )
        .await
    }

    /// Run `toggle_favorite` in the background and observe its outcome.
    pub fn toggle_in_background(&self, id: i64) -> watch::Receiver<Option<Resource<bool>>> {
        let posts = Arc::clone(&self.posts);
        let resource = self.post(id).current();
        let status = self.is_favorite(id).current();
        self.toggles
            .run(async move { toggle(&posts, resource, status).await });
        self.toggles.subscribe()
    }
}

impl Drop for DetailState {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

async fn load_detail(posts: &PostRepository, id: i64, emitter: &Emitter<Resource<Post>>) {
    emitter.emit(Resource::loading(None));

    let cached = match posts.get_favorite(id).await {
        Ok(favorite) => favorite.map(|f| f.to_post()),
        Err(e) => {
            log::warn!("Failed to read favorite {}: {}", id, e);
            emitter.emit(Resource::error(None, e));
            return;
        }
    };
    if cached.is_some() {
        emitter.emit(Resource::loading(cached.clone()));
    }

    match posts.get_post(id).await {
        Ok(post) => emitter.emit(Resource::success(Some(post))),
        Err(e) => {
            log::warn!("Failed to fetch post {}: {}", id, e);
            emitter.emit(Resource::error(cached, e))
        }
    };
}

async fn toggle(
    posts: &PostRepository,
    resource: Resource<Post>,
    status: Option<bool>,
) -> Result<bool> {
    if resource.is_loading() {
        return Err(AppError::precondition("post is still loading"));
    }
    let post = resource
        .data()
        .ok_or_else(|| AppError::precondition("post data is not available"))?;
    let is_favorite =
        status.ok_or_else(|| AppError::precondition("favorite status is not resolved yet"))?;

    if is_favorite {
        posts.remove_favorite(post.id).await?;
        Ok(false)
    } else {
        posts.add_favorite(post).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FavoritePost;
    use crate::services::PostApi;
    use crate::services::fake::{FakePostApi, posts};
    use crate::storage::{PostStore, SqliteStore};

    const KEEP_ALIVE: Duration = Duration::from_secs(5);

    fn favorite(id: i64) -> FavoritePost {
        FavoritePost {
            id,
            title: "saved title".to_string(),
            body: "saved body".to_string(),
        }
    }

    async fn detail_state(api: FakePostApi) -> (Arc<FakePostApi>, Arc<SqliteStore>, DetailState) {
        let api = Arc::new(api);
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let dyn_api: Arc<dyn PostApi> = api.clone();
        let dyn_store: Arc<dyn PostStore> = store.clone();
        let repo = Arc::new(PostRepository::new(dyn_api, dyn_store, 3));
        (api, store, DetailState::new(repo, KEEP_ALIVE).unwrap())
    }

    #[tokio::test]
    async fn test_remote_success() {
        let post = posts(1, 1).remove(0);
        let (_, _, state) = detail_state(FakePostApi::new().with_item(post.clone())).await;

        let mut sub = state.post(1).subscribe();
        let done = sub.wait_for(Resource::is_success).await.unwrap();
        assert_eq!(done.data(), Some(&post));
    }

    #[tokio::test]
    async fn test_favorite_shown_while_loading_and_kept_on_error() {
        let (api, store, state) =
            detail_state(FakePostApi::gated().with_item_error(1, 500)).await;
        store.insert_favorite(&favorite(1)).await.unwrap();

        let mut sub = state.post(1).subscribe();
        let interim = sub
            .wait_for(|r| r.is_loading() && r.data().is_some())
            .await
            .unwrap();
        assert_eq!(interim.data(), Some(&favorite(1).to_post()));

        api.release_item();
        let done = sub.wait_for(Resource::is_error).await.unwrap();
        assert_eq!(done.data(), Some(&favorite(1).to_post()));
        assert!(done.error_ref().unwrap().is_transport());
    }

    #[tokio::test]
    async fn test_local_failure_skips_remote() {
        let (api, store, state) = detail_state(FakePostApi::new()).await;
        store.close().await;

        let mut sub = state.post(1).subscribe();
        let done = sub.wait_for(Resource::is_error).await.unwrap();
        assert_eq!(done.data(), None);
        assert!(api.item_calls().is_empty());
    }

    #[tokio::test]
    async fn test_same_id_shares_flow() {
        let post = posts(1, 1).remove(0);
        let (api, _, state) = detail_state(FakePostApi::new().with_item(post)).await;

        let mut a = state.post(1).subscribe();
        let mut b = state.post(1).subscribe();
        a.wait_for(Resource::is_success).await;
        b.wait_for(Resource::is_success).await;
        assert_eq!(api.item_calls(), vec![1]);
    }

    #[tokio::test]
    async fn test_toggle_while_loading_fails() {
        let (_, _, state) = detail_state(FakePostApi::gated().with_item(posts(1, 1).remove(0))).await;
        let _post = state.post(1).subscribe();
        let mut status = state.is_favorite(1).subscribe();
        status.wait_for(Option::is_some).await;

        let err = state.toggle_favorite(1).await.unwrap_err();
        assert!(matches!(err, AppError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_toggle_without_data_fails() {
        let (_, _, state) = detail_state(FakePostApi::new().with_item_error(1, 500)).await;
        let mut post = state.post(1).subscribe();
        post.wait_for(Resource::is_error).await;
        let mut status = state.is_favorite(1).subscribe();
        status.wait_for(Option::is_some).await;

        let err = state.toggle_favorite(1).await.unwrap_err();
        assert!(matches!(err, AppError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_toggle_with_unresolved_status_fails() {
        let (_, store, state) = detail_state(FakePostApi::new().with_item(posts(1, 1).remove(0))).await;
        let mut post = state.post(1).subscribe();
        post.wait_for(Resource::is_success).await;

        let err = state.toggle_favorite(1).await.unwrap_err();
        assert!(matches!(err, AppError::Precondition(_)));
        assert!(store.favorites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_adds_then_removes() {
        let post = posts(1, 1).remove(0);
        let (_, store, state) = detail_state(FakePostApi::new().with_item(post.clone())).await;
        let mut sub = state.post(1).subscribe();
        sub.wait_for(Resource::is_success).await;
        let mut status = state.is_favorite(1).subscribe();
        status.wait_for(|s| *s == Some(false)).await;

        assert!(state.toggle_favorite(1).await.unwrap());
        assert_eq!(
            store.favorite(1).await.unwrap(),
            Some(FavoritePost::from(&post))
        );

        status.wait_for(|s| *s == Some(true)).await;
        assert!(!state.toggle_favorite(1).await.unwrap());
        assert_eq!(store.favorite(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_toggle_in_background_publishes_result() {
        let (_, _, state) = detail_state(FakePostApi::new().with_item(posts(1, 1).remove(0))).await;
        let mut sub = state.post(1).subscribe();
        sub.wait_for(Resource::is_success).await;
        let mut status = state.is_favorite(1).subscribe();
        status.wait_for(Option::is_some).await;

        let mut outcome = state.toggle_in_background(1);
        let done = outcome
            .wait_for(|r| r.as_ref().is_some_and(Resource::is_success))
            .await
            .unwrap()
            .clone();
        assert_eq!(done.unwrap().data(), Some(&true));
    }
}
