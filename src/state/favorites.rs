// src/state/favorites.rs

//! Favorites list state.

use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, future};

use crate::cache::{Scope, SharedFlow};
use crate::error::Result;
use crate::models::Post;
use crate::repo::PostRepository;

pub struct FavoritesState {
    scope: Scope,
    favorites: SharedFlow<Vec<Post>>,
}

impl FavoritesState {
    pub fn new(posts: Arc<PostRepository>, keep_alive: Duration) -> Result<Self> {
        let scope = Scope::new()?;
        let favorites = SharedFlow::from_stream(&scope, keep_alive, Vec::new(), move || {
            posts.favorites().filter_map(|favorites| {
                future::ready(match favorites {
                    Ok(favorites) => Some(favorites.iter().map(|f| f.to_post()).collect()),
                    Err(e) => {
                        log::warn!("Failed to read favorites: {}", e);
                        None
                    }
                })
            })
        });
        Ok(Self { scope, favorites })
    }

    /// Saved posts, empty until the store has answered.
    pub fn favorites(&self) -> SharedFlow<Vec<Post>> {
        self.favorites.clone()
    }
}

impl Drop for FavoritesState {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}
