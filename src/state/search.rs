// src/state/search.rs

//! Search screen state: current query, its listing, search history.

use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, future};
use tokio::sync::watch;

use crate::cache::{Scope, SharedFlow};
use crate::error::Result;
use crate::models::{Post, normalize_query};
use crate::paging::Pager;
use crate::repo::{HintRepository, PostRepository};

pub struct SearchState {
    posts: Arc<PostRepository>,
    hints: Arc<HintRepository>,
    scope: Scope,
    query: watch::Sender<Option<String>>,
    hint_texts: SharedFlow<Vec<String>>,
}

impl SearchState {
    pub fn new(
        posts: Arc<PostRepository>,
        hints: Arc<HintRepository>,
        keep_alive: Duration,
    ) -> Result<Self> {
        let scope = Scope::new()?;
        let source = Arc::clone(&hints);
        let hint_texts = SharedFlow::from_stream(&scope, keep_alive, Vec::new(), move || {
            source.hints().filter_map(|texts| {
                future::ready(match texts {
                    Ok(texts) => Some(texts),
                    Err(e) => {
                        log::warn!("Failed to read search hints: {}", e);
                        None
                    }
                })
            })
        });

        Ok(Self {
            posts,
            hints,
            scope,
            query: watch::Sender::new(None),
            hint_texts,
        })
    }

    /// Accept raw search input. Blank input clears the query; anything else
    /// becomes the current query and is remembered as a hint.
    pub async fn on_query_change(&self, raw: &str) -> Result<Option<String>> {
        let query = normalize_query(Some(raw));
        self.query.send_replace(query.clone());
        if let Some(text) = &query {
            self.hints.add_hint(text).await?;
        }
        Ok(query)
    }

    pub fn query(&self) -> Option<String> {
        self.query.borrow().clone()
    }

    pub fn subscribe_query(&self) -> watch::Receiver<Option<String>> {
        self.query.subscribe()
    }

    /// Pager for the current query.
    pub fn posts(&self) -> Arc<Pager<Post>> {
        self.posts.list_posts(self.query().as_deref())
    }

    /// Search history texts, oldest first.
    pub fn hints(&self) -> SharedFlow<Vec<String>> {
        self.hint_texts.clone()
    }

    pub async fn clear_all_hints(&self) -> Result<()> {
        self.hints.clear_all_hints().await
    }
}

impl Drop for SearchState {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}
