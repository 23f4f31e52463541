// src/paging/source.rs

//! Page sources: one `load` per page key, no retries.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::Post;
use crate::services::PostApi;

/// 0-based page index.
pub type PageKey = u32;

/// Parameters of a single page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadParams {
    /// Page to load; `None` on the first load
    pub key: Option<PageKey>,
    /// Requested number of items
    pub load_size: usize,
}

/// A successfully loaded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub prev_key: Option<PageKey>,
    pub next_key: Option<PageKey>,
    /// Number of items in the sequence before this page
    pub items_before: u64,
}

/// Outcome of a page load. Failures are scoped to the page.
#[derive(Debug, Clone)]
pub enum LoadResult<T> {
    Page(Page<T>),
    Error(Arc<AppError>),
}

impl<T> LoadResult<T> {
    pub fn page(&self) -> Option<&Page<T>> {
        match self {
            LoadResult::Page(page) => Some(page),
            LoadResult::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LoadResult::Error(_))
    }
}

/// Loaded pages plus the position the consumer last looked at.
#[derive(Debug)]
pub struct PagingState<'a, T> {
    pub pages: &'a [Page<T>],
    /// Absolute item position, counting the first page's `items_before`
    pub anchor_position: Option<usize>,
}

impl<'a, T> PagingState<'a, T> {
    /// Page holding `position`, clamped to the first and last loaded pages.
    pub fn closest_page_to_position(&self, position: usize) -> Option<&'a Page<T>> {
        let first = self.pages.first()?;
        let leading = first.items_before as usize;
        let mut index = position.saturating_sub(leading);
        for page in self.pages {
            if index < page.data.len() {
                return Some(page);
            }
            index -= page.data.len();
        }
        self.pages.last()
    }
}

/// A source of pages addressed by `PageKey`.
#[async_trait]
pub trait PagingSource<T>: Send + Sync {
    /// Load one page. Never panics on remote failure.
    async fn load(&self, params: LoadParams) -> LoadResult<T>;

    /// Key to reload around the anchor of `state`, if any.
    fn refresh_key(&self, state: &PagingState<'_, T>) -> Option<PageKey>;
}

/// Pages of posts from the remote listing, for one optional query.
pub struct PostPagingSource {
    api: Arc<dyn PostApi>,
    page_size: usize,
    query: Option<String>,
}

impl PostPagingSource {
    pub fn new(api: Arc<dyn PostApi>, page_size: usize, query: Option<String>) -> Self {
        Self {
            api,
            page_size,
            query,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}

#[async_trait]
impl PagingSource<Post> for PostPagingSource {
    async fn load(&self, params: LoadParams) -> LoadResult<Post> {
        let key = params.key.unwrap_or(0);
        let items_before = u64::from(key) * self.page_size as u64;

        match self
            .api
            .get_posts(items_before, self.page_size, self.query.as_deref())
            .await
        {
            Ok(data) => {
                let prev_key = key.checked_sub(1);
                let next_key = if data.len() < self.page_size {
                    None
                } else {
                    Some(key + 1)
                };
                LoadResult::Page(Page {
                    data,
                    prev_key,
                    next_key,
                    items_before,
                })
            }
            Err(e) => {
                log::warn!(
                    "Failed to load page {} (query {:?}): {}",
                    key,
                    self.query,
                    e
                );
                LoadResult::Error(Arc::new(e))
            }
        }
    }

    fn refresh_key(&self, state: &PagingState<'_, Post>) -> Option<PageKey> {
        let anchor = state.anchor_position?;
        let page = state.closest_page_to_position(anchor)?;
        page.prev_key
            .map(|prev| prev + 1)
            .or_else(|| page.next_key.and_then(|next| next.checked_sub(1)))
    }
}
