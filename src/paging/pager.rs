// src/paging/pager.rs

//! Pager: drives a `PagingSource` one page at a time.
//!
//! Loads are serialized. A failed load parks its direction in `Error` until
//! `retry` is called, so the pager never skips past a page that failed.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::error::AppError;
use crate::paging::source::{LoadParams, LoadResult, Page, PageKey, PagingSource, PagingState};

/// Creates a fresh source for every refresh.
pub type PagingSourceFactory<T> = Arc<dyn Fn() -> Arc<dyn PagingSource<T>> + Send + Sync>;

/// State of one load direction.
#[derive(Debug, Clone)]
pub enum LoadState {
    NotLoading { end_of_pagination: bool },
    Loading,
    Error(Arc<AppError>),
}

impl LoadState {
    pub fn is_error(&self) -> bool {
        matches!(self, LoadState::Error(_))
    }

    pub fn is_end(&self) -> bool {
        matches!(
            self,
            LoadState::NotLoading {
                end_of_pagination: true
            }
        )
    }

    fn idle(end_of_pagination: bool) -> Self {
        LoadState::NotLoading { end_of_pagination }
    }
}

/// Snapshot published to observers after every state change.
#[derive(Debug, Clone)]
pub struct PagingData<T> {
    /// Items of all loaded pages, in order
    pub items: Vec<T>,
    /// Items before the first loaded page
    pub items_before: u64,
    pub refresh: LoadState,
    pub prepend: LoadState,
    pub append: LoadState,
}

impl<T> PagingData<T> {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            items_before: 0,
            refresh: LoadState::idle(false),
            prepend: LoadState::idle(false),
            append: LoadState::idle(false),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Prepend,
    Append,
}

struct PagerInner<T> {
    source: Option<Arc<dyn PagingSource<T>>>,
    pages: Vec<Page<T>>,
    anchor_position: Option<usize>,
    refresh: LoadState,
    prepend: LoadState,
    append: LoadState,
}

impl<T> PagerInner<T> {
    fn state_mut(&mut self, direction: Direction) -> &mut LoadState {
        match direction {
            Direction::Prepend => &mut self.prepend,
            Direction::Append => &mut self.append,
        }
    }
}

/// Accumulates pages from a `PagingSource` and publishes `PagingData`.
pub struct Pager<T> {
    factory: PagingSourceFactory<T>,
    page_size: usize,
    inner: Mutex<PagerInner<T>>,
    data_tx: watch::Sender<PagingData<T>>,
}

impl<T> Pager<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(page_size: usize, factory: PagingSourceFactory<T>) -> Self {
        Self {
            factory,
            page_size,
            inner: Mutex::new(PagerInner {
                source: None,
                pages: Vec::new(),
                anchor_position: None,
                refresh: LoadState::idle(false),
                prepend: LoadState::idle(false),
                append: LoadState::idle(false),
            }),
            data_tx: watch::Sender::new(PagingData::empty()),
        }
    }

    /// Observe paging data.
    pub fn subscribe(&self) -> watch::Receiver<PagingData<T>> {
        self.data_tx.subscribe()
    }

    /// Latest paging data.
    pub fn snapshot(&self) -> PagingData<T> {
        self.data_tx.borrow().clone()
    }

    /// Loaded pages.
    pub async fn pages(&self) -> Vec<Page<T>> {
        self.inner.lock().await.pages.clone()
    }

    /// Record the item position the consumer is looking at.
    pub async fn access(&self, position: usize) {
        self.inner.lock().await.anchor_position = Some(position);
    }

    /// Reload from a fresh source around the current anchor.
    pub async fn refresh(&self) -> LoadState {
        let mut inner = self.inner.lock().await;
        self.load_refresh(&mut inner).await
    }

    /// Load the page after the last one.
    ///
    /// While a refresh or append is failed this returns that error without
    /// loading; call `retry` first.
    pub async fn append(&self) -> LoadState {
        let mut inner = self.inner.lock().await;
        if inner.refresh.is_error() {
            return inner.refresh.clone();
        }
        if inner.append.is_error() {
            return inner.append.clone();
        }
        if inner.pages.is_empty() {
            return self.load_refresh(&mut inner).await;
        }
        let key = inner.pages.last().and_then(|p| p.next_key);
        self.load_edge(&mut inner, Direction::Append, key).await
    }

    /// Load the page before the first one.
    pub async fn prepend(&self) -> LoadState {
        let mut inner = self.inner.lock().await;
        if inner.refresh.is_error() {
            return inner.refresh.clone();
        }
        if inner.prepend.is_error() || inner.pages.is_empty() {
            return inner.prepend.clone();
        }
        let key = inner.pages.first().and_then(|p| p.prev_key);
        self.load_edge(&mut inner, Direction::Prepend, key).await
    }

    /// Re-issue the load that failed, if any.
    pub async fn retry(&self) -> Option<LoadState> {
        let mut inner = self.inner.lock().await;
        if inner.refresh.is_error() {
            return Some(self.load_refresh(&mut inner).await);
        }
        if inner.prepend.is_error() {
            let key = inner.pages.first().and_then(|p| p.prev_key);
            return Some(self.load_edge(&mut inner, Direction::Prepend, key).await);
        }
        if inner.append.is_error() {
            let key = inner.pages.last().and_then(|p| p.next_key);
            return Some(self.load_edge(&mut inner, Direction::Append, key).await);
        }
        None
    }

    async fn load_refresh(&self, inner: &mut PagerInner<T>) -> LoadState {
        let key = match &inner.source {
            Some(source) if !inner.pages.is_empty() => source.refresh_key(&PagingState {
                pages: &inner.pages,
                anchor_position: inner.anchor_position,
            }),
            _ => None,
        };

        let source = (self.factory)();
        inner.source = Some(Arc::clone(&source));
        inner.refresh = LoadState::Loading;
        self.publish(inner);

        log::debug!("Refreshing pager from key {:?}", key);
        match source.load(self.params(key)).await {
            LoadResult::Page(page) => {
                inner.prepend = LoadState::idle(page.prev_key.is_none());
                inner.append = LoadState::idle(page.next_key.is_none());
                inner.refresh = LoadState::idle(false);
                inner.pages = vec![page];
            }
            LoadResult::Error(e) => {
                inner.refresh = LoadState::Error(e);
            }
        }
        self.publish(inner);
        inner.refresh.clone()
    }

    async fn load_edge(
        &self,
        inner: &mut PagerInner<T>,
        direction: Direction,
        key: Option<PageKey>,
    ) -> LoadState {
        let Some(key) = key else {
            *inner.state_mut(direction) = LoadState::idle(true);
            self.publish(inner);
            return LoadState::idle(true);
        };
        let Some(source) = inner.source.clone() else {
            return inner.state_mut(direction).clone();
        };

        *inner.state_mut(direction) = LoadState::Loading;
        self.publish(inner);

        let state = match source.load(self.params(Some(key))).await {
            LoadResult::Page(page) => match direction {
                Direction::Prepend => {
                    let end = page.prev_key.is_none();
                    inner.pages.insert(0, page);
                    LoadState::idle(end)
                }
                Direction::Append => {
                    let end = page.next_key.is_none();
                    inner.pages.push(page);
                    LoadState::idle(end)
                }
            },
            LoadResult::Error(e) => {
                log::debug!("{:?} load of page {} failed", direction, key);
                LoadState::Error(e)
            }
        };
        *inner.state_mut(direction) = state.clone();
        self.publish(inner);
        state
    }

    fn params(&self, key: Option<PageKey>) -> LoadParams {
        LoadParams {
            key,
            load_size: self.page_size,
        }
    }

    fn publish(&self, inner: &PagerInner<T>) {
        let data = PagingData {
            items: inner
                .pages
                .iter()
                .flat_map(|p| p.data.iter().cloned())
                .collect(),
            items_before: inner.pages.first().map_or(0, |p| p.items_before),
            refresh: inner.refresh.clone(),
            prepend: inner.prepend.clone(),
            append: inner.append.clone(),
        };
        self.data_tx.send_replace(data);
    }
}
