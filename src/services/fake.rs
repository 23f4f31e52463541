//! Scripted `PostApi` for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::error::{AppError, Result};
use crate::models::Post;
use crate::services::PostApi;

/// One recorded listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCall {
    pub start: u64,
    pub size: usize,
    pub query: Option<String>,
}

enum Reply {
    Posts(Vec<Post>),
    Status(u16),
}

/// In-memory remote answering from scripted replies.
///
/// Listing offsets without a script answer with an empty page. Single-post
/// lookups can be gated so a test can observe interim state before the
/// remote answers.
#[derive(Default)]
pub struct FakePostApi {
    pages: Mutex<HashMap<u64, Reply>>,
    items: Mutex<HashMap<i64, Reply>>,
    calls: Mutex<Vec<ListingCall>>,
    item_calls: Mutex<Vec<i64>>,
    gate: Option<Semaphore>,
}

impl FakePostApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-post lookups wait until `release_item` is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn with_page(self, start: u64, posts: Vec<Post>) -> Self {
        self.pages.lock().unwrap().insert(start, Reply::Posts(posts));
        self
    }

    pub fn with_page_error(self, start: u64, status: u16) -> Self {
        self.pages.lock().unwrap().insert(start, Reply::Status(status));
        self
    }

    pub fn with_item(self, post: Post) -> Self {
        self.items
            .lock()
            .unwrap()
            .insert(post.id, Reply::Posts(vec![post]));
        self
    }

    pub fn with_item_error(self, id: i64, status: u16) -> Self {
        self.items.lock().unwrap().insert(id, Reply::Status(status));
        self
    }

    pub fn set_page(&self, start: u64, posts: Vec<Post>) {
        self.pages.lock().unwrap().insert(start, Reply::Posts(posts));
    }

    pub fn set_page_error(&self, start: u64, status: u16) {
        self.pages.lock().unwrap().insert(start, Reply::Status(status));
    }

    pub fn release_item(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<ListingCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn starts(&self) -> Vec<u64> {
        self.calls().into_iter().map(|c| c.start).collect()
    }

    pub fn item_calls(&self) -> Vec<i64> {
        self.item_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostApi for FakePostApi {
    async fn get_posts(&self, start: u64, size: usize, query: Option<&str>) -> Result<Vec<Post>> {
        self.calls.lock().unwrap().push(ListingCall {
            start,
            size,
            query: query.map(str::to_string),
        });
        match self.pages.lock().unwrap().get(&start) {
            Some(Reply::Posts(posts)) => Ok(posts.clone()),
            Some(Reply::Status(status)) => Err(AppError::status(*status, "fake://posts")),
            None => Ok(Vec::new()),
        }
    }

    async fn get_post(&self, id: i64) -> Result<Vec<Post>> {
        self.item_calls.lock().unwrap().push(id);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| AppError::Cancelled)?
                .forget();
        }
        match self.items.lock().unwrap().get(&id) {
            Some(Reply::Posts(posts)) => Ok(posts.clone()),
            Some(Reply::Status(status)) => Err(AppError::status(*status, "fake://posts")),
            None => Ok(Vec::new()),
        }
    }
}

/// Build `count` posts with ids starting at `first`.
pub fn posts(first: i64, count: usize) -> Vec<Post> {
    (first..first + count as i64)
        .map(|id| Post {
            id,
            title: Some(format!("post {id}")),
            body: Some(format!("body {id}")),
        })
        .collect()
}
