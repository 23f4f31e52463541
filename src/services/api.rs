// src/services/api.rs

//! Remote post listing.
//!
//! Two endpoints are consumed:
//!
//! ```text
//! GET {base}posts?_start={offset}&_size={size}[&body_like={query}]  -> [Post]
//! GET {base}posts/{id}                                              -> [Post]
//! ```

use async_trait::async_trait;
use reqwest::{Client, Request};
use url::Url;

use crate::error::Result;
use crate::models::{Post, RemoteConfig};
use crate::utils::http::{create_async_client, read_json};

/// Offset-addressed remote post source.
#[async_trait]
pub trait PostApi: Send + Sync {
    /// Fetch up to `size` posts starting at `start`, optionally filtered by body text.
    async fn get_posts(&self, start: u64, size: usize, query: Option<&str>) -> Result<Vec<Post>>;

    /// Fetch the posts matching `id`; the first element is the post itself.
    async fn get_post(&self, id: i64) -> Result<Vec<Post>>;
}

/// `PostApi` backed by a JSON HTTP endpoint.
#[derive(Clone)]
pub struct HttpPostApi {
    client: Client,
    base_url: Url,
}

impl HttpPostApi {
    /// Create a new API client from remote settings.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            base_url: config.base_url()?,
        })
    }

    /// Create an API client around an existing HTTP client.
    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn listing_request(&self, start: u64, size: usize, query: Option<&str>) -> Result<Request> {
        let url = self.base_url.join("posts")?;
        let mut builder = self
            .client
            .get(url)
            .query(&[("_start", start.to_string()), ("_size", size.to_string())]);
        if let Some(query) = query {
            builder = builder.query(&[("body_like", query)]);
        }
        Ok(builder.build()?)
    }

    fn item_request(&self, id: i64) -> Result<Request> {
        let url = self.base_url.join(&format!("posts/{id}"))?;
        Ok(self.client.get(url).build()?)
    }
}

#[async_trait]
impl PostApi for HttpPostApi {
    async fn get_posts(&self, start: u64, size: usize, query: Option<&str>) -> Result<Vec<Post>> {
        let request = self.listing_request(start, size, query)?;
        log::debug!("GET {}", request.url());
        let response = self.client.execute(request).await?;
        read_json(response).await
    }

    async fn get_post(&self, id: i64) -> Result<Vec<Post>> {
        let request = self.item_request(id)?;
        log::debug!("GET {}", request.url());
        let response = self.client.execute(request).await?;
        read_json(response).await
    }
}
