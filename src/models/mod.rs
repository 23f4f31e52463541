// src/models/mod.rs

//! Domain models for the posts client.
//!
//! This module contains the data structures shared by the remote listing,
//! the local store and the state holders.

mod config;
mod hint;
mod post;

// Re-export all public types
pub use config::{
    Config, LocaleConfig, LoggingConfig, Messages, PagingConfig, RemoteConfig, StateConfig,
    StoreConfig,
};
pub use hint::{SearchHint, normalize_query};
pub use post::{FavoritePost, Post};
