// src/lib.rs

//! Posts client library
//!
//! Paged search over a remote post listing, with favorites and search
//! history kept in a local SQLite store.
//!
//! - `services`: remote listing API
//! - `storage`: local store and live queries
//! - `paging`: paged-fetch engine
//! - `cache`: keyed memoization and shared flows
//! - `repo`: repositories over remote and local data
//! - `state`: view-state holders

pub mod cache;
pub mod error;
pub mod models;
pub mod paging;
pub mod repo;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;
