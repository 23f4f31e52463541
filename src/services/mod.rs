//! Service layer for the posts client.
//!
//! This module contains the remote post listing (`PostApi`, `HttpPostApi`).

mod api;
#[cfg(test)]
pub(crate) mod fake;

pub use api::{HttpPostApi, PostApi};
