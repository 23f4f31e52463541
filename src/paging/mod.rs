//! Incremental pagination over the offset-addressed remote listing.
//!
//! - `source`: `PagingSource` trait and `PostPagingSource` (one remote call per page)
//! - `pager`: `Pager` driver accumulating pages and publishing `PagingData`

pub mod pager;
pub mod source;

pub use pager::{LoadState, Pager, PagingData, PagingSourceFactory};
pub use source::{LoadParams, LoadResult, Page, PageKey, PagingSource, PagingState, PostPagingSource};
