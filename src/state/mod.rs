//! View-state holders bound to the repositories.
//!
//! Each holder owns a `Scope`; dropping the holder cancels every shared flow
//! and background operation it started.

pub mod detail;
pub mod favorites;
pub mod resource;
pub mod search;

pub use detail::DetailState;
pub use favorites::FavoritesState;
pub use resource::{Operation, Resource};
pub use search::SearchState;
