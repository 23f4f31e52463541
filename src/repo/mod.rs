//! Repositories combining the remote listing, the paging engine and the local store.

pub mod hints;
pub mod posts;

pub use hints::HintRepository;
pub use posts::PostRepository;
