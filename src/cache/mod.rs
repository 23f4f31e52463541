//! Shared reactive state: keyed memoization, shared flows and their scopes.

pub mod keyed;
pub mod scope;
pub mod shared;

pub use keyed::KeyedCache;
pub use scope::Scope;
pub use shared::{Emitter, SharedFlow, Subscription};
