// src/state/resource.rs

//! Tri-state resource values and remembered operation results.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::Scope;
use crate::error::{AppError, Result};

/// A value being loaded. Every state carries the last known data, if any.
#[derive(Debug, Clone)]
pub enum Resource<T> {
    Loading { data: Option<T> },
    Success { data: Option<T> },
    Error { data: Option<T>, error: Arc<AppError> },
}

impl<T> Resource<T> {
    pub fn loading(data: Option<T>) -> Self {
        Resource::Loading { data }
    }

    pub fn success(data: Option<T>) -> Self {
        Resource::Success { data }
    }

    pub fn error(data: Option<T>, error: impl Into<Arc<AppError>>) -> Self {
        Resource::Error {
            data,
            error: error.into(),
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Resource::Loading { data } | Resource::Success { data } | Resource::Error { data, .. } => {
                data.as_ref()
            }
        }
    }

    pub fn error_ref(&self) -> Option<&Arc<AppError>> {
        match self {
            Resource::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Resource::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Resource::Error { .. })
    }
}

/// Runs an async action in a scope and keeps its latest outcome observable.
///
/// The state goes `None` → `Loading` → `Success`/`Error`. A cancelled action
/// leaves the last published state untouched.
pub struct Operation<T> {
    state: Arc<watch::Sender<Option<Resource<T>>>>,
    scope: Scope,
}

impl<T> Operation<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(scope: &Scope) -> Self {
        Self {
            state: Arc::new(watch::Sender::new(None)),
            scope: scope.clone(),
        }
    }

    /// Start `action`, publishing `Loading` immediately.
    pub fn run<F>(&self, action: F) -> JoinHandle<Option<()>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let previous = self.current().and_then(|r| r.data().cloned());
        self.state
            .send_replace(Some(Resource::loading(previous.clone())));

        let state = Arc::clone(&self.state);
        self.scope.spawn(async move {
            match action.await {
                Ok(value) => {
                    state.send_replace(Some(Resource::success(Some(value))));
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    state.send_replace(Some(Resource::error(previous, e)));
                }
            }
        })
    }

    pub fn current(&self) -> Option<Resource<T>> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Resource<T>>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_state_carries_data() {
        let loading = Resource::loading(Some(1));
        let error: Resource<i32> = Resource::error(Some(2), AppError::Cancelled);
        let empty: Resource<i32> = Resource::success(None);

        assert_eq!(loading.data(), Some(&1));
        assert_eq!(error.data(), Some(&2));
        assert!(error.error_ref().is_some());
        assert_eq!(empty.data(), None);
        assert!(empty.is_success());
    }

    #[tokio::test]
    async fn test_operation_publishes_success() {
        let scope = Scope::new().unwrap();
        let op = Operation::new(&scope);
        assert!(op.current().is_none());

        let task = op.run(async { Ok(5) });
        assert!(op.current().unwrap().is_loading());
        task.await.unwrap();

        let state = op.current().unwrap();
        assert!(state.is_success());
        assert_eq!(state.data(), Some(&5));
    }

    #[tokio::test]
    async fn test_operation_error_keeps_previous_data() {
        let scope = Scope::new().unwrap();
        let op = Operation::new(&scope);
        op.run(async { Ok(1) }).await.unwrap();

        op.run(async { Err(AppError::status(500, "fake://")) })
            .await
            .unwrap();

        let state = op.current().unwrap();
        assert!(state.is_error());
        assert_eq!(state.data(), Some(&1));
    }

    #[tokio::test]
    async fn test_cancelled_operation_is_not_an_error() {
        let scope = Scope::new().unwrap();
        let op: Operation<i32> = Operation::new(&scope);

        op.run(async { Err(AppError::Cancelled) }).await.unwrap();
        assert!(op.current().unwrap().is_loading());

        let pending = op.run(std::future::pending());
        scope.cancel();
        assert_eq!(pending.await.unwrap(), None);
        assert!(op.current().unwrap().is_loading());
    }
}
