// src/cache/scope.rs

//! Lifecycle scope for background work.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};

/// Owns a cancellation token and the runtime that background work runs on.
///
/// Everything spawned in a scope, including shared flows created with it,
/// stops when the scope is cancelled. Child scopes are cancelled with their
/// parent.
///
/// Cancellation and publishing share one lock (`gate`, common to a scope and
/// its children): once `cancel` returns, no publish that checked the token
/// beforehand can still land.
#[derive(Clone)]
pub struct Scope {
    token: CancellationToken,
    handle: Handle,
    gate: Arc<RwLock<()>>,
}

impl Scope {
    /// Create a scope on the current tokio runtime.
    pub fn new() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| AppError::Runtime(e.to_string()))?;
        Ok(Self {
            token: CancellationToken::new(),
            handle,
            gate: Arc::default(),
        })
    }

    /// A scope cancelled together with this one.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            handle: self.handle.clone(),
            gate: Arc::clone(&self.gate),
        }
    }

    /// Run `future` until it completes or the scope is cancelled.
    ///
    /// Resolves to `None` when cancelled first.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let token = self.token.clone();
        self.handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => None,
                output = future => Some(output),
            }
        })
    }

    pub fn cancel(&self) {
        self.cancel_token(&self.token);
    }

    /// Cancel `token` (this scope's or one derived from it) under the gate.
    pub(crate) fn cancel_token(&self, token: &CancellationToken) {
        let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
    }

    /// Held while publishing; blocks `cancel` until the publish is done.
    pub(crate) fn publish_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}
