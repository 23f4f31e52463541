// src/cache/shared.rs

//! Lazily started, reference-counted shared computations.
//!
//! A `SharedFlow` runs its producer only while someone subscribes. When the
//! last subscription is dropped the producer keeps running for the keep-alive
//! window, so a subscriber coming back quickly (a screen re-created, a query
//! re-issued) reuses the running work instead of starting over. After the
//! window the producer is cancelled; the next subscription restarts it and
//! sees the last published value until the producer emits again.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::cache::scope::Scope;

type Producer<T> = Box<dyn Fn(Emitter<T>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Publishes values for one producer run.
///
/// Emissions are dropped once the run is cancelled.
pub struct Emitter<T> {
    value: Arc<watch::Sender<T>>,
    token: CancellationToken,
    scope: Scope,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            token: self.token.clone(),
            scope: self.scope.clone(),
        }
    }
}

impl<T: Clone> Emitter<T> {
    /// Publish `value`. Returns `false` if the run was cancelled.
    pub fn emit(&self, value: T) -> bool {
        let _gate = self.scope.publish_gate();
        if self.token.is_cancelled() {
            return false;
        }
        self.value.send_replace(value);
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

struct Shared<T> {
    value: Arc<watch::Sender<T>>,
    subscribers: watch::Sender<usize>,
    running: Mutex<bool>,
    runs: AtomicUsize,
    producer: Producer<T>,
    keep_alive: Duration,
    scope: Scope,
}

impl<T> Shared<T> {
    /// Mark the run stopped if nobody subscribed in the meantime.
    fn try_stop(&self, run: &CancellationToken) -> bool {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if *self.subscribers.borrow() > 0 {
            return false;
        }
        *running = false;
        self.scope.cancel_token(run);
        true
    }
}

/// A shared value computed by a lazily started producer.
pub struct SharedFlow<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SharedFlow<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> SharedFlow<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F>(scope: &Scope, keep_alive: Duration, initial: T, producer: F) -> Self
    where
        F: Fn(Emitter<T>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                value: Arc::new(watch::Sender::new(initial)),
                subscribers: watch::Sender::new(0),
                running: Mutex::new(false),
                runs: AtomicUsize::new(0),
                producer: Box::new(producer),
                keep_alive,
                scope: scope.clone(),
            }),
        }
    }

    /// Share a stream: every run drains a fresh stream from `make`.
    pub fn from_stream<F, S>(scope: &Scope, keep_alive: Duration, initial: T, make: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = T> + Send + 'static,
    {
        Self::new(scope, keep_alive, initial, move |emitter| {
            let mut values = make().boxed();
            Box::pin(async move {
                while let Some(value) = values.next().await {
                    if !emitter.emit(value) {
                        break;
                    }
                }
            })
        })
    }

    /// Subscribe, starting the producer if it is not running.
    pub fn subscribe(&self) -> Subscription<T> {
        let rx = self.shared.value.subscribe();
        {
            let mut running = self
                .shared
                .running
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.shared.subscribers.send_modify(|n| *n += 1);
            if !*running && !self.shared.scope.is_cancelled() {
                *running = true;
                self.start();
            }
        }
        Subscription {
            rx,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Last published value.
    pub fn current(&self) -> T {
        self.shared.value.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        *self
            .shared
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of times the producer has been started.
    pub fn runs(&self) -> usize {
        self.shared.runs.load(Ordering::SeqCst)
    }

    fn start(&self) {
        let shared = Arc::clone(&self.shared);
        let run = shared.scope.token().child_token();
        let emitter = Emitter {
            value: Arc::clone(&shared.value),
            token: run.clone(),
            scope: shared.scope.clone(),
        };
        let run_number = shared.runs.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("Starting shared producer (run {})", run_number);

        shared.scope.clone().spawn(async move {
            let mut producer = (shared.producer)(emitter);
            let mut producing = true;
            let mut subscribers = shared.subscribers.subscribe();
            loop {
                tokio::select! {
                    _ = &mut producer, if producing => {
                        producing = false;
                    }
                    _ = wait_idle(&mut subscribers, shared.keep_alive) => {
                        if shared.try_stop(&run) {
                            log::debug!("Stopped idle shared producer (run {})", run_number);
                            break;
                        }
                    }
                }
            }
        });
    }
}

/// Resolves once the subscriber count has stayed at zero for `keep_alive`.
async fn wait_idle(subscribers: &mut watch::Receiver<usize>, keep_alive: Duration) {
    loop {
        if subscribers.wait_for(|n| *n == 0).await.is_err() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(keep_alive) => return,
            changed = subscribers.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

/// A live handle on a `SharedFlow`. Dropping it releases the producer.
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    /// Latest value, marking it seen.
    pub fn current(&mut self) -> T {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next value. `None` once the flow is gone.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait for a value matching `predicate`, including the current one.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&T) -> bool) -> Option<T> {
        self.rx.wait_for(predicate).await.ok().map(|v| v.clone())
    }

    /// The current value followed by every change.
    pub fn into_stream(self) -> BoxStream<'static, T> {
        stream::unfold((self, true), |(mut sub, first)| async move {
            let value = if first {
                sub.current()
            } else {
                sub.changed().await?
            };
            Some((value, (sub, false)))
        })
        .boxed()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.shared
            .subscribers
            .send_modify(|n| *n = n.saturating_sub(1));
    }
}
