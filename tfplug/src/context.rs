//! Context implementation for cancellation and deadlines
//!
//! This module provides the Context type which carries cancellation signals
//! and timeouts across async boundaries.

use crate::error::{Result, TfplugError};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries cancellation signals and deadlines
/// CRITICAL: Pass this as first parameter to ALL async trait methods
/// This enables proper cancellation and timeout handling
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: Arc<watch::Sender<bool>>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done: done_rx,
                done_tx: Arc::new(done_tx),
            }),
        }
    }

    /// Derive a context that is cancelled when this one is or when the
    /// timeout elapses, whichever comes first
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let child = self.child(Some(deadline));

        let parent = self.clone();
        let tx = child.inner.done_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = parent.cancelled() => {}
                _ = tx.closed() => return,
            }
            let _ = tx.send(true);
        });

        child
    }

    /// Derive a context that is cancelled together with this one but can
    /// also be cancelled on its own
    pub fn child_context(&self) -> Self {
        let child = self.child(self.inner.deadline);

        let parent = self.clone();
        let tx = child.inner.done_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = parent.cancelled() => {
                    let _ = tx.send(true);
                }
                _ = tx.closed() => {}
            }
        });

        child
    }

    fn child(&self, deadline: Option<Instant>) -> Self {
        let (done_tx, done_rx) = watch::channel(self.is_cancelled());
        Self {
            inner: Arc::new(ContextInner {
                deadline,
                done: done_rx,
                done_tx: Arc::new(done_tx),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Returns a channel that flips to true when work done on behalf of
    /// this context should be cancelled
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }

    /// Completes once the context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.done();
        // the sender lives as long as self, so wait_for only fails if we are torn down
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }

    /// Run a future to completion unless the context is cancelled first;
    /// the future is dropped on cancellation
    pub async fn run<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(TfplugError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(TfplugError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
