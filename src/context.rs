use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};

use crate::error::ClientError;

#[derive(Debug, Default)]
struct ContextState {
    cancelled: AtomicBool,
    notify: Notify,
    deadline: Option<Instant>,
}

/// Per-call cancellation and deadline carried into every client operation.
///
/// Clones share state: cancelling through the [`CancelHandle`] is observed by
/// every clone, including calls already in flight.
#[derive(Debug, Clone, Default)]
pub struct Context {
    state: Arc<ContextState>,
}

/// Cancels the [`Context`] it was created with
#[derive(Debug, Clone)]
pub struct CancelHandle {
    state: Arc<ContextState>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }
}

impl Context {
    /// Never cancelled, no deadline
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            state: Arc::new(ContextState {
                deadline: Some(deadline),
                ..Default::default()
            }),
        }
    }

    pub fn with_cancel() -> (Self, CancelHandle) {
        let ctx = Self::background();
        let handle = CancelHandle { state: ctx.state.clone() };
        (ctx, handle)
    }

    /// Cancellable context that also expires at `deadline`
    pub fn with_deadline_and_cancel(deadline: Instant) -> (Self, CancelHandle) {
        let ctx = Self::with_deadline(deadline);
        let handle = CancelHandle { state: ctx.state.clone() };
        (ctx, handle)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.state.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// The error a call made with this context would fail with right now
    pub fn err(&self) -> Option<ClientError> {
        if self.is_cancelled() {
            return Some(ClientError::Cancelled);
        }
        match self.state.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ClientError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    /// Never resolves for a background context.
    pub async fn done(&self) -> ClientError {
        // Register before checking the flag so a concurrent cancel is not missed
        let cancelled = self.state.notify.notified();
        if let Some(err) = self.err() {
            return err;
        }

        let deadline = self.state.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancelled => ClientError::Cancelled,
            _ = expired => ClientError::DeadlineExceeded,
        }
    }

    /// Drive `fut` until it completes, the context is cancelled, or the
    /// deadline passes, whichever happens first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            result = fut => result,
            err = self.done() => Err(err),
        }
    }
}
