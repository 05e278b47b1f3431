// Client decorator that remembers what it created

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::client::{
    Client, CreateOption, DeleteOption, ListOption, Patch, PatchOption, Preconditions,
    UpdateOption, WatchStream, WriteOptions,
};
use crate::config::{self, TrackerConfig};
use crate::context::Context;
use crate::error::{AggregateError, ClientError};
use crate::object::{Object, Unstructured};
use crate::scheme::Scheme;
use crate::types::ObjectKey;

/// A [`Client`] that can delete everything it created
#[async_trait]
pub trait TrackedClient: Client {
    /// Delete every object created through this client since the last call.
    ///
    /// Each delete carries a uid precondition so an object that was removed
    /// and recreated under the same name is left alone. Failures do not stop
    /// the remaining deletes, and the tracking log is emptied either way.
    async fn delete_all_tracked(&self, ctx: &Context, opts: &[DeleteOption]) -> Result<(), AggregateError>;
}

/// Wraps a client and records a snapshot of every object it successfully
/// creates. All other operations go straight to the wrapped client.
pub struct Tracked<C> {
    inner: C,
    config: TrackerConfig,
    tracker: Mutex<Vec<Unstructured>>,
}

impl<C: Client> Tracked<C> {
    /// Wrap `inner` using the environment configuration
    pub fn new(inner: C) -> Self {
        Self::with_config(inner, config::config().clone())
    }

    pub fn with_config(inner: C, config: TrackerConfig) -> Self {
        Self {
            inner,
            config,
            tracker: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of objects awaiting `delete_all_tracked`
    pub async fn tracked_count(&self) -> usize {
        self.tracker.lock().await.len()
    }

    /// Copy of the tracking log, oldest first
    pub async fn tracked(&self) -> Vec<Unstructured> {
        self.tracker.lock().await.clone()
    }

    /// Document copy of a freshly created object, with `apiVersion` and
    /// `kind` taken from the scheme since typed objects may leave them blank
    fn snapshot<T: Object>(&self, obj: &T) -> Result<Unstructured, ClientError> {
        let mut snapshot = Unstructured::from_object(obj)?;
        let gvk = self.inner.scheme().gvk_for(obj)?;
        snapshot.set_gvk(&gvk);
        Ok(snapshot)
    }

    /// Configured defaults, then the caller's options, then the uid guard
    fn tracked_delete_options(&self, snapshot: &Unstructured, opts: &[DeleteOption]) -> Vec<DeleteOption> {
        let uid = snapshot.uid().unwrap_or_default();
        let mut delete_opts = self.config.default_delete_options();
        delete_opts.extend_from_slice(opts);
        delete_opts.push(DeleteOption::Preconditions(Preconditions::uid(uid)));
        delete_opts
    }
}

#[async_trait]
impl<C: Client> TrackedClient for Tracked<C> {
    async fn delete_all_tracked(&self, ctx: &Context, opts: &[DeleteOption]) -> Result<(), AggregateError> {
        let mut tracker = self.tracker.lock().await;
        // Taken up front: the log ends up empty even if this future is dropped
        let tracked = std::mem::take(&mut *tracker);
        tracing::info!("Deleting {} tracked objects", tracked.len());

        let mut errors = Vec::new();
        for snapshot in &tracked {
            let delete_opts = self.tracked_delete_options(snapshot, opts);
            match self.inner.delete(ctx, snapshot, &delete_opts).await {
                Ok(()) => tracing::debug!("Deleted tracked {} {}", snapshot.types.kind, snapshot.key()),
                Err(e) => {
                    tracing::warn!("Failed to delete tracked {} {}: {}", snapshot.types.kind, snapshot.key(), e);
                    errors.push(e);
                }
            }
        }
        drop(tracker);

        match AggregateError::from_errors(errors) {
            None => Ok(()),
            Some(err) => {
                tracing::warn!("{} of {} tracked deletes failed", err.len(), tracked.len());
                Err(err)
            }
        }
    }
}

#[async_trait]
impl<C: Client> Client for Tracked<C> {
    fn scheme(&self) -> &Scheme {
        self.inner.scheme()
    }

    async fn create<T: Object>(&self, ctx: &Context, obj: &mut T, opts: &[CreateOption]) -> Result<(), ClientError> {
        self.inner.create(ctx, obj, opts).await?;

        if WriteOptions::from_options(opts).dry_run {
            tracing::debug!("Not tracking dry-run create of {}", obj.key());
            return Ok(());
        }

        // The store already holds the object; it stays there untracked
        let snapshot = self.snapshot(obj).map_err(|e| {
            tracing::error!("Created {} (uid {:?}) but could not track it: {}", obj.key(), obj.uid(), e);
            e
        })?;

        tracing::debug!(
            "Tracking {} {} (uid {})",
            snapshot.types.kind,
            snapshot.key(),
            snapshot.uid().unwrap_or_default()
        );
        self.tracker.lock().await.push(snapshot);
        Ok(())
    }

    async fn get<T: Object>(&self, ctx: &Context, key: &ObjectKey, obj: &mut T) -> Result<(), ClientError> {
        self.inner.get(ctx, key, obj).await
    }

    async fn list<T: Object>(&self, ctx: &Context, opts: &[ListOption]) -> Result<Vec<T>, ClientError> {
        self.inner.list(ctx, opts).await
    }

    async fn update<T: Object>(&self, ctx: &Context, obj: &mut T, opts: &[UpdateOption]) -> Result<(), ClientError> {
        self.inner.update(ctx, obj, opts).await
    }

    async fn patch<T: Object>(
        &self,
        ctx: &Context,
        obj: &mut T,
        patch: &Patch,
        opts: &[PatchOption],
    ) -> Result<(), ClientError> {
        self.inner.patch(ctx, obj, patch, opts).await
    }

    async fn delete<T: Object>(&self, ctx: &Context, obj: &T, opts: &[DeleteOption]) -> Result<(), ClientError> {
        self.inner.delete(ctx, obj, opts).await
    }

    async fn delete_all_of<T: Object>(
        &self,
        ctx: &Context,
        list_opts: &[ListOption],
        delete_opts: &[DeleteOption],
    ) -> Result<(), ClientError> {
        self.inner.delete_all_of::<T>(ctx, list_opts, delete_opts).await
    }

    async fn watch<T: Object>(&self, ctx: &Context, opts: &[ListOption]) -> Result<WatchStream<T>, ClientError> {
        self.inner.watch(ctx, opts).await
    }

    async fn update_status<T: Object>(&self, ctx: &Context, obj: &mut T, opts: &[UpdateOption]) -> Result<(), ClientError> {
        self.inner.update_status(ctx, obj, opts).await
    }

    async fn patch_status<T: Object>(
        &self,
        ctx: &Context,
        obj: &mut T,
        patch: &Patch,
        opts: &[PatchOption],
    ) -> Result<(), ClientError> {
        self.inner.patch_status(ctx, obj, patch, opts).await
    }
}
