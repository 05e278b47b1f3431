// Object-store client contract

pub mod options;
pub mod patch;

pub use options::{
    CreateOption, DeleteOption, DeleteOptions, ListOption, ListOptions, PatchOption,
    Preconditions, PropagationPolicy, UpdateOption, WriteOption, WriteOptions,
};
pub use patch::Patch;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::context::Context;
use crate::error::ClientError;
use crate::object::Object;
use crate::scheme::Scheme;
use crate::types::ObjectKey;

/// Change notification delivered by [`Client::watch`]
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<T> {
    Added(T),
    Modified(T),
    Deleted(T),
}

impl<T> WatchEvent<T> {
    pub fn object(&self) -> &T {
        match self {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) | WatchEvent::Deleted(obj) => obj,
        }
    }
}

pub type WatchStream<T> = BoxStream<'static, Result<WatchEvent<T>, ClientError>>;

/// Reads and writes typed objects in a remote store.
///
/// Write calls take the object by `&mut` and overwrite it with what the store
/// accepted, so server-assigned fields (`uid`, `resourceVersion`, ...) are
/// visible to the caller afterward.
#[async_trait]
pub trait Client: Send + Sync {
    /// Type registry used to resolve the kind of typed objects
    fn scheme(&self) -> &Scheme;

    /// Read the object stored under `key` into `obj`. The kind is resolved
    /// from `obj`, so an [`crate::object::Unstructured`] must carry its type.
    async fn get<T: Object>(&self, ctx: &Context, key: &ObjectKey, obj: &mut T) -> Result<(), ClientError>;

    /// Only types registered in the scheme can be listed
    async fn list<T: Object>(&self, ctx: &Context, opts: &[ListOption]) -> Result<Vec<T>, ClientError>;

    async fn create<T: Object>(
        &self,
        ctx: &Context,
        obj: &mut T,
        opts: &[CreateOption],
    ) -> Result<(), ClientError>;

    async fn update<T: Object>(
        &self,
        ctx: &Context,
        obj: &mut T,
        opts: &[UpdateOption],
    ) -> Result<(), ClientError>;

    async fn patch<T: Object>(
        &self,
        ctx: &Context,
        obj: &mut T,
        patch: &Patch,
        opts: &[PatchOption],
    ) -> Result<(), ClientError>;

    async fn delete<T: Object>(
        &self,
        ctx: &Context,
        obj: &T,
        opts: &[DeleteOption],
    ) -> Result<(), ClientError>;

    /// Delete every object of `T`'s kind selected by `list_opts`
    async fn delete_all_of<T: Object>(
        &self,
        ctx: &Context,
        list_opts: &[ListOption],
        delete_opts: &[DeleteOption],
    ) -> Result<(), ClientError>;

    async fn watch<T: Object>(
        &self,
        ctx: &Context,
        opts: &[ListOption],
    ) -> Result<WatchStream<T>, ClientError>;

    /// Write only the `status` of `obj`
    async fn update_status<T: Object>(
        &self,
        ctx: &Context,
        obj: &mut T,
        opts: &[UpdateOption],
    ) -> Result<(), ClientError>;

    /// Patch only the `status` of `obj`
    async fn patch_status<T: Object>(
        &self,
        ctx: &Context,
        obj: &mut T,
        patch: &Patch,
        opts: &[PatchOption],
    ) -> Result<(), ClientError>;
}
