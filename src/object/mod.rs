// Object model shared by every client implementation

pub mod meta;
pub mod unstructured;

pub use meta::{ObjectMeta, TypeMeta};
pub use unstructured::Unstructured;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::ObjectKey;

/// A resource that can be stored through a [`crate::client::Client`].
///
/// Objects move to and from the store as JSON, so every implementation must
/// round-trip through serde with `metadata` at the top level.
pub trait Object: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    /// Type information embedded in the object itself, if any.
    /// Typed resources usually leave this to the [`crate::scheme::Scheme`].
    fn type_meta(&self) -> Option<TypeMeta> {
        None
    }

    fn key(&self) -> ObjectKey {
        self.metadata().key()
    }

    fn uid(&self) -> Option<&str> {
        self.metadata().uid.as_deref()
    }
}
