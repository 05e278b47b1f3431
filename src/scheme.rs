use std::any::{type_name, TypeId};
use std::collections::HashMap;

use crate::error::ClientError;
use crate::object::Object;
use crate::types::GroupVersionKind;

/// Registry of Rust types to the group/version/kind they are stored as.
///
/// Typed objects do not have to carry `apiVersion`/`kind` themselves; the
/// scheme supplies them. Types that are not registered fall back to the
/// type information embedded in the object, which is how [`crate::object::Unstructured`]
/// resolves.
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    types: HashMap<TypeId, GroupVersionKind>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheme with the built-in core resources registered
    pub fn core() -> Self {
        let mut scheme = Self::new();
        crate::api::core::add_to_scheme(&mut scheme);
        scheme
    }

    pub fn register<T: Object>(&mut self, gvk: GroupVersionKind) {
        tracing::debug!("Registered type {} as {}", type_name::<T>(), gvk);
        self.types.insert(TypeId::of::<T>(), gvk);
    }

    pub fn with<T: Object>(mut self, gvk: GroupVersionKind) -> Self {
        self.register::<T>(gvk);
        self
    }

    pub fn is_registered<T: Object>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    /// Resolve a type without an instance. Only registered types resolve.
    pub fn gvk_for_type<T: Object>(&self) -> Result<GroupVersionKind, ClientError> {
        self.types
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or_else(|| ClientError::NotRegistered(type_name::<T>().to_string()))
    }

    /// Resolve the group/version/kind for `obj`
    pub fn gvk_for<T: Object>(&self, obj: &T) -> Result<GroupVersionKind, ClientError> {
        if let Some(gvk) = self.types.get(&TypeId::of::<T>()) {
            return Ok(gvk.clone());
        }
        obj.type_meta()
            .and_then(|types| types.gvk())
            .ok_or_else(|| ClientError::NotRegistered(type_name::<T>().to_string()))
    }
}
