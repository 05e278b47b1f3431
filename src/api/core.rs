use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::object::{Object, ObjectMeta};
use crate::scheme::Scheme;
use crate::types::GroupVersionKind;

/// Register every type in the core (`v1`) group
pub fn add_to_scheme(scheme: &mut Scheme) {
    scheme.register::<ConfigMap>(GroupVersionKind::new("", "v1", "ConfigMap"));
    scheme.register::<Secret>(GroupVersionKind::new("", "v1", "Secret"));
}

/// Non-confidential key/value configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigMap {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl ConfigMap {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            metadata,
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl Object for ConfigMap {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Confidential key/value data. Values are stored as given; encoding is the
/// caller's concern.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl Secret {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            metadata,
            type_: Some("Opaque".to_string()),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl Object for Secret {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
