use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::object::{Object, ObjectMeta, TypeMeta};
use crate::types::GroupVersionKind;

/// Kind-erased document: type information and metadata are parsed, every
/// other top-level field (`data`, `spec`, `status`, ...) stays as raw JSON.
///
/// Objects of any kind can share one collection in this form, and a client
/// resolves the resource from the embedded `apiVersion`/`kind`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Unstructured {
    #[serde(flatten)]
    pub types: TypeMeta,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

impl Unstructured {
    pub fn new(gvk: &GroupVersionKind, metadata: ObjectMeta) -> Self {
        Self {
            types: TypeMeta::from_gvk(gvk),
            metadata,
            content: Map::new(),
        }
    }

    /// Copy any object into document form. Fails if the object does not
    /// serialize to a JSON object with a readable `metadata` block.
    pub fn from_object<T: Object>(obj: &T) -> Result<Self, ClientError> {
        let value = serde_json::to_value(obj)
            .map_err(|e| ClientError::snapshot_json("object did not serialize", e))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ClientError> {
        if !value.is_object() {
            return Err(ClientError::snapshot(format!(
                "expected a JSON object, got {}",
                value_type_name(&value)
            )));
        }
        serde_json::from_value(value).map_err(|e| ClientError::snapshot_json("document did not parse", e))
    }

    pub fn to_value(&self) -> Result<Value, ClientError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn gvk(&self) -> Option<GroupVersionKind> {
        self.types.gvk()
    }

    pub fn set_gvk(&mut self, gvk: &GroupVersionKind) {
        self.types = TypeMeta::from_gvk(gvk);
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.content.insert(key.into(), value);
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }
}

impl Object for Unstructured {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn type_meta(&self) -> Option<TypeMeta> {
        if self.types.is_empty() {
            None
        } else {
            Some(self.types.clone())
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
