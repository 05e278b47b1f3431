use serde_json::Value;

/// Patch body for patch and patch-status calls
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// JSON merge patch (RFC 7386)
    Merge(Value),
}

impl Patch {
    pub fn apply(&self, target: &mut Value) {
        match self {
            Patch::Merge(patch) => merge(target, patch),
        }
    }
}

/// Apply `patch` onto `target`: objects merge recursively, `null` removes a
/// key, anything else replaces the target value.
pub fn merge(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
