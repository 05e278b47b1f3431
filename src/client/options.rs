// Call options. Each operation takes a list of option values that are applied
// in order, so a later value overrides an earlier one of the same kind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::object::ObjectMeta;

/// Options for create, update and patch calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOption {
    /// Validate and return the result without persisting it
    DryRun,
    FieldManager(String),
}

pub type CreateOption = WriteOption;
pub type UpdateOption = WriteOption;
pub type PatchOption = WriteOption;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub dry_run: bool,
    pub field_manager: Option<String>,
}

impl WriteOptions {
    pub fn from_options(opts: &[WriteOption]) -> Self {
        let mut resolved = Self::default();
        for opt in opts {
            match opt {
                WriteOption::DryRun => resolved.dry_run = true,
                WriteOption::FieldManager(manager) => resolved.field_manager = Some(manager.clone()),
            }
        }
        resolved
    }
}

/// Options narrowing list, watch and delete-all-of calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOption {
    InNamespace(String),
    MatchingLabels(BTreeMap<String, String>),
    Limit(usize),
}

impl ListOption {
    pub fn matching_label(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(key.into(), value.into());
        ListOption::MatchingLabels(labels)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub namespace: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub limit: Option<usize>,
}

impl ListOptions {
    pub fn from_options(opts: &[ListOption]) -> Self {
        let mut resolved = Self::default();
        for opt in opts {
            match opt {
                ListOption::InNamespace(ns) => resolved.namespace = Some(ns.clone()),
                ListOption::MatchingLabels(labels) => resolved.labels.extend(labels.clone()),
                ListOption::Limit(limit) => resolved.limit = Some(*limit),
            }
        }
        resolved
    }

    /// Namespace and label selection; `limit` is applied by the caller
    pub fn matches(&self, meta: &ObjectMeta) -> bool {
        if let Some(ns) = &self.namespace {
            if !ns.is_empty() && &meta.namespace != ns {
                return false;
            }
        }
        self.labels
            .iter()
            .all(|(key, value)| meta.labels.get(key) == Some(value))
    }
}

/// How dependents of a deleted object are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropagationPolicy {
    Foreground,
    Background,
    Orphan,
}

impl fmt::Display for PropagationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropagationPolicy::Foreground => "Foreground",
            PropagationPolicy::Background => "Background",
            PropagationPolicy::Orphan => "Orphan",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for PropagationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "foreground" => Ok(PropagationPolicy::Foreground),
            "background" => Ok(PropagationPolicy::Background),
            "orphan" => Ok(PropagationPolicy::Orphan),
            other => Err(format!("unknown propagation policy '{}'", other)),
        }
    }
}

/// Conditions the stored object must satisfy for a delete to proceed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preconditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl Preconditions {
    pub fn uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            resource_version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOption {
    GracePeriodSeconds(i64),
    PropagationPolicy(PropagationPolicy),
    Preconditions(Preconditions),
    DryRun,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub grace_period_seconds: Option<i64>,
    pub propagation_policy: Option<PropagationPolicy>,
    pub preconditions: Option<Preconditions>,
    pub dry_run: bool,
}

impl DeleteOptions {
    pub fn from_options(opts: &[DeleteOption]) -> Self {
        let mut resolved = Self::default();
        for opt in opts {
            match opt {
                DeleteOption::GracePeriodSeconds(secs) => resolved.grace_period_seconds = Some(*secs),
                DeleteOption::PropagationPolicy(policy) => resolved.propagation_policy = Some(*policy),
                DeleteOption::Preconditions(pre) => resolved.preconditions = Some(pre.clone()),
                DeleteOption::DryRun => resolved.dry_run = true,
            }
        }
        resolved
    }
}
