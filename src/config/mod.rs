use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::client::{DeleteOption, PropagationPolicy};

/// Tunables for the tracking wrapper
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub delete: DeleteConfig,
}

/// Defaults applied to every delete issued by `delete_all_tracked`.
/// Caller-supplied options are applied after these and win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConfig {
    pub propagation_policy: Option<PropagationPolicy>,
    pub grace_period_seconds: Option<i64>,
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("TRACKED_CLIENT_DELETE_PROPAGATION") {
            match v.parse() {
                Ok(policy) => self.delete.propagation_policy = Some(policy),
                Err(e) => tracing::warn!("Ignoring TRACKED_CLIENT_DELETE_PROPAGATION: {}", e),
            }
        }
        if let Ok(v) = env::var("TRACKED_CLIENT_GRACE_PERIOD_SECONDS") {
            match v.parse::<i64>() {
                Ok(secs) if secs >= 0 => self.delete.grace_period_seconds = Some(secs),
                Ok(secs) => tracing::warn!("Ignoring TRACKED_CLIENT_GRACE_PERIOD_SECONDS: negative value {}", secs),
                Err(e) => tracing::warn!("Ignoring TRACKED_CLIENT_GRACE_PERIOD_SECONDS: {}", e),
            }
        }

        self
    }

    /// Leading options for each tracked delete
    pub fn default_delete_options(&self) -> Vec<DeleteOption> {
        let mut opts = Vec::new();
        if let Some(policy) = self.delete.propagation_policy {
            opts.push(DeleteOption::PropagationPolicy(policy));
        }
        if let Some(secs) = self.delete.grace_period_seconds {
            opts.push(DeleteOption::GracePeriodSeconds(secs));
        }
        opts
    }
}

// Global config read from the environment once, on first use
pub static CONFIG: Lazy<TrackerConfig> = Lazy::new(TrackerConfig::from_env);

pub fn config() -> &'static TrackerConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_adds_no_delete_options() {
        let config = TrackerConfig::default();
        assert!(config.default_delete_options().is_empty());
    }

    #[test]
    fn test_delete_defaults_become_options() {
        let config = TrackerConfig {
            delete: DeleteConfig {
                propagation_policy: Some(PropagationPolicy::Foreground),
                grace_period_seconds: Some(0),
            },
        };

        assert_eq!(
            config.default_delete_options(),
            vec![
                DeleteOption::PropagationPolicy(PropagationPolicy::Foreground),
                DeleteOption::GracePeriodSeconds(0),
            ]
        );
    }
}
