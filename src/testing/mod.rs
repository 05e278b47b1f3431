// Fixtures shared by the unit tests

use crate::api::core::{ConfigMap, Secret};
use crate::config::TrackerConfig;
use crate::fake::FakeClient;
use crate::object::ObjectMeta;
use crate::tracked::Tracked;
use crate::types::GroupVersionKind;

pub fn config_map(namespace: &str, name: &str) -> ConfigMap {
    ConfigMap::new(ObjectMeta::named(namespace, name))
}

pub fn secret(namespace: &str, name: &str) -> Secret {
    Secret::new(ObjectMeta::named(namespace, name)).with_data("password", "hunter2")
}

pub fn core_gvk(kind: &str) -> GroupVersionKind {
    GroupVersionKind::new("", "v1", kind)
}

/// Tracking wrapper over a fresh in-memory store, ignoring the environment
pub fn tracked_fake() -> Tracked<FakeClient> {
    Tracked::with_config(FakeClient::core(), TrackerConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracked_fake_starts_empty() {
        let client = tracked_fake();
        assert_eq!(client.tracked_count().await, 0);
        assert!(client.inner().is_empty().await);
    }

    #[test]
    fn test_secret_fixture_has_data() {
        let secret = secret("default", "s");
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        assert!(secret.data.contains_key("password"));
    }
}
