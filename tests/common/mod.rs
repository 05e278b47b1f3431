#![allow(dead_code)]

use std::sync::Once;

use tracked_client::api::{ConfigMap, Secret};
use tracked_client::config::TrackerConfig;
use tracked_client::fake::FakeClient;
use tracked_client::types::GroupVersionKind;
use tracked_client::{ObjectMeta, Tracked};

static TRACING: Once = Once::new();

/// Log to the test writer; filter with RUST_LOG
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Tracking client over a fresh in-memory store
pub fn tracked_client() -> Tracked<FakeClient> {
    init_tracing();
    Tracked::with_config(FakeClient::core(), TrackerConfig::default())
}

pub fn config_map(namespace: &str, name: &str) -> ConfigMap {
    ConfigMap::new(ObjectMeta::named(namespace, name)).with_data("key", "value")
}

pub fn secret(namespace: &str, name: &str) -> Secret {
    Secret::new(ObjectMeta::named(namespace, name)).with_data("token", "c2VjcmV0")
}

pub fn config_map_gvk() -> GroupVersionKind {
    GroupVersionKind::new("", "v1", "ConfigMap")
}

pub fn secret_gvk() -> GroupVersionKind {
    GroupVersionKind::new("", "v1", "Secret")
}
