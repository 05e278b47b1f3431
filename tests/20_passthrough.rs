mod common;

use std::time::Duration;

use anyhow::Result;
use futures::StreamExt;
use serde_json::json;
use tracked_client::api::{ConfigMap, Secret};
use tracked_client::client::{ListOption, Patch};
use tracked_client::types::GroupVersionKind;
use tracked_client::{Client, Context, Object, ObjectMeta, TrackedClient, Unstructured, WatchEvent};

// Everything except create goes straight to the wrapped client and is
// invisible to the tracking log.

#[tokio::test]
async fn reads_and_writes_pass_through() -> Result<()> {
    let client = common::tracked_client();
    let ctx = Context::background();

    let mut cm = common::config_map("default", "test");
    client.create(&ctx, &mut cm, &[]).await?;

    client
        .patch(&ctx, &mut cm, &Patch::Merge(json!({ "data": { "extra": "1" } })), &[])
        .await?;
    assert_eq!(cm.data.get("extra").map(String::as_str), Some("1"));

    cm.data.remove("key");
    client.update(&ctx, &mut cm, &[]).await?;

    let mut fetched = ConfigMap::default();
    client.get(&ctx, &cm.key(), &mut fetched).await?;
    assert_eq!(fetched.data.len(), 1);
    assert_eq!(fetched.metadata.resource_version, cm.metadata.resource_version);

    // Still exactly one tracked entry, captured at create time
    let tracked = client.tracked().await;
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].field("data"), Some(&json!({ "key": "value" })));
    Ok(())
}

#[tokio::test]
async fn list_and_delete_all_of_pass_through() -> Result<()> {
    let client = common::tracked_client();
    let ctx = Context::background();

    for name in ["a", "b"] {
        let mut cm = ConfigMap::new(ObjectMeta::named("default", name).with_label("suite", "passthrough"));
        client.create(&ctx, &mut cm, &[]).await?;
    }
    let listed: Vec<ConfigMap> = client
        .list(&ctx, &[ListOption::matching_label("suite", "passthrough")])
        .await?;
    assert_eq!(listed.len(), 2);

    client.delete_all_of::<ConfigMap>(&ctx, &[], &[]).await?;
    assert!(client.inner().is_empty().await);

    // The log still holds both; they are gone now so each delete fails
    assert_eq!(client.tracked_count().await, 2);
    let err = client.delete_all_tracked(&ctx, &[]).await.unwrap_err();
    assert_eq!(err.len(), 2);
    Ok(())
}

#[tokio::test]
async fn manual_delete_does_not_untrack() -> Result<()> {
    let client = common::tracked_client();
    let ctx = Context::background();

    let mut secret = common::secret("default", "s");
    client.create(&ctx, &mut secret, &[]).await?;
    client.delete(&ctx, &secret, &[]).await?;

    assert_eq!(client.tracked_count().await, 1);
    let mut fetched = Secret::default();
    assert!(client.get(&ctx, &secret.key(), &mut fetched).await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn status_writes_pass_through() -> Result<()> {
    let client = common::tracked_client();
    let ctx = Context::background();
    let gvk = GroupVersionKind::new("batch.example.io", "v1", "Task");

    let mut task = Unstructured::new(&gvk, ObjectMeta::named("jobs", "t1")).with_field("spec", json!({ "steps": 3 }));
    client.create(&ctx, &mut task, &[]).await?;

    task.content.insert("status".to_string(), json!({ "phase": "Running" }));
    client.update_status(&ctx, &mut task, &[]).await?;
    client
        .patch_status(&ctx, &mut task, &Patch::Merge(json!({ "status": { "done": 1 } })), &[])
        .await?;

    let mut fetched = Unstructured::new(&gvk, ObjectMeta::default());
    client.get(&ctx, &task.key(), &mut fetched).await?;
    assert_eq!(fetched.field("status"), Some(&json!({ "phase": "Running", "done": 1 })));
    assert_eq!(fetched.metadata.generation, Some(1));

    client.delete_all_tracked(&ctx, &[]).await?;
    Ok(())
}

#[tokio::test]
async fn watch_sees_tracked_creates_and_bulk_deletes() -> Result<()> {
    let client = common::tracked_client();
    let ctx = Context::background();
    let mut events = client
        .watch::<ConfigMap>(&ctx, &[ListOption::InNamespace("default".to_string())])
        .await?;

    client.create(&ctx, &mut common::config_map("other", "ignored"), &[]).await?;
    client.create(&ctx, &mut common::config_map("default", "watched"), &[]).await?;
    client.delete_all_tracked(&ctx, &[]).await?;

    let mut seen = Vec::new();
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(1), events.next())
            .await?
            .expect("stream open")?;
        seen.push(event);
    }

    assert!(matches!(&seen[0], WatchEvent::Added(cm) if cm.metadata.name == "watched"));
    assert!(matches!(&seen[1], WatchEvent::Deleted(cm) if cm.metadata.name == "watched"));
    assert!(seen.iter().all(|event| event.object().metadata.namespace == "default"));
    assert_eq!(seen[0].object().uid(), seen[1].object().uid());
    Ok(())
}

#[tokio::test]
async fn watch_ends_when_context_is_cancelled() -> Result<()> {
    let client = common::tracked_client();
    let (ctx, cancel) = Context::with_cancel();
    let mut events = client.watch::<Secret>(&ctx, &[]).await?;

    cancel.cancel();
    let next = tokio::time::timeout(Duration::from_secs(1), events.next()).await?;
    assert!(next.is_none());
    Ok(())
}
