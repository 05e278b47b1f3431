mod common;

use std::error::Error;
use std::sync::Arc;

use anyhow::Result;
use tracked_client::api::ConfigMap;
use tracked_client::client::{DeleteOption, PropagationPolicy};
use tracked_client::{Client, ClientError, Context, Object, TrackedClient};

#[tokio::test]
async fn deletes_every_tracked_kind() -> Result<()> {
    let client = common::tracked_client();
    let ctx = Context::background();

    let mut cm = common::config_map("default", "test");
    let mut secret = common::secret("default", "test-secret");
    client.create(&ctx, &mut cm, &[]).await?;
    client.create(&ctx, &mut secret, &[]).await?;
    assert_eq!(client.tracked_count().await, 2);

    client.delete_all_tracked(&ctx, &[]).await?;

    let mut fetched = ConfigMap::default();
    let err = client.get(&ctx, &cm.key(), &mut fetched).await.unwrap_err();
    assert!(err.is_not_found(), "expected not found, got: {}", err);
    assert!(!client.inner().contains(&common::secret_gvk(), &secret.key()).await);
    assert_eq!(client.tracked_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn issues_one_guarded_delete_per_create() -> Result<()> {
    let client = common::tracked_client();
    let ctx = Context::background();

    let mut uids = Vec::new();
    for i in 0..5 {
        let mut cm = common::config_map("default", &format!("cm-{}", i));
        client.create(&ctx, &mut cm, &[]).await?;
        uids.push(cm.uid().map(str::to_string));
    }

    client
        .delete_all_tracked(&ctx, &[DeleteOption::PropagationPolicy(PropagationPolicy::Foreground)])
        .await?;

    let calls = client.inner().delete_calls();
    assert_eq!(calls.len(), 5);
    for (call, uid) in calls.iter().zip(&uids) {
        let opts = call.delete_options.as_ref().expect("delete options recorded");
        let preconditions = opts.preconditions.as_ref().expect("uid precondition");
        assert_eq!(&preconditions.uid, uid);
        assert_eq!(opts.propagation_policy, Some(PropagationPolicy::Foreground));
    }
    Ok(())
}

#[tokio::test]
async fn out_of_band_delete_is_reported_and_log_cleared() -> Result<()> {
    let client = common::tracked_client();
    let ctx = Context::background();

    let mut cm = common::config_map("default", "test");
    client.create(&ctx, &mut cm, &[]).await?;
    client.inner().delete(&ctx, &cm, &[]).await?;

    let err = client.delete_all_tracked(&ctx, &[]).await.unwrap_err();
    assert_eq!(err.len(), 1);
    assert!(err.first().is_not_found(), "unexpected error: {}", err);
    assert_eq!(client.tracked_count().await, 0);

    // Nothing left to retry
    client.delete_all_tracked(&ctx, &[]).await?;
    Ok(())
}

#[tokio::test]
async fn recreated_object_with_same_name_survives() -> Result<()> {
    let client = common::tracked_client();
    let ctx = Context::background();

    let mut original = common::config_map("default", "test");
    client.create(&ctx, &mut original, &[]).await?;
    client.inner().delete(&ctx, &original, &[]).await?;

    let mut replacement = common::config_map("default", "test");
    client.inner().create(&ctx, &mut replacement, &[]).await?;
    assert_ne!(original.uid(), replacement.uid());

    let err = client.delete_all_tracked(&ctx, &[]).await.unwrap_err();
    assert!(err.first().is_conflict(), "unexpected error: {}", err);
    assert!(client.inner().contains(&common::config_map_gvk(), &replacement.key()).await);
    Ok(())
}

#[tokio::test]
async fn partial_failures_do_not_stop_the_rest() -> Result<()> {
    let client = common::tracked_client();
    let ctx = Context::background();

    let mut created = Vec::new();
    for i in 0..6 {
        let mut cm = common::config_map("default", &format!("cm-{}", i));
        client.create(&ctx, &mut cm, &[]).await?;
        created.push(cm);
    }
    // Remove two of them behind the tracker's back
    client.inner().delete(&ctx, &created[1], &[]).await?;
    client.inner().delete(&ctx, &created[4], &[]).await?;
    assert_eq!(client.inner().len().await, 4);

    let err = client.delete_all_tracked(&ctx, &[]).await.unwrap_err();

    assert_eq!(err.len(), 2);
    assert!(err.errors().iter().all(ClientError::is_not_found));
    assert!(err.to_string().contains("cm-1") && err.to_string().contains("cm-4"));
    assert!(err.source().is_some());
    assert!(client.inner().is_empty().await);
    assert_eq!(client.tracked_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn failed_create_leaves_log_unchanged() -> Result<()> {
    let client = common::tracked_client();
    let ctx = Context::background();

    client.create(&ctx, &mut common::config_map("default", "test"), &[]).await?;
    let err = client
        .create(&ctx, &mut common::config_map("default", "test"), &[])
        .await
        .unwrap_err();
    assert!(err.is_already_exists());

    let err = client
        .create(&ctx, &mut common::config_map("default", ""), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Invalid(_)));

    assert_eq!(client.tracked_count().await, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_are_all_tracked() -> Result<()> {
    let client = Arc::new(common::tracked_client());
    let ctx = Context::background();

    let mut tasks = Vec::new();
    for i in 0..32 {
        let client = client.clone();
        let ctx = ctx.clone();
        tasks.push(tokio::spawn(async move {
            let mut cm = common::config_map("default", &format!("cm-{}", i));
            client.create(&ctx, &mut cm, &[]).await
        }));
    }
    for task in tasks {
        task.await??;
    }

    assert_eq!(client.tracked_count().await, 32);
    client.delete_all_tracked(&ctx, &[]).await?;
    assert!(client.inner().is_empty().await);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn creates_racing_bulk_delete_are_never_lost() -> Result<()> {
    let client = Arc::new(common::tracked_client());
    let ctx = Context::background();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        let ctx = ctx.clone();
        tasks.push(tokio::spawn(async move {
            let mut cm = common::config_map("default", &format!("cm-{}", i));
            client.create(&ctx, &mut cm, &[]).await
        }));
    }
    let deleter = {
        let client = client.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { client.delete_all_tracked(&ctx, &[]).await })
    };

    for task in tasks {
        task.await??;
    }
    deleter.await??;

    // Every surviving object must still be tracked
    assert_eq!(client.inner().len().await, client.tracked_count().await);
    client.delete_all_tracked(&ctx, &[]).await?;
    assert!(client.inner().is_empty().await);
    Ok(())
}

#[tokio::test]
async fn cancelled_context_fails_every_delete_but_clears_log() -> Result<()> {
    let client = common::tracked_client();
    let setup = Context::background();
    for i in 0..3 {
        client.create(&setup, &mut common::config_map("default", &format!("cm-{}", i)), &[]).await?;
    }

    let (ctx, cancel) = Context::with_cancel();
    cancel.cancel();
    let err = client.delete_all_tracked(&ctx, &[]).await.unwrap_err();

    assert_eq!(err.len(), 3);
    assert!(err.errors().iter().all(ClientError::is_context_error));
    assert_eq!(client.tracked_count().await, 0);
    assert_eq!(client.inner().len().await, 3);
    Ok(())
}
