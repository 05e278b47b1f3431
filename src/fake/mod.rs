// In-memory object store implementing the client contract.
// Documents are kept as JSON keyed by group, kind, namespace and name.

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::client::{
    Client, CreateOption, DeleteOption, DeleteOptions, ListOption, ListOptions, Patch,
    PatchOption, Preconditions, UpdateOption, WatchEvent, WatchStream, WriteOption, WriteOptions,
};
use crate::context::Context;
use crate::error::ClientError;
use crate::object::{Object, ObjectMeta};
use crate::scheme::Scheme;
use crate::types::{GroupVersionKind, ObjectKey, Operation};

const WATCH_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct StoreKey {
    group: String,
    kind: String,
    namespace: String,
    name: String,
}

impl StoreKey {
    fn new(gvk: &GroupVersionKind, key: &ObjectKey) -> Self {
        Self {
            group: gvk.group.clone(),
            kind: gvk.kind.clone(),
            namespace: key.namespace.clone(),
            name: key.name.clone(),
        }
    }

    fn is_kind(&self, gvk: &GroupVersionKind) -> bool {
        self.group == gvk.group && self.kind == gvk.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
struct StoredEvent {
    kind: EventKind,
    gvk: GroupVersionKind,
    document: Value,
}

/// One call that reached the store, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: Operation,
    pub gvk: GroupVersionKind,
    pub key: ObjectKey,
    /// Resolved options, only for `Delete` and `DeleteAllOf`
    pub delete_options: Option<DeleteOptions>,
}

struct FakeState {
    scheme: Scheme,
    objects: RwLock<BTreeMap<StoreKey, Value>>,
    resource_version: AtomicU64,
    events: broadcast::Sender<StoredEvent>,
    calls: Mutex<Vec<RecordedCall>>,
}

/// In-memory [`Client`]. Clones share the same store.
///
/// Behaves like a real API server for the parts the client contract
/// exposes: server-assigned uids and resource versions, optimistic
/// concurrency on update, delete preconditions, dry run, status
/// subresource and watch events.
#[derive(Clone)]
pub struct FakeClient {
    state: Arc<FakeState>,
}

impl FakeClient {
    pub fn new(scheme: Scheme) -> Self {
        let (events, _) = broadcast::channel(WATCH_BUFFER);
        Self {
            state: Arc::new(FakeState {
                scheme,
                objects: RwLock::new(BTreeMap::new()),
                resource_version: AtomicU64::new(0),
                events,
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Store with the core types registered
    pub fn core() -> Self {
        Self::new(Scheme::core())
    }

    /// Every call that reached the store so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn delete_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation == Operation::Delete)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Number of stored objects across all kinds
    pub async fn len(&self) -> usize {
        self.state.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> bool {
        self.state.objects.read().await.contains_key(&StoreKey::new(gvk, key))
    }

    fn record(&self, operation: Operation, gvk: &GroupVersionKind, key: &ObjectKey, delete_options: Option<DeleteOptions>) {
        tracing::debug!("Fake store {:?} {} {}", operation, gvk, key);
        self.state
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                operation,
                gvk: gvk.clone(),
                key: key.clone(),
                delete_options,
            });
    }

    fn next_resource_version(&self) -> String {
        (self.state.resource_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn emit(&self, kind: EventKind, gvk: &GroupVersionKind, document: &Value) {
        // No receivers is not an error
        let _ = self.state.events.send(StoredEvent {
            kind,
            gvk: gvk.clone(),
            document: document.clone(),
        });
    }

    /// Serialize `obj` with its resolved `apiVersion` and `kind` filled in
    fn to_document<T: Object>(&self, obj: &T) -> Result<(GroupVersionKind, Value), ClientError> {
        let gvk = self.state.scheme.gvk_for(obj)?;
        let mut document = serde_json::to_value(obj)?;
        let map = document.as_object_mut().ok_or_else(|| {
            ClientError::invalid(format!("{} did not serialize to a JSON object", gvk.kind))
        })?;
        map.insert("apiVersion".to_string(), Value::String(gvk.api_version()));
        map.insert("kind".to_string(), Value::String(gvk.kind.clone()));
        Ok((gvk, document))
    }

    /// Shared body of update, patch and their status variants
    async fn write_existing<T: Object>(
        &self,
        obj: &mut T,
        opts: &[WriteOption],
        operation: Operation,
        patch: Option<&Patch>,
    ) -> Result<(), ClientError> {
        let (gvk, incoming) = self.to_document(obj)?;
        let key = obj.key();
        self.record(operation, &gvk, &key, None);

        let write = WriteOptions::from_options(opts);
        let store_key = StoreKey::new(&gvk, &key);
        let mut objects = self.state.objects.write().await;
        let current = objects
            .get(&store_key)
            .cloned()
            .ok_or_else(|| ClientError::not_found(gvk.kind.clone(), key.clone()))?;

        let candidate = match patch {
            Some(patch) => {
                let mut document = current.clone();
                patch.apply(&mut document);
                document
            }
            None => {
                check_resource_version(&gvk, &key, obj.metadata(), &current)?;
                incoming
            }
        };

        let status_only = matches!(operation, Operation::UpdateStatus | Operation::PatchStatus);
        let next = self.next_revision(&current, candidate, status_only)?;

        if !write.dry_run {
            objects.insert(store_key, next.clone());
            self.emit(EventKind::Modified, &gvk, &next);
        }
        *obj = from_document(&next)?;
        Ok(())
    }

    /// Combine the stored document with a candidate write. Identity fields
    /// always come from the stored copy; `status` comes from the candidate
    /// only for status writes and is untouchable otherwise.
    fn next_revision(&self, current: &Value, candidate: Value, status_only: bool) -> Result<Value, ClientError> {
        let current_meta = meta_of(current)?;

        let (mut next, mut meta) = if status_only {
            let mut document = current.clone();
            set_field(&mut document, "status", candidate.get("status").cloned())?;
            (document, current_meta.clone())
        } else {
            let mut document = candidate;
            set_field(&mut document, "status", current.get("status").cloned())?;
            let meta = meta_of(&document)?;
            (document, meta)
        };

        meta.name = current_meta.name.clone();
        meta.namespace = current_meta.namespace.clone();
        meta.uid = current_meta.uid.clone();
        meta.creation_timestamp = current_meta.creation_timestamp;
        meta.generation = current_meta.generation;
        if !status_only && spec_changed(current, &next) {
            meta.generation = Some(current_meta.generation.unwrap_or(0) + 1);
        }
        meta.resource_version = Some(self.next_resource_version());

        for field in ["apiVersion", "kind"] {
            set_field(&mut next, field, current.get(field).cloned())?;
        }
        set_meta(&mut next, &meta)?;
        Ok(next)
    }
}

#[async_trait]
impl Client for FakeClient {
    fn scheme(&self) -> &Scheme {
        &self.state.scheme
    }

    async fn get<T: Object>(&self, ctx: &Context, key: &ObjectKey, obj: &mut T) -> Result<(), ClientError> {
        ctx.run(async {
            let gvk = self.state.scheme.gvk_for(obj)?;
            self.record(Operation::Get, &gvk, key, None);

            let objects = self.state.objects.read().await;
            let document = objects
                .get(&StoreKey::new(&gvk, key))
                .ok_or_else(|| ClientError::not_found(gvk.kind.clone(), key.clone()))?;
            *obj = from_document(document)?;
            Ok(())
        })
        .await
    }

    async fn list<T: Object>(&self, ctx: &Context, opts: &[ListOption]) -> Result<Vec<T>, ClientError> {
        ctx.run(async {
            let gvk = self.state.scheme.gvk_for_type::<T>()?;
            let list_opts = ListOptions::from_options(opts);
            let scope = ObjectKey::new(list_opts.namespace.clone().unwrap_or_default(), "");
            self.record(Operation::List, &gvk, &scope, None);

            let objects = self.state.objects.read().await;
            let mut items = Vec::new();
            for (store_key, document) in objects.iter() {
                if !store_key.is_kind(&gvk) || !list_opts.matches(&meta_of(document)?) {
                    continue;
                }
                if list_opts.limit.is_some_and(|limit| items.len() >= limit) {
                    break;
                }
                items.push(from_document(document)?);
            }
            Ok(items)
        })
        .await
    }

    async fn create<T: Object>(&self, ctx: &Context, obj: &mut T, opts: &[CreateOption]) -> Result<(), ClientError> {
        ctx.run(async {
            let (gvk, mut document) = self.to_document(obj)?;
            let key = obj.key();
            self.record(Operation::Create, &gvk, &key, None);

            let meta = obj.metadata();
            if meta.name.is_empty() {
                return Err(ClientError::invalid(format!("{}: metadata.name is required", gvk.kind)));
            }
            if meta.resource_version.is_some() {
                return Err(ClientError::invalid(format!(
                    "{} \"{}\": resourceVersion should not be set on objects to be created",
                    gvk.kind, key
                )));
            }

            let write = WriteOptions::from_options(opts);
            let store_key = StoreKey::new(&gvk, &key);
            let mut objects = self.state.objects.write().await;
            if objects.contains_key(&store_key) {
                return Err(ClientError::already_exists(gvk.kind.clone(), key));
            }

            let mut stored = meta.clone();
            stored.uid = Some(Uuid::new_v4().to_string());
            stored.resource_version = Some(self.next_resource_version());
            stored.creation_timestamp = Some(Utc::now());
            stored.generation = Some(1);
            set_meta(&mut document, &stored)?;

            if !write.dry_run {
                objects.insert(store_key, document.clone());
                self.emit(EventKind::Added, &gvk, &document);
            }
            *obj = from_document(&document)?;
            Ok(())
        })
        .await
    }

    async fn update<T: Object>(&self, ctx: &Context, obj: &mut T, opts: &[UpdateOption]) -> Result<(), ClientError> {
        ctx.run(self.write_existing(obj, opts, Operation::Update, None)).await
    }

    async fn patch<T: Object>(
        &self,
        ctx: &Context,
        obj: &mut T,
        patch: &Patch,
        opts: &[PatchOption],
    ) -> Result<(), ClientError> {
        ctx.run(self.write_existing(obj, opts, Operation::Patch, Some(patch))).await
    }

    async fn delete<T: Object>(&self, ctx: &Context, obj: &T, opts: &[DeleteOption]) -> Result<(), ClientError> {
        ctx.run(async {
            let gvk = self.state.scheme.gvk_for(obj)?;
            let key = obj.key();
            let delete_opts = DeleteOptions::from_options(opts);
            self.record(Operation::Delete, &gvk, &key, Some(delete_opts.clone()));

            let store_key = StoreKey::new(&gvk, &key);
            let mut objects = self.state.objects.write().await;
            let current = objects
                .get(&store_key)
                .ok_or_else(|| ClientError::not_found(gvk.kind.clone(), key.clone()))?;
            if let Some(preconditions) = &delete_opts.preconditions {
                check_preconditions(&gvk, &key, preconditions, current)?;
            }

            if !delete_opts.dry_run {
                if let Some(removed) = objects.remove(&store_key) {
                    self.emit(EventKind::Deleted, &gvk, &removed);
                }
            }
            Ok(())
        })
        .await
    }

    async fn delete_all_of<T: Object>(
        &self,
        ctx: &Context,
        list_opts: &[ListOption],
        delete_opts: &[DeleteOption],
    ) -> Result<(), ClientError> {
        ctx.run(async {
            let gvk = self.state.scheme.gvk_for_type::<T>()?;
            let selection = ListOptions::from_options(list_opts);
            let delete_opts = DeleteOptions::from_options(delete_opts);
            let scope = ObjectKey::new(selection.namespace.clone().unwrap_or_default(), "");
            self.record(Operation::DeleteAllOf, &gvk, &scope, Some(delete_opts.clone()));

            let mut objects = self.state.objects.write().await;
            let mut selected = Vec::new();
            for (store_key, document) in objects.iter() {
                if store_key.is_kind(&gvk) && selection.matches(&meta_of(document)?) {
                    selected.push(store_key.clone());
                }
            }
            if delete_opts.dry_run {
                return Ok(());
            }
            for store_key in selected {
                if let Some(removed) = objects.remove(&store_key) {
                    self.emit(EventKind::Deleted, &gvk, &removed);
                }
            }
            Ok(())
        })
        .await
    }

    async fn watch<T: Object>(&self, ctx: &Context, opts: &[ListOption]) -> Result<WatchStream<T>, ClientError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        let gvk = self.state.scheme.gvk_for_type::<T>()?;
        let selection = ListOptions::from_options(opts);
        let scope = ObjectKey::new(selection.namespace.clone().unwrap_or_default(), "");
        self.record(Operation::Watch, &gvk, &scope, None);

        let receiver = self.state.events.subscribe();
        let ctx = ctx.clone();
        let stream = futures::stream::unfold(receiver, move |mut receiver| {
            let ctx = ctx.clone();
            let gvk = gvk.clone();
            let selection = selection.clone();
            async move {
                loop {
                    let received = tokio::select! {
                        received = receiver.recv() => received,
                        _ = ctx.done() => return None,
                    };
                    let event = match received {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("Watch on {} skipped {} events", gvk, skipped);
                            continue;
                        }
                        Err(RecvError::Closed) => return None,
                    };
                    if event.gvk.group != gvk.group || event.gvk.kind != gvk.kind {
                        continue;
                    }
                    match meta_of(&event.document) {
                        Ok(meta) if !selection.matches(&meta) => continue,
                        Err(err) => return Some((Err(err), receiver)),
                        Ok(_) => {}
                    }
                    let item = from_document::<T>(&event.document).map(|obj| match event.kind {
                        EventKind::Added => WatchEvent::Added(obj),
                        EventKind::Modified => WatchEvent::Modified(obj),
                        EventKind::Deleted => WatchEvent::Deleted(obj),
                    });
                    return Some((item, receiver));
                }
            }
        });
        Ok(stream.boxed())
    }

    async fn update_status<T: Object>(&self, ctx: &Context, obj: &mut T, opts: &[UpdateOption]) -> Result<(), ClientError> {
        ctx.run(self.write_existing(obj, opts, Operation::UpdateStatus, None)).await
    }

    async fn patch_status<T: Object>(
        &self,
        ctx: &Context,
        obj: &mut T,
        patch: &Patch,
        opts: &[PatchOption],
    ) -> Result<(), ClientError> {
        ctx.run(self.write_existing(obj, opts, Operation::PatchStatus, Some(patch))).await
    }
}

fn from_document<T: Object>(document: &Value) -> Result<T, ClientError> {
    Ok(serde_json::from_value(document.clone())?)
}

fn meta_of(document: &Value) -> Result<ObjectMeta, ClientError> {
    match document.get("metadata") {
        Some(meta) => Ok(serde_json::from_value(meta.clone())?),
        None => Ok(ObjectMeta::default()),
    }
}

fn set_meta(document: &mut Value, meta: &ObjectMeta) -> Result<(), ClientError> {
    let meta = serde_json::to_value(meta)?;
    set_field(document, "metadata", Some(meta))
}

fn set_field(document: &mut Value, field: &str, value: Option<Value>) -> Result<(), ClientError> {
    let map = document
        .as_object_mut()
        .ok_or_else(|| ClientError::invalid("document is not a JSON object"))?;
    match value {
        Some(value) => map.insert(field.to_string(), value),
        None => map.remove(field),
    };
    Ok(())
}

/// True when anything besides metadata and status differs
fn spec_changed(current: &Value, next: &Value) -> bool {
    let strip = |document: &Value| {
        let mut document = document.clone();
        if let Some(map) = document.as_object_mut() {
            map.remove("metadata");
            map.remove("status");
        }
        document
    };
    strip(current) != strip(next)
}

fn check_resource_version(
    gvk: &GroupVersionKind,
    key: &ObjectKey,
    incoming: &ObjectMeta,
    current: &Value,
) -> Result<(), ClientError> {
    let Some(expected) = &incoming.resource_version else {
        return Ok(());
    };
    let stored = meta_of(current)?.resource_version.unwrap_or_default();
    if *expected != stored {
        return Err(ClientError::conflict(format!(
            "Operation cannot be fulfilled on {} \"{}\": the object has been modified; please apply your changes to the latest version and try again",
            gvk.kind, key
        )));
    }
    Ok(())
}

fn check_preconditions(
    gvk: &GroupVersionKind,
    key: &ObjectKey,
    preconditions: &Preconditions,
    current: &Value,
) -> Result<(), ClientError> {
    let meta = meta_of(current)?;
    if let Some(uid) = &preconditions.uid {
        let stored = meta.uid.unwrap_or_default();
        if *uid != stored {
            return Err(ClientError::conflict(format!(
                "Operation cannot be fulfilled on {} \"{}\": Precondition failed: UID in precondition: {}, UID in object meta: {}",
                gvk.kind, key, uid, stored
            )));
        }
    }
    if let Some(resource_version) = &preconditions.resource_version {
        let stored = meta.resource_version.unwrap_or_default();
        if *resource_version != stored {
            return Err(ClientError::conflict(format!(
                "Operation cannot be fulfilled on {} \"{}\": Precondition failed: ResourceVersion in precondition: {}, ResourceVersion in object meta: {}",
                gvk.kind, key, resource_version, stored
            )));
        }
    }
    Ok(())
}
