//!
//! # In memory client
//!
//! Thread safe object store behaving like a single api server.
//! Assigns uids and resource versions, applies patches and broadcasts watch events.
//!
use std::collections::HashMap;
use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use async_trait::async_trait;
use futures_channel::mpsc::unbounded;
use futures_channel::mpsc::UnboundedSender;
use futures_util::stream::BoxStream;
use futures_util::stream::StreamExt;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::trace;
use uuid::Uuid;

use dw_diff::apply_patch;
use dw_diff::merge_patch;
use dw_diff::PatchOperation;
use dw_types::options::DeleteOptions;
use dw_types::options::PropagationPolicy;
use dw_types::Crd;
use dw_types::DeleteStatus;
use dw_types::InputK8Obj;
use dw_types::K8List;
use dw_types::K8Meta;
use dw_types::K8Obj;
use dw_types::MetaStatus;
use dw_types::Spec;
use dw_types::StatusDetails;

use crate::decode_watch_value;
use crate::ClientError;
use crate::ListArg;
use crate::MetadataClient;
use crate::NameSpace;
use crate::PatchMergeType;
use crate::TokenStreamResult;

/// watch events kept for replay
const HISTORY_LIMIT: usize = 1024;

/// request kinds a scripted failure can target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    List,
    Create,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ItemKey {
    crd: &'static Crd,
    ns: String,
    name: String,
}

impl ItemKey {
    fn new<S, M>(metadata: &M) -> Self
    where
        S: Spec,
        M: K8Meta,
    {
        ItemKey {
            crd: S::metadata(),
            ns: metadata.namespace().to_owned(),
            name: metadata.name().to_owned(),
        }
    }

    fn matches(&self, crd: &Crd, ns: &NameSpace) -> bool {
        self.crd == crd && (ns.is_all() || ns.named() == self.ns)
    }
}

#[derive(Debug)]
struct Watcher {
    crd: &'static Crd,
    ns: NameSpace,
    sender: UnboundedSender<Value>,
}

#[derive(Debug)]
struct Event {
    version: u64,
    key: ItemKey,
    value: Value,
}

#[derive(Debug)]
struct StoreState {
    items: HashMap<ItemKey, Value>,
    version: u64,
    history: VecDeque<Event>,
    // newest version dropped from history
    compacted: u64,
    watchers: Vec<Watcher>,
    authorized: bool,
    finalizing: bool,
    failures: Vec<(Verb, MetaStatus)>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            version: 0,
            history: VecDeque::new(),
            compacted: 0,
            watchers: vec![],
            authorized: true,
            finalizing: false,
            failures: vec![],
        }
    }
}

impl StoreState {
    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn take_failure(&mut self, verb: Verb) -> Result<(), ClientError> {
        match self.failures.iter().position(|(v, _)| *v == verb) {
            Some(index) => {
                let (_, status) = self.failures.remove(index);
                debug!(?verb, %status, "returning scripted failure");
                Err(ClientError::Status(status))
            }
            None => Ok(()),
        }
    }

    /// record and broadcast a watch event, pruning closed watchers
    fn emit(&mut self, ty: &str, key: &ItemKey, object: &Value) {
        let version = self.version;
        let event = json!({ "type": ty, "object": object });
        trace!(ty, name = %key.name, version, "emit watch event");

        self.watchers.retain(|watcher| {
            if key.matches(watcher.crd, &watcher.ns) {
                watcher.sender.unbounded_send(event.clone()).is_ok()
            } else {
                !watcher.sender.is_closed()
            }
        });
        self.history.push_back(Event {
            version,
            key: key.clone(),
            value: event,
        });
        while self.history.len() > HISTORY_LIMIT {
            if let Some(dropped) = self.history.pop_front() {
                self.compacted = dropped.version;
            }
        }
    }

    /// queue events after `since`, or a 410 error event when they were compacted away
    fn replay(&self, crd: &Crd, ns: &NameSpace, since: u64, sender: &UnboundedSender<Value>) {
        if since < self.compacted {
            debug!(since, compacted = self.compacted, "watch version too old");
            let status = MetaStatus::failure(
                410,
                "Expired",
                format!("too old resource version: {} ({})", since, self.compacted),
            );
            let _ = sender.unbounded_send(json!({ "type": "ERROR", "object": status }));
            return;
        }
        for event in self.history.iter() {
            if event.version > since && event.key.matches(crd, ns) {
                let _ = sender.unbounded_send(event.value.clone());
            }
        }
    }
}

fn not_found(key: &ItemKey) -> ClientError {
    ClientError::not_found(format!(
        "{} \"{}\" not found",
        key.crd.names.plural, key.name
    ))
}

fn metadata_mut(value: &mut Value) -> Result<&mut Map<String, Value>, ClientError> {
    value
        .get_mut("metadata")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ClientError::Other("object without metadata".to_owned()))
}

fn set_resource_version(value: &mut Value, version: u64) -> Result<(), ClientError> {
    metadata_mut(value)?.insert("resourceVersion".to_owned(), json!(version.to_string()));
    Ok(())
}

/// equality based selector, `key=value` pairs separated by comma
fn labels_match(value: &Value, selector: &str) -> bool {
    let labels = value.pointer("/metadata/labels");
    selector
        .split(',')
        .filter(|term| !term.trim().is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, expected)) => labels
                .and_then(|labels| labels.get(key.trim()))
                .and_then(Value::as_str)
                .map(|actual| actual == expected.trim())
                .unwrap_or(false),
            None => labels
                .and_then(|labels| labels.get(term.trim()))
                .is_some(),
        })
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryClient {
    store: Arc<RwLock<StoreState>>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, ClientError> {
        self.store
            .read()
            .map_err(|_| ClientError::Other("store lock poisoned".to_owned()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, ClientError> {
        self.store
            .write()
            .map_err(|_| ClientError::Other("store lock poisoned".to_owned()))
    }

    /// make `sanity_check` accept or reject the credentials
    pub fn set_authorized(&self, authorized: bool) -> Result<(), ClientError> {
        self.write()?.authorized = authorized;
        Ok(())
    }

    /// next request of `verb` fails with `status`
    pub fn fail_next(&self, verb: Verb, status: MetaStatus) -> Result<(), ClientError> {
        self.write()?.failures.push((verb, status));
        Ok(())
    }

    /// when set, deletes only mark the object and `complete_deletion` removes it
    pub fn set_finalizing(&self, finalizing: bool) -> Result<(), ClientError> {
        self.write()?.finalizing = finalizing;
        Ok(())
    }

    /// replace the status of an object, as a controller would
    pub fn set_status<S, M>(&self, metadata: &M, status: S::Status) -> Result<K8Obj<S>, ClientError>
    where
        S: Spec,
        M: K8Meta,
    {
        let key = ItemKey::new::<S, M>(metadata);
        let status = serde_json::to_value(status)?;

        let mut store = self.write()?;
        let version = store.next_version();
        let value = store.items.get_mut(&key).ok_or_else(|| not_found(&key))?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("status".to_owned(), status);
        }
        set_resource_version(value, version)?;
        let value = value.clone();
        store.emit("MODIFIED", &key, &value);

        Ok(serde_json::from_value(value)?)
    }

    /// remove an object whose deletion was held back
    pub fn complete_deletion<S, M>(&self, metadata: &M) -> Result<(), ClientError>
    where
        S: Spec,
        M: K8Meta,
    {
        let key = ItemKey::new::<S, M>(metadata);
        let mut store = self.write()?;
        let version = store.next_version();
        let mut value = store.items.remove(&key).ok_or_else(|| not_found(&key))?;
        set_resource_version(&mut value, version)?;
        store.emit("DELETED", &key, &value);
        Ok(())
    }
}

#[async_trait]
impl MetadataClient for InMemoryClient {
    async fn retrieve_item<S, M>(&self, metadata: &M) -> Result<K8Obj<S>, ClientError>
    where
        S: Spec,
        M: K8Meta + Send + Sync,
    {
        let key = ItemKey::new::<S, M>(metadata);
        let value = {
            let mut store = self.write()?;
            store.take_failure(Verb::Get)?;
            store.items.get(&key).cloned().ok_or_else(|| not_found(&key))?
        };
        Ok(serde_json::from_value(value)?)
    }

    async fn retrieve_items_with_option<S, N>(
        &self,
        namespace: N,
        option: Option<ListArg>,
    ) -> Result<K8List<S>, ClientError>
    where
        S: Spec,
        N: Into<NameSpace> + Send + Sync,
    {
        let ns: NameSpace = namespace.into();
        let label_selector = option.and_then(|opt| opt.label_selector);

        let (values, version) = {
            let mut store = self.write()?;
            store.take_failure(Verb::List)?;
            let mut values: Vec<(&ItemKey, &Value)> = store
                .items
                .iter()
                .filter(|(key, _)| key.matches(S::metadata(), &ns))
                .filter(|(_, value)| match &label_selector {
                    Some(selector) => labels_match(value, selector),
                    None => true,
                })
                .collect();
            values.sort_by(|a, b| (&a.0.ns, &a.0.name).cmp(&(&b.0.ns, &b.0.name)));
            let values: Vec<Value> = values.into_iter().map(|(_, v)| v.clone()).collect();
            (values, store.version)
        };

        let mut list = K8List::<S>::new();
        list.metadata.resource_version = version.to_string();
        for value in values {
            list.items.push(serde_json::from_value(value)?);
        }
        Ok(list)
    }

    async fn delete_item_with_option<S, M>(
        &self,
        metadata: &M,
        option: Option<DeleteOptions>,
    ) -> Result<DeleteStatus<S>, ClientError>
    where
        S: Spec,
        M: K8Meta + Send + Sync,
    {
        let key = ItemKey::new::<S, M>(metadata);
        let foreground = option
            .and_then(|opt| opt.propagation_policy)
            .map(|policy| policy == PropagationPolicy::Foreground)
            .unwrap_or(false);

        let mut store = self.write()?;
        store.take_failure(Verb::Delete)?;
        let version = store.next_version();

        if store.finalizing || foreground {
            let value = store.items.get_mut(&key).ok_or_else(|| not_found(&key))?;
            metadata_mut(value)?.insert("deletionTimestamp".to_owned(), json!("pending"));
            set_resource_version(value, version)?;
            let value = value.clone();
            store.emit("MODIFIED", &key, &value);
            debug!(name = %key.name, "deletion pending");
            return Ok(DeleteStatus::ForegroundDelete(serde_json::from_value(value)?));
        }

        let mut value = store.items.remove(&key).ok_or_else(|| not_found(&key))?;
        set_resource_version(&mut value, version)?;
        store.emit("DELETED", &key, &value);

        let uid = value
            .pointer("/metadata/uid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let mut status = MetaStatus::success();
        status.details = Some(StatusDetails {
            name: key.name.clone(),
            group: Some(key.crd.group.to_owned()),
            kind: key.crd.names.plural.to_owned(),
            uid,
        });
        Ok(DeleteStatus::Deleted(status))
    }

    async fn create_item<S>(&self, value: InputK8Obj<S>) -> Result<K8Obj<S>, ClientError>
    where
        S: Spec,
    {
        let key = ItemKey::new::<S, _>(&value.metadata);
        let mut item_value = serde_json::to_value(&value)?;

        let mut store = self.write()?;
        store.take_failure(Verb::Create)?;
        if store.items.contains_key(&key) {
            return Err(ClientError::Status(MetaStatus::failure(
                409,
                "AlreadyExists",
                format!("{} \"{}\" already exists", key.crd.names.plural, key.name),
            )));
        }

        let version = store.next_version();
        let metadata = metadata_mut(&mut item_value)?;
        metadata.insert("uid".to_owned(), json!(Uuid::new_v4().to_string()));
        metadata.insert("resourceVersion".to_owned(), json!(version.to_string()));

        store.items.insert(key.clone(), item_value.clone());
        store.emit("ADDED", &key, &item_value);
        debug!(name = %key.name, version, "created");

        Ok(serde_json::from_value(item_value)?)
    }

    async fn patch<S, M>(
        &self,
        metadata: &M,
        patch: &Value,
        merge_type: PatchMergeType,
    ) -> Result<K8Obj<S>, ClientError>
    where
        S: Spec,
        M: K8Meta + Display + Send + Sync,
    {
        let key = ItemKey::new::<S, M>(metadata);
        debug!(%metadata, ?merge_type, "patching");

        let mut store = self.write()?;
        store.take_failure(Verb::Patch)?;
        let mut value = store
            .items
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found(&key))?;

        match merge_type {
            PatchMergeType::Json => {
                let ops: Vec<PatchOperation> = serde_json::from_value(patch.clone())?;
                apply_patch(&mut value, &ops)?;
            }
            PatchMergeType::JsonMerge | PatchMergeType::StrategicMerge => {
                merge_patch(&mut value, patch);
            }
        }

        let obj: K8Obj<S> = serde_json::from_value(value.clone())?;
        let version = store.next_version();
        set_resource_version(&mut value, version)?;
        store.items.insert(key.clone(), value.clone());
        store.emit("MODIFIED", &key, &value);
        trace!(?obj, "patched");

        Ok(serde_json::from_value(value)?)
    }

    fn watch_stream_since<S, N>(
        &self,
        namespace: N,
        resource_version: Option<String>,
    ) -> BoxStream<'_, TokenStreamResult<S>>
    where
        S: Spec + 'static,
        N: Into<NameSpace>,
    {
        let ns: NameSpace = namespace.into();
        let (sender, receiver) = unbounded();

        match self.write() {
            Ok(mut store) => {
                let since = resource_version.and_then(|rv| rv.parse::<u64>().ok());
                if let Some(since) = since {
                    store.replay(S::metadata(), &ns, since, &sender);
                }
                store.watchers.push(Watcher {
                    crd: S::metadata(),
                    ns,
                    sender,
                });
            }
            Err(err) => {
                debug!(%err, "watch not registered");
            }
        }

        receiver
            .map(|value| Ok(vec![decode_watch_value::<S>(value)]))
            .boxed()
    }

    async fn sanity_check(&self, namespace: &str) -> Result<(), ClientError> {
        if self.read()?.authorized {
            Ok(())
        } else {
            debug!(namespace, "credentials rejected");
            Err(ClientError::Status(MetaStatus::failure(
                401,
                "Unauthorized",
                "Unauthorized",
            )))
        }
    }
}
