//!
//! # Workspace store
//!
//! Cache of DevWorkspaces keyed by uid, ordered by resource version.
//! The store is owned by a `StoreRunner` task and mutated only through `StoreCommand`s.
//!
use std::collections::HashMap;

use futures_channel::mpsc::unbounded;
use futures_channel::mpsc::UnboundedReceiver;
use futures_channel::mpsc::UnboundedSender;
use futures_channel::oneshot;
use futures_util::stream::StreamExt;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use dw_types::devworkspace::DevWorkspace;
use dw_types::event::K8Event;
use dw_types::K8Watch;

use crate::LifecycleError;
use crate::PushMessage;
use crate::Workspace;
use crate::WorkspaceStatus;

pub const DEFAULT_TERMINATING_MESSAGE: &str = "Cleaning up resources for deletion";

/// status transition of a cached workspace
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub uid: String,
    pub previous: Option<WorkspaceStatus>,
    pub current: WorkspaceStatus,
    /// set when the workspace left the cache
    pub removed: bool,
    pub workspace: Workspace,
}

#[derive(Debug, Default)]
pub struct WorkspaceStore {
    workspaces: HashMap<String, DevWorkspace>,
    events: HashMap<String, Vec<K8Event>>,
    // uid -> message, kept until removal
    terminating: HashMap<String, String>,
}

impl WorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// store `devworkspace` unless an equal or newer version is cached
    pub fn apply(&mut self, mut devworkspace: DevWorkspace) -> Option<StatusChange> {
        let uid = devworkspace.metadata.uid.clone();
        let previous = match self.workspaces.get(&uid) {
            Some(current) => {
                match (
                    current.metadata.resource_version_number(),
                    devworkspace.metadata.resource_version_number(),
                ) {
                    (Some(stored), Some(incoming)) if incoming <= stored => {
                        trace!(%uid, stored, incoming, "stale update ignored");
                        return None;
                    }
                    (Some(_), Some(_)) => {}
                    _ => warn!(
                        %uid,
                        stored = %current.metadata.resource_version,
                        incoming = %devworkspace.metadata.resource_version,
                        "resource version not numeric, keeping latest arrival"
                    ),
                }
                Some(Workspace::from(current).status())
            }
            None => None,
        };

        if let Some(message) = self.terminating.get(&uid) {
            devworkspace.status.phase = Some(WorkspaceStatus::Terminating.to_string());
            devworkspace.status.message = Some(message.clone());
        }

        let workspace = Workspace::from(&devworkspace);
        let current = workspace.status();
        debug!(%uid, name = workspace.name(), %current, version = workspace.resource_version(), "workspace updated");
        self.workspaces.insert(uid.clone(), devworkspace);

        if previous.as_ref() == Some(&current) {
            return None;
        }
        Some(StatusChange {
            uid,
            previous,
            current,
            removed: false,
            workspace,
        })
    }

    pub fn remove(&mut self, uid: &str) -> Option<StatusChange> {
        self.terminating.remove(uid);
        let devworkspace = self.workspaces.remove(uid)?;
        self.events.remove(uid);
        let workspace = Workspace::new(devworkspace);
        debug!(%uid, name = workspace.name(), "workspace removed");
        let status = workspace.status();
        Some(StatusChange {
            uid: uid.to_owned(),
            previous: Some(status.clone()),
            current: status,
            removed: true,
            workspace,
        })
    }

    /// deletion was requested; the cached entry stays until the watch reports it gone
    pub fn mark_terminating(&mut self, uid: &str, message: &str) -> Option<StatusChange> {
        let devworkspace = self.workspaces.get_mut(uid)?;
        self.terminating.insert(uid.to_owned(), message.to_owned());
        let previous = Workspace::from(&*devworkspace).status();
        devworkspace.status.phase = Some(WorkspaceStatus::Terminating.to_string());
        devworkspace.status.message = Some(message.to_owned());

        let workspace = Workspace::from(&*devworkspace);
        debug!(%uid, name = workspace.name(), %message, "workspace terminating");
        Some(StatusChange {
            uid: uid.to_owned(),
            previous: Some(previous),
            current: WorkspaceStatus::Terminating,
            removed: false,
            workspace,
        })
    }

    /// events are kept per involved object uid, a newer copy of an event replaces the old one
    pub fn apply_event(&mut self, event: K8Event) {
        let owner = match &event.header.involved_object.uid {
            Some(uid) => uid.clone(),
            None => {
                trace!(name = %event.metadata.name, "event without involved object");
                return;
            }
        };
        let events = self.events.entry(owner).or_default();
        match events
            .iter_mut()
            .find(|existing| existing.metadata.name == event.metadata.name)
        {
            Some(existing) => {
                let stale = matches!(
                    (
                        existing.metadata.resource_version_number(),
                        event.metadata.resource_version_number()
                    ),
                    (Some(stored), Some(incoming)) if incoming <= stored
                );
                if !stale {
                    *existing = event;
                }
            }
            None => events.push(event),
        }
    }

    pub fn get(&self, uid: &str) -> Option<Workspace> {
        self.workspaces.get(uid).map(Workspace::from)
    }

    pub fn workspaces(&self) -> Vec<Workspace> {
        let mut workspaces: Vec<Workspace> = self.workspaces.values().map(Workspace::from).collect();
        workspaces.sort_by(|a, b| a.name().cmp(b.name()));
        workspaces
    }

    pub fn events(&self, uid: &str) -> Vec<K8Event> {
        self.events.get(uid).cloned().unwrap_or_default()
    }

    /// workspaces counting against the running limit
    pub fn running_count(&self) -> usize {
        self.workspaces
            .values()
            .map(Workspace::from)
            .filter(|workspace| workspace.is_running() || workspace.is_starting())
            .count()
    }

    /// true when one more running workspace would go over `limit`
    pub fn running_limit_exceeded(&self, limit: usize) -> bool {
        self.running_count() >= limit
    }
}

pub enum StoreCommand {
    Apply(DevWorkspace),
    Remove(String),
    MarkTerminating {
        uid: String,
        message: String,
    },
    ApplyEvent(K8Event),
    Subscribe(UnboundedSender<StatusChange>),
    Get {
        uid: String,
        reply: oneshot::Sender<Option<Workspace>>,
    },
    List {
        reply: oneshot::Sender<Vec<Workspace>>,
    },
    Events {
        uid: String,
        reply: oneshot::Sender<Vec<K8Event>>,
    },
    RunningLimitExceeded {
        limit: usize,
        reply: oneshot::Sender<bool>,
    },
    SubscriberCount {
        reply: oneshot::Sender<usize>,
    },
}

/// owns the store and applies commands in arrival order
pub struct StoreRunner {
    store: WorkspaceStore,
    receiver: UnboundedReceiver<StoreCommand>,
    subscribers: Vec<UnboundedSender<StatusChange>>,
}

impl StoreRunner {
    pub async fn run(mut self) {
        debug!("store runner started");
        while let Some(command) = self.receiver.next().await {
            self.handle(command);
        }
        debug!("store runner stopped, all handles dropped");
    }

    fn handle(&mut self, command: StoreCommand) {
        match command {
            StoreCommand::Apply(devworkspace) => {
                if let Some(change) = self.store.apply(devworkspace) {
                    self.publish(change);
                }
            }
            StoreCommand::Remove(uid) => {
                if let Some(change) = self.store.remove(&uid) {
                    self.publish(change);
                }
            }
            StoreCommand::MarkTerminating { uid, message } => {
                if let Some(change) = self.store.mark_terminating(&uid, &message) {
                    self.publish(change);
                }
            }
            StoreCommand::ApplyEvent(event) => self.store.apply_event(event),
            StoreCommand::Subscribe(sender) => self.subscribers.push(sender),
            StoreCommand::Get { uid, reply } => {
                let _ = reply.send(self.store.get(&uid));
            }
            StoreCommand::List { reply } => {
                let _ = reply.send(self.store.workspaces());
            }
            StoreCommand::Events { uid, reply } => {
                let _ = reply.send(self.store.events(&uid));
            }
            StoreCommand::RunningLimitExceeded { limit, reply } => {
                let _ = reply.send(self.store.running_limit_exceeded(limit));
            }
            StoreCommand::SubscriberCount { reply } => {
                self.subscribers.retain(|subscriber| !subscriber.is_closed());
                let _ = reply.send(self.subscribers.len());
            }
        }
    }

    fn publish(&mut self, change: StatusChange) {
        trace!(uid = %change.uid, current = %change.current, "publishing status change");
        self.subscribers
            .retain(|subscriber| subscriber.unbounded_send(change.clone()).is_ok());
    }
}

/// cheap handle to the store runner
#[derive(Debug, Clone)]
pub struct StoreHandle {
    sender: UnboundedSender<StoreCommand>,
}

impl StoreHandle {
    pub fn new() -> (Self, StoreRunner) {
        let (sender, receiver) = unbounded();
        let runner = StoreRunner {
            store: WorkspaceStore::new(),
            receiver,
            subscribers: vec![],
        };
        (Self { sender }, runner)
    }

    /// create a store with its runner on the executor
    pub fn spawn() -> Self {
        let (handle, runner) = Self::new();
        fluvio_future::task::spawn(runner.run());
        handle
    }

    fn send(&self, command: StoreCommand) -> Result<(), LifecycleError> {
        self.sender
            .unbounded_send(command)
            .map_err(|_| LifecycleError::StoreClosed)
    }

    async fn ask<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> StoreCommand,
    ) -> Result<T, LifecycleError> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply))?;
        response.await.map_err(|_| LifecycleError::StoreClosed)
    }

    pub fn apply(&self, devworkspace: DevWorkspace) -> Result<(), LifecycleError> {
        self.send(StoreCommand::Apply(devworkspace))
    }

    pub fn remove(&self, uid: impl Into<String>) -> Result<(), LifecycleError> {
        self.send(StoreCommand::Remove(uid.into()))
    }

    pub fn mark_terminating(
        &self,
        uid: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), LifecycleError> {
        self.send(StoreCommand::MarkTerminating {
            uid: uid.into(),
            message: message.into(),
        })
    }

    pub fn apply_event(&self, event: K8Event) -> Result<(), LifecycleError> {
        self.send(StoreCommand::ApplyEvent(event))
    }

    /// status changes applied after this call; dropping the receiver unsubscribes
    pub fn subscribe(&self) -> Result<UnboundedReceiver<StatusChange>, LifecycleError> {
        let (sender, receiver) = unbounded();
        self.send(StoreCommand::Subscribe(sender))?;
        Ok(receiver)
    }

    /// route a push frame into the store
    pub fn dispatch(&self, message: PushMessage) -> Result<(), LifecycleError> {
        match message {
            PushMessage::DevWorkspace(K8Watch::DELETED(devworkspace)) => {
                self.remove(devworkspace.metadata.uid)
            }
            PushMessage::DevWorkspace(K8Watch::ADDED(devworkspace))
            | PushMessage::DevWorkspace(K8Watch::MODIFIED(devworkspace)) => self.apply(devworkspace),
            PushMessage::Event(K8Watch::DELETED(event)) => {
                trace!(name = %event.metadata.name, "event expired");
                Ok(())
            }
            PushMessage::Event(K8Watch::ADDED(event)) | PushMessage::Event(K8Watch::MODIFIED(event)) => {
                self.apply_event(event)
            }
        }
    }

    pub async fn get(&self, uid: impl Into<String>) -> Result<Option<Workspace>, LifecycleError> {
        let uid = uid.into();
        self.ask(|reply| StoreCommand::Get { uid, reply }).await
    }

    pub async fn workspaces(&self) -> Result<Vec<Workspace>, LifecycleError> {
        self.ask(|reply| StoreCommand::List { reply }).await
    }

    pub async fn events(&self, uid: impl Into<String>) -> Result<Vec<K8Event>, LifecycleError> {
        let uid = uid.into();
        self.ask(|reply| StoreCommand::Events { uid, reply }).await
    }

    pub async fn running_limit_exceeded(&self, limit: usize) -> Result<bool, LifecycleError> {
        self.ask(|reply| StoreCommand::RunningLimitExceeded { limit, reply })
            .await
    }

    /// live subscriptions, closed ones are pruned first
    pub async fn subscriber_count(&self) -> Result<usize, LifecycleError> {
        self.ask(|reply| StoreCommand::SubscriberCount { reply }).await
    }
}
