//!
//! # Restart
//!
//! One restart in flight. An active workspace is stopped with a status subscription
//! taken out beforehand; start follows once the workspace reports `Stopped` or `Failed`.
//! When the cache already holds a stopped copy, start follows right away.
//! The subscription lives in the `Stopping` state, leaving that state drops it.
//!
use futures_channel::mpsc::UnboundedReceiver;
use futures_util::stream::StreamExt;
use tracing::debug;
use tracing::trace;

use dw_client::MetadataClient;

use crate::LifecycleError;
use crate::StatusChange;
use crate::Workspace;
use crate::WorkspaceLifecycle;

#[derive(Debug)]
pub enum RestartState {
    Idle,
    Stopping(UnboundedReceiver<StatusChange>),
    Starting,
    Done,
}

impl RestartState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Stopping(_) => "Stopping",
            Self::Starting => "Starting",
            Self::Done => "Done",
        }
    }
}

#[derive(Debug)]
pub struct RestartOperation {
    workspace: Workspace,
    state: RestartState,
}

impl RestartOperation {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            state: RestartState::Idle,
        }
    }

    pub fn state(&self) -> &RestartState {
        &self.state
    }

    pub async fn run<C>(mut self, lifecycle: &WorkspaceLifecycle<C>) -> Result<Workspace, LifecycleError>
    where
        C: MetadataClient,
    {
        let result = self.drive(lifecycle).await;
        self.state = RestartState::Done;
        result
    }

    async fn drive<C>(&mut self, lifecycle: &WorkspaceLifecycle<C>) -> Result<Workspace, LifecycleError>
    where
        C: MetadataClient,
    {
        let status = self.workspace.status();
        debug!(name = self.workspace.name(), %status, "restart requested");

        if status.is_startable() {
            self.state = RestartState::Starting;
        } else if status.is_active() {
            let subscription = lifecycle.store().subscribe()?;
            // changes applied before the subscription are only visible in the cache
            let cached = lifecycle.store().get(self.workspace.uid()).await?;
            match cached {
                Some(cached) if cached.status().is_startable() => {
                    debug!(name = cached.name(), status = %cached.status(), "already stopped");
                    self.workspace = cached;
                    self.state = RestartState::Starting;
                }
                _ => {
                    self.state = RestartState::Stopping(subscription);
                    lifecycle.stop_workspace(&self.workspace).await?;
                }
            }
        } else {
            return Err(LifecycleError::InvalidTransition {
                action: "restart",
                status,
            });
        }

        if let RestartState::Stopping(subscription) = &mut self.state {
            let uid = self.workspace.uid().to_owned();
            self.workspace = wait_for_stop(subscription, &uid).await?;
            self.state = RestartState::Starting;
        }

        debug!(name = self.workspace.name(), state = self.state.name(), "starting");
        lifecycle.start_workspace(&self.workspace).await
    }
}

async fn wait_for_stop(
    subscription: &mut UnboundedReceiver<StatusChange>,
    uid: &str,
) -> Result<Workspace, LifecycleError> {
    while let Some(change) = subscription.next().await {
        if change.uid != uid {
            continue;
        }
        if change.removed {
            return Err(LifecycleError::Abandoned(uid.to_owned()));
        }
        trace!(%uid, current = %change.current, "restart observed status");
        if change.current.is_startable() {
            return Ok(change.workspace);
        }
    }
    Err(LifecycleError::Abandoned(uid.to_owned()))
}
