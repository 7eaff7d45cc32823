//!
//! # Lifecycle actions
//!
//! Workspace actions against the cluster. Actions return once the
//! api server accepted the change; phase transitions arrive later through the watch.
//!
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::instrument;

use dw_client::retryable_exec;
use dw_client::ClientError;
use dw_client::MetadataClient;
use dw_client::PatchMergeType;
use dw_client::RetryPolicy;
use dw_client::SharedClient;
use dw_config::DashboardConfig;
use dw_devfile::devfile_to_devworkspace_with;
use dw_devfile::ConvertOptions;
use dw_diff::json_patch;
use dw_diff::PatchOperation;
use dw_types::devfile::Devfile;
use dw_types::devworkspace::DevWorkspaceSpec;
use dw_types::devworkspace::DevWorkspaceTemplateSpec;
use dw_types::DeleteStatus;

use crate::store::DEFAULT_TERMINATING_MESSAGE;
use crate::LifecycleError;
use crate::RestartOperation;
use crate::StoreHandle;
use crate::Workspace;

pub struct WorkspaceLifecycle<C> {
    client: SharedClient<C>,
    store: StoreHandle,
    retry: RetryPolicy,
    running_limit: Option<usize>,
    convert: ConvertOptions,
}

impl<C> WorkspaceLifecycle<C>
where
    C: MetadataClient,
{
    pub fn new(client: SharedClient<C>, store: StoreHandle, retry: RetryPolicy) -> Self {
        Self {
            client,
            store,
            retry,
            running_limit: None,
            convert: ConvertOptions::default(),
        }
    }

    pub fn from_config(client: SharedClient<C>, store: StoreHandle, config: &DashboardConfig) -> Self {
        Self {
            client,
            store,
            retry: RetryPolicy::from(&config.retry),
            running_limit: Some(config.running_limit),
            convert: ConvertOptions {
                editor_namespace: config.editor_namespace.clone(),
                prefer_tech_preview: config.prefer_tech_preview,
                routing_class: config.routing_class.clone(),
                started: false,
            },
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn check_authorized(&self, namespace: &str) -> Result<(), LifecycleError> {
        self.client.sanity_check(namespace).await?;
        Ok(())
    }

    /// create a DevWorkspace from `devfile` in `namespace`
    #[instrument(skip(self, devfile))]
    pub async fn create_workspace(
        &self,
        devfile: &Devfile,
        namespace: &str,
        start: bool,
    ) -> Result<Workspace, LifecycleError> {
        let options = ConvertOptions {
            started: start,
            ..self.convert.clone()
        };
        let mut devworkspace = devfile_to_devworkspace_with(devfile, &options)?;
        devworkspace.metadata.namespace = namespace.to_owned();

        if start {
            self.check_running_limit().await?;
        }
        self.check_authorized(namespace).await?;

        let input = devworkspace.as_input();
        let created = retryable_exec(&self.retry, "create workspace", || {
            self.client.create_item::<DevWorkspaceSpec>(input.clone())
        })
        .await?;
        debug!(uid = %created.metadata.uid, "workspace created");
        self.store.apply(created.clone())?;
        Ok(Workspace::new(created))
    }

    #[instrument(skip(self, workspace), fields(name = workspace.name()))]
    pub async fn start_workspace(&self, workspace: &Workspace) -> Result<Workspace, LifecycleError> {
        let status = workspace.status();
        if !status.is_startable() {
            return Err(LifecycleError::InvalidTransition {
                action: "start",
                status,
            });
        }
        self.check_running_limit().await?;
        self.check_authorized(workspace.namespace()).await?;
        self.set_started(workspace, true).await
    }

    #[instrument(skip(self, workspace), fields(name = workspace.name()))]
    pub async fn stop_workspace(&self, workspace: &Workspace) -> Result<Workspace, LifecycleError> {
        self.check_authorized(workspace.namespace()).await?;
        self.set_started(workspace, false).await
    }

    /// replace the template of `workspace` with the one converted from `devfile`
    ///
    /// Only the changed parts of `spec.template` are sent, as a JSON patch.
    /// Nothing is sent when the template is unchanged.
    #[instrument(skip(self, workspace, devfile), fields(name = workspace.name()))]
    pub async fn update_workspace(
        &self,
        workspace: &Workspace,
        devfile: &Devfile,
    ) -> Result<Workspace, LifecycleError> {
        let current = workspace.devworkspace();
        let options = ConvertOptions {
            started: current.spec.started,
            ..self.convert.clone()
        };
        let desired = devfile_to_devworkspace_with(devfile, &options)?;

        let ops = json_patch(
            &template_document(&current.spec.template)?,
            &template_document(&desired.spec.template)?,
        )
        .map_err(ClientError::from)?;
        if ops.is_empty() {
            debug!("template unchanged");
            return Ok(workspace.clone());
        }

        self.check_authorized(workspace.namespace()).await?;
        debug!(ops = ops.len(), "updating template");
        let patch = serde_json::to_value(ops)?;
        self.send_patch(workspace, &patch, "update workspace").await
    }

    /// stop then start; a stopped workspace is started right away
    pub async fn restart_workspace(&self, workspace: &Workspace) -> Result<Workspace, LifecycleError> {
        RestartOperation::new(workspace.clone()).run(self).await
    }

    /// delete the DevWorkspace; the cached entry shows `Terminating` until the watch reports it gone
    #[instrument(skip(self, workspace), fields(name = workspace.name()))]
    pub async fn terminate_workspace(&self, workspace: &Workspace) -> Result<(), LifecycleError> {
        self.check_authorized(workspace.namespace()).await?;

        let meta = workspace.devworkspace().metadata.as_item();
        let status = retryable_exec(&self.retry, "terminate workspace", || {
            self.client.delete_item::<DevWorkspaceSpec, _>(&meta)
        })
        .await?;

        let message = match status {
            DeleteStatus::ForegroundDelete(devworkspace) => devworkspace
                .status
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| DEFAULT_TERMINATING_MESSAGE.to_owned()),
            DeleteStatus::Deleted(_) => DEFAULT_TERMINATING_MESSAGE.to_owned(),
        };
        debug!(%message, "terminate accepted");
        self.store.mark_terminating(workspace.uid(), message)
    }

    async fn check_running_limit(&self) -> Result<(), LifecycleError> {
        if let Some(limit) = self.running_limit {
            if self.store.running_limit_exceeded(limit).await? {
                return Err(LifecycleError::RunningLimitExceeded(limit));
            }
        }
        Ok(())
    }

    async fn set_started(&self, workspace: &Workspace, started: bool) -> Result<Workspace, LifecycleError> {
        let patch = serde_json::to_value(vec![PatchOperation::replace(
            "/spec/started",
            Value::Bool(started),
        )])?;
        let label = if started { "start workspace" } else { "stop workspace" };
        self.send_patch(workspace, &patch, label).await
    }

    async fn send_patch(
        &self,
        workspace: &Workspace,
        patch: &Value,
        label: &str,
    ) -> Result<Workspace, LifecycleError> {
        let meta = workspace.devworkspace().metadata.as_item();
        let updated = retryable_exec(&self.retry, label, || {
            self.client
                .patch::<DevWorkspaceSpec, _>(&meta, patch, PatchMergeType::Json)
        })
        .await?;
        debug!(label, version = %updated.metadata.resource_version, "patch accepted");
        self.store.apply(updated.clone())?;
        Ok(Workspace::new(updated))
    }
}

/// `{"spec": {"template": ..}}`, so generated paths are rooted at the object
fn template_document(template: &DevWorkspaceTemplateSpec) -> Result<Value, LifecycleError> {
    let mut spec = Map::new();
    spec.insert("template".to_owned(), serde_json::to_value(template)?);
    let mut document = Map::new();
    document.insert("spec".to_owned(), Value::Object(spec));
    Ok(Value::Object(document))
}
