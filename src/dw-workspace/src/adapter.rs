//!
//! # Workspace
//!
//! Read only view over a DevWorkspace
//!
use tracing::debug;

use dw_devfile::DevfileSource;
use dw_devfile::DEVFILE_SOURCE_ANNOTATION;
use dw_devfile::LAST_UPDATED_ANNOTATION;
use dw_types::devworkspace::DevWorkspace;
use dw_types::devworkspace::STORAGE_TYPE_ATTRIBUTE;

use crate::WorkspaceStatus;

#[derive(Debug, Clone)]
pub struct Workspace {
    devworkspace: DevWorkspace,
}

impl From<DevWorkspace> for Workspace {
    fn from(devworkspace: DevWorkspace) -> Self {
        Self::new(devworkspace)
    }
}

impl From<&DevWorkspace> for Workspace {
    fn from(devworkspace: &DevWorkspace) -> Self {
        Self::new(devworkspace.clone())
    }
}

impl Workspace {
    pub fn new(devworkspace: DevWorkspace) -> Self {
        Self { devworkspace }
    }

    pub fn devworkspace(&self) -> &DevWorkspace {
        &self.devworkspace
    }

    /// `status.devworkspaceId`, else derived from the first three uid segments
    pub fn id(&self) -> String {
        match self.devworkspace.status.devworkspace_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => {
                let segments: String = self.uid().split('-').take(3).collect();
                format!("workspace{segments}")
            }
        }
    }

    pub fn uid(&self) -> &str {
        &self.devworkspace.metadata.uid
    }

    pub fn name(&self) -> &str {
        &self.devworkspace.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.devworkspace.metadata.namespace
    }

    pub fn resource_version(&self) -> &str {
        &self.devworkspace.metadata.resource_version
    }

    pub fn status(&self) -> WorkspaceStatus {
        match self.devworkspace.status.phase.as_deref() {
            Some(phase) => WorkspaceStatus::from_phase(phase),
            None if self.devworkspace.spec.started => WorkspaceStatus::Starting,
            None => WorkspaceStatus::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == WorkspaceStatus::Running
    }

    pub fn is_starting(&self) -> bool {
        self.status() == WorkspaceStatus::Starting
    }

    pub fn is_stopping(&self) -> bool {
        self.status() == WorkspaceStatus::Stopping
    }

    pub fn is_stopped(&self) -> bool {
        self.status() == WorkspaceStatus::Stopped
    }

    pub fn is_terminating(&self) -> bool {
        self.status() == WorkspaceStatus::Terminating
    }

    pub fn has_error(&self) -> bool {
        matches!(
            self.status(),
            WorkspaceStatus::Failed | WorkspaceStatus::Failing
        )
    }

    /// controller message, set while failing or terminating
    pub fn message(&self) -> Option<&str> {
        self.devworkspace.status.message.as_deref()
    }

    pub fn storage_type(&self) -> Option<&str> {
        self.devworkspace
            .spec
            .template
            .string_attribute(STORAGE_TYPE_ATTRIBUTE)
    }

    /// recorded devfile source, falls back to the first project's origin
    pub fn source(&self) -> Option<String> {
        if let Some(recorded) = self.devworkspace.metadata.annotation(DEVFILE_SOURCE_ANNOTATION) {
            match DevfileSource::parse(recorded) {
                Ok(source) => return Some(source.url().to_owned()),
                Err(err) => debug!(name = self.name(), %err, "unreadable devfile source"),
            }
        }
        self.devworkspace
            .spec
            .template
            .projects
            .first()
            .and_then(|project| project.origin())
            .map(|url| url.to_owned())
    }

    pub fn ide_url(&self) -> Option<&str> {
        self.devworkspace.status.main_url.as_deref()
    }

    pub fn projects(&self) -> Vec<&str> {
        self.devworkspace
            .spec
            .template
            .projects
            .iter()
            .map(|project| project.name.as_str())
            .collect()
    }

    pub fn created(&self) -> &str {
        &self.devworkspace.metadata.creation_timestamp
    }

    pub fn updated(&self) -> &str {
        self.devworkspace
            .metadata
            .annotation(LAST_UPDATED_ANNOTATION)
            .unwrap_or_else(|| self.created())
    }
}
