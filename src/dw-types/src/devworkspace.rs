//!
//! # DevWorkspace
//!
//! `workspace.devfile.io/v1alpha2` DevWorkspace and DevWorkspaceTemplate resources
//!
use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::devfile::Attributes;
use crate::devfile::Component;
use crate::devfile::KubernetesRef;
use crate::devfile::Parent;
use crate::devfile::Project;
use crate::{Crd, CrdNames, DefaultHeader, K8Obj, Spec, Status, DEVFILE_GROUP, V1ALPHA2};

pub const DEVWORKSPACE_API: Crd = Crd {
    group: DEVFILE_GROUP,
    version: V1ALPHA2,
    names: CrdNames {
        kind: "DevWorkspace",
        plural: "devworkspaces",
        singular: "devworkspace",
    },
};

pub const DEVWORKSPACE_TEMPLATE_API: Crd = Crd {
    group: DEVFILE_GROUP,
    version: V1ALPHA2,
    names: CrdNames {
        kind: "DevWorkspaceTemplate",
        plural: "devworkspacetemplates",
        singular: "devworkspacetemplate",
    },
};

/// template attribute selecting how workspace storage is provisioned
pub const STORAGE_TYPE_ATTRIBUTE: &str = "controller.devfile.io/storage-type";

pub type DevWorkspace = K8Obj<DevWorkspaceSpec>;
pub type DevWorkspaceTemplate = K8Obj<DevWorkspaceTemplateSpec>;

impl Spec for DevWorkspaceSpec {
    type Status = DevWorkspaceStatus;
    type Header = DefaultHeader;

    fn metadata() -> &'static Crd {
        &DEVWORKSPACE_API
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DevWorkspaceSpec {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_class: Option<String>,
    pub template: DevWorkspaceTemplateSpec,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contributions: Vec<Contribution>,
}

/// devfile shaped body embedded as `spec.template`; also the spec of a DevWorkspaceTemplate
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DevWorkspaceTemplateSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<Project>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl DevWorkspaceTemplateSpec {
    pub fn string_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|value| value.as_str())
    }
}

impl Spec for DevWorkspaceTemplateSpec {
    type Status = DevWorkspaceTemplateStatus;
    type Header = DefaultHeader;

    fn metadata() -> &'static Crd {
        &DEVWORKSPACE_TEMPLATE_API
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct DevWorkspaceTemplateStatus {}

impl Status for DevWorkspaceTemplateStatus {}

/// additional template merged into the workspace, e.g. the editor
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DevWorkspaceStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// url of the IDE once the workspace is running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devworkspace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Value>,
}

impl Status for DevWorkspaceStatus {}
