//!
//! # Devfile
//!
//! Devfile v2 document. Only the fields the toolkit reasons about are typed;
//! everything else is kept in the `other` maps so documents survive a round trip.
//!
use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_SCHEMA_VERSION: &str = "2.2.0";

/// devfile attribute holding annotations to copy onto the DevWorkspace
pub const DW_METADATA_ANNOTATIONS: &str = "dw.metadata.annotations";

pub type Attributes = BTreeMap<String, Value>;

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Devfile {
    #[serde(default)]
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DevfileMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<Project>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Devfile {
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|component| component.name == name)
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref().map(|metadata| metadata.name.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DevfileMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl DevfileMetadata {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// string map stored under `dw.metadata.annotations`, non string values are skipped
    pub fn dw_annotations(&self) -> BTreeMap<String, String> {
        match self.attributes.get(DW_METADATA_ANNOTATIONS) {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_owned())))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    pub fn set_dw_annotation(&mut self, key: &str, value: String) {
        let entry = self
            .attributes
            .entry(DW_METADATA_ANNOTATIONS.to_owned())
            .or_insert_with(|| Value::Object(Default::default()));
        if !entry.is_object() {
            *entry = Value::Object(Default::default());
        }
        if let Value::Object(map) = entry {
            map.insert(key.to_owned(), Value::String(value));
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesRef>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// reference to a resource on the cluster
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// named unit of a devfile. At most one capability block is expected to be set.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openshift: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl Component {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn volume<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            volume: Some(VolumeComponent::default()),
            ..Default::default()
        }
    }

    /// names of the capability blocks that are present
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut present = vec![];
        if self.container.is_some() {
            present.push("container");
        }
        if self.volume.is_some() {
            present.push("volume");
        }
        if self.plugin.is_some() {
            present.push("plugin");
        }
        if self.kubernetes.is_some() {
            present.push("kubernetes");
        }
        if self.openshift.is_some() {
            present.push("openshift");
        }
        if self.image.is_some() {
            present.push("image");
        }
        present
    }

    /// true when nothing but the name survived serialization
    pub fn is_name_only(&self) -> bool {
        self.attributes.is_empty() && self.other.is_empty() && self.capabilities().is_empty()
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerComponent {
    #[serde(default)]
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_sources: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_mapping: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Endpoint>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub name: String,
    pub target_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeComponent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PluginComponent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesRef>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<Value>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl Project {
    /// url of the `origin` remote, or of the only remote
    pub fn origin(&self) -> Option<&str> {
        let git = self.git.as_ref()?;
        git.remotes
            .get("origin")
            .or_else(|| git.remotes.values().next())
            .map(|remote| remote.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitSource {
    #[serde(default)]
    pub remotes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_from: Option<CheckoutFrom>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutFrom {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

#[cfg(test)]
mod test {

    use serde_json::json;

    use super::Component;
    use super::Devfile;
    use super::DevfileMetadata;
    use super::DW_METADATA_ANNOTATIONS;

    const DEVFILE: &str = r#"
schemaVersion: 2.2.0
metadata:
  name: nodejs-web-app
  displayName: Node.js
components:
  - name: tools
    container:
      image: quay.io/devfile/universal-developer-image:latest
      memoryLimit: 1Gi
      mountSources: true
      dedicatedPod: false
      endpoints:
        - name: http
          targetPort: 3000
          exposure: public
  - name: m2
projects:
  - name: web-nodejs-sample
    git:
      remotes:
        origin: https://github.com/che-samples/web-nodejs-sample.git
"#;

    #[test]
    fn test_decode_devfile() {
        let devfile: Devfile = serde_yaml::from_str(DEVFILE).expect("devfile");
        assert_eq!(devfile.schema_version, "2.2.0");
        assert_eq!(devfile.name(), Some("nodejs-web-app"));
        let metadata = devfile.metadata.as_ref().expect("metadata");
        assert_eq!(metadata.other.get("displayName"), Some(&json!("Node.js")));

        let tools = devfile.component("tools").expect("tools");
        let container = tools.container.as_ref().expect("container");
        assert_eq!(container.memory_limit.as_deref(), Some("1Gi"));
        assert_eq!(container.other.get("dedicatedPod"), Some(&json!(false)));
        assert_eq!(container.endpoints[0].target_port, 3000);
        assert_eq!(tools.capabilities(), vec!["container"]);

        assert!(devfile.component("m2").expect("m2").is_name_only());
        assert_eq!(
            devfile.projects[0].origin(),
            Some("https://github.com/che-samples/web-nodejs-sample.git")
        );
    }

    #[test]
    fn test_volume_serializes_as_empty_block() {
        let value = serde_json::to_value(Component::volume("m2")).expect("json");
        assert_eq!(value, json!({ "name": "m2", "volume": {} }));
    }

    #[test]
    fn test_dw_annotations() {
        let mut metadata = DevfileMetadata::named("wksp");
        assert!(metadata.dw_annotations().is_empty());

        metadata.set_dw_annotation("che.eclipse.org/che-editor", "che-code".to_owned());
        metadata
            .attributes
            .get_mut(DW_METADATA_ANNOTATIONS)
            .and_then(|value| value.as_object_mut())
            .expect("annotations")
            .insert("numeric".to_owned(), json!(1));

        let annotations = metadata.dw_annotations();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations["che.eclipse.org/che-editor"], "che-code");
    }
}
