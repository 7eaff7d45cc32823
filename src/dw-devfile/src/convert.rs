//!
//! # Devfile and DevWorkspace conversion
//!
//! A devfile becomes the `spec.template` of a DevWorkspace. Annotations travel through
//! the devfile attribute `dw.metadata.annotations`.
//!
use std::collections::BTreeMap;
use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;
use tracing::trace;

use dw_types::devfile::Component;
use dw_types::devfile::Devfile;
use dw_types::devfile::DevfileMetadata;
use dw_types::devfile::KubernetesRef;
use dw_types::devfile::DEFAULT_SCHEMA_VERSION;
use dw_types::devfile::DW_METADATA_ANNOTATIONS;
use dw_types::devworkspace::Contribution;
use dw_types::devworkspace::DevWorkspace;
use dw_types::devworkspace::DevWorkspaceSpec;
use dw_types::devworkspace::DevWorkspaceTemplateSpec;
use dw_types::ObjectMeta;
use dw_types::Spec;

use crate::ConversionError;
use crate::DEVFILE_SOURCE_ANNOTATION;
use crate::EDITOR_ANNOTATION;
use crate::LAST_UPDATED_ANNOTATION;

pub const DEFAULT_ROUTING_CLASS: &str = "che";
pub const DEFAULT_EDITOR: &str = "che-incubator/che-code/latest";

/// devfile metadata attribute selecting the editor
pub const EDITOR_ATTRIBUTE: &str = "che-editor";

/// name of the contribution carrying the editor template
pub const EDITOR_CONTRIBUTION: &str = "editor";

const CLUSTER_ANNOTATION_PREFIXES: [&str; 2] = ["controller.devfile.io/", "kubectl.kubernetes.io/"];
const CLUSTER_ANNOTATIONS: [&str; 3] = [
    LAST_UPDATED_ANNOTATION,
    DEVFILE_SOURCE_ANNOTATION,
    EDITOR_ANNOTATION,
];

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub editor_namespace: Option<String>,
    pub prefer_tech_preview: bool,
    pub routing_class: String,
    pub started: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            editor_namespace: None,
            prefer_tech_preview: false,
            routing_class: DEFAULT_ROUTING_CLASS.to_owned(),
            started: false,
        }
    }
}

/// build a stopped DevWorkspace from a devfile
pub fn devfile_to_devworkspace(
    devfile: &Devfile,
    target_editor_namespace: Option<&str>,
    prefer_tech_preview: bool,
) -> Result<DevWorkspace, ConversionError> {
    let options = ConvertOptions {
        editor_namespace: target_editor_namespace.map(|ns| ns.to_owned()),
        prefer_tech_preview,
        ..Default::default()
    };
    devfile_to_devworkspace_with(devfile, &options)
}

pub fn devfile_to_devworkspace_with(
    devfile: &Devfile,
    options: &ConvertOptions,
) -> Result<DevWorkspace, ConversionError> {
    let metadata = devfile
        .metadata
        .as_ref()
        .ok_or(ConversionError::MissingMetadata)?;
    if metadata.name.trim().is_empty() {
        return Err(ConversionError::MissingName);
    }

    let components = normalize_components(&devfile.components);
    validate_components(&components)?;

    let editor = editor_id(metadata, options.prefer_tech_preview);
    debug!(name = %metadata.name, %editor, "converting devfile");

    let mut annotations = metadata.dw_annotations();
    annotations.insert(EDITOR_ANNOTATION.to_owned(), editor.clone());

    let contributions = match &options.editor_namespace {
        Some(namespace) => vec![editor_contribution(&editor, namespace)],
        None => vec![],
    };

    let spec = DevWorkspaceSpec {
        started: options.started,
        routing_class: Some(options.routing_class.clone()),
        template: DevWorkspaceTemplateSpec {
            parent: devfile.parent.clone(),
            components,
            projects: devfile.projects.clone(),
            commands: devfile.commands.clone(),
            events: devfile.events.clone(),
            attributes: devfile.attributes.clone(),
        },
        contributions,
    };

    let mut devworkspace = DevWorkspace::new(metadata.name.clone(), spec);
    devworkspace.metadata = ObjectMeta {
        name: metadata.name.clone(),
        namespace: metadata.namespace.clone().unwrap_or_default(),
        annotations,
        ..Default::default()
    };
    trace!("devworkspace: {:#?}", devworkspace);
    Ok(devworkspace)
}

/// project a DevWorkspace back into a devfile, cluster only annotations are dropped
pub fn devworkspace_to_devfile(devworkspace: &DevWorkspace) -> Result<Devfile, ConversionError> {
    if devworkspace.metadata.name.trim().is_empty() {
        return Err(ConversionError::MissingName);
    }
    debug!(name = %devworkspace.metadata.name, "converting {}", DevWorkspaceSpec::label());

    let mut metadata = DevfileMetadata::named(devworkspace.metadata.name.clone());
    if !devworkspace.metadata.namespace.is_empty() {
        metadata.namespace = Some(devworkspace.metadata.namespace.clone());
    }

    let annotations: serde_json::Map<String, Value> = devworkspace
        .metadata
        .annotations
        .iter()
        .filter(|(key, _)| !is_cluster_annotation(key))
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    if !annotations.is_empty() {
        metadata
            .attributes
            .insert(DW_METADATA_ANNOTATIONS.to_owned(), Value::Object(annotations));
    }

    let template = &devworkspace.spec.template;
    Ok(Devfile {
        schema_version: DEFAULT_SCHEMA_VERSION.to_owned(),
        metadata: Some(metadata),
        parent: template.parent.clone(),
        components: template.components.clone(),
        projects: template.projects.clone(),
        commands: template.commands.clone(),
        events: template.events.clone(),
        attributes: template.attributes.clone(),
    })
}

/// a component that lost everything but its name is a volume
pub fn normalize_components(components: &[Component]) -> Vec<Component> {
    components
        .iter()
        .map(|component| {
            if component.is_name_only() {
                trace!(name = %component.name, "name only component, treating as volume");
                Component::volume(component.name.clone())
            } else {
                component.clone()
            }
        })
        .collect()
}

fn validate_components(components: &[Component]) -> Result<(), ConversionError> {
    let mut names = HashSet::new();
    for component in components {
        if component.name.is_empty() {
            return Err(ConversionError::MissingName);
        }
        if !names.insert(component.name.as_str()) {
            return Err(ConversionError::DuplicateComponent(component.name.clone()));
        }
        if component.capabilities().len() > 1 {
            return Err(ConversionError::AmbiguousComponent(component.name.clone()));
        }
    }
    Ok(())
}

/// editor id from the devfile attribute or the default, `/latest` maps to `/next` for tech preview
pub fn editor_id(metadata: &DevfileMetadata, prefer_tech_preview: bool) -> String {
    let editor = metadata
        .attributes
        .get(EDITOR_ATTRIBUTE)
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_EDITOR);

    match editor.strip_suffix("/latest") {
        Some(base) if prefer_tech_preview => format!("{base}/next"),
        _ => editor.to_owned(),
    }
}

fn editor_contribution(editor: &str, namespace: &str) -> Contribution {
    // `publisher/name/version`
    let template = editor.split('/').nth(1).unwrap_or(editor);
    Contribution {
        name: EDITOR_CONTRIBUTION.to_owned(),
        kubernetes: Some(KubernetesRef {
            name: template.to_owned(),
            namespace: Some(namespace.to_owned()),
        }),
        uri: None,
        other: BTreeMap::new(),
    }
}

fn is_cluster_annotation(key: &str) -> bool {
    CLUSTER_ANNOTATIONS.contains(&key)
        || CLUSTER_ANNOTATION_PREFIXES
            .iter()
            .any(|prefix| key.starts_with(prefix))
}

#[cfg(test)]
mod test {

    use serde_json::json;

    use dw_types::devfile::Component;
    use dw_types::devfile::Devfile;
    use dw_types::devfile::DevfileMetadata;
    use dw_types::devfile::VolumeComponent;
    use dw_types::devfile::DW_METADATA_ANNOTATIONS;

    use super::*;

    fn devfile(name: &str) -> Devfile {
        Devfile {
            schema_version: "2.2.0".to_owned(),
            metadata: Some(DevfileMetadata::named(name)),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_metadata() {
        let devfile = Devfile::default();
        assert!(matches!(
            devfile_to_devworkspace(&devfile, None, false),
            Err(ConversionError::MissingMetadata)
        ));
        assert!(matches!(
            devfile_to_devworkspace(&self::devfile(" "), None, false),
            Err(ConversionError::MissingName)
        ));
    }

    #[test]
    fn test_component_validation() {
        let mut duplicate = devfile("wksp");
        duplicate.components = vec![Component::volume("m2"), Component::volume("m2")];
        match devfile_to_devworkspace(&duplicate, None, false) {
            Err(ConversionError::DuplicateComponent(name)) => assert_eq!(name, "m2"),
            other => panic!("unexpected: {:?}", other),
        }

        let mut ambiguous = devfile("wksp");
        let mut component = Component::volume("tools");
        component.plugin = Some(Default::default());
        ambiguous.components = vec![component];
        match devfile_to_devworkspace(&ambiguous, None, false) {
            Err(ConversionError::AmbiguousComponent(name)) => assert_eq!(name, "tools"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_volume_fix_up() {
        let mut source = devfile("wksp");
        source.components = vec![Component::named("m2")];
        let dw = devfile_to_devworkspace(&source, None, false).expect("convert");
        let m2 = &dw.spec.template.components[0];
        assert_eq!(m2.volume, Some(VolumeComponent::default()));
        assert_eq!(
            serde_json::to_value(m2).expect("json"),
            json!({ "name": "m2", "volume": {} })
        );
    }

    #[test]
    fn test_defaults() {
        let mut source = devfile("wksp");
        source.metadata.as_mut().expect("metadata").namespace = Some("user-che".to_owned());
        let dw = devfile_to_devworkspace(&source, None, false).expect("convert");
        assert!(!dw.spec.started);
        assert_eq!(dw.spec.routing_class.as_deref(), Some("che"));
        assert_eq!(dw.metadata.namespace, "user-che");
        assert_eq!(dw.api_version, "workspace.devfile.io/v1alpha2");
        assert_eq!(dw.kind, "DevWorkspace");
        assert_eq!(dw.metadata.annotation(EDITOR_ANNOTATION), Some(DEFAULT_EDITOR));
        assert!(dw.spec.contributions.is_empty());
    }

    #[test]
    fn test_editor_selection() {
        let mut metadata = DevfileMetadata::named("wksp");
        assert_eq!(editor_id(&metadata, true), "che-incubator/che-code/next");

        metadata.attributes.insert(
            EDITOR_ATTRIBUTE.to_owned(),
            json!("che-incubator/che-idea/latest"),
        );
        assert_eq!(editor_id(&metadata, false), "che-incubator/che-idea/latest");

        let source = Devfile {
            metadata: Some(metadata),
            ..Default::default()
        };
        let dw = devfile_to_devworkspace(&source, Some("eclipse-che"), true).expect("convert");
        let contribution = &dw.spec.contributions[0];
        assert_eq!(contribution.name, EDITOR_CONTRIBUTION);
        let template = contribution.kubernetes.as_ref().expect("reference");
        assert_eq!(template.name, "che-idea");
        assert_eq!(template.namespace.as_deref(), Some("eclipse-che"));
        assert_eq!(
            dw.metadata.annotation(EDITOR_ANNOTATION),
            Some("che-incubator/che-idea/next")
        );
    }

    #[test]
    fn test_cluster_annotations_dropped() {
        let mut source = devfile("wksp");
        let metadata = source.metadata.as_mut().expect("metadata");
        metadata.set_dw_annotation("team", "tools".to_owned());
        metadata.set_dw_annotation(DEVFILE_SOURCE_ANNOTATION, "url:\n  location: x\n".to_owned());

        let mut dw = devfile_to_devworkspace(&source, None, false).expect("convert");
        assert_eq!(dw.metadata.annotation("team"), Some("tools"));
        dw.metadata.annotations.insert(
            "controller.devfile.io/started-at".to_owned(),
            "1700000000".to_owned(),
        );
        dw.metadata
            .annotations
            .insert(LAST_UPDATED_ANNOTATION.to_owned(), "2023-01-01".to_owned());

        let back = devworkspace_to_devfile(&dw).expect("devfile");
        assert_eq!(back.schema_version, DEFAULT_SCHEMA_VERSION);
        let metadata = back.metadata.expect("metadata");
        assert_eq!(
            metadata.attributes.get(DW_METADATA_ANNOTATIONS),
            Some(&json!({ "team": "tools" }))
        );
    }

    #[test]
    fn test_reverse_requires_name() {
        let dw = DevWorkspace::default();
        assert!(matches!(
            devworkspace_to_devfile(&dw),
            Err(ConversionError::MissingName)
        ));
    }
}
