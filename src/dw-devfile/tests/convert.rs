use serde_json::json;

use dw_devfile::devfile_to_devworkspace;
use dw_devfile::devworkspace_to_devfile;
use dw_devfile::factory::DevfileOrigin;
use dw_devfile::factory::FactoryResolution;
use dw_devfile::factory::ScmInfo;
use dw_devfile::normalize_components;
use dw_devfile::prepare_devfile;
use dw_devfile::ConversionError;
use dw_devfile::DevfileSource;
use dw_devfile::DEVFILE_SOURCE_ANNOTATION;
use dw_types::devfile::Devfile;
use dw_types::devfile::DW_METADATA_ANNOTATIONS;
use dw_types::devworkspace::DevWorkspace;

const DEVFILE: &str = include_str!("fixtures/devfile-nodejs.yaml");
const DEVWORKSPACE: &str = include_str!("fixtures/devworkspace-nodejs.yaml");
const FACTORY_DEVFILE: &str = include_str!("fixtures/devfile-factory.yaml");

#[test]
fn test_devfile_to_devworkspace_fixture() -> Result<(), ConversionError> {
    let devfile: Devfile = serde_yaml::from_str(DEVFILE)?;
    let expected: DevWorkspace = serde_yaml::from_str(DEVWORKSPACE)?;

    let dw = devfile_to_devworkspace(&devfile, Some("eclipse-che"), false)?;
    assert_eq!(dw.api_version, expected.api_version);
    assert_eq!(dw.kind, expected.kind);
    assert_eq!(dw.metadata.name, expected.metadata.name);
    assert_eq!(dw.metadata.namespace, expected.metadata.namespace);
    assert_eq!(dw.metadata.annotations, expected.metadata.annotations);
    assert_eq!(dw.spec, expected.spec);
    Ok(())
}

#[test]
fn test_round_trip() -> Result<(), ConversionError> {
    let devfile: Devfile = serde_yaml::from_str(DEVFILE)?;

    let dw = devfile_to_devworkspace(&devfile, None, false)?;
    let back = devworkspace_to_devfile(&dw)?;

    assert_eq!(back.components, normalize_components(&devfile.components));
    assert_eq!(back.projects, devfile.projects);
    assert_eq!(back.commands, devfile.commands);
    assert_eq!(back.events, devfile.events);
    assert_eq!(back.attributes, devfile.attributes);

    let metadata = back.metadata.expect("metadata");
    assert_eq!(metadata.name, "nodejs-web-app");
    assert_eq!(metadata.namespace.as_deref(), Some("user-che"));
    assert_eq!(
        metadata.attributes.get(DW_METADATA_ANNOTATIONS),
        Some(&json!({ "team": "web" }))
    );
    Ok(())
}

#[test]
fn test_prepare_factory_devfile() -> Result<(), ConversionError> {
    let resolution = FactoryResolution {
        devfile: serde_yaml::from_str(FACTORY_DEVFILE)?,
        origin: DevfileOrigin {
            source: Some("devfile.yaml".to_owned()),
            scm_info: Some(ScmInfo {
                clone_url: "https://github.com/che-samples/python-hello-world.git".to_owned(),
                branch: Some("devfilev2".to_owned()),
            }),
            location: Some("https://github.com/che-samples/python-hello-world/tree/devfilev2".to_owned()),
        },
    };

    let devfile = prepare_devfile(resolution)?;
    assert!(devfile.component("venv").expect("venv").volume.is_some());
    assert_eq!(devfile.projects.len(), 1);
    assert_eq!(devfile.projects[0].name, "python-hello-world");

    let dw = devfile_to_devworkspace(&devfile, None, false)?;
    let recorded = dw
        .metadata
        .annotation(DEVFILE_SOURCE_ANNOTATION)
        .expect("devfile source");
    match DevfileSource::parse(recorded)? {
        DevfileSource::Scm {
            repo,
            revision,
            file_name,
        } => {
            assert_eq!(repo, "https://github.com/che-samples/python-hello-world.git");
            assert_eq!(revision.as_deref(), Some("devfilev2"));
            assert_eq!(file_name, "devfile.yaml");
        }
        other => panic!("unexpected source: {:?}", other),
    }

    // provenance does not come back with the devfile
    let back = devworkspace_to_devfile(&dw)?;
    assert_eq!(back.components, devfile.components);
    assert_eq!(back.projects, devfile.projects);
    assert!(back.metadata.expect("metadata").attributes.is_empty());
    Ok(())
}
