//!
//! # Factory
//!
//! Prepares a resolved devfile before it is converted: volume fix-up, default project
//! and the `che.eclipse.org/devfile-source` provenance record.
//!
use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use dw_types::devfile::CheckoutFrom;
use dw_types::devfile::Devfile;
use dw_types::devfile::GitSource;
use dw_types::devfile::Project;

use crate::convert::normalize_components;
use crate::ConversionError;
use crate::DEVFILE_SOURCE_ANNOTATION;

pub const DEFAULT_DEVFILE_NAME: &str = "devfile.yaml";

/// source control details of a resolved repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScmInfo {
    pub clone_url: String,
    pub branch: Option<String>,
}

/// where a devfile was resolved from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevfileOrigin {
    /// file name of the devfile inside the repository
    pub source: Option<String>,
    pub scm_info: Option<ScmInfo>,
    /// location the user asked for
    pub location: Option<String>,
}

/// output of a factory resolver
#[derive(Debug, Clone, Default)]
pub struct FactoryResolution {
    pub devfile: Devfile,
    pub origin: DevfileOrigin,
}

/// provenance record, exactly one form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevfileSource {
    Scm {
        repo: String,
        revision: Option<String>,
        file_name: String,
    },
    Url {
        location: String,
    },
}

// yaml layout of the annotation
#[derive(Serialize, Deserialize, Debug, Default)]
struct SourceRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    scm: Option<ScmRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<UrlRecord>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ScmRecord {
    repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<String>,
    file_name: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct UrlRecord {
    location: String,
}

impl DevfileSource {
    /// scm info wins over a bare location
    pub fn from_origin(origin: &DevfileOrigin) -> Option<Self> {
        if let Some(scm) = &origin.scm_info {
            Some(Self::Scm {
                repo: scm.clone_url.clone(),
                revision: scm.branch.clone(),
                file_name: origin
                    .source
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DEVFILE_NAME.to_owned()),
            })
        } else {
            origin.location.as_ref().map(|location| Self::Url {
                location: location.clone(),
            })
        }
    }

    pub fn parse(yaml: &str) -> Result<Self, ConversionError> {
        let record: SourceRecord = serde_yaml::from_str(yaml)?;
        match (record.scm, record.url) {
            (Some(scm), None) => Ok(Self::Scm {
                repo: scm.repo,
                revision: scm.revision,
                file_name: scm.file_name,
            }),
            (None, Some(url)) => Ok(Self::Url {
                location: url.location,
            }),
            (Some(_), Some(_)) => Err(ConversionError::InvalidSource(
                "both scm and url present".to_owned(),
            )),
            (None, None) => Err(ConversionError::InvalidSource(
                "neither scm nor url present".to_owned(),
            )),
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConversionError> {
        let record = match self {
            Self::Scm {
                repo,
                revision,
                file_name,
            } => SourceRecord {
                scm: Some(ScmRecord {
                    repo: repo.clone(),
                    revision: revision.clone(),
                    file_name: file_name.clone(),
                }),
                url: None,
            },
            Self::Url { location } => SourceRecord {
                url: Some(UrlRecord {
                    location: location.clone(),
                }),
                scm: None,
            },
        };
        Ok(serde_yaml::to_string(&record)?)
    }

    /// repository or location the workspace was created from
    pub fn url(&self) -> &str {
        match self {
            Self::Scm { repo, .. } => repo,
            Self::Url { location } => location,
        }
    }
}

/// project name from a clone url: last path segment without `.git`
pub fn project_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    segment.strip_suffix(".git").unwrap_or(segment).to_owned()
}

/// inject a project for the resolved repository when the devfile has none
pub fn apply_default_project(devfile: &mut Devfile, scm_info: Option<&ScmInfo>) {
    let scm = match scm_info {
        Some(scm) if devfile.projects.is_empty() && !scm.clone_url.is_empty() => scm,
        _ => return,
    };

    let name = project_name_from_url(&scm.clone_url);
    debug!(%name, url = %scm.clone_url, "adding default project");

    let mut remotes = BTreeMap::new();
    remotes.insert("origin".to_owned(), scm.clone_url.clone());
    devfile.projects.push(Project {
        name,
        git: Some(GitSource {
            remotes,
            checkout_from: scm.branch.as_ref().map(|branch| CheckoutFrom {
                revision: Some(branch.clone()),
                remote: None,
            }),
        }),
        ..Default::default()
    });
}

/// store the provenance record under `dw.metadata.annotations`; nothing is recorded without an origin
pub fn record_devfile_source(
    devfile: &mut Devfile,
    origin: &DevfileOrigin,
) -> Result<Option<DevfileSource>, ConversionError> {
    let source = match DevfileSource::from_origin(origin) {
        Some(source) => source,
        None => return Ok(None),
    };
    let yaml = source.to_yaml()?;
    let metadata = devfile
        .metadata
        .as_mut()
        .ok_or(ConversionError::MissingMetadata)?;
    metadata.set_dw_annotation(DEVFILE_SOURCE_ANNOTATION, yaml);
    Ok(Some(source))
}

pub fn prepare_devfile(resolution: FactoryResolution) -> Result<Devfile, ConversionError> {
    let FactoryResolution {
        mut devfile,
        origin,
    } = resolution;
    devfile.components = normalize_components(&devfile.components);
    apply_default_project(&mut devfile, origin.scm_info.as_ref());
    record_devfile_source(&mut devfile, &origin)?;
    Ok(devfile)
}

#[cfg(test)]
mod test {

    use dw_types::devfile::Devfile;
    use dw_types::devfile::DevfileMetadata;
    use dw_types::devfile::Project;

    use super::*;

    const URL: &str = "https://github.com/che-samples/web-nodejs-sample.git";

    fn scm(branch: Option<&str>) -> ScmInfo {
        ScmInfo {
            clone_url: URL.to_owned(),
            branch: branch.map(|b| b.to_owned()),
        }
    }

    #[test]
    fn test_project_name() {
        assert_eq!(project_name_from_url(URL), "web-nodejs-sample");
        assert_eq!(
            project_name_from_url("https://gitlab.com/group/sub/repo/"),
            "repo"
        );
        assert_eq!(project_name_from_url("repo.git"), "repo");
    }

    #[test]
    fn test_default_project_with_branch() {
        let mut devfile = Devfile::default();
        apply_default_project(&mut devfile, Some(&scm(Some("main"))));
        assert_eq!(devfile.projects.len(), 1);

        let project = &devfile.projects[0];
        assert_eq!(project.name, "web-nodejs-sample");
        assert_eq!(project.origin(), Some(URL));
        let checkout = project
            .git
            .as_ref()
            .and_then(|git| git.checkout_from.as_ref())
            .expect("checkout");
        assert_eq!(checkout.revision.as_deref(), Some("main"));
    }

    #[test]
    fn test_default_project_without_branch() {
        let mut devfile = Devfile::default();
        apply_default_project(&mut devfile, Some(&scm(None)));

        let value = serde_json::to_value(&devfile.projects[0]).expect("json");
        assert_eq!(
            value,
            serde_json::json!({ "name": "web-nodejs-sample", "git": { "remotes": { "origin": URL } } })
        );
    }

    #[test]
    fn test_existing_projects_kept() {
        let mut devfile = Devfile {
            projects: vec![Project {
                name: "mine".to_owned(),
                ..Default::default()
            }],
            ..Default::default()
        };
        apply_default_project(&mut devfile, Some(&scm(Some("main"))));
        assert_eq!(devfile.projects.len(), 1);
        assert_eq!(devfile.projects[0].name, "mine");

        let mut empty = Devfile::default();
        apply_default_project(&mut empty, None);
        assert!(empty.projects.is_empty());
    }

    #[test]
    fn test_source_precedence() {
        let both = DevfileOrigin {
            source: None,
            scm_info: Some(scm(Some("main"))),
            location: Some("https://github.com/che-samples/web-nodejs-sample".to_owned()),
        };
        assert_eq!(
            DevfileSource::from_origin(&both),
            Some(DevfileSource::Scm {
                repo: URL.to_owned(),
                revision: Some("main".to_owned()),
                file_name: DEFAULT_DEVFILE_NAME.to_owned(),
            })
        );

        let location_only = DevfileOrigin {
            location: Some("https://example.com/devfile.yaml".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            DevfileSource::from_origin(&location_only),
            Some(DevfileSource::Url {
                location: "https://example.com/devfile.yaml".to_owned()
            })
        );

        assert_eq!(DevfileSource::from_origin(&DevfileOrigin::default()), None);
    }

    #[test]
    fn test_source_yaml() -> Result<(), ConversionError> {
        let source = DevfileSource::Scm {
            repo: URL.to_owned(),
            revision: None,
            file_name: ".devfile.yaml".to_owned(),
        };
        let yaml = source.to_yaml()?;
        assert_eq!(
            yaml,
            format!("scm:\n  repo: {URL}\n  fileName: .devfile.yaml\n")
        );
        assert_eq!(DevfileSource::parse(&yaml)?, source);

        let url = DevfileSource::parse("url:\n  location: https://example.com/devfile.yaml\n")?;
        assert_eq!(url.url(), "https://example.com/devfile.yaml");

        assert!(matches!(
            DevfileSource::parse("{}"),
            Err(ConversionError::InvalidSource(_))
        ));
        Ok(())
    }

    #[test]
    fn test_record_requires_metadata() {
        let origin = DevfileOrigin {
            location: Some("https://example.com/devfile.yaml".to_owned()),
            ..Default::default()
        };
        let mut devfile = Devfile::default();
        assert!(matches!(
            record_devfile_source(&mut devfile, &origin),
            Err(ConversionError::MissingMetadata)
        ));

        let mut devfile = Devfile {
            metadata: Some(DevfileMetadata::named("wksp")),
            ..Default::default()
        };
        let recorded = record_devfile_source(&mut devfile, &origin).expect("record");
        assert!(matches!(recorded, Some(DevfileSource::Url { .. })));
        let annotations = devfile.metadata.expect("metadata").dw_annotations();
        assert_eq!(
            annotations[DEVFILE_SOURCE_ANNOTATION],
            "url:\n  location: https://example.com/devfile.yaml\n"
        );
    }
}
