use serde_yaml::Error as SerdeYamlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("devfile has no metadata")]
    MissingMetadata,
    #[error("name is missing or empty")]
    MissingName,
    #[error("duplicate component name: {0}")]
    DuplicateComponent(String),
    #[error("component {0} declares more than one of container, volume, plugin, kubernetes, openshift, image")]
    AmbiguousComponent(String),
    #[error("invalid devfile source: {0}")]
    InvalidSource(String),
    #[error("Yaml error: {0}")]
    Yaml(#[from] SerdeYamlError),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
}
