use serde_yaml::Error as SerdeYamlError;
use std::io::Error as IoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] IoError),
    #[error("Yaml error: {0}")]
    Yaml(#[from] SerdeYamlError),
    #[error("No active Kubernetes context")]
    NoCurrentContext,
    #[error("Invalid value for {key}: {value}")]
    Env { key: String, value: String },
    #[error("Unknown error: {0}")]
    Other(String),
}
