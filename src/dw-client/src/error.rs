use std::io::Error as IoError;

use thiserror::Error;

use dw_config::ConfigError;
use dw_diff::DiffError;
use dw_diff::PatchError;
use dw_types::MetaStatus;

use crate::http::header::InvalidHeaderValue;
use crate::http::status::StatusCode;
use crate::http::uri::InvalidUri;
use crate::http::Error as HttpError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] IoError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("diff error: {0}")]
    Diff(#[from] DiffError),
    #[error("patch error: {0}")]
    Patch(#[from] PatchError),
    #[error("http error: {0}")]
    Http(#[from] HttpError),
    #[error("invalid uri: {0}")]
    InvalidUri(#[from] InvalidUri),
    #[error("invalid header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
    #[error("transport error: {0}")]
    Isahc(#[from] isahc::Error),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("api server: {0}")]
    Status(MetaStatus),
    #[error("client error: {0}")]
    Client(StatusCode),
    #[error("{0}")]
    Other(String),
}

impl From<MetaStatus> for ClientError {
    fn from(status: MetaStatus) -> Self {
        Self::Status(status)
    }
}

impl From<StatusCode> for ClientError {
    fn from(code: StatusCode) -> Self {
        Self::Client(code)
    }
}

impl ClientError {
    /// api server status for an unknown object
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Status(MetaStatus::failure(404, "NotFound", message))
    }

    pub fn cluster_error(&self) -> ClusterError {
        match self {
            Self::Status(status) => match status.code {
                Some(code) => classify(
                    code,
                    status.reason.as_deref(),
                    status.message.as_deref().unwrap_or_default(),
                ),
                None => ClusterError::Unknown(status.to_string()),
            },
            Self::Client(code) => classify(code.as_u16(), None, code.canonical_reason().unwrap_or("")),
            other => ClusterError::Unknown(other.to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.cluster_error() == ClusterError::NotFound
    }

    /// message carried by the api server, if any
    pub fn status_message(&self) -> Option<&str> {
        match self {
            Self::Status(status) => status.message.as_deref(),
            _ => None,
        }
    }
}

/// failure category used for retry and authorization decisions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    NotFound,
    Unauthorized,
    Forbidden,
    /// 409 for a create whose name is taken
    AlreadyExists(String),
    Transient(u16, String),
    Unknown(String),
}

impl ClusterError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden)
    }

    /// repeating the same request cannot succeed
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::NotFound | Self::AlreadyExists(_))
    }
}

/// classify an api server response code and its `reason`
pub fn classify(code: u16, reason: Option<&str>, message: &str) -> ClusterError {
    match code {
        404 => ClusterError::NotFound,
        401 => ClusterError::Unauthorized,
        403 => ClusterError::Forbidden,
        409 if reason == Some("AlreadyExists") => ClusterError::AlreadyExists(message.to_owned()),
        408 | 409 | 429 | 500..=599 => ClusterError::Transient(code, message.to_owned()),
        _ => ClusterError::Unknown(format!("{}: {}", code, message)),
    }
}
