use thiserror::Error;

use dw_client::ClientError;
use dw_devfile::ConversionError;

use crate::WorkspaceStatus;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("cannot {action} workspace in status {status}")]
    InvalidTransition {
        action: &'static str,
        status: WorkspaceStatus,
    },
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("running workspace limit of {0} reached")]
    RunningLimitExceeded(usize),
    #[error("cluster error: {0}")]
    Client(ClientError),
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("workspace {0} went away before the operation finished")]
    Abandoned(String),
    #[error("workspace store is closed")]
    StoreClosed,
}

/// 401 and 403 become `Unauthorized`
impl From<ClientError> for LifecycleError {
    fn from(err: ClientError) -> Self {
        if err.cluster_error().is_auth() {
            Self::Unauthorized(err.to_string())
        } else {
            Self::Client(err)
        }
    }
}
