use std::fmt;

/// workspace phase as reported by the controller. Phases are case sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkspaceStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failing,
    Failed,
    Terminating,
    Other(String),
}

impl WorkspaceStatus {
    pub fn from_phase(phase: &str) -> Self {
        match phase {
            "Stopped" => Self::Stopped,
            "Starting" => Self::Starting,
            "Running" => Self::Running,
            "Stopping" => Self::Stopping,
            "Failing" => Self::Failing,
            "Failed" => Self::Failed,
            "Terminating" => Self::Terminating,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Failing => "Failing",
            Self::Failed => "Failed",
            Self::Terminating => "Terminating",
            Self::Other(phase) => phase,
        }
    }

    /// start is accepted from these
    pub fn is_startable(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    /// restart has to stop first from these
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Starting | Self::Failing)
    }
}

impl fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod test {

    use super::WorkspaceStatus;

    #[test]
    fn test_phase_is_case_sensitive() {
        assert_eq!(WorkspaceStatus::from_phase("Running"), WorkspaceStatus::Running);
        assert_eq!(
            WorkspaceStatus::from_phase("RUNNING"),
            WorkspaceStatus::Other("RUNNING".to_owned())
        );
        assert_eq!(WorkspaceStatus::Other("Paused".to_owned()).to_string(), "Paused");
        assert!(WorkspaceStatus::Failed.is_startable());
        assert!(!WorkspaceStatus::Stopping.is_active());
    }
}
