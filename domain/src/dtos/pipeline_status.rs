use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStatus {
    #[serde(alias = "created")]
    Created,
    #[serde(alias = "running")]
    Running,
    #[serde(alias = "pausing")]
    Pausing,
    #[serde(alias = "paused")]
    Paused,
    #[serde(alias = "resuming")]
    Resuming,
    #[serde(alias = "stopping")]
    Stopping,
    #[serde(alias = "stopped")]
    Stopped,
    #[serde(alias = "terminating")]
    Terminating,
    #[serde(alias = "terminated")]
    Terminated,
    #[serde(alias = "failed")]
    Failed,
}

impl PipelineStatus {
    pub const ALL: [PipelineStatus; 10] = [
        PipelineStatus::Created,
        PipelineStatus::Running,
        PipelineStatus::Pausing,
        PipelineStatus::Paused,
        PipelineStatus::Resuming,
        PipelineStatus::Stopping,
        PipelineStatus::Stopped,
        PipelineStatus::Terminating,
        PipelineStatus::Terminated,
        PipelineStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Created => "Created",
            PipelineStatus::Running => "Running",
            PipelineStatus::Pausing => "Pausing",
            PipelineStatus::Paused => "Paused",
            PipelineStatus::Resuming => "Resuming",
            PipelineStatus::Stopping => "Stopping",
            PipelineStatus::Stopped => "Stopped",
            PipelineStatus::Terminating => "Terminating",
            PipelineStatus::Terminated => "Terminated",
            PipelineStatus::Failed => "Failed",
        }
    }

    /// Deployed and holding resources, including the in-between states.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PipelineStatus::Created
                | PipelineStatus::Running
                | PipelineStatus::Pausing
                | PipelineStatus::Paused
                | PipelineStatus::Resuming
                | PipelineStatus::Stopping
        )
    }

    pub fn is_failed(self) -> bool {
        matches!(self, PipelineStatus::Failed)
    }

    pub fn is_terminated(self) -> bool {
        matches!(self, PipelineStatus::Stopped | PipelineStatus::Terminated)
    }

    /// Waiting on the backend to finish an action.
    pub fn is_transitional(self) -> bool {
        matches!(
            self,
            PipelineStatus::Pausing
                | PipelineStatus::Resuming
                | PipelineStatus::Stopping
                | PipelineStatus::Terminating
        )
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pipeline status: {0}")]
pub struct UnknownPipelineStatus(pub String);

impl FromStr for PipelineStatus {
    type Err = UnknownPipelineStatus;

    fn from_str(input: &str) -> Result<PipelineStatus, Self::Err> {
        PipelineStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(input.trim()))
            .ok_or_else(|| UnknownPipelineStatus(input.to_string()))
    }
}

pub fn is_pipeline_active(status: PipelineStatus) -> bool {
    status.is_active()
}

pub fn is_pipeline_failed(status: PipelineStatus) -> bool {
    status.is_failed()
}

pub fn is_pipeline_terminated(status: PipelineStatus) -> bool {
    status.is_terminated()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_is_failed_and_not_active() {
        assert!(is_pipeline_failed(PipelineStatus::Failed));
        assert!(!is_pipeline_active(PipelineStatus::Failed));
    }

    #[test]
    fn running_and_paused_are_active() {
        assert!(is_pipeline_active(PipelineStatus::Running));
        assert!(is_pipeline_active(PipelineStatus::Paused));
        assert!(!is_pipeline_failed(PipelineStatus::Running));
    }

    #[test]
    fn stopped_and_terminated_are_terminated() {
        assert!(is_pipeline_terminated(PipelineStatus::Terminated));
        assert!(is_pipeline_terminated(PipelineStatus::Stopped));
        assert!(!is_pipeline_terminated(PipelineStatus::Terminating));
        assert!(!is_pipeline_active(PipelineStatus::Stopped));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("running".parse(), Ok(PipelineStatus::Running));
        assert_eq!(" Paused ".parse(), Ok(PipelineStatus::Paused));
        assert_eq!("TERMINATED".parse(), Ok(PipelineStatus::Terminated));
        assert!("active".parse::<PipelineStatus>().is_err());
    }

    #[test]
    fn accepts_lowercase_on_the_wire() {
        let status: PipelineStatus = serde_json::from_str("\"stopping\"").unwrap();
        assert_eq!(status, PipelineStatus::Stopping);
        assert_eq!(
            serde_json::to_string(&PipelineStatus::Stopping).unwrap(),
            "\"Stopping\""
        );
    }
}
