use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dtos::{BackendErrorDetail, PipelineStatus};

pub const INVALID_STATUS_TRANSITION: &str = "invalid_status_transition";

/// Edges of the pipeline state machine.
pub fn valid_transitions(from: PipelineStatus) -> &'static [PipelineStatus] {
    use PipelineStatus::*;

    match from {
        Created => &[Running, Failed, Terminating],
        Running => &[Pausing, Stopping, Terminating, Failed],
        Pausing => &[Paused, Failed, Terminating],
        Paused => &[Resuming, Stopping, Terminating, Failed],
        Resuming => &[Running, Failed, Terminating],
        Stopping => &[Stopped, Failed, Terminating],
        Stopped => &[Resuming, Failed, Terminating],
        Terminating => &[Terminated, Failed],
        Terminated => &[],
        Failed => &[Resuming, Terminating],
    }
}

pub fn validate_transition(
    from: PipelineStatus,
    to: PipelineStatus,
) -> Result<(), StatusValidationError> {
    if valid_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StatusValidationError::new(from, to))
    }
}

pub fn can_pause(status: PipelineStatus) -> bool {
    status == PipelineStatus::Running
}

pub fn can_resume(status: PipelineStatus) -> bool {
    matches!(status, PipelineStatus::Paused | PipelineStatus::Stopped)
}

pub fn can_stop(status: PipelineStatus) -> bool {
    matches!(status, PipelineStatus::Running | PipelineStatus::Paused)
}

/// Configuration can only change while nothing is deployed.
pub fn can_edit(status: PipelineStatus) -> bool {
    status == PipelineStatus::Stopped
}

pub fn can_terminate(status: PipelineStatus) -> bool {
    !matches!(
        status,
        PipelineStatus::Terminating | PipelineStatus::Terminated
    )
}

pub fn can_delete(status: PipelineStatus) -> bool {
    matches!(
        status,
        PipelineStatus::Stopped | PipelineStatus::Terminated | PipelineStatus::Failed
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Pause,
    Resume,
    Stop,
    Terminate,
}

impl LifecycleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleAction::Pause => "pause",
            LifecycleAction::Resume => "resume",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Terminate => "terminate",
        }
    }

    pub fn is_allowed(self, status: PipelineStatus) -> bool {
        match self {
            LifecycleAction::Pause => can_pause(status),
            LifecycleAction::Resume => can_resume(status),
            LifecycleAction::Stop => can_stop(status),
            LifecycleAction::Terminate => can_terminate(status),
        }
    }

    /// The in-between status shown as soon as the action is issued.
    pub fn optimistic_status(self) -> PipelineStatus {
        match self {
            LifecycleAction::Pause => PipelineStatus::Pausing,
            LifecycleAction::Resume => PipelineStatus::Resuming,
            LifecycleAction::Stop => PipelineStatus::Stopping,
            LifecycleAction::Terminate => PipelineStatus::Terminating,
        }
    }

    pub fn final_status(self) -> PipelineStatus {
        match self {
            LifecycleAction::Pause => PipelineStatus::Paused,
            LifecycleAction::Resume => PipelineStatus::Running,
            LifecycleAction::Stop => PipelineStatus::Stopped,
            LifecycleAction::Terminate => PipelineStatus::Terminated,
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LifecycleAction {
    type Err = ();

    fn from_str(input: &str) -> Result<LifecycleAction, Self::Err> {
        match input {
            "pause" => Ok(LifecycleAction::Pause),
            "resume" => Ok(LifecycleAction::Resume),
            "stop" => Ok(LifecycleAction::Stop),
            "terminate" => Ok(LifecycleAction::Terminate),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StatusValidationError {
    pub current_status: PipelineStatus,
    pub requested_status: PipelineStatus,
    pub valid_transitions: Vec<PipelineStatus>,
    pub message: String,
}

impl StatusValidationError {
    pub fn new(current_status: PipelineStatus, requested_status: PipelineStatus) -> Self {
        Self {
            current_status,
            requested_status,
            valid_transitions: valid_transitions(current_status).to_vec(),
            message: format!(
                "invalid status transition from {current_status} to {requested_status}"
            ),
        }
    }

    pub fn http_status(&self) -> u16 {
        400
    }

    pub fn to_detail(&self, pipeline_id: &str) -> BackendErrorDetail {
        let valid_transitions: Vec<&str> = self
            .valid_transitions
            .iter()
            .map(|status| status.as_str())
            .collect();

        BackendErrorDetail::new(self.http_status(), INVALID_STATUS_TRANSITION, &self.message)
            .with_detail("pipeline_id", pipeline_id)
            .with_detail("current_status", self.current_status.as_str())
            .with_detail("requested_status", self.requested_status.as_str())
            .with_detail("valid_transitions", valid_transitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_requires_stopped() {
        for status in PipelineStatus::ALL {
            assert_eq!(can_edit(status), status == PipelineStatus::Stopped);
        }
    }

    #[test]
    fn guards_agree_with_state_machine() {
        for status in PipelineStatus::ALL {
            for action in [
                LifecycleAction::Pause,
                LifecycleAction::Resume,
                LifecycleAction::Stop,
                LifecycleAction::Terminate,
            ] {
                if action.is_allowed(status) {
                    assert!(
                        validate_transition(status, action.optimistic_status()).is_ok(),
                        "{action} allowed from {status} but edge is missing"
                    );
                }
            }
        }
    }

    #[test]
    fn terminated_is_a_sink() {
        assert!(valid_transitions(PipelineStatus::Terminated).is_empty());
        assert!(!can_terminate(PipelineStatus::Terminated));
    }

    #[test]
    fn failed_can_only_resume_or_terminate() {
        assert_eq!(
            valid_transitions(PipelineStatus::Failed),
            &[PipelineStatus::Resuming, PipelineStatus::Terminating]
        );
        assert!(validate_transition(PipelineStatus::Failed, PipelineStatus::Stopping).is_err());
        assert!(validate_transition(PipelineStatus::Stopped, PipelineStatus::Failed).is_ok());
    }

    #[test]
    fn rejection_lists_valid_transitions() {
        let error = validate_transition(PipelineStatus::Stopped, PipelineStatus::Pausing).unwrap_err();
        assert_eq!(error.current_status, PipelineStatus::Stopped);
        assert_eq!(
            error.valid_transitions,
            vec![
                PipelineStatus::Resuming,
                PipelineStatus::Failed,
                PipelineStatus::Terminating
            ]
        );

        let detail = error.to_detail("orders");
        assert_eq!(detail.code.as_deref(), Some(INVALID_STATUS_TRANSITION));
        assert_eq!(detail.details["current_status"], "Stopped");
    }
}
