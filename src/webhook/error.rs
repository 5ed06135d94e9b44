use reqwest::StatusCode;
use thiserror::Error;

use super::types::{ErrorReport, SubmissionOutcome};

/// Raised while building a request, before anything touches the network
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("coordinate is not set or not finite: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("invalid service URL \"{url}\": {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

/// Why a submission attempt did not succeed
#[derive(Debug, Error)]
pub enum SubmitError {
    /// No complete HTTP response was received
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with something other than 200
    #[error("service error {status}: {report}")]
    Service {
        status: StatusCode,
        report: ErrorReport,
    },

    /// The response could not be classified at all
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SubmitError {
    /// Session or credential problems; retrying blindly will not help
    pub fn is_permanent(&self) -> bool {
        match self {
            SubmitError::Transport(_) => false,
            SubmitError::Service { status, .. } => is_auth_status(*status),
            SubmitError::Protocol(_) => true,
        }
    }

    /// Text handed to the notifier, `None` for silent failures
    pub fn notification(&self) -> Option<String> {
        match self {
            SubmitError::Transport(_) => None,
            SubmitError::Service { report, .. } => Some(report.to_string()),
            SubmitError::Protocol(description) => Some(description.clone()),
        }
    }

    pub fn into_outcome(self) -> SubmissionOutcome {
        let permanent = self.is_permanent();
        let reason = match self {
            SubmitError::Service { report, .. } => report.to_string(),
            other => other.to_string(),
        };
        if permanent {
            SubmissionOutcome::PermanentFailure(reason)
        } else {
            SubmissionOutcome::RetryableFailure(reason)
        }
    }
}

/// 401 or 511 (session expired). Session renewal is not implemented.
pub fn is_auth_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::NETWORK_AUTHENTICATION_REQUIRED
}
