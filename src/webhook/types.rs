//! Types for the map service `Webhook` mutation and its outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// GraphQL operation name sent with every submission
pub const OPERATION_NAME: &str = "Webhook";

/// Webhook category used for location updates
pub const CATEGORY_SET_LOCATION: &str = "setLocation";

/// The `status` variable the webhook resolver expects for writes
pub const WEBHOOK_STATUS: &str = "POST";

/// Mutation document identifying the webhook call
pub const WEBHOOK_QUERY: &str = "mutation Webhook($data: JSON, $category: String!, $status: String!) { webhook(data: $data, category: $category, status: $status) { __typename } }";

/// A device position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Unset values are stored as NaN, so this is also the "was it set" check
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Body of the `POST /graphql` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookBody {
    pub operation_name: &'static str,
    pub variables: WebhookVariables,
    pub query: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookVariables {
    pub category: &'static str,
    /// `[latitude, longitude]`
    pub data: [f64; 2],
    pub status: &'static str,
}

/// GraphQL error envelope returned with non-200 responses
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlErrorBody {
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

/// Human-readable aggregation of the messages a failed response carried
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorReport {
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages.join(", "))
    }
}

/// What observers receive once the service accepted a coordinate
#[derive(Debug, Clone)]
pub struct SubmittedLocation {
    pub coordinate: Coordinate,
    pub submitted_at: DateTime<Utc>,
}

/// Classified result of one submission attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// The service returned 200 for this coordinate
    Success(Coordinate),
    /// Plausibly transient; the scheduler may try again later
    RetryableFailure(String),
    /// Retrying without outside intervention cannot fix this
    PermanentFailure(String),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmissionOutcome::RetryableFailure(_))
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, SubmissionOutcome::PermanentFailure(_))
    }

    /// Failure text, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::Success(_) => None,
            SubmissionOutcome::RetryableFailure(reason)
            | SubmissionOutcome::PermanentFailure(reason) => Some(reason),
        }
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionOutcome::Success(coordinate) => write!(f, "submitted {}", coordinate),
            SubmissionOutcome::RetryableFailure(reason) => write!(f, "retryable: {}", reason),
            SubmissionOutcome::PermanentFailure(reason) => write!(f, "permanent: {}", reason),
        }
    }
}
