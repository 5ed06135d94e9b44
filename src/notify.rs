//! Notification sink for submission progress and failures
//!
//! The executor never renders anything itself. It hands human-readable text
//! to a [`Notifier`], and whoever hosts the job decides how to show it.

use tracing::{error, info};

use crate::webhook::types::{Coordinate, SubmittedLocation};

pub trait Notifier: Send + Sync {
    /// An attempt for `coordinate` is about to go out
    fn submitting(&self, _coordinate: &Coordinate) {}

    /// The service accepted the location
    fn location_submitted(&self, location: &SubmittedLocation);

    /// Failed to update location; `message` is ready for display
    fn error(&self, message: &str);
}

/// Writes notifications to the tracing log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn submitting(&self, coordinate: &Coordinate) {
        info!("Updating location: {}", coordinate);
    }

    fn location_submitted(&self, location: &SubmittedLocation) {
        info!(
            "Location submitted: {} at {}",
            location.coordinate,
            location.submitted_at.to_rfc3339()
        );
    }

    fn error(&self, message: &str) {
        error!("Failed to update location: {}", message);
    }
}
