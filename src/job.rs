//! Location update job
//!
//! Plays the scheduler's side of a submission: reads the stored job input,
//! runs attempts, and maps each outcome to done / retry-with-backoff /
//! done-with-alert. At most one attempt is in flight per job.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::webhook::{self, Coordinate, SubmissionExecutor, SubmissionOutcome};

pub const KEY_LATITUDE: &str = "latitude";
pub const KEY_LONGITUDE: &str = "longitude";

/// Parameters stored with a scheduled job. Missing values read as NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobInput {
    pub latitude: f64,
    pub longitude: f64,
}

impl JobInput {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn from_value(data: &Value) -> Self {
        let read = |key: &str| data.get(key).and_then(Value::as_f64).unwrap_or(f64::NAN);
        Self::new(read(KEY_LATITUDE), read(KEY_LONGITUDE))
    }

    /// Load job input from a JSON object file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read job input {:?}", path))?;
        let data: Value = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse job input {:?}", path))?;
        Ok(Self::from_value(&data))
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Bounded exponential backoff between retryable attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based): `initial * 2^(attempt-1)`, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(5 * 60 * 60),
        }
    }
}

pub struct LocationJob {
    executor: SubmissionExecutor,
    base_url: String,
    policy: RetryPolicy,
}

impl LocationJob {
    pub fn new(executor: SubmissionExecutor, base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            executor,
            base_url: base_url.into(),
            policy,
        }
    }

    /// One attempt with a freshly built request
    pub async fn run_attempt(&self, input: &JobInput) -> SubmissionOutcome {
        match webhook::build(input.coordinate(), &self.base_url) {
            Ok(request) => self.executor.submit(&request).await,
            Err(err) => {
                error!("Refusing to submit job input {:?}: {}", input, err);
                let reason = err.to_string();
                self.executor.notifier().error(&reason);
                SubmissionOutcome::PermanentFailure(reason)
            }
        }
    }

    /// Run attempts until a terminal outcome or until `cancel` resolves
    ///
    /// Cancellation drops the in-flight request and returns `None`: nothing
    /// is reported and the next scheduled run starts fresh.
    pub async fn run<F>(&self, input: &JobInput, cancel: F) -> Option<SubmissionOutcome>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let outcome = tokio::select! {
                _ = &mut cancel => {
                    info!("Location job cancelled during attempt {}", attempt);
                    return None;
                }
                outcome = self.run_attempt(input) => outcome,
            };

            let reason = outcome.reason().unwrap_or_default();
            if outcome.is_retryable() {
                if attempt < self.policy.max_attempts {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}...",
                        attempt, self.policy.max_attempts, reason, delay
                    );
                    tokio::select! {
                        _ = &mut cancel => {
                            info!("Location job cancelled while waiting to retry");
                            return None;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }

                self.executor.notifier().error(&format!(
                    "giving up after {} attempts: {}",
                    attempt, reason
                ));
            } else if outcome.is_permanent() {
                warn!("Location job stopped, needs attention: {}", reason);
            }

            info!("Location job finished after {} attempt(s): {}", attempt, outcome);
            return Some(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingNotifier;
    use crate::notify::Notifier;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    fn job(server: &MockServer, notifier: &Arc<RecordingNotifier>, max_attempts: u32) -> LocationJob {
        let notifier: Arc<dyn Notifier> = notifier.clone();
        let executor = SubmissionExecutor::with_client(reqwest::Client::new(), notifier);
        LocationJob::new(executor, server.uri(), quick_policy(max_attempts))
    }

    #[test]
    fn test_job_input_missing_keys_are_nan() {
        let input = JobInput::from_value(&json!({"latitude": 12.5}));
        assert_eq!(input.latitude, 12.5);
        assert!(input.longitude.is_nan());

        let input = JobInput::from_value(&json!({"latitude": "north", "longitude": -3}));
        assert!(input.latitude.is_nan());
        assert_eq!(input.longitude, -3.0);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(200),
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(30));
        assert_eq!(policy.backoff(2), Duration::from_secs(60));
        assert_eq!(policy.backoff(3), Duration::from_secs(120));
        assert_eq!(policy.backoff(4), Duration::from_secs(200));
        assert_eq!(policy.backoff(64), Duration::from_secs(200));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let notifier = Arc::new(RecordingNotifier::default());
        let outcome = job(&server, &notifier, 5)
            .run(&JobInput::new(40.4168, -3.7038), std::future::pending())
            .await;

        assert_eq!(
            outcome,
            Some(SubmissionOutcome::Success(Coordinate::new(40.4168, -3.7038)))
        );
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        assert_eq!(notifier.errors(), vec!["warming up".to_string()]);
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(
                ResponseTemplate::new(511)
                    .set_body_json(json!({"errors": [{"message": "session expired"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Arc::new(RecordingNotifier::default());
        let outcome = job(&server, &notifier, 5)
            .run(&JobInput::new(1.0, 2.0), std::future::pending())
            .await;

        assert_eq!(
            outcome,
            Some(SubmissionOutcome::PermanentFailure("session expired".to_string()))
        );
        assert_eq!(notifier.errors(), vec!["session expired".to_string()]);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
            .expect(3)
            .mount(&server)
            .await;

        let notifier = Arc::new(RecordingNotifier::default());
        let outcome = job(&server, &notifier, 3)
            .run(&JobInput::new(1.0, 2.0), std::future::pending())
            .await;

        assert_eq!(
            outcome,
            Some(SubmissionOutcome::RetryableFailure("db down".to_string()))
        );
        let errors = notifier.errors();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors[3], "giving up after 3 attempts: db down");
    }

    #[tokio::test]
    async fn test_unset_coordinate_never_reaches_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let notifier = Arc::new(RecordingNotifier::default());
        let input = JobInput::from_value(&json!({"longitude": 4.0}));
        let outcome = job(&server, &notifier, 5)
            .run(&input, std::future::pending())
            .await;

        assert!(matches!(outcome, Some(SubmissionOutcome::PermanentFailure(_))));
        assert_eq!(notifier.errors().len(), 1);
        assert!(notifier.progress().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_flight_reports_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let notifier = Arc::new(RecordingNotifier::default());
        let outcome = job(&server, &notifier, 5)
            .run(
                &JobInput::new(1.0, 2.0),
                tokio::time::sleep(Duration::from_millis(100)),
            )
            .await;

        assert_eq!(outcome, None);
        assert!(notifier.submitted().is_empty());
        assert!(notifier.errors().is_empty());
    }
}
