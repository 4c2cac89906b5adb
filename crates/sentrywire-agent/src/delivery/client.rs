//! Retrying HTTP client for collector submission.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use sentrywire_core::config::AgentConfig;
use sentrywire_core::wire;
use sentrywire_core::SentryError;

/// Fixed client identifier header sent on every request.
pub const CLIENT_ID_HEADER: &str = "X-Sentrywire-Client";

const CONTENT_TYPE_EVENT: &str = "application/json; utf-8";
const CONTENT_TYPE_DIAGNOSTIC: &str = "text/plain; utf-8";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid collector endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("unsupported collector scheme '{0}' (only http and https)")]
    UnsupportedScheme(String),

    #[error("collector returned status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Encode(#[from] SentryError),
}

impl DeliveryError {
    /// Recoverable errors are retried up to the ceiling; the rest fail the
    /// delivery on the spot (bad endpoint configuration, malformed payload).
    fn is_recoverable(&self) -> bool {
        matches!(self, DeliveryError::Status(_) | DeliveryError::Network(_))
    }
}

/// Tracks one event's pending transmission: attempts so far and the last
/// recoverable error. Dropped on success or once the ceiling is reached.
#[derive(Debug, Default)]
struct DeliveryAttempt {
    attempts: u32,
    last_error: Option<DeliveryError>,
}

/// HTTP client for the collector endpoint, with bounded retry and a
/// monotonically increasing back-off schedule.
pub struct CollectorClient {
    endpoint: String,
    client_id: String,
    retry_ceiling: u32,
    backoff_ms: Vec<u64>,
    http: Client,
}

impl CollectorClient {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            endpoint: config.collector_url.clone(),
            client_id: config.client_id.clone(),
            retry_ceiling: config.retry_ceiling.max(1),
            backoff_ms: config.backoff_ms.clone(),
            http: Client::new(),
        }
    }

    /// Ship one encoded wire line as an event body.
    ///
    /// A malformed line fails immediately; transport trouble is retried per
    /// the schedule.
    pub async fn send_event_line(&self, line: &str) -> Result<(), DeliveryError> {
        let body = wire::line_to_json(line)?;
        self.send_with_retry(&body, CONTENT_TYPE_EVENT).await
    }

    /// Ship one diagnostic/status string.
    pub async fn send_diagnostic(&self, message: &str) -> Result<(), DeliveryError> {
        self.send_with_retry(message, CONTENT_TYPE_DIAGNOSTIC).await
    }

    async fn send_with_retry(
        &self,
        body: &str,
        content_type: &'static str,
    ) -> Result<(), DeliveryError> {
        let mut attempt = DeliveryAttempt::default();
        loop {
            let wait = self.backoff_for(attempt.attempts);
            if wait > 0 {
                sleep(Duration::from_millis(wait)).await;
            }
            match self.send_once(body, content_type).await {
                Ok(()) => {
                    if attempt.attempts > 0 {
                        debug!(
                            retries = attempt.attempts,
                            prior_error = ?attempt.last_error,
                            "delivered after retry"
                        );
                    }
                    return Ok(());
                }
                Err(e) if e.is_recoverable() => {
                    attempt.attempts += 1;
                    if attempt.attempts >= self.retry_ceiling {
                        warn!(
                            error = %e,
                            attempts = attempt.attempts,
                            "delivery abandoned after exhausting retries"
                        );
                        return Err(e);
                    }
                    debug!(error = %e, attempt = attempt.attempts, "recoverable delivery error, backing off");
                    attempt.last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, body: &str, content_type: &'static str) -> Result<(), DeliveryError> {
        let url = self.validated_endpoint()?;
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header(CLIENT_ID_HEADER, &self.client_id)
            .body(body.to_string())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }

    /// Wait before attempt `n`. The schedule's last entry repeats beyond its
    /// end, keeping the sequence non-decreasing.
    fn backoff_for(&self, attempt: u32) -> u64 {
        self.backoff_ms
            .get(attempt as usize)
            .or_else(|| self.backoff_ms.last())
            .copied()
            .unwrap_or(0)
    }

    /// The endpoint is re-validated on every attempt; a scheme outside the
    /// two supported ones fails the attempt outright.
    fn validated_endpoint(&self) -> Result<Url, DeliveryError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|_| DeliveryError::InvalidEndpoint(self.endpoint.clone()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(DeliveryError::UnsupportedScheme(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with(endpoint: &str, retry_ceiling: u32, backoff_ms: Vec<u64>) -> CollectorClient {
        CollectorClient::new(&AgentConfig {
            collector_url: endpoint.to_string(),
            retry_ceiling,
            backoff_ms,
            ..AgentConfig::default()
        })
    }

    #[test]
    fn default_backoff_schedule_is_non_decreasing() {
        let client = client_with("http://localhost/events", 5, AgentConfig::default().backoff_ms);
        let waits: Vec<u64> = (0..8).map(|n| client.backoff_for(n)).collect();
        assert_eq!(&waits[..5], &[0, 500, 4000, 13500, 32000]);
        // Past the table, the last entry repeats.
        assert_eq!(&waits[5..], &[32000, 32000, 32000]);
        assert!(waits.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn empty_backoff_schedule_means_no_wait() {
        let client = client_with("http://localhost/events", 5, Vec::new());
        assert_eq!(client.backoff_for(0), 0);
        assert_eq!(client.backoff_for(3), 0);
    }

    #[tokio::test]
    async fn unsupported_scheme_is_fatal_per_attempt() {
        let client = client_with("ftp://collector/events", 5, vec![0]);
        let err = client.send_diagnostic("status").await.unwrap_err();
        assert!(matches!(err, DeliveryError::UnsupportedScheme(ref s) if s == "ftp"));
    }

    #[tokio::test]
    async fn unparseable_endpoint_is_fatal() {
        let client = client_with("not a url", 5, vec![0]);
        let err = client.send_diagnostic("status").await.unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn malformed_line_fails_without_touching_the_network() {
        let client = client_with("http://localhost:1/events", 5, vec![0]);
        let err = client.send_event_line("only,three,fields").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Encode(_)));
    }

    #[tokio::test]
    async fn permanent_failure_attempts_exactly_the_ceiling() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/events")
            .with_status(500)
            .expect(5)
            .create_async()
            .await;

        let client = client_with(&format!("{}/events", server.url()), 5, vec![0]);
        let err = client.send_diagnostic("status").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Status(500)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn success_sends_exactly_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/events")
            .match_header(CLIENT_ID_HEADER, "sentrywire-agent/0.1")
            .match_header("content-type", CONTENT_TYPE_DIAGNOSTIC)
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let client = client_with(&format!("{}/events", server.url()), 5, vec![0]);
        client.send_diagnostic("status").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connection_refused_is_retried_to_the_ceiling() {
        // Port 1 is never listening; every attempt is a network error.
        let client = client_with("http://127.0.0.1:1/events", 3, vec![0]);
        let err = client.send_diagnostic("status").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Network(_)));
    }
}
