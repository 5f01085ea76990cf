//! HttpTransport - JSON over HTTP(S)

use std::time::Duration;

use contracts::{AttemptOutcome, EndpointConfig, HealthReport, RecordTransport, SourceRecord};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::DeliveryError;

/// Acknowledgement body of a successful push
#[derive(Debug, Default, Deserialize)]
struct PushAck {
    #[serde(default)]
    message: Option<String>,
}

/// Body of the health endpoint
#[derive(Debug, Default, Deserialize)]
struct HealthBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// Sends records to the ingestion endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    push_url: String,
    health_url: String,
    probe_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport for `endpoint`.
    ///
    /// Every request carries `User-Agent` (configured or `reactor-watch/<version>`);
    /// pushes use the request timeout, the health check the probe timeout.
    pub fn new(endpoint: &EndpointConfig) -> Result<Self, DeliveryError> {
        let push_url = endpoint.push_url();
        let health_url = endpoint.health_url();
        for url in [&push_url, &health_url] {
            reqwest::Url::parse(url).map_err(|e| DeliveryError::invalid_url(url, e.to_string()))?;
        }

        let user_agent = endpoint
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("reactor-watch/{}", env!("CARGO_PKG_VERSION")));

        let client = Client::builder()
            .timeout(Duration::from_secs(endpoint.request_timeout_secs))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            push_url,
            health_url,
            probe_timeout: Duration::from_secs(endpoint.probe_timeout_secs),
        })
    }

    pub fn push_url(&self) -> &str {
        &self.push_url
    }

    pub fn health_url(&self) -> &str {
        &self.health_url
    }
}

impl RecordTransport for HttpTransport {
    fn endpoint(&self) -> &str {
        &self.push_url
    }

    #[instrument(name = "http_push", skip_all, fields(kind = %record.kind()))]
    async fn push(&self, record: &SourceRecord) -> AttemptOutcome {
        let response = match self.client.post(&self.push_url).json(record).send().await {
            Ok(response) => response,
            Err(e) => {
                return AttemptOutcome::Unreachable {
                    cause: describe_transport_error(&e),
                }
            }
        };

        let status = response.status();
        // A body that cannot be read is treated like an empty one
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "push answered");

        if status == StatusCode::OK {
            let ack: PushAck = serde_json::from_str(&body).unwrap_or_default();
            AttemptOutcome::Delivered {
                message: ack.message,
            }
        } else {
            AttemptOutcome::Rejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            }
        }
    }

    #[instrument(name = "http_health", skip(self), fields(url = %self.health_url))]
    async fn health(&self) -> HealthReport {
        let response = match self
            .client
            .get(&self.health_url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return HealthReport {
                    error: Some(describe_transport_error(&e)),
                    ..Default::default()
                }
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status != StatusCode::OK {
            return HealthReport {
                status: Some(status.as_u16()),
                error: Some(format!("unexpected status {}", status.as_u16())),
                ..Default::default()
            };
        }

        let info: HealthBody = serde_json::from_str(&body).unwrap_or_default();
        HealthReport {
            reachable: true,
            status: Some(status.as_u16()),
            message: info.message,
            version: info.version,
            error: None,
        }
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}
