use futures::future::join_all;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

use crate::dto::MeasurementRecord;

const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Error)]
pub enum DispatchFailure {
    #[error("rejected by server ({status}): {body}")]
    RejectedByServer { status: StatusCode, body: String },
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("unexpected failure: {0}")]
    UnexpectedFailure(String),
}

/// Aggregate result of one dispatch round. Every configured endpoint shows up
/// either in `succeeded` or in `failures`.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<(String, DispatchFailure)>,
}

impl DispatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Dispatcher {
    client: Client,
    endpoints: Vec<String>,
    api_key: String,
}

impl Dispatcher {
    pub fn new(
        endpoints: Vec<String>,
        api_key: String,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            endpoints,
            api_key,
        })
    }

    /// Posts the record to every endpoint, concurrently and independently.
    /// One endpoint's failure never prevents attempting the rest, and no
    /// per-endpoint fault escapes as an error.
    pub async fn dispatch(&self, record: &MeasurementRecord) -> DispatchOutcome {
        let attempts = self.endpoints.iter().map(|endpoint| async move {
            (endpoint.as_str(), self.post(endpoint, record).await)
        });

        let mut outcome = DispatchOutcome {
            attempted: self.endpoints.len(),
            ..Default::default()
        };

        for (endpoint, result) in join_all(attempts).await {
            match result {
                Ok(()) => {
                    debug!("Delivered record to {}", endpoint);
                    outcome.succeeded += 1;
                }
                Err(failure) => {
                    error!("Dispatch to {} failed: {}", endpoint, failure);
                    outcome.failures.push((endpoint.to_string(), failure));
                }
            }
        }

        outcome
    }

    async fn post(
        &self,
        endpoint: &str,
        record: &MeasurementRecord,
    ) -> Result<(), DispatchFailure> {
        let response = self
            .client
            .post(endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(record)
            .send()
            .await
            .map_err(classify_send_error)?;

        if response.status() == StatusCode::OK {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(DispatchFailure::RejectedByServer { status, body })
    }
}

fn classify_send_error(err: reqwest::Error) -> DispatchFailure {
    if err.is_timeout() || err.is_connect() {
        DispatchFailure::NetworkFailure(err.to_string())
    } else {
        DispatchFailure::UnexpectedFailure(err.to_string())
    }
}
