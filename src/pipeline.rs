use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::decoder::{self, DecodeError, PayloadLayout};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::dto::UplinkEnvelope;
use crate::metadata;
use crate::persist::RawStore;
use crate::record;
use crate::util::config::Settings;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid envelope: {0}")]
    Validation(String),
    #[error("payload decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Runs one inbound message through validate, persist, decode, build and
/// dispatch. Configuration is threaded in at construction; nothing here is
/// mutated after startup, so one pipeline can serve concurrent invocations.
pub struct MessagePipeline {
    layout: PayloadLayout,
    store: RawStore,
    dispatcher: Dispatcher,
}

impl MessagePipeline {
    pub fn new(layout: PayloadLayout, store: RawStore, dispatcher: Dispatcher) -> Self {
        Self {
            layout,
            store,
            dispatcher,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::new(
            settings.layout.clone(),
            RawStore::new(&settings.data_dir),
            Dispatcher::new(
                settings.endpoints.clone(),
                settings.api_key.clone(),
                settings.request_timeout,
            )?,
        ))
    }

    /// Status contract towards the transport: 0 once the message decoded,
    /// regardless of how delivery went; 1 when the message was dropped
    /// before or at decoding.
    pub async fn process_message(&self, raw: &Value) -> i32 {
        match self.process_envelope(raw).await {
            Ok(outcome) => {
                if outcome.all_succeeded() {
                    info!(
                        "Message processed, delivered to {} endpoint(s)",
                        outcome.succeeded
                    );
                } else {
                    warn!(
                        "Message processed, delivered to {} of {} endpoints",
                        outcome.succeeded, outcome.attempted
                    );
                }
                0
            }
            Err(err) => {
                error!("Dropping message: {}", err);
                1
            }
        }
    }

    async fn process_envelope(&self, raw: &Value) -> Result<DispatchOutcome, PipelineError> {
        let envelope: UplinkEnvelope = serde_json::from_value(raw.clone())
            .map_err(|err| PipelineError::Validation(err.to_string()))?;
        let device_id = envelope.device_id().to_string();

        let frm_payload = envelope
            .uplink_message
            .frm_payload
            .as_deref()
            .filter(|payload| !payload.is_empty())
            .ok_or_else(|| PipelineError::Validation("'frm_payload' is missing".into()))?;

        // Raw durability is best effort, not a precondition for delivery.
        match self.store.store(&device_id, raw).await {
            Ok(path) => info!("Raw envelope saved to {}", path.display()),
            Err(err) => warn!("Failed to persist raw envelope for {}: {:?}", device_id, err),
        }

        let decoded = decoder::decode_payload(frm_payload, &self.layout)?;
        let envelope_metadata = metadata::extract(&envelope.uplink_message);
        let record = record::build(
            &device_id,
            &decoded,
            &envelope_metadata,
            &envelope.uplink_message.rx_metadata,
            Utc::now(),
        );

        Ok(self.dispatcher.dispatch(&record).await)
    }
}
