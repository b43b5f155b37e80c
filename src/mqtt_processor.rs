use rumqttc::{ConnAck, ConnectReturnCode, Event, Incoming, QoS, SubAck};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::pipeline::MessagePipeline;
use crate::util::{config::Settings, connect_to_mqtt};

/// Transport adapter: every received publish is parsed as JSON and handed to
/// the pipeline. The pipeline owns the per-message outcome; a bad message
/// never takes the subscription down.
pub async fn start_server(settings: Arc<Settings>) -> anyhow::Result<()> {
    info!("Starting MQTT processor");

    let pipeline = MessagePipeline::from_settings(&settings)?;
    let (mut eventloop, client) = connect_to_mqtt(&settings.mqtt).await?;

    loop {
        let event = eventloop.poll().await;
        match &event {
            Err(e) => {
                error!("MQTT error: {:?}", e);

                // Only retry every 5 seconds
                sleep(Duration::from_secs(5)).await;

                warn!("Retrying after MQTT error.");
            }
            Ok(Event::Incoming(Incoming::ConnAck(ConnAck {
                session_present,
                code: ConnectReturnCode::Success,
            }))) => {
                info!("Reconnected to broker!");

                if !session_present {
                    info!("Resubscribing to topic {}", settings.mqtt.topic);
                    client
                        .subscribe(&settings.mqtt.topic, QoS::AtLeastOnce)
                        .await?;
                }
            }
            Ok(Event::Incoming(Incoming::SubAck(SubAck {
                pkid: _,
                return_codes: _,
            }))) => {
                info!("MQTT subscribed to {}", settings.mqtt.topic);
            }
            Ok(Event::Incoming(Incoming::Publish(publish))) => {
                match serde_json::from_slice(&publish.payload) {
                    Ok(raw) => {
                        let status = pipeline.process_message(&raw).await;
                        if status != 0 {
                            warn!(
                                "Message on {} dropped with status {}",
                                publish.topic, status
                            );
                        }
                    }
                    Err(e) => {
                        error!("Error decoding message on {}: {}", publish.topic, e);
                    }
                }
            }
            event => {
                debug!("MQTT event: {:?}", event);
            }
        }
    }
}
