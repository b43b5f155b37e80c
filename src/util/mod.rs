use rumqttc::{
    AsyncClient, ConnAck, ConnectReturnCode, Event, EventLoop, Incoming, MqttOptions, QoS, SubAck,
    Transport,
};
use tokio::time::timeout;
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::writer::MakeWriterExt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub mod config;

use self::config::MqttSettings;

pub fn setup_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::Layer::new()
                .with_writer(std::io::stdout.with_max_level(Level::INFO))
                .compact(),
        )
        .init();
}

pub async fn connect_to_mqtt(settings: &MqttSettings) -> anyhow::Result<(EventLoop, AsyncClient)> {
    let mut mqttoptions = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
    mqttoptions.set_keep_alive(settings.keep_alive);

    if settings.tls {
        mqttoptions.set_transport(Transport::tls_with_default_config());
    }

    if settings.auth {
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            mqttoptions.set_credentials(username, password);
        }
    }

    let (client, eventloop) = AsyncClient::new(mqttoptions, 10);
    client.subscribe(&settings.topic, QoS::AtLeastOnce).await?;

    let mqtt_connect_timeout = tokio::time::Duration::from_millis(30000);

    let eventloop = timeout(mqtt_connect_timeout, wait_for_connection(eventloop)).await??;
    info!("MQTT subscribed to {}", settings.topic);
    Ok((eventloop, client))
}

async fn wait_for_connection(mut eventloop: EventLoop) -> anyhow::Result<EventLoop> {
    loop {
        let event = eventloop.poll().await?;

        if let Event::Incoming(Incoming::ConnAck(ConnAck {
            session_present: _,
            code: ConnectReturnCode::Success,
        })) = event
        {
            info!("MQTT connected");
        }

        if let Event::Incoming(Incoming::SubAck(SubAck {
            pkid: _,
            return_codes: _,
        })) = event
        {
            return Ok(eventloop);
        }
    }
}
