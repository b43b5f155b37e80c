use chrono::{DateTime, Utc};

use crate::decoder::DecodedMeasurement;
use crate::dto::{GatewayReception, MeasurementRecord, SensorMessage};
use crate::metadata::EnvelopeMetadata;

/// Merges decoded measurements and envelope metadata into the outbound
/// record. Pure; never fails. The device carries no clock of its own, so both
/// timestamps are the server's `now`.
pub fn build(
    device_id: &str,
    decoded: &DecodedMeasurement,
    metadata: &EnvelopeMetadata,
    rx_metadata: &[GatewayReception],
    now: DateTime<Utc>,
) -> MeasurementRecord {
    let sensor_messages = if rx_metadata.is_empty() {
        None
    } else {
        // Gateway order and count are preserved, even for entries that carry
        // no fields at all.
        Some(
            rx_metadata
                .iter()
                .map(|rx| sensor_message(rx, metadata))
                .collect(),
        )
    };

    MeasurementRecord {
        timestamp_device: now.timestamp(),
        timestamp_server: now.timestamp(),
        device_name: device_id.to_string(),
        temperature: decoded.temperature,
        humidity: decoded.humidity,
        air_pressure: decoded.pressure,
        battery_voltage: decoded.battery_voltage,
        confirmed: metadata.confirmed,
        consumed_airtime: metadata.consumed_airtime,
        f_cnt: metadata.f_cnt,
        frequency: metadata.frequency.clone(),
        sensor_messages,
    }
}

fn sensor_message(rx: &GatewayReception, metadata: &EnvelopeMetadata) -> SensorMessage {
    let modulation = metadata.modulation.as_ref();

    SensorMessage {
        gateway_id: rx
            .gateway_ids
            .as_ref()
            .and_then(|ids| ids.gateway_id.clone()),
        rssi: rx.rssi,
        snr: rx.snr,
        channel_rssi: rx.channel_rssi,
        lora_bandwidth: modulation.and_then(|m| m.bandwidth),
        lora_spreading_factor: modulation.and_then(|m| m.spreading_factor),
        lora_coding_rate: modulation.and_then(|m| m.coding_rate.clone()),
    }
}
