use serde::Serialize;

/// Canonical outbound record, serialized as the collector wire format.
/// Optional fields are left off the wire entirely when absent.
#[derive(Clone, Debug, Serialize)]
pub struct MeasurementRecord {
    pub timestamp_device: i64,
    pub timestamp_server: i64,
    pub device_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_airtime: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f_cnt: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_messages: Option<Vec<SensorMessage>>,
}

/// Per-gateway entry: one gateway's signal metrics plus the uplink's shared
/// modulation settings.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SensorMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_rssi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lora_bandwidth: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lora_spreading_factor: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lora_coding_rate: Option<String>,
}
