use serde::Deserialize;

/// Inbound uplink document as published by the network server.
///
/// Every field is optional on the wire; validation of the parts we actually
/// need happens in the pipeline, not here.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UplinkEnvelope {
    #[serde(default)]
    pub end_device_ids: EndDeviceIds,
    #[serde(default)]
    pub uplink_message: UplinkMessage,
}

impl UplinkEnvelope {
    pub fn device_id(&self) -> &str {
        self.end_device_ids
            .device_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or("unknown")
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EndDeviceIds {
    pub device_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UplinkMessage {
    pub frm_payload: Option<String>,
    #[serde(default)]
    pub rx_metadata: Vec<GatewayReception>,
    pub confirmed: Option<bool>,
    pub f_cnt: Option<u64>,
    pub consumed_airtime: Option<String>,
    pub settings: Option<UplinkSettings>,
}

/// One gateway's view of the uplink. All signal fields are optional.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GatewayReception {
    pub gateway_ids: Option<GatewayIds>,
    pub rssi: Option<f64>,
    pub snr: Option<f64>,
    pub channel_rssi: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GatewayIds {
    pub gateway_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UplinkSettings {
    pub frequency: Option<String>,
    pub data_rate: Option<DataRate>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DataRate {
    pub lora: Option<LoraDataRate>,
}

/// Modulation parameters of the uplink itself, shared by every gateway that
/// received it.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoraDataRate {
    pub bandwidth: Option<u64>,
    pub spreading_factor: Option<u64>,
    pub coding_rate: Option<String>,
}
