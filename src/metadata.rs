use tracing::warn;

use crate::dto::{LoraDataRate, UplinkMessage};

/// Flattened envelope metadata. Extraction never fails; anything missing or
/// unparseable in the envelope is simply absent here.
#[derive(Clone, Debug, Default)]
pub struct EnvelopeMetadata {
    pub confirmed: Option<bool>,
    pub f_cnt: Option<u64>,
    pub frequency: Option<String>,
    pub consumed_airtime: Option<f64>,
    pub modulation: Option<LoraDataRate>,
}

pub fn extract(uplink: &UplinkMessage) -> EnvelopeMetadata {
    EnvelopeMetadata {
        confirmed: uplink.confirmed,
        f_cnt: uplink.f_cnt,
        frequency: uplink
            .settings
            .as_ref()
            .and_then(|settings| settings.frequency.clone()),
        consumed_airtime: uplink.consumed_airtime.as_deref().and_then(parse_airtime),
        modulation: uplink
            .settings
            .as_ref()
            .and_then(|settings| settings.data_rate.as_ref())
            .and_then(|data_rate| data_rate.lora.clone()),
    }
}

/// Parses the `"<float>s"` airtime notation. A value that does not parse is
/// downgraded to absent rather than failing the message.
fn parse_airtime(raw: &str) -> Option<f64> {
    match raw.strip_suffix('s').and_then(|v| v.parse::<f64>().ok()) {
        Some(seconds) => Some(seconds),
        None => {
            warn!("Dropping unparseable consumed_airtime {:?}", raw);
            None
        }
    }
}
