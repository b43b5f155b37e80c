use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64 frame: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("empty frame")]
    EmptyFrame,
    #[error("frame too short: layout index {index} out of bounds for {len} byte frame")]
    ShortFrame { index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid layout document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
    #[error("layout field {0:?} has an empty index list")]
    EmptyIndices(&'static str),
}

/// Byte positions composing one measurement field, most significant first.
///
/// The layout document accepts either a bare index array or
/// `{"indices": [...], "signed": bool}`. When signedness is left out, the
/// decoder falls back to the field's default (signed for temperature,
/// unsigned for everything else).
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "RawFieldLayout")]
pub struct FieldLayout {
    pub indices: Vec<usize>,
    pub signed: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldLayout {
    Bare(Vec<usize>),
    Detailed {
        indices: Vec<usize>,
        signed: Option<bool>,
    },
}

impl From<RawFieldLayout> for FieldLayout {
    fn from(raw: RawFieldLayout) -> Self {
        match raw {
            RawFieldLayout::Bare(indices) => FieldLayout {
                indices,
                signed: None,
            },
            RawFieldLayout::Detailed { indices, signed } => FieldLayout { indices, signed },
        }
    }
}

/// Versioned frame schema, loaded once at startup and shared read-only.
/// A field left out of the document is never decoded.
#[derive(Clone, Debug, Deserialize)]
pub struct PayloadLayout {
    pub version: u8,
    pub temperature: Option<FieldLayout>,
    pub humidity: Option<FieldLayout>,
    pub pressure: Option<FieldLayout>,
    pub voltage: Option<FieldLayout>,
}

impl PayloadLayout {
    pub fn parse(document: &str) -> Result<Self, LayoutError> {
        let layout: PayloadLayout = serde_json::from_str(document)?;

        for (name, field) in [
            ("temperature", &layout.temperature),
            ("humidity", &layout.humidity),
            ("pressure", &layout.pressure),
            ("voltage", &layout.voltage),
        ] {
            if let Some(field) = field {
                if field.indices.is_empty() {
                    return Err(LayoutError::EmptyIndices(name));
                }
            }
        }

        Ok(layout)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path)?;
        Ok(Self::parse(&document)?)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedMeasurement {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub battery_voltage: Option<f64>,
}

/// Decodes a base64 frame string into physical measurements.
pub fn decode_payload(frm_payload: &str, layout: &PayloadLayout) -> Result<DecodedMeasurement, DecodeError> {
    let frame = STANDARD.decode(frm_payload)?;
    decode_frame(&frame, layout)
}

/// Decodes raw frame bytes according to the layout. The first byte carries
/// the firmware's layout version; a mismatch with the configured layout is
/// logged but decoding proceeds with the configured layout regardless.
pub fn decode_frame(frame: &[u8], layout: &PayloadLayout) -> Result<DecodedMeasurement, DecodeError> {
    let version = *frame.first().ok_or(DecodeError::EmptyFrame)?;
    if version != layout.version {
        warn!(
            "Frame declares layout version {} but layout version {} is configured",
            version, layout.version
        );
    }

    Ok(DecodedMeasurement {
        temperature: extract_field(frame, layout.temperature.as_ref(), true)?,
        humidity: extract_field(frame, layout.humidity.as_ref(), false)?,
        pressure: extract_field(frame, layout.pressure.as_ref(), false)?,
        battery_voltage: extract_field(frame, layout.voltage.as_ref(), false)?,
    })
}

/// Big-endian concatenation of the configured bytes, divided by 100.
fn extract_field(
    frame: &[u8],
    field: Option<&FieldLayout>,
    signed_default: bool,
) -> Result<Option<f64>, DecodeError> {
    let Some(field) = field else {
        return Ok(None);
    };

    let mut raw: u64 = 0;
    for &index in &field.indices {
        let byte = *frame.get(index).ok_or(DecodeError::ShortFrame {
            index,
            len: frame.len(),
        })?;
        raw = (raw << 8) | u64::from(byte);
    }

    let value = if field.signed.unwrap_or(signed_default) {
        sign_extend(raw, field.indices.len() as u32 * 8) as f64
    } else {
        raw as f64
    };

    Ok(Some(value / 100.0))
}

fn sign_extend(raw: u64, bits: u32) -> i64 {
    if bits >= 64 {
        return raw as i64;
    }
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}
