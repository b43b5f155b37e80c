mod measurement_record;
mod uplink;

pub use measurement_record::{MeasurementRecord, SensorMessage};
pub use uplink::{
    DataRate, EndDeviceIds, GatewayIds, GatewayReception, LoraDataRate, UplinkEnvelope,
    UplinkMessage, UplinkSettings,
};
