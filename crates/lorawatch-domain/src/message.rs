use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::Location;

/// Latest uplink received from a device. Only `sent_time` drives the
/// staleness evaluation; the rest is context for notification templates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub sent_time: DateTime<Utc>,
    pub rssi: i32,
    pub snr: i32,
    pub rx_info: Vec<ReceivedInfo>,
}

/// Per-gateway reception record for a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceivedInfo {
    pub gateway_id: String,
    pub gateway_name: String,
    pub rssi: i32,
    pub snr: i32,
    pub crc_status: String,
    pub location: Location,
}
