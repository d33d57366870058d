use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::message::Message;
use crate::metadata::Metadata;
use crate::types::Location;

/// Device snapshot from the device-management API.
///
/// A device without a `latest_received_message` cannot be evaluated for
/// staleness. `status_battery` uses -1.0 as the unknown sentinel. The
/// metadata mapping carries the per-device limit override, contact
/// overrides and silenced-until marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: i64,
    pub application_id: i64,
    pub eui: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub location: Location,
    pub latest_received_message: Option<Message>,
    pub status_battery: f64,
    pub metadata: Metadata,
}
