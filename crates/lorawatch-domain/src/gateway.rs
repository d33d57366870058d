use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Location, Status};

/// Gateway snapshot from the device-management API.
///
/// `gateway_id` is the LoRaWAN EUI string, distinct from the numeric API
/// id. The free-form tag mapping carries the silenced-until marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gateway {
    pub id: i64,
    pub gateway_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub name: String,
    pub description: Option<String>,
    pub location: Location,
    pub status: Status,
    pub responsible_name: Option<String>,
    pub responsible_email: Option<String>,
    pub responsible_phone: Option<String>,
    pub tags: BTreeMap<String, String>,
}
