use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::Status;

/// Application snapshot from the device-management API.
///
/// Applications own devices (by id) and optionally carry an activity
/// window and a contact used as a fallback for device notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Application {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub name: String,
    pub status: Status,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub devices: Vec<i64>,
}
