use serde::Serialize;

/// Operational status reported by the device-management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "IN-OPERATION")]
    InOperation,
    #[serde(rename = "PROTOTYPE")]
    Prototype,
    #[serde(rename = "PROJECT")]
    Project,
    #[serde(rename = "OTHER")]
    Other,
}

impl Status {
    /// Parse the API's string representation. Unknown values are `None` in
    /// the Option sense; the caller decides whether that is an error.
    pub fn from_api(value: &str) -> Option<Self> {
        match value {
            "NONE" => Some(Status::None),
            "IN-OPERATION" => Some(Status::InOperation),
            "PROTOTYPE" => Some(Status::Prototype),
            "PROJECT" => Some(Status::Project),
            "OTHER" => Some(Status::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::None => "NONE",
            Status::InOperation => "IN-OPERATION",
            Status::Prototype => "PROTOTYPE",
            Status::Project => "PROJECT",
            Status::Other => "OTHER",
        }
    }
}

/// Geographic position of a gateway or device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}
