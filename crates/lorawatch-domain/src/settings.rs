use chrono::{FixedOffset, Offset, Utc};

/// Tuning for a full check run, threaded into the engine explicitly so no
/// component reads process-wide state.
#[derive(Debug, Clone, Default)]
pub struct AlertSettings {
    pub application: ApplicationSettings,
    pub gateway: GatewaySettings,
    pub device: DeviceSettings,
    pub silence: SilenceSettings,
}

/// Application-level gates and links.
///
/// `base_url` is a pattern with an `{application}` placeholder.
#[derive(Debug, Clone)]
pub struct ApplicationSettings {
    pub check_start_date: bool,
    pub check_end_date: bool,
    pub base_url: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            check_start_date: false,
            check_end_date: false,
            base_url: "https://iot.example.com/application/{application}".to_string(),
        }
    }
}

/// Gateway staleness threshold, contact fallbacks and deep-link prefix.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub limit_secs: i64,
    pub fallback_mail: String,
    pub fallback_phone: String,
    pub base_url: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            limit_secs: 3600,
            fallback_mail: "iot-alerts@example.com".to_string(),
            fallback_phone: "+4512345678".to_string(),
            base_url: "https://iot.example.com/gateway/".to_string(),
        }
    }
}

/// Device staleness fallback, metadata field names, contact fallbacks and
/// deep-link pattern (`{application}` and `{device}` placeholders).
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub fallback_limit_secs: i64,
    pub fallback_mail: String,
    pub fallback_phone: String,
    pub metadata_field_limit: String,
    pub metadata_field_mail: String,
    pub metadata_field_phone: String,
    pub base_url: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            fallback_limit_secs: 86_400,
            fallback_mail: "iot-alerts@example.com".to_string(),
            fallback_phone: "+4512345678".to_string(),
            metadata_field_limit: "notification_limit".to_string(),
            metadata_field_mail: "notification_mail".to_string(),
            metadata_field_phone: "notification_phone".to_string(),
            base_url: "https://iot.example.com/application/{application}/device/{device}"
                .to_string(),
        }
    }
}

/// Where the silenced-until marker lives and how its value is read.
#[derive(Debug, Clone)]
pub struct SilenceSettings {
    pub gateway_tag: String,
    pub device_metadata_field: String,
    pub time_format: String,
    pub utc_offset: FixedOffset,
}

impl Default for SilenceSettings {
    fn default() -> Self {
        Self {
            gateway_tag: "silenced_until".to_string(),
            device_metadata_field: "silenced_until".to_string(),
            time_format: "%d-%m-%Y %H:%M:%S".to_string(),
            utc_offset: Utc.fix(),
        }
    }
}
