use chrono::{DateTime, Utc};

use crate::device::Device;

/// Whole seconds elapsed between the last event and `now`. Negative when
/// the data or clock is ahead of us; callers do not defend against that.
pub fn diff_seconds(last: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.timestamp() - last.timestamp()
}

pub fn is_stale(diff_secs: i64, limit_secs: i64) -> bool {
    diff_secs >= limit_secs
}

/// Effective staleness limit for a device: the metadata override when it
/// parses as a number of seconds, otherwise the configured fallback.
pub fn device_limit(device: &Device, field: &str, fallback_secs: i64) -> i64 {
    device.metadata.seconds(field).unwrap_or(fallback_secs)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::metadata::{Metadata, MetadataValue};
    use crate::types::Location;

    fn test_device(metadata: Metadata) -> Device {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Device {
            id: 1,
            application_id: 10,
            eui: "0011223344556677".to_string(),
            created_at: created,
            updated_at: created,
            name: "Sensor".to_string(),
            location: Location {
                latitude: 56.15,
                longitude: 10.21,
            },
            latest_received_message: None,
            status_battery: -1.0,
            metadata,
        }
    }

    #[test]
    fn test_diff_seconds() {
        let last = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 14, 46, 40).unwrap();
        assert_eq!(diff_seconds(last, now), 10_000);
    }

    #[test]
    fn test_diff_seconds_negative_when_event_is_in_the_future() {
        let last = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 11, 59, 0).unwrap();
        assert_eq!(diff_seconds(last, now), -60);
    }

    #[test]
    fn test_is_stale_at_and_past_the_limit() {
        assert!(is_stale(3600, 3600));
        assert!(is_stale(3601, 3600));
        assert!(!is_stale(3599, 3600));
        assert!(!is_stale(-60, 3600));
    }

    #[test]
    fn test_device_limit_uses_metadata_override() {
        let mut metadata = Metadata::new();
        metadata.insert("notification_limit", MetadataValue::Number(60.0));
        let device = test_device(metadata);
        assert_eq!(device_limit(&device, "notification_limit", 86_400), 60);
    }

    #[test]
    fn test_device_limit_falls_back_without_override() {
        let device = test_device(Metadata::new());
        assert_eq!(device_limit(&device, "notification_limit", 86_400), 86_400);
    }

    #[test]
    fn test_device_limit_treats_non_numeric_override_as_absent() {
        let mut metadata = Metadata::new();
        metadata.insert("notification_limit", MetadataValue::Text("soon".into()));
        let device = test_device(metadata);
        assert_eq!(device_limit(&device, "notification_limit", 86_400), 86_400);
    }
}
