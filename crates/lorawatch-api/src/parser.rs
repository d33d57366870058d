use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use lorawatch_common::Metrics;
use serde_json::Value;
use tracing::debug;

use lorawatch_domain::{
    Application, Device, DomainError, DomainResult, Gateway, Location, Message, Metadata,
    MetadataValue, ReceivedInfo, Status,
};

use crate::config::ApiClientConfig;

/// Turns raw API payloads into domain entities.
///
/// Status filtering happens here, while iterating a listing, never after
/// parsing. All parse failures are counted before they are returned.
pub struct ApiParser {
    metrics: Arc<Metrics>,
    statuses: Vec<String>,
    time_format: String,
    utc_offset: FixedOffset,
}

impl ApiParser {
    pub fn new(config: &ApiClientConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            statuses: config.statuses.clone(),
            time_format: config.time_format.clone(),
            utc_offset: config.utc_offset,
        }
    }

    /// Parse an application listing (`data` array).
    pub fn applications(
        &self,
        content: &str,
        filter_on_status: bool,
    ) -> DomainResult<Vec<Application>> {
        let root = parse_json(content, "application listing")?;
        let items = root
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| DomainError::Parse("application listing missing `data`".to_string()))?;

        let mut applications = Vec::new();
        for item in items {
            if filter_on_status && !self.status_is_configured(item) {
                continue;
            }
            applications.push(self.application(item)?);
        }

        self.metrics
            .applications_fetched
            .set(applications.len() as i64);
        debug!(count = applications.len(), "Parsed application listing");
        Ok(applications)
    }

    /// Parse a single application object.
    pub fn application(&self, data: &Value) -> DomainResult<Application> {
        let devices = data
            .get("iotDevices")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| flexible_i64(item.get("id"), "iotDevices.id"))
                    .collect::<DomainResult<Vec<i64>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let application = Application {
            id: flexible_i64(data.get("id"), "id")?,
            created_at: self.parse_date(data.get("createdAt"))?,
            updated_at: self.parse_date(data.get("updatedAt"))?,
            start_date: self.opt_date(data.get("startDate"))?,
            end_date: self.opt_date(data.get("endDate"))?,
            name: require_str(data, "name")?,
            status: self.parse_status(data.get("status"))?,
            contact_person: opt_str(data, "contactPerson"),
            contact_email: opt_str(data, "contactEmail"),
            contact_phone: opt_str(data, "contactPhone"),
            devices,
        };

        self.metrics.applications_parsed.inc();
        Ok(application)
    }

    /// Parse a gateway listing (`resultList` array).
    pub fn gateways(&self, content: &str, filter_on_status: bool) -> DomainResult<Vec<Gateway>> {
        let root = parse_json(content, "gateway listing")?;
        let items = root
            .get("resultList")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                DomainError::Parse("gateway listing missing `resultList`".to_string())
            })?;

        let mut gateways = Vec::new();
        for item in items {
            if filter_on_status && !self.status_is_configured(item) {
                continue;
            }
            gateways.push(self.gateway(item)?);
        }

        self.metrics.gateways_fetched.set(gateways.len() as i64);
        debug!(count = gateways.len(), "Parsed gateway listing");
        Ok(gateways)
    }

    /// Parse a single gateway object.
    pub fn gateway(&self, data: &Value) -> DomainResult<Gateway> {
        let location = data
            .get("location")
            .ok_or_else(|| DomainError::Parse("gateway missing `location`".to_string()))?;

        Ok(Gateway {
            id: flexible_i64(data.get("id"), "id")?,
            gateway_id: require_str(data, "gatewayId")?,
            created_at: self.parse_date(data.get("createdAt"))?,
            updated_at: self.parse_date(data.get("updatedAt"))?,
            last_seen_at: self.parse_date(data.get("lastSeenAt"))?,
            name: require_str(data, "name")?,
            description: opt_str(data, "description"),
            location: self.parse_location(location)?,
            status: self.parse_status(data.get("status"))?,
            responsible_name: opt_str(data, "gatewayResponsibleName"),
            responsible_email: opt_str(data, "gatewayResponsibleEmail"),
            responsible_phone: opt_str(data, "gatewayResponsiblePhoneNumber"),
            tags: string_map(data.get("tags")),
        })
    }

    /// Parse a single device payload. The gateway collection enriches the
    /// per-gateway reception records with gateway names.
    pub fn device(&self, content: &str, gateways: &[Gateway]) -> DomainResult<Device> {
        let data = parse_json(content, "device")?;

        let id = flexible_i64(data.get("id"), "id")?;
        let application_id = flexible_i64(
            data.get("application").and_then(|app| app.get("id")),
            "application.id",
        )?;

        let location = match data.get("location").filter(|value| !value.is_null()) {
            Some(value) => self.parse_location(value)?,
            None => Location {
                latitude: 0.0,
                longitude: 0.0,
            },
        };

        let latest_received_message = match data
            .get("latestReceivedMessage")
            .filter(|value| !value.is_null())
        {
            Some(value) => Some(self.parse_message(value, gateways)?),
            None => None,
        };

        let lorawan = data.get("lorawanSettings");
        let status_battery = lorawan
            .and_then(|settings| settings.get("deviceStatusBattery"))
            .and_then(Value::as_f64)
            .unwrap_or(-1.0);
        let eui = lorawan
            .and_then(|settings| settings.get("devEUI"))
            .and_then(Value::as_str)
            .or_else(|| data.get("deviceEUI").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| format!("device-{id}"));

        let device = Device {
            id,
            application_id,
            eui,
            created_at: self.parse_date(data.get("createdAt"))?,
            updated_at: self.parse_date(data.get("updatedAt"))?,
            name: require_str(&data, "name")?,
            location,
            latest_received_message,
            status_battery,
            metadata: self.parse_metadata(data.get("metadata"))?,
        };

        self.metrics.devices_parsed.inc();
        Ok(device)
    }

    fn status_is_configured(&self, item: &Value) -> bool {
        item.get("status")
            .and_then(Value::as_str)
            .is_some_and(|status| self.statuses.iter().any(|allowed| allowed == status))
    }

    fn parse_message(&self, data: &Value, gateways: &[Gateway]) -> DomainResult<Message> {
        let rx_info = match data
            .get("rawData")
            .and_then(|raw| raw.get("rxInfo"))
            .and_then(Value::as_array)
        {
            Some(items) => self.parse_rx_info(items, gateways)?,
            None => Vec::new(),
        };

        Ok(Message {
            id: flexible_i64(data.get("id"), "latestReceivedMessage.id")?,
            created_at: self.parse_date(data.get("createdAt"))?,
            sent_time: self.parse_date(data.get("sentTime"))?,
            rssi: data.get("rssi").and_then(Value::as_i64).unwrap_or(0) as i32,
            snr: data.get("snr").and_then(Value::as_i64).unwrap_or(0) as i32,
            rx_info,
        })
    }

    fn parse_rx_info(
        &self,
        items: &[Value],
        gateways: &[Gateway],
    ) -> DomainResult<Vec<ReceivedInfo>> {
        let mut info = Vec::new();
        for item in items {
            let gateway_id = item
                .get("gatewayId")
                .or_else(|| item.get("gatewayID"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let location = item
                .get("location")
                .ok_or_else(|| DomainError::Parse("rxInfo missing `location`".to_string()))?;

            info.push(ReceivedInfo {
                gateway_name: find_gateway_name(&gateway_id, gateways),
                gateway_id,
                rssi: item.get("rssi").and_then(Value::as_i64).unwrap_or(0) as i32,
                snr: item
                    .get("snr")
                    .or_else(|| item.get("loRaSNR"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0) as i32,
                crc_status: item
                    .get("crcStatus")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_string(),
                location: self.parse_location(location)?,
            });
        }
        Ok(info)
    }

    /// Locations arrive either as GeoJSON-style `coordinates` pairs
    /// (longitude first) or as `latitude`/`longitude` objects.
    fn parse_location(&self, data: &Value) -> DomainResult<Location> {
        if let Some(coordinates) = data.get("coordinates").and_then(Value::as_array) {
            if coordinates.len() == 2 {
                if let (Some(longitude), Some(latitude)) =
                    (coordinates[0].as_f64(), coordinates[1].as_f64())
                {
                    return Ok(Location {
                        latitude,
                        longitude,
                    });
                }
            }
        } else if let (Some(latitude), Some(longitude)) = (
            data.get("latitude").and_then(Value::as_f64),
            data.get("longitude").and_then(Value::as_f64),
        ) {
            return Ok(Location {
                latitude,
                longitude,
            });
        }

        self.metrics.location_parse_errors.inc();
        Err(DomainError::Parse("unrecognized location data".to_string()))
    }

    /// Device metadata is an embedded JSON document, usually delivered as
    /// a string. Only string and number values are kept; other types have
    /// no typed lookup and count as absent.
    fn parse_metadata(&self, value: Option<&Value>) -> DomainResult<Metadata> {
        let value = match value {
            None | Some(Value::Null) => return Ok(Metadata::new()),
            Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    self.metrics.metadata_parse_errors.inc();
                    return Err(DomainError::Parse(format!("invalid metadata: {err}")));
                }
            },
            Some(other) => other.clone(),
        };

        match value {
            Value::Null => Ok(Metadata::new()),
            Value::Object(map) => Ok(map
                .iter()
                .filter_map(|(key, value)| match value {
                    Value::String(text) => {
                        Some((key.clone(), MetadataValue::Text(text.clone())))
                    }
                    Value::Number(number) => number
                        .as_f64()
                        .map(|number| (key.clone(), MetadataValue::Number(number))),
                    _ => None,
                })
                .collect()),
            _ => {
                self.metrics.metadata_parse_errors.inc();
                Err(DomainError::Parse("metadata is not an object".to_string()))
            }
        }
    }

    /// Parse an API timestamp. A null or absent value is unix zero.
    fn parse_date(&self, value: Option<&Value>) -> DomainResult<DateTime<Utc>> {
        let Some(raw) = value.and_then(Value::as_str) else {
            return Ok(DateTime::<Utc>::UNIX_EPOCH);
        };

        NaiveDateTime::parse_from_str(raw, &self.time_format)
            .ok()
            .and_then(|naive| naive.and_local_timezone(self.utc_offset).single())
            .map(|date| date.with_timezone(&Utc))
            .ok_or_else(|| {
                self.metrics.date_parse_errors.inc();
                DomainError::Parse(format!("invalid date value: {raw}"))
            })
    }

    /// A nullable timestamp; unlike `parse_date`, null stays absent.
    fn opt_date(&self, value: Option<&Value>) -> DomainResult<Option<DateTime<Utc>>> {
        match value.filter(|value| !value.is_null()) {
            Some(value) => Ok(Some(self.parse_date(Some(value))?)),
            None => Ok(None),
        }
    }

    fn parse_status(&self, value: Option<&Value>) -> DomainResult<Status> {
        let Some(value) = value.filter(|value| !value.is_null()) else {
            return Ok(Status::None);
        };

        value
            .as_str()
            .and_then(Status::from_api)
            .ok_or_else(|| {
                self.metrics.invalid_statuses.inc();
                DomainError::Parse(format!("invalid status value: {value}"))
            })
    }
}

fn parse_json(content: &str, what: &str) -> DomainResult<Value> {
    serde_json::from_str(content)
        .map_err(|err| DomainError::Parse(format!("invalid {what}: {err}")))
}

/// Numeric id fields arrive as numbers or numeric strings.
fn flexible_i64(value: Option<&Value>, field: &str) -> DomainResult<i64> {
    value
        .and_then(|value| {
            value
                .as_i64()
                .or_else(|| value.as_str().and_then(|raw| raw.trim().parse().ok()))
        })
        .ok_or_else(|| DomainError::Parse(format!("missing or non-numeric `{field}`")))
}

fn require_str(data: &Value, field: &str) -> DomainResult<String> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DomainError::Parse(format!("missing `{field}`")))
}

fn opt_str(data: &Value, field: &str) -> Option<String> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(key, value)| {
                    value
                        .as_str()
                        .map(|value| (key.clone(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn find_gateway_name(gateway_id: &str, gateways: &[Gateway]) -> String {
    gateways
        .iter()
        .find(|gateway| gateway.gateway_id == gateway_id)
        .map(|gateway| gateway.name.clone())
        // Should never happen: messages are received by known gateways.
        .unwrap_or_else(|| "Name not found".to_string())
}

#[cfg(test)]
mod tests {
    use lorawatch_common::Registry;

    use super::*;

    fn parser() -> (ApiParser, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new(&Registry::new()).unwrap());
        (
            ApiParser::new(&ApiClientConfig::default(), metrics.clone()),
            metrics,
        )
    }

    const APPLICATION_LISTING: &str = r#"{
        "data": [
            {
                "id": 10,
                "createdAt": "2024-01-01T00:00:00.000Z",
                "updatedAt": "2024-02-01T00:00:00.000Z",
                "startDate": "2024-03-01T00:00:00.000Z",
                "endDate": null,
                "name": "Parking",
                "status": "IN-OPERATION",
                "contactPerson": "Jane Doe",
                "contactEmail": "owner@example.com",
                "contactPhone": "+4533333333",
                "iotDevices": [{"id": 3}, {"id": "4"}]
            },
            {
                "id": 11,
                "createdAt": null,
                "updatedAt": null,
                "startDate": null,
                "endDate": null,
                "name": "Prototype bench",
                "status": "PROTOTYPE",
                "contactPerson": "",
                "contactEmail": "",
                "contactPhone": "",
                "iotDevices": []
            }
        ]
    }"#;

    const GATEWAY_LISTING: &str = r#"{
        "resultList": [
            {
                "id": 7,
                "gatewayId": "7276ff002e062c01",
                "createdAt": "2024-01-01T00:00:00.000Z",
                "updatedAt": "2024-02-01T00:00:00.000Z",
                "lastSeenAt": "2024-06-01T09:13:20.000Z",
                "name": "Rooftop",
                "description": "North rooftop mast",
                "location": {"type": "Point", "coordinates": [10.21, 56.15]},
                "status": "IN-OPERATION",
                "gatewayResponsibleName": "Jane Doe",
                "gatewayResponsibleEmail": "responsible@example.com",
                "gatewayResponsiblePhoneNumber": "+4511111111",
                "tags": {"silenced_until": "01-07-2024 00:00:00", "internal": "yes"}
            }
        ]
    }"#;

    const DEVICE: &str = r#"{
        "id": 3,
        "createdAt": "2024-01-01T00:00:00.000Z",
        "updatedAt": "2024-02-01T00:00:00.000Z",
        "name": "Sensor",
        "application": {"id": 10},
        "location": {"latitude": 56.15, "longitude": 10.21},
        "latestReceivedMessage": {
            "id": "900",
            "createdAt": "2024-06-01T09:13:20.000Z",
            "sentTime": "2024-06-01T09:13:20.000Z",
            "rssi": -107,
            "snr": 9,
            "rawData": {
                "rxInfo": [
                    {
                        "gatewayId": "7276ff002e062c01",
                        "rssi": -107,
                        "loRaSNR": 9,
                        "location": {"latitude": 56.15, "longitude": 10.21}
                    }
                ]
            }
        },
        "lorawanSettings": {"devEUI": "0011223344556677", "deviceStatusBattery": 67.2},
        "metadata": "{\"notification_limit\": 60, \"notification_mail\": \"meta@example.com\"}"
    }"#;

    #[test]
    fn test_applications_parse_and_collect_device_ids() {
        let (parser, metrics) = parser();
        let applications = parser.applications(APPLICATION_LISTING, false).unwrap();

        assert_eq!(applications.len(), 2);
        assert_eq!(applications[0].devices, vec![3, 4]);
        assert_eq!(
            applications[0].contact_email.as_deref(),
            Some("owner@example.com")
        );
        // Empty contact strings count as absent.
        assert_eq!(applications[1].contact_email, None);
        assert_eq!(applications[1].start_date, None);
        assert_eq!(metrics.applications_fetched.get(), 2);
        assert_eq!(metrics.applications_parsed.get(), 2);
    }

    #[test]
    fn test_applications_filter_on_configured_statuses() {
        let (parser, _) = parser();
        let applications = parser.applications(APPLICATION_LISTING, true).unwrap();
        assert_eq!(applications.len(), 1);
        assert_eq!(applications[0].status, Status::InOperation);
    }

    #[test]
    fn test_date_parsing_is_idempotent() {
        let (parser, _) = parser();
        let first = parser.applications(APPLICATION_LISTING, false).unwrap();
        let second = parser.applications(APPLICATION_LISTING, false).unwrap();
        assert_eq!(first[0].created_at, second[0].created_at);
        assert_eq!(first[0].start_date, second[0].start_date);
    }

    #[test]
    fn test_null_dates_are_unix_zero() {
        let (parser, _) = parser();
        let applications = parser.applications(APPLICATION_LISTING, false).unwrap();
        assert_eq!(applications[1].created_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_gateway_parses_geojson_location_and_tags() {
        let (parser, metrics) = parser();
        let gateways = parser.gateways(GATEWAY_LISTING, false).unwrap();

        assert_eq!(gateways.len(), 1);
        let gateway = &gateways[0];
        assert_eq!(gateway.gateway_id, "7276ff002e062c01");
        // GeoJSON coordinates are longitude-first.
        assert_eq!(gateway.location.latitude, 56.15);
        assert_eq!(gateway.location.longitude, 10.21);
        assert_eq!(
            gateway.tags.get("silenced_until").map(String::as_str),
            Some("01-07-2024 00:00:00")
        );
        assert_eq!(metrics.gateways_fetched.get(), 1);
    }

    #[test]
    fn test_device_parses_message_and_enriches_rx_info() {
        let (parser, metrics) = parser();
        let gateways = parser.gateways(GATEWAY_LISTING, false).unwrap();
        let device = parser.device(DEVICE, &gateways).unwrap();

        assert_eq!(device.id, 3);
        assert_eq!(device.application_id, 10);
        assert_eq!(device.eui, "0011223344556677");
        assert_eq!(device.status_battery, 67.2);
        assert_eq!(device.metadata.seconds("notification_limit"), Some(60));

        let message = device.latest_received_message.unwrap();
        assert_eq!(message.id, 900);
        assert_eq!(message.rx_info.len(), 1);
        assert_eq!(message.rx_info[0].gateway_name, "Rooftop");
        assert_eq!(message.rx_info[0].snr, 9);
        assert_eq!(message.rx_info[0].crc_status, "Unknown");
        assert_eq!(metrics.devices_parsed.get(), 1);
    }

    #[test]
    fn test_device_rx_info_unknown_gateway_gets_sentinel_name() {
        let (parser, _) = parser();
        let device = parser.device(DEVICE, &[]).unwrap();
        let message = device.latest_received_message.unwrap();
        assert_eq!(message.rx_info[0].gateway_name, "Name not found");
    }

    #[test]
    fn test_device_without_message_or_battery() {
        let (parser, _) = parser();
        let content = r#"{
            "id": 5,
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z",
            "name": "Quiet sensor",
            "application": {"id": 10},
            "location": null,
            "latestReceivedMessage": null,
            "metadata": null
        }"#;
        let device = parser.device(content, &[]).unwrap();

        assert!(device.latest_received_message.is_none());
        assert_eq!(device.status_battery, -1.0);
        assert_eq!(device.location.latitude, 0.0);
        assert_eq!(device.eui, "device-5");
    }

    #[test]
    fn test_invalid_status_is_counted_and_rejected() {
        let (parser, metrics) = parser();
        let content = r#"{"data": [{"id": 1, "name": "X", "status": "RETIRED", "iotDevices": []}]}"#;
        let result = parser.applications(content, false);

        assert!(matches!(result, Err(DomainError::Parse(_))));
        assert_eq!(metrics.invalid_statuses.get(), 1);
    }

    #[test]
    fn test_invalid_date_is_counted_and_rejected() {
        let (parser, metrics) = parser();
        let content = r#"{"data": [{"id": 1, "createdAt": "yesterday", "name": "X", "status": null, "iotDevices": []}]}"#;
        let result = parser.applications(content, false);

        assert!(matches!(result, Err(DomainError::Parse(_))));
        assert_eq!(metrics.date_parse_errors.get(), 1);
    }

    #[test]
    fn test_invalid_metadata_is_counted_and_rejected() {
        let (parser, metrics) = parser();
        let content = r#"{
            "id": 5,
            "name": "Broken",
            "application": {"id": 10},
            "metadata": "{not json"
        }"#;
        let result = parser.device(content, &[]);

        assert!(matches!(result, Err(DomainError::Parse(_))));
        assert_eq!(metrics.metadata_parse_errors.get(), 1);
    }

    #[test]
    fn test_unrecognized_location_is_counted_and_rejected() {
        let (parser, metrics) = parser();
        let content = r#"{
            "resultList": [{
                "id": 7,
                "gatewayId": "x",
                "name": "Broken",
                "status": null,
                "location": {"coordinates": [1.0]}
            }]
        }"#;
        let result = parser.gateways(content, false);

        assert!(matches!(result, Err(DomainError::Parse(_))));
        assert_eq!(metrics.location_parse_errors.get(), 1);
    }
}
