use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use lorawatch_common::Metrics;
use tracing::error;

use crate::device::Device;
use crate::gateway::Gateway;
use crate::settings::SilenceSettings;

/// Evaluates the silenced-until marker on gateways and devices.
///
/// The marker is a local timestamp string in a configured format and UTC
/// offset; an entity is silenced while that timestamp is still in the
/// future. An unparseable marker never silences: a spurious alert is
/// preferred over a missed one.
pub struct SilenceEvaluator {
    settings: SilenceSettings,
    metrics: Arc<Metrics>,
}

impl SilenceEvaluator {
    pub fn new(settings: SilenceSettings, metrics: Arc<Metrics>) -> Self {
        Self { settings, metrics }
    }

    pub fn is_gateway_silenced(&self, gateway: &Gateway, now: DateTime<Utc>) -> bool {
        match gateway.tags.get(&self.settings.gateway_tag) {
            Some(raw) => !self.is_past("gateway", gateway.id, raw, now),
            None => false,
        }
    }

    pub fn is_device_silenced(&self, device: &Device, now: DateTime<Utc>) -> bool {
        match device.metadata.text(&self.settings.device_metadata_field) {
            Some(raw) => !self.is_past("device", device.id, &raw, now),
            None => false,
        }
    }

    /// Whether the stored timestamp has already passed. Parse failures
    /// count as passed, which resolves the entity as not silenced.
    fn is_past(&self, kind: &str, id: i64, raw: &str, now: DateTime<Utc>) -> bool {
        let parsed = NaiveDateTime::parse_from_str(raw.trim(), &self.settings.time_format)
            .ok()
            .and_then(|naive| naive.and_local_timezone(self.settings.utc_offset).single());

        match parsed {
            Some(silenced_until) => now >= silenced_until.with_timezone(&Utc),
            None => {
                error!(
                    kind = kind,
                    id = id,
                    value = raw,
                    "Unparseable silenced-until value, treating as not silenced"
                );
                self.metrics.silence_parse_errors.inc();
                true
            }
        }
    }
}
