use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Counters and gauges observed during a check run.
///
/// All metrics are registered into a caller-supplied registry so binaries
/// share one exposition endpoint and tests can read exact values from a
/// fresh registry.
#[derive(Clone)]
pub struct Metrics {
    pub checks_started: IntCounter,
    pub checks_completed: IntCounter,
    pub checks_errors: IntCounter,

    pub gateway_alerts_triggered: IntCounter,
    pub device_alerts_triggered: IntCounter,
    pub messages_missing: IntCounterVec,
    pub silence_parse_errors: IntCounter,

    pub date_parse_errors: IntCounter,
    pub location_parse_errors: IntCounter,
    pub metadata_parse_errors: IntCounter,
    pub invalid_statuses: IntCounter,
    pub applications_parsed: IntCounter,
    pub devices_parsed: IntCounter,
    pub applications_fetched: IntGauge,
    pub gateways_fetched: IntGauge,

    pub mails_sent: IntCounter,
    pub mail_failures: IntCounter,
    pub sms_sent: IntCounterVec,
}

impl Metrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let metrics = Self {
            checks_started: IntCounter::with_opts(Opts::new(
                "command_checks_started_total",
                "Total number of check runs started",
            ))?,
            checks_completed: IntCounter::with_opts(Opts::new(
                "command_checks_completed_total",
                "Total number of check runs completed",
            ))?,
            checks_errors: IntCounter::with_opts(Opts::new(
                "command_checks_error_total",
                "Total number of check runs that failed",
            ))?,
            gateway_alerts_triggered: IntCounter::with_opts(Opts::new(
                "alert_gateway_notification_triggered_total",
                "Total number of alerts triggered for gateways",
            ))?,
            device_alerts_triggered: IntCounter::with_opts(Opts::new(
                "alert_device_notification_triggered_total",
                "Total number of alerts triggered for devices",
            ))?,
            messages_missing: IntCounterVec::new(
                Opts::new(
                    "alert_message_missing_total",
                    "Devices missing a latest received message",
                ),
                &["device_id"],
            )?,
            silence_parse_errors: IntCounter::with_opts(Opts::new(
                "alert_silenced_parse_date_error_total",
                "Total number of unparseable silenced-until values",
            ))?,
            date_parse_errors: IntCounter::with_opts(Opts::new(
                "api_parse_date_error_total",
                "Total number of date parsing failures",
            ))?,
            location_parse_errors: IntCounter::with_opts(Opts::new(
                "api_parse_location_error_total",
                "Total number of location parsing failures",
            ))?,
            metadata_parse_errors: IntCounter::with_opts(Opts::new(
                "api_parse_metadata_error_total",
                "Total number of metadata parsing failures",
            ))?,
            invalid_statuses: IntCounter::with_opts(Opts::new(
                "api_parse_status_invalid_total",
                "Total number of unknown status values",
            ))?,
            applications_parsed: IntCounter::with_opts(Opts::new(
                "api_parsed_applications_total",
                "Total number of applications parsed",
            ))?,
            devices_parsed: IntCounter::with_opts(Opts::new(
                "api_parsed_devices_total",
                "Total number of devices parsed",
            ))?,
            applications_fetched: IntGauge::with_opts(Opts::new(
                "api_parsed_applications",
                "Number of applications fetched in the latest request",
            ))?,
            gateways_fetched: IntGauge::with_opts(Opts::new(
                "api_parsed_gateways",
                "Number of gateways fetched in the latest request",
            ))?,
            mails_sent: IntCounter::with_opts(Opts::new(
                "mail_sent_total",
                "Total number of notification mails sent",
            ))?,
            mail_failures: IntCounter::with_opts(Opts::new(
                "mail_sent_exception_total",
                "Total number of notification mails that failed to send",
            ))?,
            sms_sent: IntCounterVec::new(
                Opts::new("sms_send_total", "Total number of SMS messages sent"),
                &["mode"],
            )?,
        };

        registry.register(Box::new(metrics.checks_started.clone()))?;
        registry.register(Box::new(metrics.checks_completed.clone()))?;
        registry.register(Box::new(metrics.checks_errors.clone()))?;
        registry.register(Box::new(metrics.gateway_alerts_triggered.clone()))?;
        registry.register(Box::new(metrics.device_alerts_triggered.clone()))?;
        registry.register(Box::new(metrics.messages_missing.clone()))?;
        registry.register(Box::new(metrics.silence_parse_errors.clone()))?;
        registry.register(Box::new(metrics.date_parse_errors.clone()))?;
        registry.register(Box::new(metrics.location_parse_errors.clone()))?;
        registry.register(Box::new(metrics.metadata_parse_errors.clone()))?;
        registry.register(Box::new(metrics.invalid_statuses.clone()))?;
        registry.register(Box::new(metrics.applications_parsed.clone()))?;
        registry.register(Box::new(metrics.devices_parsed.clone()))?;
        registry.register(Box::new(metrics.applications_fetched.clone()))?;
        registry.register(Box::new(metrics.gateways_fetched.clone()))?;
        registry.register(Box::new(metrics.mails_sent.clone()))?;
        registry.register(Box::new(metrics.mail_failures.clone()))?;
        registry.register(Box::new(metrics.sms_sent.clone()))?;

        Ok(metrics)
    }

    /// Record a missing latest-received-message observation for a device.
    pub fn message_missing(&self, device_id: i64) {
        self.messages_missing
            .with_label_values(&[&device_id.to_string()])
            .inc();
    }

    /// Record an SMS send in the given mode ("info" or "dry-run").
    pub fn sms_send(&self, mode: &str) {
        self.sms_sent.with_label_values(&[mode]).inc();
    }
}

/// Encode all metrics in the registry using the Prometheus text format.
pub fn export_metrics(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&registry.gather(), &mut buffer) {
        return format!("# metrics encoding failed: {err}");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
