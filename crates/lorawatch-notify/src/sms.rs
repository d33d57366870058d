use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use lorawatch_common::Metrics;
use serde_json::json;
use tracing::{debug, info};

use lorawatch_domain::{DomainError, DomainResult, SmsSender};

#[derive(Debug, Clone)]
pub struct SmsConfig {
    /// SMS gateway endpoint prefix; the gateway id is appended.
    pub url: String,
    pub gateway_id: String,
    pub high_priority: bool,
    /// Skip the network call and report batch id -1.
    pub dry_run: bool,
    /// Country prefix assumed for numbers without one.
    pub default_country_code: String,
    pub validity_minutes: u32,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            url: "https://sms-gateway.example.com/sms/".to_string(),
            gateway_id: "1".to_string(),
            high_priority: false,
            dry_run: false,
            default_country_code: "+45".to_string(),
            validity_minutes: 60,
        }
    }
}

/// HTTP client for the push SMS gateway.
pub struct HttpSmsClient {
    http: reqwest::Client,
    config: SmsConfig,
    metrics: Arc<Metrics>,
}

impl HttpSmsClient {
    pub fn new(config: SmsConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            metrics,
        }
    }
}

#[async_trait::async_trait]
impl SmsSender for HttpSmsClient {
    async fn send(&self, to: &[String], message: &str, flash: bool) -> DomainResult<i64> {
        let mut recipients = Vec::with_capacity(to.len());
        for number in to {
            match normalize_number(number, &self.config.default_country_code) {
                Some(normalized) => recipients.push(normalized),
                None => {
                    return Err(DomainError::Sms(format!("Invalid phone number: {number}")))
                }
            }
        }

        if self.config.dry_run {
            info!(recipients = recipients.len(), "Dry run, skipping SMS send");
            self.metrics.sms_send("dry-run");
            return Ok(-1);
        }

        let url = format!("{}{}", self.config.url, self.config.gateway_id);
        debug!(url = %url, recipients = recipients.len(), "Sending SMS");

        let response = self
            .http
            .post(&url)
            .json(&json!({
                "body": message,
                "flash": flash,
                "highPriority": self.config.high_priority,
                "validityMinutes": self.config.validity_minutes,
                "sendAtUtc": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                "to": recipients,
            }))
            .send()
            .await
            .map_err(|err| DomainError::Sms(err.to_string()))?
            .error_for_status()
            .map_err(|err| DomainError::Sms(err.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|err| DomainError::Sms(err.to_string()))?;
        let batch_id = body
            .trim()
            .parse::<i64>()
            .map_err(|_| DomainError::Sms(format!("unexpected gateway response: {body}")))?;

        self.metrics.sms_send("info");
        Ok(batch_id)
    }
}

/// Lenient E.164 shape check: an optional leading `+`, 8 to 15 digits.
/// Numbers without a prefix get the configured country code.
fn normalize_number(raw: &str, default_country_code: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let (prefix, digits) = match compact.strip_prefix('+') {
        Some(rest) => (String::from("+"), rest.to_string()),
        None => (default_country_code.to_string(), compact),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let total_digits = digits.len() + prefix.trim_start_matches('+').len();
    if !(8..=15).contains(&total_digits) {
        return None;
    }

    Some(format!("{prefix}{digits}"))
}
