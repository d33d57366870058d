use anyhow::Context;
use chrono::FixedOffset;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use lorawatch_api::ApiClientConfig;
use lorawatch_domain::{
    AlertSettings, ApplicationSettings, DeviceSettings, GatewaySettings, SilenceSettings,
};
use lorawatch_notify::{MailConfig, SmsConfig};

/// Service configuration loaded from `LORAWATCH_`-prefixed environment
/// variables, with `__` separating nested sections
/// (e.g. `LORAWATCH_API__BASE_URL`).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Offset applied to `--date` overrides.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub mail: MailSection,

    #[serde(default)]
    pub sms: SmsSection,

    #[serde(default)]
    pub alert: AlertSection,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSection {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_gateway_organization_id")]
    pub gateway_organization_id: i64,

    #[serde(default = "default_request_limit")]
    pub request_limit: i64,

    #[serde(default = "default_cache_ttl_secs")]
    pub application_cache_ttl_secs: u64,

    #[serde(default = "default_cache_ttl_secs")]
    pub gateway_cache_ttl_secs: u64,

    /// Comma-separated list of statuses kept when filtering.
    #[serde(default = "default_statuses")]
    pub statuses: String,

    #[serde(default = "default_api_time_format")]
    pub time_format: String,

    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_api_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_gateway_organization_id() -> i64 {
    1
}

fn default_request_limit() -> i64 {
    999
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_statuses() -> String {
    "IN-OPERATION".to_string()
}

fn default_api_time_format() -> String {
    "%Y-%m-%dT%H:%M:%S%.fZ".to_string()
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            api_key: String::new(),
            gateway_organization_id: default_gateway_organization_id(),
            request_limit: default_request_limit(),
            application_cache_ttl_secs: default_cache_ttl_secs(),
            gateway_cache_ttl_secs: default_cache_ttl_secs(),
            statuses: default_statuses(),
            time_format: default_api_time_format(),
            utc_offset: default_utc_offset(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MailSection {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_username: String,

    #[serde(default)]
    pub smtp_password: String,

    #[serde(default = "default_from_address")]
    pub from_address: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    #[serde(default = "default_reply_to")]
    pub reply_to: String,

    #[serde(default)]
    pub cc: String,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_from_address() -> String {
    "alerts@example.com".to_string()
}

fn default_from_name() -> String {
    "IoT alert manager".to_string()
}

fn default_reply_to() -> String {
    "noreply@example.com".to_string()
}

impl Default for MailSection {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: default_from_address(),
            from_name: default_from_name(),
            reply_to: default_reply_to(),
            cc: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SmsSection {
    #[serde(default = "default_sms_url")]
    pub url: String,

    #[serde(default = "default_sms_gateway_id")]
    pub gateway_id: String,

    #[serde(default)]
    pub high_priority: bool,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default = "default_country_code")]
    pub default_country_code: String,

    #[serde(default = "default_validity_minutes")]
    pub validity_minutes: u32,
}

fn default_sms_url() -> String {
    "https://sms-gateway.example.com/sms/".to_string()
}

fn default_sms_gateway_id() -> String {
    "1".to_string()
}

fn default_country_code() -> String {
    "+45".to_string()
}

fn default_validity_minutes() -> u32 {
    60
}

impl Default for SmsSection {
    fn default() -> Self {
        Self {
            url: default_sms_url(),
            gateway_id: default_sms_gateway_id(),
            high_priority: false,
            dry_run: false,
            default_country_code: default_country_code(),
            validity_minutes: default_validity_minutes(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlertSection {
    #[serde(default)]
    pub application_check_start_date: bool,

    #[serde(default)]
    pub application_check_end_date: bool,

    #[serde(default = "default_application_base_url")]
    pub application_base_url: String,

    #[serde(default = "default_gateway_limit_secs")]
    pub gateway_limit_secs: i64,

    #[serde(default = "default_fallback_mail")]
    pub gateway_fallback_mail: String,

    #[serde(default = "default_fallback_phone")]
    pub gateway_fallback_phone: String,

    #[serde(default = "default_gateway_base_url")]
    pub gateway_base_url: String,

    #[serde(default = "default_device_fallback_limit_secs")]
    pub device_fallback_limit_secs: i64,

    #[serde(default = "default_fallback_mail")]
    pub device_fallback_mail: String,

    #[serde(default = "default_fallback_phone")]
    pub device_fallback_phone: String,

    #[serde(default = "default_metadata_field_limit")]
    pub device_metadata_field_limit: String,

    #[serde(default = "default_metadata_field_mail")]
    pub device_metadata_field_mail: String,

    #[serde(default = "default_metadata_field_phone")]
    pub device_metadata_field_phone: String,

    #[serde(default = "default_device_base_url")]
    pub device_base_url: String,

    #[serde(default = "default_silenced_field")]
    pub gateway_silenced_tag: String,

    #[serde(default = "default_silenced_field")]
    pub device_metadata_field_silenced: String,

    #[serde(default = "default_silenced_time_format")]
    pub silenced_time_format: String,

    #[serde(default = "default_utc_offset")]
    pub silenced_utc_offset: String,
}

fn default_application_base_url() -> String {
    "https://iot.example.com/application/{application}".to_string()
}

fn default_gateway_limit_secs() -> i64 {
    3600
}

fn default_fallback_mail() -> String {
    "iot-alerts@example.com".to_string()
}

fn default_fallback_phone() -> String {
    "+4512345678".to_string()
}

fn default_gateway_base_url() -> String {
    "https://iot.example.com/gateway/".to_string()
}

fn default_device_fallback_limit_secs() -> i64 {
    86_400
}

fn default_metadata_field_limit() -> String {
    "notification_limit".to_string()
}

fn default_metadata_field_mail() -> String {
    "notification_mail".to_string()
}

fn default_metadata_field_phone() -> String {
    "notification_phone".to_string()
}

fn default_device_base_url() -> String {
    "https://iot.example.com/application/{application}/device/{device}".to_string()
}

fn default_silenced_field() -> String {
    "silenced_until".to_string()
}

fn default_silenced_time_format() -> String {
    "%d-%m-%Y %H:%M:%S".to_string()
}

impl Default for AlertSection {
    fn default() -> Self {
        Self {
            application_check_start_date: false,
            application_check_end_date: false,
            application_base_url: default_application_base_url(),
            gateway_limit_secs: default_gateway_limit_secs(),
            gateway_fallback_mail: default_fallback_mail(),
            gateway_fallback_phone: default_fallback_phone(),
            gateway_base_url: default_gateway_base_url(),
            device_fallback_limit_secs: default_device_fallback_limit_secs(),
            device_fallback_mail: default_fallback_mail(),
            device_fallback_phone: default_fallback_phone(),
            device_metadata_field_limit: default_metadata_field_limit(),
            device_metadata_field_mail: default_metadata_field_mail(),
            device_metadata_field_phone: default_metadata_field_phone(),
            device_base_url: default_device_base_url(),
            gateway_silenced_tag: default_silenced_field(),
            device_metadata_field_silenced: default_silenced_field(),
            silenced_time_format: default_silenced_time_format(),
            silenced_utc_offset: default_utc_offset(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("LORAWATCH").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn date_override_offset(&self) -> anyhow::Result<FixedOffset> {
        parse_offset(&self.utc_offset)
    }

    pub fn api_client_config(&self) -> anyhow::Result<ApiClientConfig> {
        Ok(ApiClientConfig {
            base_url: self.api.base_url.clone(),
            api_key: self.api.api_key.clone(),
            gateway_organization_id: self.api.gateway_organization_id,
            request_limit: self.api.request_limit,
            application_cache_ttl_secs: self.api.application_cache_ttl_secs,
            gateway_cache_ttl_secs: self.api.gateway_cache_ttl_secs,
            statuses: self
                .api
                .statuses
                .split(',')
                .map(str::trim)
                .filter(|status| !status.is_empty())
                .map(str::to_string)
                .collect(),
            time_format: self.api.time_format.clone(),
            utc_offset: parse_offset(&self.api.utc_offset)?,
        })
    }

    pub fn alert_settings(&self) -> anyhow::Result<AlertSettings> {
        Ok(AlertSettings {
            application: ApplicationSettings {
                check_start_date: self.alert.application_check_start_date,
                check_end_date: self.alert.application_check_end_date,
                base_url: self.alert.application_base_url.clone(),
            },
            gateway: GatewaySettings {
                limit_secs: self.alert.gateway_limit_secs,
                fallback_mail: self.alert.gateway_fallback_mail.clone(),
                fallback_phone: self.alert.gateway_fallback_phone.clone(),
                base_url: self.alert.gateway_base_url.clone(),
            },
            device: DeviceSettings {
                fallback_limit_secs: self.alert.device_fallback_limit_secs,
                fallback_mail: self.alert.device_fallback_mail.clone(),
                fallback_phone: self.alert.device_fallback_phone.clone(),
                metadata_field_limit: self.alert.device_metadata_field_limit.clone(),
                metadata_field_mail: self.alert.device_metadata_field_mail.clone(),
                metadata_field_phone: self.alert.device_metadata_field_phone.clone(),
                base_url: self.alert.device_base_url.clone(),
            },
            silence: SilenceSettings {
                gateway_tag: self.alert.gateway_silenced_tag.clone(),
                device_metadata_field: self.alert.device_metadata_field_silenced.clone(),
                time_format: self.alert.silenced_time_format.clone(),
                utc_offset: parse_offset(&self.alert.silenced_utc_offset)?,
            },
        })
    }

    pub fn mail_config(&self) -> MailConfig {
        MailConfig {
            smtp_host: self.mail.smtp_host.clone(),
            smtp_port: self.mail.smtp_port,
            smtp_username: self.mail.smtp_username.clone(),
            smtp_password: self.mail.smtp_password.clone(),
            from_address: self.mail.from_address.clone(),
            from_name: self.mail.from_name.clone(),
            reply_to: self.mail.reply_to.clone(),
            cc: self.mail.cc.clone(),
        }
    }

    pub fn sms_config(&self) -> SmsConfig {
        SmsConfig {
            url: self.sms.url.clone(),
            gateway_id: self.sms.gateway_id.clone(),
            high_priority: self.sms.high_priority,
            dry_run: self.sms.dry_run,
            default_country_code: self.sms.default_country_code.clone(),
            validity_minutes: self.sms.validity_minutes,
        }
    }
}

fn parse_offset(raw: &str) -> anyhow::Result<FixedOffset> {
    raw.parse::<FixedOffset>()
        .with_context(|| format!("invalid UTC offset: {raw}"))
}
