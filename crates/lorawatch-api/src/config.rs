use chrono::{FixedOffset, Offset, Utc};

/// Connection and parsing configuration for the device-management API.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    /// Bearer token; empty disables authentication.
    pub api_key: String,
    /// Organization whose gateways are listed.
    pub gateway_organization_id: i64,
    /// The API's offset/limit handling is unreliable, so lists are fetched
    /// in one request with offset 0 and this limit.
    pub request_limit: i64,
    pub application_cache_ttl_secs: u64,
    pub gateway_cache_ttl_secs: u64,
    /// Statuses kept when a listing is fetched with filtering enabled,
    /// compared against the raw API value.
    pub statuses: Vec<String>,
    /// chrono format string for API timestamps.
    pub time_format: String,
    /// Offset the API's local timestamps are expressed in.
    pub utc_offset: FixedOffset,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key: String::new(),
            gateway_organization_id: 1,
            request_limit: 999,
            application_cache_ttl_secs: 300,
            gateway_cache_ttl_secs: 300,
            statuses: vec!["IN-OPERATION".to_string()],
            time_format: "%Y-%m-%dT%H:%M:%S%.fZ".to_string(),
            utc_offset: Utc.fix(),
        }
    }
}
