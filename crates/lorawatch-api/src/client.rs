use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use tracing::debug;

use lorawatch_domain::{
    Application, Device, DomainError, DomainResult, Gateway, IotApiRepository,
};

use crate::config::ApiClientConfig;
use crate::parser::ApiParser;

/// HTTP client for the device-management API.
///
/// Listing responses are cached per filter flag with the configured TTLs;
/// everything else goes straight to the API. The raw body is cached and
/// parsed on every read, matching the parse counters to actual use.
pub struct IotApiClient {
    http: reqwest::Client,
    config: ApiClientConfig,
    parser: ApiParser,
    application_cache: Cache<bool, String>,
    gateway_cache: Cache<bool, String>,
}

impl IotApiClient {
    pub fn new(config: ApiClientConfig, parser: ApiParser) -> Self {
        let application_cache = Cache::builder()
            .time_to_live(Duration::from_secs(config.application_cache_ttl_secs))
            .build();
        let gateway_cache = Cache::builder()
            .time_to_live(Duration::from_secs(config.gateway_cache_ttl_secs))
            .build();

        Self {
            http: reqwest::Client::new(),
            config,
            parser,
            application_cache,
            gateway_cache,
        }
    }

    async fn fetch(&self, path: &str, query: &[(&str, String)]) -> DomainResult<String> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(url = %url, "Fetching from the IoT API");

        let mut request = self.http.get(&url).query(query);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| DomainError::Fetch(err.to_string()))?
            .error_for_status()
            .map_err(|err| DomainError::Fetch(err.to_string()))?;

        response
            .text()
            .await
            .map_err(|err| DomainError::Fetch(err.to_string()))
    }

    async fn application_listing(&self, filter_on_status: bool) -> DomainResult<String> {
        self.application_cache
            .try_get_with(filter_on_status, async {
                self.fetch(
                    "/api/v1/application",
                    &[
                        ("offset", "0".to_string()),
                        ("limit", self.config.request_limit.to_string()),
                    ],
                )
                .await
            })
            .await
            .map_err(|err| (*err).clone())
    }

    async fn gateway_listing(&self, filter_on_status: bool) -> DomainResult<String> {
        self.gateway_cache
            .try_get_with(filter_on_status, async {
                self.fetch(
                    "/api/v1/chirpstack/gateway",
                    &[
                        (
                            "organizationId",
                            self.config.gateway_organization_id.to_string(),
                        ),
                        ("offset", "0".to_string()),
                        ("limit", self.config.request_limit.to_string()),
                    ],
                )
                .await
            })
            .await
            .map_err(|err| (*err).clone())
    }
}

#[async_trait]
impl IotApiRepository for IotApiClient {
    async fn get_applications(&self, filter_on_status: bool) -> DomainResult<Vec<Application>> {
        let content = self.application_listing(filter_on_status).await?;
        self.parser.applications(&content, filter_on_status)
    }

    async fn get_application(&self, id: i64) -> DomainResult<Application> {
        let content = self.fetch(&format!("/api/v1/application/{id}"), &[]).await?;
        let data: Value = serde_json::from_str(&content)
            .map_err(|err| DomainError::Parse(format!("invalid application: {err}")))?;
        self.parser.application(&data)
    }

    async fn get_gateways(&self, filter_on_status: bool) -> DomainResult<Vec<Gateway>> {
        let content = self.gateway_listing(filter_on_status).await?;
        self.parser.gateways(&content, filter_on_status)
    }

    async fn get_gateway(&self, gateway_id: &str) -> DomainResult<Gateway> {
        let content = self
            .fetch(&format!("/api/v1/chirpstack/gateway/{gateway_id}"), &[])
            .await?;
        let data: Value = serde_json::from_str(&content)
            .map_err(|err| DomainError::Parse(format!("invalid gateway: {err}")))?;
        let gateway = data
            .get("gateway")
            .ok_or_else(|| DomainError::Parse("gateway response missing `gateway`".to_string()))?;
        self.parser.gateway(gateway)
    }

    async fn get_device(&self, id: i64) -> DomainResult<Device> {
        let content = self.fetch(&format!("/api/v1/iot-device/{id}"), &[]).await?;
        // The reception records only carry gateway EUIs; the gateway
        // collection supplies the display names.
        let gateways = self.get_gateways(false).await?;
        self.parser.device(&content, &gateways)
    }
}
