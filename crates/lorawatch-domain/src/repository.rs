use async_trait::async_trait;

use crate::application::Application;
use crate::device::Device;
use crate::error::DomainResult;
use crate::gateway::Gateway;

/// Read-only access to the device-management API.
/// Infrastructure (lorawatch-api) implements this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IotApiRepository: Send + Sync {
    /// List applications, optionally filtered to the configured statuses.
    async fn get_applications(&self, filter_on_status: bool) -> DomainResult<Vec<Application>>;

    /// Get a single application by id.
    async fn get_application(&self, id: i64) -> DomainResult<Application>;

    /// List gateways, optionally filtered to the configured statuses.
    async fn get_gateways(&self, filter_on_status: bool) -> DomainResult<Vec<Gateway>>;

    /// Get a single gateway by its EUI.
    async fn get_gateway(&self, gateway_id: &str) -> DomainResult<Gateway>;

    /// Get a single device by id.
    async fn get_device(&self, id: i64) -> DomainResult<Device>;
}
