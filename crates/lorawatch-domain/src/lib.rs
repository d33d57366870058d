pub mod alert_manager;
pub mod application;
pub mod contacts;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod humanize;
pub mod message;
pub mod metadata;
pub mod notifier;
pub mod repository;
pub mod settings;
pub mod silence;
pub mod staleness;
pub mod template;
pub mod types;

pub use alert_manager::{
    AlertManager, CheckFailure, CheckOptions, CheckReport, DeviceCheckStatus,
};
pub use application::Application;
pub use device::Device;
pub use dispatcher::NotificationDispatcher;
pub use error::{DomainError, DomainResult};
pub use gateway::Gateway;
pub use message::{Message, ReceivedInfo};
pub use metadata::{Metadata, MetadataValue};
pub use notifier::{MailRequest, MailSender, SmsSender};
pub use repository::IotApiRepository;
pub use settings::{
    AlertSettings, ApplicationSettings, DeviceSettings, GatewaySettings, SilenceSettings,
};
pub use silence::SilenceEvaluator;
pub use template::TemplateRenderer;
pub use types::{Location, Status};

#[cfg(any(test, feature = "testing"))]
pub use notifier::{MockMailSender, MockSmsSender};
#[cfg(any(test, feature = "testing"))]
pub use repository::MockIotApiRepository;
#[cfg(any(test, feature = "testing"))]
pub use template::MockTemplateRenderer;
