use std::sync::Arc;

use chrono::{DateTime, Utc};
use lorawatch_common::Metrics;
use serde_json::json;
use tracing::{error, info};

use crate::alert_manager::CheckOptions;
use crate::application::Application;
use crate::contacts;
use crate::device::Device;
use crate::error::{DomainError, DomainResult};
use crate::gateway::Gateway;
use crate::humanize;
use crate::notifier::{MailRequest, MailSender, SmsSender};
use crate::settings::AlertSettings;
use crate::template::TemplateRenderer;

const DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S";
const UNNAMED_APPLICATION: &str = "unnamed application";

/// Renders and sends the notifications for one stale, non-silenced entity.
///
/// Mail and SMS are gated independently; a failure on one channel never
/// skips the attempt on the other. The triggered counter increments once
/// per entity, not per channel.
pub struct NotificationDispatcher {
    mailer: Arc<dyn MailSender>,
    sms: Arc<dyn SmsSender>,
    templates: Arc<dyn TemplateRenderer>,
    metrics: Arc<Metrics>,
    settings: AlertSettings,
}

impl NotificationDispatcher {
    pub fn new(
        mailer: Arc<dyn MailSender>,
        sms: Arc<dyn SmsSender>,
        templates: Arc<dyn TemplateRenderer>,
        metrics: Arc<Metrics>,
        settings: AlertSettings,
    ) -> Self {
        Self {
            mailer,
            sms,
            templates,
            metrics,
            settings,
        }
    }

    pub async fn dispatch_gateway(
        &self,
        gateway: &Gateway,
        diff_secs: i64,
        opts: &CheckOptions,
    ) -> DomainResult<()> {
        self.metrics.gateway_alerts_triggered.inc();
        info!(
            gateway_id = %gateway.gateway_id,
            offline_secs = diff_secs,
            "Gateway offline, dispatching alert"
        );

        let ago = humanize::ago(diff_secs);
        let url = format!("{}{}", self.settings.gateway.base_url, gateway.gateway_id);
        let mut first_error: Option<DomainError> = None;

        if !opts.no_mail {
            let request = MailRequest {
                to: contacts::gateway_mail(
                    gateway,
                    &opts.override_mail,
                    &self.settings.gateway.fallback_mail,
                ),
                subject: format!(
                    "Gateway \"{}\" offline since {}",
                    gateway.name,
                    gateway.last_seen_at.format(DATE_FORMAT),
                ),
                ref_id: gateway.gateway_id.clone(),
                html_template: "gateway.html".to_string(),
                text_template: "gateway.txt".to_string(),
                context: json!({
                    "gateway": gateway,
                    "diff": diff_secs,
                    "ago": ago,
                    "url": url,
                }),
            };
            if let Err(err) = self.mailer.send(request).await {
                error!(gateway_id = %gateway.gateway_id, "Gateway alert mail failed: {err}");
                first_error = Some(err);
            }
        }

        if !opts.no_sms {
            let result = self
                .send_sms(
                    contacts::gateway_phone(
                        gateway,
                        &opts.override_phone,
                        &self.settings.gateway.fallback_phone,
                    ),
                    "sms/gateway",
                    json!({ "gateway": gateway, "ago": ago, "url": url }),
                )
                .await;
            if let Err(err) = result {
                error!(gateway_id = %gateway.gateway_id, "Gateway alert SMS failed: {err}");
                first_error = first_error.or(Some(err));
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub async fn dispatch_device(
        &self,
        device: &Device,
        application: Option<&Application>,
        diff_secs: i64,
        last_sent: DateTime<Utc>,
        opts: &CheckOptions,
    ) -> DomainResult<()> {
        self.metrics.device_alerts_triggered.inc();
        info!(
            device_id = device.id,
            offline_secs = diff_secs,
            "Device offline, dispatching alert"
        );

        let ago = humanize::ago(diff_secs);
        let url = self
            .settings
            .device
            .base_url
            .replace("{application}", &device.application_id.to_string())
            .replace("{device}", &device.id.to_string());
        let application_url = self
            .settings
            .application
            .base_url
            .replace(
                "{application}",
                &application.map(|app| app.id).unwrap_or(0).to_string(),
            );
        let mut first_error: Option<DomainError> = None;

        if !opts.no_mail {
            let application_name = application
                .map(|app| app.name.as_str())
                .unwrap_or(UNNAMED_APPLICATION);
            let request = MailRequest {
                to: contacts::device_mail(
                    device,
                    application,
                    &opts.override_mail,
                    &self.settings.device.metadata_field_mail,
                    &self.settings.device.fallback_mail,
                ),
                subject: format!(
                    "Device \"{}\" offline since {} ({})",
                    device.name,
                    last_sent.format(DATE_FORMAT),
                    application_name,
                ),
                ref_id: device.eui.clone(),
                html_template: "device.html".to_string(),
                text_template: "device.txt".to_string(),
                context: json!({
                    "application": application,
                    "application_url": application_url,
                    "device": device,
                    "diff": diff_secs,
                    "ago": ago,
                    "url": url,
                }),
            };
            if let Err(err) = self.mailer.send(request).await {
                error!(device_id = device.id, "Device alert mail failed: {err}");
                first_error = Some(err);
            }
        }

        if !opts.no_sms {
            let result = self
                .send_sms(
                    contacts::device_phone(
                        device,
                        application,
                        &opts.override_phone,
                        &self.settings.device.metadata_field_phone,
                        &self.settings.device.fallback_phone,
                    ),
                    "sms/device",
                    json!({ "device": device, "ago": ago, "url": url }),
                )
                .await;
            if let Err(err) = result {
                error!(device_id = device.id, "Device alert SMS failed: {err}");
                first_error = first_error.or(Some(err));
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn send_sms(
        &self,
        to: String,
        template: &str,
        context: serde_json::Value,
    ) -> DomainResult<()> {
        let message = self.templates.render(template, &context)?;
        self.sms.send(&[to], &message, false).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use lorawatch_common::Registry;
    use mockall::predicate;

    use super::*;
    use crate::metadata::Metadata;
    use crate::notifier::{MockMailSender, MockSmsSender};
    use crate::template::MockTemplateRenderer;
    use crate::types::{Location, Status};

    fn test_gateway() -> Gateway {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Gateway {
            id: 7,
            gateway_id: "7276ff002e062c01".to_string(),
            created_at: created,
            updated_at: created,
            last_seen_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 13, 20).unwrap(),
            name: "Rooftop".to_string(),
            description: None,
            location: Location {
                latitude: 56.15,
                longitude: 10.21,
            },
            status: Status::InOperation,
            responsible_name: None,
            responsible_email: None,
            responsible_phone: None,
            tags: Default::default(),
        }
    }

    fn test_device() -> Device {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Device {
            id: 3,
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
            metadata: Metadata::new(),
        }
    }

    fn rendering_templates() -> MockTemplateRenderer {
        let mut templates = MockTemplateRenderer::new();
        templates
            .expect_render()
            .returning(|_, _| Ok("rendered message".to_string()));
        templates
    }

    fn dispatcher(
        mailer: MockMailSender,
        sms: MockSmsSender,
        templates: MockTemplateRenderer,
    ) -> (NotificationDispatcher, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new(&Registry::new()).unwrap());
        let dispatcher = NotificationDispatcher::new(
            Arc::new(mailer),
            Arc::new(sms),
            Arc::new(templates),
            metrics.clone(),
            AlertSettings::default(),
        );
        (dispatcher, metrics)
    }

    #[tokio::test]
    async fn test_dispatch_gateway_sends_mail_and_sms_to_fallbacks() {
        let mut mailer = MockMailSender::new();
        mailer
            .expect_send()
            .withf(|request: &MailRequest| {
                request.to == "iot-alerts@example.com"
                    && request.ref_id == "7276ff002e062c01"
                    && request.subject.contains("Rooftop")
                    && request.subject.contains("01-06-2024 09:13:20")
            })
            .times(1)
            .return_once(|_| Ok(()));

        let mut sms = MockSmsSender::new();
        sms.expect_send()
            .withf(|to: &[String], message: &str, flash: &bool| {
                to == ["+4512345678".to_string()] && message == "rendered message" && !flash
            })
            .times(1)
            .return_once(|_, _, _| Ok(100));

        let (dispatcher, metrics) = dispatcher(mailer, sms, rendering_templates());
        let result = dispatcher
            .dispatch_gateway(&test_gateway(), 10_000, &CheckOptions::default())
            .await;

        assert!(result.is_ok());
        assert_eq!(metrics.gateway_alerts_triggered.get(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_gateway_respects_override_mail() {
        let mut mailer = MockMailSender::new();
        mailer
            .expect_send()
            .withf(|request: &MailRequest| request.to == "test@example.com")
            .times(1)
            .return_once(|_| Ok(()));

        let mut sms = MockSmsSender::new();
        sms.expect_send().times(1).return_once(|_, _, _| Ok(100));

        let (dispatcher, _) = dispatcher(mailer, sms, rendering_templates());
        let opts = CheckOptions {
            override_mail: "test@example.com".to_string(),
            ..CheckOptions::default()
        };
        assert!(dispatcher
            .dispatch_gateway(&test_gateway(), 10_000, &opts)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_gateway_no_mail_still_sends_sms() {
        // No expectation on the mailer: any send call would panic.
        let mailer = MockMailSender::new();
        let mut sms = MockSmsSender::new();
        sms.expect_send().times(1).return_once(|_, _, _| Ok(100));

        let (dispatcher, metrics) = dispatcher(mailer, sms, rendering_templates());
        let opts = CheckOptions {
            no_mail: true,
            ..CheckOptions::default()
        };
        assert!(dispatcher
            .dispatch_gateway(&test_gateway(), 10_000, &opts)
            .await
            .is_ok());
        assert_eq!(metrics.gateway_alerts_triggered.get(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_gateway_mail_failure_does_not_skip_sms() {
        let mut mailer = MockMailSender::new();
        mailer
            .expect_send()
            .times(1)
            .return_once(|_| Err(DomainError::Mail("connection refused".to_string())));

        let mut sms = MockSmsSender::new();
        sms.expect_send().times(1).return_once(|_, _, _| Ok(100));

        let (dispatcher, metrics) = dispatcher(mailer, sms, rendering_templates());
        let result = dispatcher
            .dispatch_gateway(&test_gateway(), 10_000, &CheckOptions::default())
            .await;

        assert!(matches!(result, Err(DomainError::Mail(_))));
        assert_eq!(metrics.gateway_alerts_triggered.get(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_device_names_unnamed_application() {
        let mut mailer = MockMailSender::new();
        mailer
            .expect_send()
            .withf(|request: &MailRequest| {
                request.subject.contains("(unnamed application)")
                    && request.ref_id == "0011223344556677"
            })
            .times(1)
            .return_once(|_| Ok(()));

        let mut sms = MockSmsSender::new();
        sms.expect_send().times(1).return_once(|_, _, _| Ok(100));

        let (dispatcher, metrics) = dispatcher(mailer, sms, rendering_templates());
        let last_sent = Utc.with_ymd_and_hms(2024, 6, 1, 9, 13, 20).unwrap();
        assert!(dispatcher
            .dispatch_device(&test_device(), None, 10_000, last_sent, &CheckOptions::default())
            .await
            .is_ok());
        assert_eq!(metrics.device_alerts_triggered.get(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_device_builds_deep_links_from_patterns() {
        let mut mailer = MockMailSender::new();
        mailer
            .expect_send()
            .withf(|request: &MailRequest| {
                request.context["url"]
                    == "https://iot.example.com/application/10/device/3"
            })
            .times(1)
            .return_once(|_| Ok(()));

        let sms = MockSmsSender::new();
        let (dispatcher, _) = dispatcher(mailer, sms, rendering_templates());
        let last_sent = Utc.with_ymd_and_hms(2024, 6, 1, 9, 13, 20).unwrap();
        let opts = CheckOptions {
            no_sms: true,
            ..CheckOptions::default()
        };
        assert!(dispatcher
            .dispatch_device(&test_device(), None, 10_000, last_sent, &opts)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_gateway_template_failure_is_surfaced() {
        let mut mailer = MockMailSender::new();
        mailer.expect_send().times(1).return_once(|_| Ok(()));

        let sms = MockSmsSender::new();
        let mut templates = MockTemplateRenderer::new();
        templates
            .expect_render()
            .with(predicate::eq("sms/gateway"), predicate::always())
            .return_once(|_, _| Err(DomainError::Template("unknown template".to_string())));

        let (dispatcher, _) = dispatcher(mailer, sms, templates);
        let result = dispatcher
            .dispatch_gateway(&test_gateway(), 10_000, &CheckOptions::default())
            .await;
        assert!(matches!(result, Err(DomainError::Template(_))));
    }
}
