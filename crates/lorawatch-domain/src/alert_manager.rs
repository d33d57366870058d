use std::sync::Arc;

use chrono::{DateTime, Utc};
use lorawatch_common::Metrics;
use tracing::{debug, error, info};

use crate::application::Application;
use crate::dispatcher::NotificationDispatcher;
use crate::error::{DomainError, DomainResult};
use crate::notifier::{MailSender, SmsSender};
use crate::repository::IotApiRepository;
use crate::settings::AlertSettings;
use crate::silence::SilenceEvaluator;
use crate::staleness;
use crate::template::TemplateRenderer;

/// Per-invocation switches for a check run.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub filter_on_status: bool,
    pub override_mail: String,
    pub override_phone: String,
    pub no_mail: bool,
    pub no_sms: bool,
}

/// Outcome of evaluating one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCheckStatus {
    Alerted,
    Fresh,
    Silenced,
    MissingMessage,
}

/// One entity that failed during a collection run.
#[derive(Debug)]
pub struct CheckFailure {
    pub entity: String,
    pub error: DomainError,
}

/// Summary of a collection run. Failures are per-entity; the run itself
/// only aborts when the collection fetch fails.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub checked: u64,
    pub triggered: u64,
    pub failures: Vec<CheckFailure>,
}

/// Top-level control for a check run: pulls entity collections from the
/// API, evaluates staleness and silencing, and hands stale entities to the
/// dispatcher. Driven by a caller-supplied `now` so runs are reproducible.
///
/// A failing entity is logged, counted and recorded in the report; its
/// siblings are still evaluated. Only collection-level fetch errors abort
/// a call.
pub struct AlertManager {
    api: Arc<dyn IotApiRepository>,
    dispatcher: NotificationDispatcher,
    silence: SilenceEvaluator,
    settings: AlertSettings,
    metrics: Arc<Metrics>,
}

impl AlertManager {
    pub fn new(
        api: Arc<dyn IotApiRepository>,
        mailer: Arc<dyn MailSender>,
        sms: Arc<dyn SmsSender>,
        templates: Arc<dyn TemplateRenderer>,
        metrics: Arc<Metrics>,
        settings: AlertSettings,
    ) -> Self {
        Self {
            api,
            dispatcher: NotificationDispatcher::new(
                mailer,
                sms,
                templates,
                metrics.clone(),
                settings.clone(),
            ),
            silence: SilenceEvaluator::new(settings.silence.clone(), metrics.clone()),
            settings,
            metrics,
        }
    }

    /// Check all gateways against the configured last-seen limit.
    pub async fn check_gateways(
        &self,
        now: DateTime<Utc>,
        opts: &CheckOptions,
    ) -> DomainResult<CheckReport> {
        let gateways = self.api.get_gateways(opts.filter_on_status).await?;
        info!(count = gateways.len(), "Checking gateways");

        let mut report = CheckReport::default();
        for gateway in &gateways {
            report.checked += 1;

            let diff = staleness::diff_seconds(gateway.last_seen_at, now);
            if !staleness::is_stale(diff, self.settings.gateway.limit_secs) {
                continue;
            }
            if self.silence.is_gateway_silenced(gateway, now) {
                debug!(gateway_id = %gateway.gateway_id, "Gateway alert is silenced");
                continue;
            }

            match self.dispatcher.dispatch_gateway(gateway, diff, opts).await {
                Ok(()) => report.triggered += 1,
                Err(err) => {
                    error!(
                        gateway_id = %gateway.gateway_id,
                        "Gateway alert dispatch failed: {err}"
                    );
                    report.failures.push(CheckFailure {
                        entity: format!("gateway {}", gateway.gateway_id),
                        error: err,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Check all applications, cascading into their devices. Applications
    /// outside their configured active window are skipped entirely.
    pub async fn check_applications(
        &self,
        now: DateTime<Utc>,
        opts: &CheckOptions,
    ) -> DomainResult<CheckReport> {
        let applications = self.api.get_applications(opts.filter_on_status).await?;
        info!(count = applications.len(), "Checking applications");

        let mut report = CheckReport::default();
        for application in &applications {
            if self.skip_by_start_date(application, now) || self.skip_by_end_date(application, now)
            {
                debug!(
                    application_id = application.id,
                    "Application outside its active window, skipping"
                );
                continue;
            }

            for &device_id in &application.devices {
                report.checked += 1;
                match self
                    .check_device(now, device_id, Some(application), opts)
                    .await
                {
                    Ok(DeviceCheckStatus::Alerted) => report.triggered += 1,
                    Ok(_) => {}
                    Err(err) => {
                        error!(
                            device_id,
                            application_id = application.id,
                            "Device check failed: {err}"
                        );
                        report.failures.push(CheckFailure {
                            entity: format!("device {device_id}"),
                            error: err,
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    /// Check one device against its effective staleness limit. Devices
    /// without a latest received message are recorded and never alerted.
    pub async fn check_device(
        &self,
        now: DateTime<Utc>,
        device_id: i64,
        application: Option<&Application>,
        opts: &CheckOptions,
    ) -> DomainResult<DeviceCheckStatus> {
        let device = self.api.get_device(device_id).await?;

        let Some(message) = device.latest_received_message.as_ref() else {
            info!(
                device_id = device.id,
                "Device has no received messages, cannot evaluate staleness"
            );
            self.metrics.message_missing(device.id);
            return Ok(DeviceCheckStatus::MissingMessage);
        };

        let limit = staleness::device_limit(
            &device,
            &self.settings.device.metadata_field_limit,
            self.settings.device.fallback_limit_secs,
        );
        let diff = staleness::diff_seconds(message.sent_time, now);
        if !staleness::is_stale(diff, limit) {
            return Ok(DeviceCheckStatus::Fresh);
        }
        if self.silence.is_device_silenced(&device, now) {
            debug!(device_id = device.id, "Device alert is silenced");
            return Ok(DeviceCheckStatus::Silenced);
        }

        self.dispatcher
            .dispatch_device(&device, application, diff, message.sent_time, opts)
            .await?;
        Ok(DeviceCheckStatus::Alerted)
    }

    fn skip_by_start_date(&self, application: &Application, now: DateTime<Utc>) -> bool {
        if !self.settings.application.check_start_date {
            return false;
        }
        // Without a start date there is nothing to skip on.
        match application.start_date {
            Some(start_date) => now <= start_date,
            None => false,
        }
    }

    fn skip_by_end_date(&self, application: &Application, now: DateTime<Utc>) -> bool {
        if !self.settings.application.check_end_date {
            return false;
        }
        match application.end_date {
            Some(end_date) => now >= end_date,
            None => false,
        }
    }
}
