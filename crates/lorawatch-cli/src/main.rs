mod cli;
mod config;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};
use clap::Parser;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lorawatch_api::{ApiParser, IotApiClient};
use lorawatch_common::{export_metrics, Metrics, Registry};
use lorawatch_domain::{
    AlertManager, CheckOptions, CheckReport, IotApiRepository, MailRequest, MailSender, SmsSender,
};
use lorawatch_notify::{HandlebarsRenderer, HttpSmsClient, SmtpMailSender};

use crate::cli::{ApiCommand, ChecksArgs, Cli, Command, MailTestArgs, SmsTestArgs};
use crate::config::ServiceConfig;

const DATE_OVERRIDE_FORMAT: &str = "%d-%m-%yT%H:%M:%S";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    match run(cli, config).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

struct Services {
    registry: Registry,
    metrics: Arc<Metrics>,
    api: Arc<IotApiClient>,
    mailer: Arc<SmtpMailSender>,
    sms: Arc<HttpSmsClient>,
    manager: AlertManager,
}

fn build_services(config: &ServiceConfig) -> anyhow::Result<Services> {
    let registry = Registry::new();
    let metrics =
        Arc::new(Metrics::new(&registry).context("failed to register metrics")?);

    let api_config = config.api_client_config()?;
    let parser = ApiParser::new(&api_config, metrics.clone());
    let api = Arc::new(IotApiClient::new(api_config, parser));

    let templates = Arc::new(HandlebarsRenderer::new()?);
    let mailer = Arc::new(SmtpMailSender::new(
        config.mail_config(),
        templates.clone(),
        metrics.clone(),
    )?);
    let sms = Arc::new(HttpSmsClient::new(config.sms_config(), metrics.clone()));

    let manager = AlertManager::new(
        api.clone(),
        mailer.clone(),
        sms.clone(),
        templates,
        metrics.clone(),
        config.alert_settings()?,
    );

    Ok(Services {
        registry,
        metrics,
        api,
        mailer,
        sms,
        manager,
    })
}

async fn run(cli: Cli, config: ServiceConfig) -> anyhow::Result<ExitCode> {
    let services = build_services(&config)?;

    match cli.command {
        Command::Checks(args) => run_checks(&services, &config, args).await,
        Command::Api(command) => run_api(services.api.as_ref(), command).await,
        Command::MailTest(args) => run_mail_test(services.mailer.as_ref(), args).await,
        Command::SmsTest(args) => run_sms_test(services.sms.as_ref(), args).await,
    }
}

async fn run_checks(
    services: &Services,
    config: &ServiceConfig,
    args: ChecksArgs,
) -> anyhow::Result<ExitCode> {
    let metrics = &services.metrics;
    metrics.checks_started.inc();

    let now = match resolve_now(args.date.as_deref(), config.date_override_offset()?) {
        Ok(now) => now,
        Err(err) => {
            error!("DateError: {err:#}");
            metrics.checks_errors.inc();
            if args.debug {
                return Err(err);
            }
            return Ok(ExitCode::FAILURE);
        }
    };
    info!("The date used for checking: {}", now.format(DATE_OVERRIDE_FORMAT));

    if args.only_device && args.device_id.is_none() {
        error!("Device id is required");
        metrics.checks_errors.inc();
        return Ok(ExitCode::FAILURE);
    }

    let opts = CheckOptions {
        filter_on_status: args.filter_status,
        override_mail: args.override_mail.clone(),
        override_phone: args.override_phone.clone(),
        no_mail: args.no_mails,
        no_sms: args.no_sms,
    };

    let manager = &services.manager;
    let outcome: anyhow::Result<u64> = async {
        let mut failures = 0;
        if args.only_applications || args.all {
            failures += log_report("applications", &manager.check_applications(now, &opts).await?);
        }
        if args.only_gateways || args.all {
            failures += log_report("gateways", &manager.check_gateways(now, &opts).await?);
        }
        if args.only_device {
            if let Some(device_id) = args.device_id {
                let status = manager.check_device(now, device_id, None, &opts).await?;
                info!(device_id, ?status, "Device check finished");
            }
        }
        Ok(failures)
    }
    .await;

    if args.debug {
        info!("Metrics for this run:\n{}", export_metrics(&services.registry));
    }

    match outcome {
        Ok(0) => {
            metrics.checks_completed.inc();
            Ok(ExitCode::SUCCESS)
        }
        Ok(failures) => {
            error!(failures, "Check run finished with entity failures");
            metrics.checks_errors.inc();
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            error!("CheckError: {err:#}");
            metrics.checks_errors.inc();
            if args.debug {
                return Err(err);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn log_report(kind: &str, report: &CheckReport) -> u64 {
    info!(
        kind,
        checked = report.checked,
        triggered = report.triggered,
        failures = report.failures.len(),
        "Check finished"
    );
    for failure in &report.failures {
        error!(kind, entity = %failure.entity, "Entity check failed: {}", failure.error);
    }
    report.failures.len() as u64
}

async fn run_api(api: &IotApiClient, command: ApiCommand) -> anyhow::Result<ExitCode> {
    let output = match command {
        ApiCommand::Applications { filter_status } => {
            serde_json::to_string_pretty(&api.get_applications(filter_status).await?)?
        }
        ApiCommand::Gateways { filter_status } => {
            serde_json::to_string_pretty(&api.get_gateways(filter_status).await?)?
        }
        ApiCommand::Application { id } => {
            serde_json::to_string_pretty(&api.get_application(id).await?)?
        }
        ApiCommand::Device { id } => serde_json::to_string_pretty(&api.get_device(id).await?)?,
    };
    println!("{output}");
    Ok(ExitCode::SUCCESS)
}

async fn run_mail_test(mailer: &SmtpMailSender, args: MailTestArgs) -> anyhow::Result<ExitCode> {
    let last_seen = Utc::now() - Duration::hours(1);
    mailer
        .send(MailRequest {
            to: args.to.clone(),
            subject: "Test mail from the alert manager".to_string(),
            ref_id: "mail-test".to_string(),
            html_template: "test.html".to_string(),
            text_template: "test.txt".to_string(),
            context: json!({
                "name": "TEST TEST",
                "seen_ago": "3600",
                "last_seen_date": last_seen.to_rfc3339(),
                "description": args.message,
                "location": { "latitude": 56.153540, "longitude": 10.214136 },
                "battery": 67.234643,
            }),
        })
        .await?;

    info!(to = %args.to, "Successfully sent test mail");
    Ok(ExitCode::SUCCESS)
}

async fn run_sms_test(sms: &HttpSmsClient, args: SmsTestArgs) -> anyhow::Result<ExitCode> {
    let batch_id = sms
        .send(&[args.to.clone()], &args.message, args.flash)
        .await?;
    info!(to = %args.to, batch_id, "Successfully sent test SMS");
    Ok(ExitCode::SUCCESS)
}

/// The timestamp the checks run against: an explicit `--date` override in
/// the configured offset, or the current time.
fn resolve_now(date: Option<&str>, offset: FixedOffset) -> anyhow::Result<DateTime<Utc>> {
    let Some(raw) = date else {
        return Ok(Utc::now());
    };

    let naive = NaiveDateTime::parse_from_str(raw, DATE_OVERRIDE_FORMAT)
        .with_context(|| format!("invalid date override: {raw}"))?;
    let local = naive
        .and_local_timezone(offset)
        .single()
        .with_context(|| format!("ambiguous date override: {raw}"))?;
    Ok(local.with_timezone(&Utc))
}
