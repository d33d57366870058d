use std::sync::Arc;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use lorawatch_common::Metrics;
use tracing::{debug, error};

use lorawatch_domain::{DomainError, DomainResult, MailRequest, MailSender, TemplateRenderer};

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Empty credentials switch to an unauthenticated connection, e.g. a
    /// local relay.
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_address: String,
    pub from_name: String,
    pub reply_to: String,
    /// Address copied on every alert; empty disables the CC.
    pub cc: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: "alerts@example.com".to_string(),
            from_name: "IoT alert manager".to_string(),
            reply_to: "noreply@example.com".to_string(),
            cc: String::new(),
        }
    }
}

/// SMTP-backed mail transport. Renders the named template pair, builds a
/// multipart alternative message and threads repeated alerts for the same
/// entity with a References header derived from the request's ref id.
pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: MailConfig,
    templates: Arc<dyn TemplateRenderer>,
    metrics: Arc<Metrics>,
}

impl SmtpMailSender {
    pub fn new(
        config: MailConfig,
        templates: Arc<dyn TemplateRenderer>,
        metrics: Arc<Metrics>,
    ) -> DomainResult<Self> {
        let transport = if config.smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|err| DomainError::Mail(err.to_string()))?
                .port(config.smtp_port)
                .credentials(Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.clone(),
                ))
                .build()
        };

        Ok(Self {
            transport,
            config,
            templates,
            metrics,
        })
    }

    fn build_message(
        &self,
        request: &MailRequest,
        html_body: String,
        text_body: String,
    ) -> DomainResult<Message> {
        let from = Mailbox::new(
            Some(self.config.from_name.clone()),
            parse_address(&self.config.from_address)?,
        );

        let mut builder = Message::builder()
            .from(from)
            .to(Mailbox::new(None, parse_address(&request.to)?))
            .subject(request.subject.clone());

        if !self.config.reply_to.is_empty() {
            builder = builder.reply_to(Mailbox::new(None, parse_address(&self.config.reply_to)?));
        }
        if !self.config.cc.is_empty() {
            builder = builder.cc(Mailbox::new(None, parse_address(&self.config.cc)?));
        }

        // Thread repeated alerts for the same entity into one conversation.
        let domain = self
            .config
            .from_address
            .split('@')
            .nth(1)
            .unwrap_or("localhost");
        builder = builder.references(format!("<{}@{}>", request.ref_id, domain));

        builder
            .multipart(MultiPart::alternative_plain_html(text_body, html_body))
            .map_err(|err| DomainError::Mail(err.to_string()))
    }
}

#[async_trait::async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, request: MailRequest) -> DomainResult<()> {
        let html_body = self
            .templates
            .render(&request.html_template, &request.context)?;
        let text_body = self
            .templates
            .render(&request.text_template, &request.context)?;

        let message = self.build_message(&request, html_body, text_body)?;

        debug!(to = %request.to, subject = %request.subject, "Sending notification mail");
        match self.transport.send(message).await {
            Ok(_) => {
                self.metrics.mails_sent.inc();
                Ok(())
            }
            Err(err) => {
                error!(to = %request.to, "SMTP send failed: {err}");
                self.metrics.mail_failures.inc();
                Err(DomainError::Mail(err.to_string()))
            }
        }
    }
}

fn parse_address(raw: &str) -> DomainResult<Address> {
    raw.parse::<Address>()
        .map_err(|err| DomainError::Mail(format!("invalid address {raw}: {err}")))
}
