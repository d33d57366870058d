mod mail;
mod sms;
mod templates;

pub use mail::{MailConfig, SmtpMailSender};
pub use sms::{HttpSmsClient, SmsConfig};
pub use templates::HandlebarsRenderer;
