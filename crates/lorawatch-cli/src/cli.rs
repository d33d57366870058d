use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "lorawatch", about = "Offline alerts for IoT gateways and devices", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the offline checks
    Checks(ChecksArgs),
    /// Inspect raw data from the device-management API
    #[command(subcommand)]
    Api(ApiCommand),
    /// Send a test mail
    MailTest(MailTestArgs),
    /// Send a test SMS
    SmsTest(SmsTestArgs),
}

#[derive(Debug, Args)]
pub struct ChecksArgs {
    /// Override the datetime used in checks, format "dd-mm-yyTHH:MM:SS"
    #[arg(long)]
    pub date: Option<String>,

    /// Run all checks
    #[arg(short, long)]
    pub all: bool,

    /// Only check applications
    #[arg(long)]
    pub only_applications: bool,

    /// Only check gateways
    #[arg(long)]
    pub only_gateways: bool,

    /// Only check one device, requires --device-id
    #[arg(long)]
    pub only_device: bool,

    /// Id of the device to check
    #[arg(long)]
    pub device_id: Option<i64>,

    /// Do not send mails
    #[arg(long = "no-mails")]
    pub no_mails: bool,

    /// Do not send SMS
    #[arg(long = "no-sms")]
    pub no_sms: bool,

    /// Filter on the configured statuses
    #[arg(long)]
    pub filter_status: bool,

    /// Override the address mails are sent to
    #[arg(long, default_value = "")]
    pub override_mail: String,

    /// Override the phone number messages are sent to
    #[arg(long, default_value = "")]
    pub override_phone: String,

    /// Re-raise errors instead of swallowing them
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Subcommand)]
pub enum ApiCommand {
    /// List applications
    Applications {
        /// Filter on the configured statuses
        #[arg(long)]
        filter_status: bool,
    },
    /// List gateways
    Gateways {
        /// Filter on the configured statuses
        #[arg(long)]
        filter_status: bool,
    },
    /// Get a single application
    Application { id: i64 },
    /// Get a single device
    Device { id: i64 },
}

#[derive(Debug, Args)]
pub struct MailTestArgs {
    /// Address to send the test mail to
    pub to: String,

    /// Message to include in the mail body
    #[arg(short, long, default_value = "This is an IoT alert manager test")]
    pub message: String,
}

#[derive(Debug, Args)]
pub struct SmsTestArgs {
    /// Phone number to send the test SMS to
    pub to: String,

    /// Message to send
    #[arg(short, long, default_value = "This is an IoT alert manager test")]
    pub message: String,

    /// Send as a flash message
    #[arg(short, long)]
    pub flash: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_checks_flags_parse() {
        let cli = Cli::parse_from([
            "lorawatch",
            "checks",
            "--all",
            "--no-mails",
            "--filter-status",
            "--override-mail",
            "test@example.com",
            "--date",
            "01-06-24T12:00:00",
        ]);

        let Command::Checks(args) = cli.command else {
            panic!("expected the checks subcommand");
        };
        assert!(args.all);
        assert!(args.no_mails);
        assert!(!args.no_sms);
        assert!(args.filter_status);
        assert_eq!(args.override_mail, "test@example.com");
        assert_eq!(args.date.as_deref(), Some("01-06-24T12:00:00"));
    }

    #[test]
    fn test_only_device_parses_with_id() {
        let cli = Cli::parse_from([
            "lorawatch",
            "checks",
            "--only-device",
            "--device-id",
            "42",
        ]);
        let Command::Checks(args) = cli.command else {
            panic!("expected the checks subcommand");
        };
        assert!(args.only_device);
        assert_eq!(args.device_id, Some(42));
    }

    #[test]
    fn test_api_device_subcommand() {
        let cli = Cli::parse_from(["lorawatch", "api", "device", "42"]);
        assert!(matches!(
            cli.command,
            Command::Api(ApiCommand::Device { id: 42 })
        ));
    }
}
