use crate::application::Application;
use crate::device::Device;
use crate::gateway::Gateway;

/// Resolve the notification mail address for a gateway:
/// override, then the gateway's responsible email, then the fallback.
pub fn gateway_mail(gateway: &Gateway, override_mail: &str, fallback: &str) -> String {
    if !override_mail.is_empty() {
        return override_mail.to_string();
    }
    let addresses = non_empty(gateway.responsible_email.as_deref()).unwrap_or(fallback);
    first_entry(addresses)
}

/// Resolve the notification phone number for a gateway:
/// override, then the gateway's responsible phone, then the fallback.
pub fn gateway_phone(gateway: &Gateway, override_phone: &str, fallback: &str) -> String {
    if !override_phone.is_empty() {
        return override_phone.to_string();
    }
    non_empty(gateway.responsible_phone.as_deref())
        .unwrap_or(fallback)
        .to_string()
}

/// Resolve the notification mail address for a device: override, then the
/// device metadata field, then the owning application's contact email,
/// then the fallback.
pub fn device_mail(
    device: &Device,
    application: Option<&Application>,
    override_mail: &str,
    metadata_field: &str,
    fallback: &str,
) -> String {
    if !override_mail.is_empty() {
        return override_mail.to_string();
    }
    let addresses = device
        .metadata
        .text(metadata_field)
        .or_else(|| application_contact(application, |app| app.contact_email.as_deref()))
        .unwrap_or_else(|| fallback.to_string());
    first_entry(&addresses)
}

/// Resolve the notification phone number for a device, with the same
/// precedence as `device_mail` over the phone fields.
pub fn device_phone(
    device: &Device,
    application: Option<&Application>,
    override_phone: &str,
    metadata_field: &str,
    fallback: &str,
) -> String {
    if !override_phone.is_empty() {
        return override_phone.to_string();
    }
    device
        .metadata
        .text(metadata_field)
        .or_else(|| application_contact(application, |app| app.contact_phone.as_deref()))
        .unwrap_or_else(|| fallback.to_string())
}

fn application_contact<'a>(
    application: Option<&'a Application>,
    field: impl Fn(&'a Application) -> Option<&'a str>,
) -> Option<String> {
    application
        .and_then(field)
        .and_then(|value| non_empty(Some(value)))
        .map(str::to_string)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// First usable entry of a comma-separated address list.
fn first_entry(raw: &str) -> String {
    raw.split(',')
        .map(str::trim)
        .find(|entry| !entry.is_empty())
        .unwrap_or_default()
        .to_string()
}
