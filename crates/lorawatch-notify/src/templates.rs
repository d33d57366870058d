use handlebars::Handlebars;
use serde_json::Value;

use lorawatch_domain::{DomainError, DomainResult, TemplateRenderer};

/// Embedded notification templates: a html/text pair per entity kind for
/// mails plus a short body per entity kind for SMS.
const TEMPLATES: [(&str, &str); 8] = [
    ("gateway.html", include_str!("../templates/gateway.html.hbs")),
    ("gateway.txt", include_str!("../templates/gateway.txt.hbs")),
    ("device.html", include_str!("../templates/device.html.hbs")),
    ("device.txt", include_str!("../templates/device.txt.hbs")),
    ("test.html", include_str!("../templates/test.html.hbs")),
    ("test.txt", include_str!("../templates/test.txt.hbs")),
    ("sms/gateway", include_str!("../templates/sms/gateway.hbs")),
    ("sms/device", include_str!("../templates/sms/device.hbs")),
];

pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> DomainResult<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        for (name, source) in TEMPLATES {
            registry
                .register_template_string(name, source)
                .map_err(|err| {
                    DomainError::Template(format!("invalid template {name}: {err}"))
                })?;
        }
        Ok(Self { registry })
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, context: &Value) -> DomainResult<String> {
        self.registry
            .render(template, context)
            .map_err(|err| DomainError::Template(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_all_templates_register() {
        assert!(HandlebarsRenderer::new().is_ok());
    }

    #[test]
    fn test_gateway_sms_renders_name_ago_and_url() {
        let renderer = HandlebarsRenderer::new().unwrap();
        let rendered = renderer
            .render(
                "sms/gateway",
                &json!({
                    "gateway": {"name": "Rooftop"},
                    "ago": "2 hours 46 minutes 40 seconds ago",
                    "url": "https://iot.example.com/gateway/7276ff002e062c01",
                }),
            )
            .unwrap();

        assert!(rendered.contains("Rooftop"));
        assert!(rendered.contains("2 hours 46 minutes 40 seconds ago"));
        assert!(rendered.contains("https://iot.example.com/gateway/7276ff002e062c01"));
    }

    #[test]
    fn test_device_mail_renders_application_context() {
        let renderer = HandlebarsRenderer::new().unwrap();
        let context = json!({
            "application": {"name": "Parking"},
            "application_url": "https://iot.example.com/application/10",
            "device": {
                "name": "Sensor",
                "status_battery": 67.2,
                "location": {"latitude": 56.15, "longitude": 10.21},
            },
            "diff": 10000,
            "ago": "2 hours 46 minutes 40 seconds ago",
            "url": "https://iot.example.com/application/10/device/3",
        });

        let html = renderer.render("device.html", &context).unwrap();
        assert!(html.contains("Sensor"));
        assert!(html.contains("Parking"));

        let text = renderer.render("device.txt", &context).unwrap();
        assert!(text.contains("Sensor"));
        assert!(text.contains("https://iot.example.com/application/10/device/3"));
    }

    #[test]
    fn test_unknown_template_is_a_template_error() {
        let renderer = HandlebarsRenderer::new().unwrap();
        let result = renderer.render("sms/unknown", &json!({}));
        assert!(matches!(result, Err(DomainError::Template(_))));
    }
}
