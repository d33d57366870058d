use crate::error::DomainResult;

/// Rendering capability for SMS bodies and mail templates.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &serde_json::Value) -> DomainResult<String>;
}
