use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("API request failed: {0}")]
    Fetch(String),

    #[error("Failed to parse API data: {0}")]
    Parse(String),

    #[error("Unable to send notification mail: {0}")]
    Mail(String),

    #[error("Unable to send SMS: {0}")]
    Sms(String),

    #[error("Template rendering failed: {0}")]
    Template(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
