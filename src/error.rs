use thiserror::Error;

pub type Result<T> = std::result::Result<T, StudyError>;

/// Errors raised by the study engine and its persistence layer.
///
/// Every variant is recoverable: callers either surface it to the student
/// or fall back to static content.
#[derive(Error, Debug)]
pub enum StudyError {
    #[error("Student '{0}' not found, please register first")]
    StudentNotFound(String),

    #[error("Student '{0}' already exists")]
    StudentExists(String),

    #[error("Invalid student profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Malformed study plan: {0}")]
    MalformedPlan(String),

    #[error("Student '{0}' has no active study plan")]
    NoActivePlan(String),

    #[error("Tutor service error: {0}")]
    Tutor(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StudyError {
    /// True for errors the caller should treat as "register first".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StudyError::StudentNotFound(_))
    }
}
