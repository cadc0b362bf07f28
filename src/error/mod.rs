use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditDeskError {
    /// Gateway unreachable or answered with a non-2xx status.
    #[error("Transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Console error: {0}")]
    Console(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditDeskError {
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        AuditDeskError::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn index_out_of_range(kind: &'static str, index: usize, len: usize) -> Self {
        AuditDeskError::IndexOutOfRange { kind, index, len }
    }

    pub fn user_message(&self) -> String {
        match self {
            AuditDeskError::Transport { message, .. } => message.clone(),
            AuditDeskError::Validation(msg) => msg.clone(),
            AuditDeskError::NotFound(what) => format!("{} not found", what),
            other => other.to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AuditDeskError::Transport { .. })
    }
}

impl From<reqwest::Error> for AuditDeskError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        AuditDeskError::Transport {
            status,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditDeskError>;
