use thiserror::Error;

pub const CONNECTION_ERROR: &str = "Error de conexión";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("session expired, login required")]
    SessionExpired,

    #[error("http {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text suitable for a toast or the console pane.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => CONNECTION_ERROR.to_string(),
            ApiError::Unauthorized { message } | ApiError::Rejected { message, .. } => {
                if message.trim().is_empty() {
                    CONNECTION_ERROR.to_string()
                } else {
                    message.clone()
                }
            }
            ApiError::SessionExpired => "Sesión expirada, inicie sesión nuevamente".to_string(),
            ApiError::Decode(detail) => format!("Respuesta inesperada del servidor: {detail}"),
        }
    }

    /// Message the backend actually sent, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message } | ApiError::Rejected { message, .. } => {
                let trimmed = message.trim();
                (!trimmed.is_empty() && trimmed != CONNECTION_ERROR).then_some(trimmed)
            }
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
