use thiserror::Error;

/// Failure reported by the backend API collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("backend rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("backend transport failure: {0}")]
    Transport(String),
    #[error("backend response could not be decoded: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::PermissionDenied { .. })
    }

    /// Message the backend attached to the failure, if it is safe to echo to the caller.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::PermissionDenied { message }
            | Self::NotFound { message }
            | Self::Rejected { message, .. } => {
                let trimmed = message.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::PermissionDenied { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("permission denied: {message}")]
    PermissionDenied { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn internal(correlation_id: impl Into<String>) -> Self {
        Self::Internal {
            message: "unclassified failure".to_owned(),
            correlation_id: correlation_id.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => {
                "❌ You're not authorized to do that. Make sure you are registered with `/register`."
            }
            Self::PermissionDenied { .. } => {
                "🚫 You don't have permission to perform this action."
            }
            Self::BadRequest { .. } => {
                "⚠️ The request could not be processed. Check your inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "⚠️ The service is temporarily unavailable. Please try again later."
            }
            Self::Internal { .. } => "⚠️ An unexpected error occurred. Please try again later.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::Unauthorized { correlation_id, .. }
            | Self::PermissionDenied { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl From<ApiError> for InterfaceError {
    fn from(value: ApiError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApiError::Unauthorized { message } => Self::Unauthorized { message, correlation_id },
            ApiError::PermissionDenied { message } => {
                Self::PermissionDenied { message, correlation_id }
            }
            ApiError::NotFound { message } | ApiError::Rejected { message, .. } => {
                Self::BadRequest { message, correlation_id }
            }
            ApiError::Transport(message) => Self::ServiceUnavailable { message, correlation_id },
            ApiError::Decode(message) => Self::Internal { message, correlation_id },
        }
    }
}
