use comrade_core::domain::service::{Acknowledgement, Timed};
use comrade_core::{ApiError, ApiResult};
use serde::Deserialize;

/// Wrapper the backend puts around every `/api/v1` payload.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub response_time: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn into_data(self) -> ApiResult<T> {
        self.data.ok_or_else(|| ApiError::Decode("response carried no `data`".to_string()))
    }

    pub fn into_timed(self) -> ApiResult<Timed<T>> {
        let response_time = self.response_time.clone();
        self.into_data().map(|data| Timed { data, response_time })
    }

    pub fn into_acknowledgement(self) -> Acknowledgement {
        Acknowledgement { message: self.message.unwrap_or_default() }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Maps a non-success HTTP status and its body onto the backend error taxonomy.
pub fn error_for_status(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message.or(parsed.error))
        .unwrap_or_default();

    match status {
        401 => ApiError::Unauthorized { message },
        403 => ApiError::PermissionDenied { message },
        404 => ApiError::NotFound { message },
        _ => ApiError::Rejected { status, message },
    }
}
