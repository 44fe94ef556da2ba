use std::sync::Arc;

use comrade_core::domain::validation::ValidationError;
use comrade_core::{ApiError, BackendApi, Identity};
use thiserror::Error;

use crate::events::InboundEvent;
use crate::render::{FlightRenderer, RenderError};
use crate::reply::ReplyError;
use crate::token::{DecodeError, EncodeError};

/// Everything a handler may use: the event, who sent it, and the collaborators.
/// There is no global client; handlers only reach the backend through `api`.
#[derive(Clone)]
pub struct HandlerContext {
    pub event: Arc<InboundEvent>,
    pub identity: Identity,
    pub api: Arc<dyn BackendApi>,
    pub renderer: Arc<dyn FlightRenderer>,
}

impl HandlerContext {
    pub fn new(
        event: Arc<InboundEvent>,
        api: Arc<dyn BackendApi>,
        renderer: Arc<dyn FlightRenderer>,
    ) -> Self {
        let identity = event.identity();
        Self { event, identity, api, renderer }
    }

    pub fn correlation_id(&self) -> &str {
        &self.event.id
    }

    pub fn in_guild(&self) -> bool {
        self.identity.guild_id.is_some()
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Reply(#[from] ReplyError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    /// Input problems the user can fix; their message is safe to show.
    pub fn user_facing(&self) -> Option<String> {
        match self {
            Self::Validation(error) => Some(error.to_string()),
            Self::InvalidInput(message) => Some(message.clone()),
            _ => None,
        }
    }
}

pub type HandlerResult = Result<(), HandlerError>;
