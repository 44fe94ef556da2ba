//! Reply lifecycle for a single interaction.
//!
//! ```text
//! Created ──reply / update_message──▶ Replied ──follow_up──▶ FollowedUp*
//!    │                                                 ▲
//!    ├──defer / defer_update──▶ Deferred ──edit──▶ Edited* ──┘
//!    │
//!    └──show_modal / finish──▶ Terminal  (every later call: Expired)
//! ```
//!
//! Exactly one initial acknowledgement leaves `Created`. An acknowledgement whose outcome
//! is unknown (the request may have reached the platform) moves to `Unconfirmed`, where only
//! follow-ups are attempted. The acknowledgement must land
//! within [`ReplyDeadlines::ack`] of receipt; edits and follow-ups are bounded by the
//! interaction token window. A call past either deadline fails with
//! [`ReplyError::Expired`] without touching the platform.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::events::{InboundEvent, InteractionType};
use crate::messages::{Attachment, MessagePayload, Modal, EPHEMERAL};

const CALLBACK_CHANNEL_MESSAGE: u8 = 4;
const CALLBACK_DEFERRED_MESSAGE: u8 = 5;
const CALLBACK_DEFERRED_UPDATE: u8 = 6;
const CALLBACK_UPDATE_MESSAGE: u8 = 7;
const CALLBACK_MODAL: u8 = 9;

/// Platform coordinates of one interaction. The token is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct InteractionHandle {
    pub id: String,
    pub application_id: String,
    pub token: String,
}

impl fmt::Debug for InteractionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionHandle")
            .field("id", &self.id)
            .field("application_id", &self.application_id)
            .field("token", &"[redacted]")
            .finish()
    }
}

impl From<&InboundEvent> for InteractionHandle {
    fn from(event: &InboundEvent) -> Self {
        Self {
            id: event.id.clone(),
            application_id: event.application_id.clone(),
            token: event.interaction_token.clone(),
        }
    }
}

/// The one response that acknowledges an interaction.
#[derive(Clone, Debug, PartialEq)]
pub enum InitialResponse {
    Message(MessagePayload),
    DeferredMessage { ephemeral: bool },
    DeferredUpdate,
    UpdateMessage(MessagePayload),
    Modal(Modal),
}

impl InitialResponse {
    pub fn callback_type(&self) -> u8 {
        match self {
            Self::Message(_) => CALLBACK_CHANNEL_MESSAGE,
            Self::DeferredMessage { .. } => CALLBACK_DEFERRED_MESSAGE,
            Self::DeferredUpdate => CALLBACK_DEFERRED_UPDATE,
            Self::UpdateMessage(_) => CALLBACK_UPDATE_MESSAGE,
            Self::Modal(_) => CALLBACK_MODAL,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Message(_) => "reply",
            Self::DeferredMessage { .. } => "defer",
            Self::DeferredUpdate => "defer_update",
            Self::UpdateMessage(_) => "update_message",
            Self::Modal(_) => "show_modal",
        }
    }

    /// JSON body for the interaction callback endpoint.
    pub fn body(&self) -> Result<Value, PlatformError> {
        let data = match self {
            Self::Message(payload) | Self::UpdateMessage(payload) => Some(to_value(payload)?),
            Self::DeferredMessage { ephemeral: true } => Some(json!({ "flags": EPHEMERAL })),
            Self::DeferredMessage { ephemeral: false } | Self::DeferredUpdate => None,
            Self::Modal(modal) => Some(to_value(modal)?),
        };

        let mut body = json!({ "type": self.callback_type() });
        if let Some(data) = data {
            body["data"] = data;
        }
        Ok(body)
    }

    pub fn attachments(&self) -> &[Attachment] {
        match self {
            Self::Message(payload) | Self::UpdateMessage(payload) => &payload.attachments,
            _ => &[],
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, PlatformError> {
    serde_json::to_value(value).map_err(|error| PlatformError::Encode(error.to_string()))
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("interaction is unknown to the platform or its token has expired")]
    UnknownInteraction,
    #[error("platform reports the interaction as already acknowledged")]
    AlreadyAcknowledged,
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("platform returned HTTP {status}: {message}")]
    Http { status: u16, code: Option<u64>, message: String },
    #[error("platform transport failure: {0}")]
    Transport(String),
    #[error("payload could not be encoded: {0}")]
    Encode(String),
}

impl PlatformError {
    /// The platform definitely did not act on the request.
    pub fn is_definitive_rejection(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Encode(_) => true,
            Self::Http { status, .. } => (400..500).contains(status),
            Self::UnknownInteraction | Self::AlreadyAcknowledged | Self::Transport(_) => false,
        }
    }
}

/// Outbound side of the platform boundary. The platform does not deduplicate calls.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    async fn create_response(
        &self,
        interaction: &InteractionHandle,
        response: &InitialResponse,
    ) -> Result<(), PlatformError>;

    async fn edit_original(
        &self,
        interaction: &InteractionHandle,
        message: &MessagePayload,
    ) -> Result<(), PlatformError>;

    async fn create_followup(
        &self,
        interaction: &InteractionHandle,
        message: &MessagePayload,
    ) -> Result<(), PlatformError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyState {
    Created,
    Deferred,
    Replied,
    Edited,
    FollowedUp,
    /// An initial acknowledgement was sent but its outcome is unknown.
    Unconfirmed,
    Terminal,
}

impl ReplyState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Deferred => "deferred",
            Self::Replied => "replied",
            Self::Edited => "edited",
            Self::FollowedUp => "followed_up",
            Self::Unconfirmed => "unconfirmed",
            Self::Terminal => "terminal",
        }
    }
}

impl fmt::Display for ReplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplyDeadlines {
    /// Time allowed between receipt and the initial acknowledgement.
    pub ack: Duration,
    /// Lifetime of the interaction token; bounds edits and follow-ups.
    pub window: Duration,
}

impl Default for ReplyDeadlines {
    fn default() -> Self {
        Self { ack: Duration::from_secs(3), window: Duration::from_secs(15 * 60) }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("interaction was already acknowledged (state `{state}`)")]
    AlreadyAcknowledged { state: ReplyState },
    #[error("interaction has not been acknowledged yet")]
    NotAcknowledged,
    #[error("editing requires a deferred acknowledgement (state `{state}`)")]
    NotDeferred { state: ReplyState },
    #[error("`{response}` is not a valid answer to a {interaction_type:?} interaction")]
    ResponseNotAllowed { response: &'static str, interaction_type: InteractionType },
    #[error("interaction expired")]
    Expired,
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl ReplyError {
    /// Misuse of the lifecycle by handler code, as opposed to platform or timing failures.
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(
            self,
            Self::AlreadyAcknowledged { .. }
                | Self::NotAcknowledged
                | Self::NotDeferred { .. }
                | Self::ResponseNotAllowed { .. }
        )
    }
}

pub struct ReplyController {
    responder: Arc<dyn InteractionResponder>,
    interaction: InteractionHandle,
    interaction_type: InteractionType,
    state: ReplyState,
    deferred: bool,
    received_at: Instant,
    deadlines: ReplyDeadlines,
}

impl ReplyController {
    /// Starts the clock for this interaction.
    pub fn new(
        responder: Arc<dyn InteractionResponder>,
        event: &InboundEvent,
        deadlines: ReplyDeadlines,
    ) -> Self {
        Self {
            responder,
            interaction: InteractionHandle::from(event),
            interaction_type: event.interaction_type(),
            state: ReplyState::Created,
            deferred: false,
            received_at: Instant::now(),
            deadlines,
        }
    }

    pub fn state(&self) -> ReplyState {
        self.state
    }

    pub fn is_acknowledged(&self) -> bool {
        self.state != ReplyState::Created
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub fn interaction_type(&self) -> InteractionType {
        self.interaction_type
    }

    pub fn correlation_id(&self) -> &str {
        &self.interaction.id
    }

    pub async fn reply(&mut self, message: MessagePayload) -> Result<(), ReplyError> {
        self.acknowledge(InitialResponse::Message(message), ReplyState::Replied).await
    }

    pub async fn defer(&mut self, ephemeral: bool) -> Result<(), ReplyError> {
        self.acknowledge(InitialResponse::DeferredMessage { ephemeral }, ReplyState::Deferred)
            .await?;
        self.deferred = true;
        Ok(())
    }

    /// Acknowledges a component without posting; the parent message is edited later.
    pub async fn defer_update(&mut self) -> Result<(), ReplyError> {
        self.require_component("defer_update")?;
        self.acknowledge(InitialResponse::DeferredUpdate, ReplyState::Deferred).await?;
        self.deferred = true;
        Ok(())
    }

    /// Replaces the message that carries the triggering component.
    pub async fn update_message(&mut self, message: MessagePayload) -> Result<(), ReplyError> {
        self.require_component("update_message")?;
        self.acknowledge(InitialResponse::UpdateMessage(message), ReplyState::Replied).await
    }

    /// Answers with a form. The form's submission arrives as a new interaction, so this
    /// one is finished.
    pub async fn show_modal(&mut self, modal: Modal) -> Result<(), ReplyError> {
        if self.interaction_type == InteractionType::ModalSubmit {
            return Err(self.violation(ReplyError::ResponseNotAllowed {
                response: "show_modal",
                interaction_type: self.interaction_type,
            }));
        }
        self.acknowledge(InitialResponse::Modal(modal), ReplyState::Terminal).await
    }

    /// Replaces the deferred placeholder (or the previous edit).
    pub async fn edit(&mut self, message: MessagePayload) -> Result<(), ReplyError> {
        self.ensure_open("edit")?;
        if !self.deferred {
            return Err(self.violation(ReplyError::NotDeferred { state: self.state }));
        }
        self.ensure_within(self.deadlines.window)?;

        let result = self.responder.edit_original(&self.interaction, &message).await;
        self.settle(result)?;
        if matches!(self.state, ReplyState::Deferred | ReplyState::Edited) {
            self.state = ReplyState::Edited;
        }
        Ok(())
    }

    pub async fn follow_up(&mut self, message: MessagePayload) -> Result<(), ReplyError> {
        self.ensure_open("follow_up")?;
        if self.state == ReplyState::Created {
            return Err(self.violation(ReplyError::NotAcknowledged));
        }
        self.ensure_within(self.deadlines.window)?;

        let result = self.responder.create_followup(&self.interaction, &message).await;
        self.settle(result)?;
        self.state = ReplyState::FollowedUp;
        Ok(())
    }

    pub fn finish(&mut self) {
        self.state = ReplyState::Terminal;
    }

    async fn acknowledge(
        &mut self,
        response: InitialResponse,
        next: ReplyState,
    ) -> Result<(), ReplyError> {
        self.ensure_open(response.name())?;
        if self.state != ReplyState::Created {
            return Err(self.violation(ReplyError::AlreadyAcknowledged { state: self.state }));
        }
        self.ensure_within(self.deadlines.ack)?;

        let result = self.responder.create_response(&self.interaction, &response).await;
        if let Err(error) = &result {
            if !error.is_definitive_rejection() && *error != PlatformError::UnknownInteraction {
                warn!(
                    event_name = "interaction.ack_unconfirmed",
                    correlation_id = %self.interaction.id,
                    response = response.name(),
                    error = %error,
                    "initial response may have reached the platform"
                );
                self.state = ReplyState::Unconfirmed;
            }
        }
        self.settle(result)?;
        self.state = next;
        Ok(())
    }

    fn require_component(&self, response: &'static str) -> Result<(), ReplyError> {
        if self.interaction_type == InteractionType::Command {
            return Err(self.violation(ReplyError::ResponseNotAllowed {
                response,
                interaction_type: self.interaction_type,
            }));
        }
        Ok(())
    }

    fn ensure_open(&self, attempted: &'static str) -> Result<(), ReplyError> {
        if self.state == ReplyState::Terminal {
            info!(
                event_name = "interaction.reply_after_terminal",
                correlation_id = %self.interaction.id,
                attempted,
                "reply attempted on a finished interaction"
            );
            return Err(ReplyError::Expired);
        }
        Ok(())
    }

    fn ensure_within(&mut self, deadline: Duration) -> Result<(), ReplyError> {
        let elapsed = self.received_at.elapsed();
        if elapsed >= deadline {
            self.expire(elapsed);
            return Err(ReplyError::Expired);
        }
        Ok(())
    }

    fn settle(&mut self, result: Result<(), PlatformError>) -> Result<(), ReplyError> {
        match result {
            Ok(()) => Ok(()),
            Err(PlatformError::UnknownInteraction) => {
                self.expire(self.received_at.elapsed());
                Err(ReplyError::Expired)
            }
            Err(error) => Err(ReplyError::Platform(error)),
        }
    }

    fn expire(&mut self, elapsed: Duration) {
        info!(
            event_name = "interaction.expired",
            correlation_id = %self.interaction.id,
            state = %self.state,
            elapsed_ms = elapsed.as_millis() as u64,
            "interaction can no longer be answered"
        );
        self.state = ReplyState::Terminal;
    }

    fn violation(&self, error: ReplyError) -> ReplyError {
        warn!(
            event_name = "interaction.lifecycle_violation",
            correlation_id = %self.interaction.id,
            state = %self.state,
            error = %error,
            "reply call rejected by lifecycle"
        );
        error
    }
}
