//! Last line of defence for a failed dispatch: whatever the handler did, the user gets one
//! terminal message (unless the interaction can no longer be answered).

use comrade_core::InterfaceError;
use tracing::{error, info, warn};

use crate::context::HandlerError;
use crate::messages::MessagePayload;
use crate::reply::{ReplyController, ReplyError, ReplyState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryOutcome {
    /// The error was the initial response.
    Replied,
    /// The interaction was already acknowledged; the error went out as a follow-up.
    FollowedUp,
    /// The interaction is terminal or expired; nothing could be sent.
    Dropped,
    /// Sending the error reply failed.
    SendFailed,
}

impl BoundaryOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replied => "replied",
            Self::FollowedUp => "followed_up",
            Self::Dropped => "dropped",
            Self::SendFailed => "send_failed",
        }
    }
}

/// Text shown to the user for a failure. Input problems, the fixed interface messages and
/// the backend's reason for an authorization failure are shown; internal error text is not.
pub fn user_message(failure: &HandlerError, correlation_id: &str) -> String {
    if let Some(message) = failure.user_facing() {
        return format!("⚠️ {message}");
    }
    let HandlerError::Api(api) = failure else {
        return InterfaceError::internal(correlation_id).user_message().to_owned();
    };
    let text = api.clone().into_interface(correlation_id).user_message();
    match api.backend_message().filter(|_| api.is_authorization()) {
        Some(reason) => format!("{text}\n> {}", summarize(reason)),
        None => text.to_owned(),
    }
}

/// Backend reasons are echoed for authorization failures only, cut to one short line.
fn summarize(reason: &str) -> String {
    let line = reason.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= MAX_REASON_CHARS {
        return line.to_owned();
    }
    let mut cut: String = line.chars().take(MAX_REASON_CHARS - 1).collect();
    cut.push('…');
    cut
}

const MAX_REASON_CHARS: usize = 200;

pub async fn recover(failure: &HandlerError, reply: &mut ReplyController) -> BoundaryOutcome {
    let correlation_id = reply.correlation_id().to_owned();
    if failure.user_facing().is_some() {
        warn!(
            event_name = "interaction.input_rejected",
            correlation_id = %correlation_id,
            error = %failure,
            "handler rejected user input"
        );
    } else {
        error!(
            event_name = "interaction.boundary_activated",
            correlation_id = %correlation_id,
            state = %reply.state(),
            error = %failure,
            "handler failed; sending terminal error reply"
        );
    }

    let message = MessagePayload::ephemeral_text(user_message(failure, &correlation_id));
    let result = match reply.state() {
        ReplyState::Terminal => {
            info!(
                event_name = "interaction.error_dropped",
                correlation_id = %correlation_id,
                "interaction already terminal; error not delivered"
            );
            return BoundaryOutcome::Dropped;
        }
        ReplyState::Created => reply.reply(message).await.map(|()| BoundaryOutcome::Replied),
        ReplyState::Deferred
        | ReplyState::Replied
        | ReplyState::Edited
        | ReplyState::FollowedUp
        | ReplyState::Unconfirmed => {
            reply.follow_up(message).await.map(|()| BoundaryOutcome::FollowedUp)
        }
    };

    match result {
        Ok(outcome) => {
            reply.finish();
            outcome
        }
        Err(ReplyError::Expired) => {
            info!(
                event_name = "interaction.error_dropped",
                correlation_id = %correlation_id,
                "interaction expired before the error could be delivered"
            );
            BoundaryOutcome::Dropped
        }
        Err(send_error) => {
            error!(
                event_name = "interaction.error_reply_failed",
                correlation_id = %correlation_id,
                error = %send_error,
                "could not deliver error reply"
            );
            BoundaryOutcome::SendFailed
        }
    }
}
