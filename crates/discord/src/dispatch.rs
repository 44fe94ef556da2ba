use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use comrade_core::BackendApi;
use futures::FutureExt;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::boundary::{self, BoundaryOutcome};
use crate::context::{HandlerContext, HandlerError, HandlerResult};
use crate::events::{InboundEvent, InteractionKind};
use crate::messages::MessagePayload;
use crate::registry::{CommandRegistry, ComponentTable};
use crate::render::FlightRenderer;
use crate::reply::{InteractionResponder, ReplyController, ReplyDeadlines, ReplyState};
use crate::token::{decode, ComponentKind, ComponentRoute, DecodeError};

pub const NOT_AVAILABLE_MESSAGE: &str = "❓ This action is not available anymore.";

/// What an event is routed by. Computed once per event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutingKey {
    Command(String),
    Component(ComponentRoute),
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(name) => write!(f, "/{name}"),
            Self::Component(route) => write!(f, "{}_{}", route.domain(), route.action()),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Unroutable {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("token for a {expected:?} arrived on a {actual:?}")]
    KindMismatch { expected: ComponentKind, actual: ComponentKind },
    #[error("no handler for `{0}`")]
    NoHandler(String),
}

pub fn routing_key(event: &InboundEvent) -> Result<RoutingKey, Unroutable> {
    match &event.kind {
        InteractionKind::Command(invocation) => Ok(RoutingKey::Command(invocation.name.clone())),
        InteractionKind::Button(press) => component_key(&press.custom_id, ComponentKind::Button),
        InteractionKind::SelectMenu(selection) => {
            component_key(&selection.custom_id, ComponentKind::SelectMenu)
        }
        InteractionKind::ModalSubmit(submission) => {
            component_key(&submission.custom_id, ComponentKind::Modal)
        }
    }
}

fn component_key(custom_id: &str, actual: ComponentKind) -> Result<RoutingKey, Unroutable> {
    let token = decode(custom_id)?;
    if let Some(spec) = token.spec() {
        if spec.kind != actual {
            return Err(Unroutable::KindMismatch { expected: spec.kind, actual });
        }
    }
    Ok(RoutingKey::Component(ComponentRoute::try_from(&token)?))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    /// Input failed the command's validation; answered with its message.
    Rejected,
    Unrouted(Unroutable),
    Recovered(BoundaryOutcome),
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Unrouted(_) => "unrouted",
            Self::Recovered(_) => "recovered",
        }
    }
}

/// Classifies events, runs their handler and guarantees every event a terminal outcome.
/// Shared across concurrent dispatches; holds no per-event state.
pub struct Dispatcher {
    commands: Arc<CommandRegistry>,
    components: Arc<ComponentTable>,
    responder: Arc<dyn InteractionResponder>,
    api: Arc<dyn BackendApi>,
    renderer: Arc<dyn FlightRenderer>,
    deadlines: ReplyDeadlines,
}

impl Dispatcher {
    pub fn new(
        commands: CommandRegistry,
        components: ComponentTable,
        responder: Arc<dyn InteractionResponder>,
        api: Arc<dyn BackendApi>,
        renderer: Arc<dyn FlightRenderer>,
    ) -> Self {
        Self {
            commands: Arc::new(commands),
            components: Arc::new(components),
            responder,
            api,
            renderer,
            deadlines: ReplyDeadlines::default(),
        }
    }

    pub fn with_deadlines(mut self, deadlines: ReplyDeadlines) -> Self {
        self.deadlines = deadlines;
        self
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn components(&self) -> &ComponentTable {
        &self.components
    }

    /// Never fails: every error ends in the boundary.
    pub async fn dispatch(&self, event: InboundEvent) -> DispatchOutcome {
        let started = Instant::now();
        let event = Arc::new(event);
        let mut reply = ReplyController::new(self.responder.clone(), &event, self.deadlines);
        let ctx = HandlerContext::new(event.clone(), self.api.clone(), self.renderer.clone());

        let outcome = match routing_key(&event) {
            Ok(key) => {
                info!(
                    event_name = "interaction.routed",
                    correlation_id = %event.id,
                    routing_key = %key,
                    user_id = %event.origin.user_id,
                    "routing interaction"
                );
                self.run(key, &ctx, &mut reply).await
            }
            Err(reason) => self.unrouted(reason, &mut reply).await,
        };

        info!(
            event_name = "interaction.dispatch_completed",
            correlation_id = %event.id,
            outcome = outcome.as_str(),
            reply_state = %reply.state(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "interaction dispatch finished"
        );
        outcome
    }

    async fn run(
        &self,
        key: RoutingKey,
        ctx: &HandlerContext,
        reply: &mut ReplyController,
    ) -> DispatchOutcome {
        let result = match key {
            RoutingKey::Command(name) => {
                let handler = match self.commands.lookup(&name) {
                    Ok(handler) => handler,
                    Err(_) => return self.unrouted(Unroutable::NoHandler(name), reply).await,
                };
                if let Some(invocation) = ctx.event.command() {
                    if let Err(failure) = handler.validate(invocation) {
                        if failure.user_facing().is_some() {
                            boundary::recover(&failure, reply).await;
                            return DispatchOutcome::Rejected;
                        }
                        return DispatchOutcome::Recovered(boundary::recover(&failure, reply).await);
                    }
                }
                guarded(handler.execute(ctx, reply)).await
            }
            RoutingKey::Component(route) => {
                let handler = match self.components.lookup(route.domain(), route.action()) {
                    Ok(handler) => handler,
                    Err(_) => {
                        let key = RoutingKey::Component(route).to_string();
                        return self.unrouted(Unroutable::NoHandler(key), reply).await;
                    }
                };
                guarded(handler.handle(ctx, route, reply)).await
            }
        };

        match result {
            Ok(()) if reply.state() == ReplyState::Created => {
                let failure =
                    HandlerError::Internal("handler returned without acknowledging".to_owned());
                DispatchOutcome::Recovered(boundary::recover(&failure, reply).await)
            }
            Ok(()) => DispatchOutcome::Completed,
            Err(failure) => DispatchOutcome::Recovered(boundary::recover(&failure, reply).await),
        }
    }

    async fn unrouted(&self, reason: Unroutable, reply: &mut ReplyController) -> DispatchOutcome {
        warn!(
            event_name = "interaction.unrouted",
            correlation_id = %reply.correlation_id(),
            reason = %reason,
            "no route for interaction"
        );
        if reply.state() == ReplyState::Created {
            if let Err(error) = reply.reply(MessagePayload::ephemeral_text(NOT_AVAILABLE_MESSAGE)).await
            {
                warn!(
                    event_name = "interaction.unrouted_reply_failed",
                    correlation_id = %reply.correlation_id(),
                    error = %error,
                    "could not answer unrouted interaction"
                );
            }
        }
        DispatchOutcome::Unrouted(reason)
    }
}

/// Turns a handler panic into an ordinary failure.
async fn guarded<F>(handler: F) -> HandlerResult
where
    F: std::future::Future<Output = HandlerResult>,
{
    match AssertUnwindSafe(handler).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(HandlerError::Internal("handler panicked".to_owned())),
    }
}
