//! Staff operations on another member: callsign sync and role assignment. The target user
//! travels in the continuation token, so the follow-up form needs no stored state.

use async_trait::async_trait;
use comrade_core::domain::pilot::{MemberSync, PilotRole, RoleAssignment};
use comrade_core::domain::validation::ValidationError;

use super::{required_field, submitted_form, unexpected_route};
use crate::context::{HandlerContext, HandlerError, HandlerResult};
use crate::events::CommandInvocation;
use crate::messages::{MessageBuilder, MessagePayload, Modal, SelectMenu, TextInput};
use crate::registry::{CommandHandler, ComponentHandler};
use crate::reply::ReplyController;
use crate::token::{ComponentRoute, Domain};

const FUNCTION_OPTION: &str = "function";
const TARGET_OPTION: &str = "target_user";
const FIELD_CALLSIGN: &str = "callsign";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PilotFunction {
    SyncUser,
    SetRole,
}

impl PilotFunction {
    fn parse(value: &str) -> Result<Self, HandlerError> {
        match value {
            "sync_user" => Ok(Self::SyncUser),
            "set_role" => Ok(Self::SetRole),
            other => Err(HandlerError::InvalidInput(format!(
                "Unknown function `{other}` (expected sync_user or set_role)."
            ))),
        }
    }
}

fn arguments(invocation: &CommandInvocation) -> Result<(PilotFunction, &str), HandlerError> {
    let function = invocation
        .string_option(FUNCTION_OPTION)
        .ok_or_else(|| HandlerError::InvalidInput("`function` is required.".to_owned()))?;
    let target = invocation
        .user_option(TARGET_OPTION)
        .ok_or_else(|| HandlerError::InvalidInput("`target_user` is required.".to_owned()))?;
    Ok((PilotFunction::parse(function)?, target))
}

pub struct PilotManageCommand;

#[async_trait]
impl CommandHandler for PilotManageCommand {
    fn name(&self) -> &'static str {
        "pilotmanage"
    }

    fn description(&self) -> &'static str {
        "Manage a pilot's callsign or role (staff only)"
    }

    fn usage(&self) -> &'static str {
        "/pilotmanage function:<sync_user|set_role> target_user:@member"
    }

    fn validate(&self, invocation: &CommandInvocation) -> Result<(), HandlerError> {
        arguments(invocation).map(|_| ())
    }

    async fn execute(&self, ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
        let invocation = ctx
            .event
            .command()
            .ok_or_else(|| HandlerError::Internal("expected a command".to_owned()))?;
        let (function, target) = arguments(invocation)?;

        match function {
            PilotFunction::SyncUser => {
                let form_id =
                    ComponentRoute::PilotSync { target_user_id: target.to_owned() }.token()?;
                let modal = Modal::new(form_id, "Sync Pilot").input(
                    TextInput::short(FIELD_CALLSIGN, "Pilot's Callsign (e.g. YZVA011)")
                        .length(1, 30),
                );
                reply.show_modal(modal).await?;
            }
            PilotFunction::SetRole => {
                let menu_id =
                    ComponentRoute::PilotRole { target_user_id: target.to_owned() }.token()?;
                let menu = PilotRole::ALL
                    .into_iter()
                    .fold(SelectMenu::new(menu_id).placeholder("Select a role"), |menu, role| {
                        menu.option(role.label(), role.as_str())
                    });
                let message = MessageBuilder::new()
                    .content(format!("Please select a role to assign to <@{target}>"))
                    .actions(|row| {
                        row.select(menu);
                    })
                    .ephemeral()
                    .build();
                reply.reply(message).await?;
            }
        }
        Ok(())
    }
}

pub struct PilotOperations;

#[async_trait]
impl ComponentHandler for PilotOperations {
    fn routes(&self) -> &'static [(Domain, &'static str)] {
        &[(Domain::Pilot, "sync"), (Domain::Pilot, "role")]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        route: ComponentRoute,
        reply: &mut ReplyController,
    ) -> HandlerResult {
        match route {
            ComponentRoute::PilotSync { target_user_id } => {
                let callsign = required_field(submitted_form(ctx)?, FIELD_CALLSIGN)?;
                reply.defer(true).await?;
                let sync = MemberSync {
                    target_user_id: target_user_id.clone(),
                    callsign: callsign.to_owned(),
                };
                let ack = ctx.api.sync_member(&ctx.identity, &sync).await?;
                reply
                    .edit(MessagePayload::text(confirmation(
                        &ack.message,
                        &format!("Synced <@{target_user_id}> as **{callsign}**."),
                    )))
                    .await?;
            }
            ComponentRoute::PilotRole { target_user_id } => {
                let role: PilotRole = ctx
                    .event
                    .selected_values()
                    .first()
                    .ok_or(ValidationError::MissingField { field: "role".to_owned() })?
                    .parse()?;
                reply.defer_update().await?;
                let assignment =
                    RoleAssignment { target_user_id: target_user_id.clone(), role };
                ctx.api.assign_role(&ctx.identity, &assignment).await?;
                reply
                    .edit(MessagePayload::text(format!(
                        "✅ Role `{}` assigned successfully to <@{target_user_id}>.",
                        role.label()
                    )))
                    .await?;
            }
            other => return Err(unexpected_route(&other)),
        }
        Ok(())
    }
}

fn confirmation(backend_message: &str, fallback: &str) -> String {
    let message = backend_message.trim();
    if message.is_empty() {
        format!("✅ {fallback}")
    } else {
        format!("✅ {message}")
    }
}
