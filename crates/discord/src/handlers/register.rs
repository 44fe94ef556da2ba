use async_trait::async_trait;
use comrade_core::domain::pilot::{
    RegistrationOutcome, RegistrationRequest, RegistrationState, UserDetails,
};
use comrade_core::domain::validation::{normalize_route, validate_callsign, validate_ifc_username};
use comrade_core::ApiError;
use tracing::info;

use super::{required_field, submitted_form, title_case, unexpected_route};
use crate::context::{HandlerContext, HandlerResult};
use crate::messages::{
    Button, ButtonStyle, MessageBuilder, MessagePayload, Modal, TextInput, COLOR_INFO,
    COLOR_SUCCESS, COLOR_WARNING,
};
use crate::registry::{CommandHandler, ComponentHandler};
use crate::reply::ReplyController;
use crate::token::{ComponentRoute, Domain, EncodeError};

const FIELD_IFC_ID: &str = "ifcId";
const FIELD_LAST_FLIGHT: &str = "lastFlight";
const FIELD_CALLSIGN: &str = "callsign";

pub struct RegisterCommand;

#[async_trait]
impl CommandHandler for RegisterCommand {
    fn name(&self) -> &'static str {
        "register"
    }

    fn description(&self) -> &'static str {
        "Register to Comrade Bot and link to your Virtual Airline"
    }

    async fn execute(&self, ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
        let details = match ctx.api.user_details(&ctx.identity).await {
            Ok(details) => details,
            // Unknown users get the new-registration flow.
            Err(ApiError::NotFound { .. } | ApiError::Unauthorized { .. }) => UserDetails::default(),
            Err(error) => return Err(error.into()),
        };

        let message = match RegistrationState::from(&details) {
            RegistrationState::Linked { ifc_username, role } => already_linked(&ifc_username, &role),
            RegistrationState::RegisteredUnlinked { ifc_username } => link_prompt(&ifc_username)?,
            RegistrationState::Unregistered => new_user_prompt()?,
        };
        reply.reply(message).await?;
        Ok(())
    }
}

fn already_linked(ifc_username: &str, role: &str) -> MessagePayload {
    MessageBuilder::new()
        .embed(|embed| {
            embed
                .title("✅ Already Registered & Linked!")
                .color(COLOR_SUCCESS)
                .description("You're all set up!")
                .field("📝 IFC Username", ifc_username, true)
                .field("🎖️ Role", title_case(role), true)
                .footer("Use /help for more info • Contact staff to change callsign");
        })
        .ephemeral()
        .build()
}

fn link_prompt(ifc_username: &str) -> Result<MessagePayload, EncodeError> {
    let link = ComponentRoute::RegisterLink.token()?;
    Ok(MessageBuilder::new()
        .embed(|embed| {
            embed
                .title("🔗 Link to Virtual Airline")
                .color(COLOR_WARNING)
                .description(format!(
                    "You're registered as **{ifc_username}**, but not linked to this VA.\n\n\
                     Enter your callsign number (1-5 digits) to link."
                ))
                .field(
                    "📌 Note",
                    "Callsign is locked after you set it. Contact staff if you need to change it.",
                    false,
                )
                .footer("Click 'Link to VA' to proceed");
        })
        .actions(|row| {
            row.button(Button::new(link, "🔗 Link to VA"));
        })
        .ephemeral()
        .build())
}

fn new_user_prompt() -> Result<MessagePayload, EncodeError> {
    let proceed = ComponentRoute::RegisterNew.token()?;
    Ok(MessageBuilder::new()
        .embed(|embed| {
            embed
                .title("✈️ User Registration")
                .color(COLOR_INFO)
                .description(
                    "Register with Comrade Bot using your Infinite Flight Community account.",
                )
                .field(
                    "📝 IFC Username",
                    "Your Infinite Flight Community login username.\nExample: `john_doe123`",
                    false,
                )
                .field(
                    "🛫 Last Flight",
                    "Your most recent flight (origin-destination).\n\
                     Format: `EGLL-KSEA` (4-letter ICAO codes)",
                    false,
                )
                .field(
                    "🔢 Callsign (Optional)",
                    "1-5 digits for the VA (if this server is a registered VA).\n\
                     Example: `001`, `123`",
                    false,
                )
                .footer("Click 'Proceed' to continue");
        })
        .actions(|row| {
            row.button(Button::new(proceed, "✅ Proceed").style(ButtonStyle::Success));
        })
        .ephemeral()
        .build())
}

/// Buttons and forms of the registration flow.
pub struct RegisterFlow;

#[async_trait]
impl ComponentHandler for RegisterFlow {
    fn routes(&self) -> &'static [(Domain, &'static str)] {
        &[
            (Domain::Register, "new"),
            (Domain::Register, "link"),
            (Domain::Register, "submit"),
            (Domain::Register, "linksubmit"),
        ]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        route: ComponentRoute,
        reply: &mut ReplyController,
    ) -> HandlerResult {
        match route {
            ComponentRoute::RegisterNew => {
                let va_server = serves_virtual_airline(ctx).await;
                reply.show_modal(registration_form(va_server)?).await?;
            }
            ComponentRoute::RegisterLink => {
                let modal = Modal::new(
                    ComponentRoute::RegisterLinkSubmit.token()?,
                    "Link to Virtual Airline",
                )
                .input(
                    TextInput::short(FIELD_CALLSIGN, "Callsign Number (1-5 digits)")
                        .placeholder("001")
                        .length(1, 5),
                );
                reply.show_modal(modal).await?;
            }
            ComponentRoute::RegisterSubmit => submit_registration(ctx, reply).await?,
            ComponentRoute::RegisterLinkSubmit => submit_link(ctx, reply).await?,
            other => return Err(unexpected_route(&other)),
        }
        Ok(())
    }
}

/// A server is a VA when the backend recognises it, even if this user is unknown.
async fn serves_virtual_airline(ctx: &HandlerContext) -> bool {
    match ctx.api.user_details(&ctx.identity).await {
        Ok(_) | Err(ApiError::NotFound { .. }) => true,
        Err(_) => false,
    }
}

fn registration_form(va_server: bool) -> Result<Modal, EncodeError> {
    let mut modal = Modal::new(ComponentRoute::RegisterSubmit.token()?, "Register to Comrade Bot")
        .input(
            TextInput::short(FIELD_IFC_ID, "IFC Username")
                .placeholder("john_doe123")
                .length(3, 30),
        )
        .input(
            TextInput::short(FIELD_LAST_FLIGHT, "Last Valid Flight (ICAO-ICAO)")
                .placeholder("KJFK-EGLL")
                .length(9, 9),
        );
    if va_server {
        modal = modal.input(
            TextInput::short(FIELD_CALLSIGN, "Callsign Number (Optional, 1-5 digits)")
                .placeholder("001")
                .required(false)
                .length(1, 5),
        );
    }
    Ok(modal)
}

async fn submit_registration(ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
    let form = submitted_form(ctx)?;
    let ifc_id = required_field(form, FIELD_IFC_ID)?;
    validate_ifc_username(ifc_id)?;
    let last_flight = normalize_route(required_field(form, FIELD_LAST_FLIGHT)?)?;
    let callsign = form.field(FIELD_CALLSIGN);
    if let Some(callsign) = callsign {
        validate_callsign(callsign)?;
    }

    info!(
        event_name = "handler.registration_submitted",
        correlation_id = %ctx.correlation_id(),
        ifc_id,
        has_callsign = callsign.is_some(),
        "submitting registration"
    );

    reply.defer(true).await?;
    let request = RegistrationRequest {
        ifc_id: ifc_id.to_owned(),
        last_flight,
        callsign: callsign.map(str::to_owned),
    };
    let outcome = ctx.api.register_user(&ctx.identity, &request).await?;
    reply.edit(registration_result(&outcome)).await?;
    Ok(())
}

async fn submit_link(ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
    let callsign = required_field(submitted_form(ctx)?, FIELD_CALLSIGN)?;
    validate_callsign(callsign)?;

    reply.defer(true).await?;
    ctx.api.link_user(&ctx.identity, callsign).await?;
    reply
        .edit(MessagePayload::text(format!(
            "✅ **Successfully Linked to Virtual Airline!**\n\n\
             You're now linked with callsign **{callsign}**.\n\n\
             Use `/help` to learn how to use Comrade Bot."
        )))
        .await?;
    Ok(())
}

fn registration_result(outcome: &RegistrationOutcome) -> MessagePayload {
    let mut lines = vec![if outcome.status {
        format!("✅ **Registration complete for {}**", outcome.ifc_id)
    } else {
        "❌ **Registration failed**".to_owned()
    }];
    if let Some(message) = outcome.message.as_deref().filter(|message| !message.is_empty()) {
        lines.push(message.to_owned());
    }
    for step in &outcome.steps {
        let icon = if step.status { "✅" } else { "❌" };
        if step.message.is_empty() {
            lines.push(format!("{icon} {}", step.name));
        } else {
            lines.push(format!("{icon} {}: {}", step.name, step.message));
        }
    }
    MessagePayload::text(lines.join("\n"))
}
