use async_trait::async_trait;
use comrade_core::domain::pilot::RegistrationOutcome;
use comrade_core::domain::service::ServerInitRequest;
use comrade_core::domain::validation::{validate_va_code, validate_va_name};

use super::{required_field, submitted_form, unexpected_route};
use crate::context::{HandlerContext, HandlerError, HandlerResult};
use crate::messages::{
    Button, MessageBuilder, MessagePayload, Modal, TextInput, COLOR_ERROR, COLOR_INFO,
    COLOR_SUCCESS,
};
use crate::registry::{CommandHandler, ComponentHandler};
use crate::reply::ReplyController;
use crate::token::{ComponentRoute, Domain};

const FIELD_VA_CODE: &str = "vaCode";
const FIELD_VA_NAME: &str = "vaName";
const FIELD_PREFIX: &str = "callsignPrefix";
const FIELD_SUFFIX: &str = "callsignSuffix";

const GUILD_ONLY: &str = "This command can only be used inside a server.";

pub struct InitServerCommand;

#[async_trait]
impl CommandHandler for InitServerCommand {
    fn name(&self) -> &'static str {
        "initserver"
    }

    fn description(&self) -> &'static str {
        "Initialise this Discord server with VA details"
    }

    async fn execute(&self, ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
        if !ctx.in_guild() {
            return Err(HandlerError::InvalidInput(GUILD_ONLY.to_owned()));
        }
        let proceed = ComponentRoute::InitServerProceed.token()?;
        let message = MessageBuilder::new()
            .embed(|embed| {
                embed
                    .title("🏢 Initialize Virtual Airline Server")
                    .color(COLOR_INFO)
                    .description(
                        "Please provide your Virtual Airline details to set up this Discord server.",
                    )
                    .field(
                        "📝 VA Code (3-5 characters)",
                        "A unique identifier for your virtual airline.\nExample: `AAVA`, `DAL`, `UAE`",
                        false,
                    )
                    .field(
                        "✈️ VA Name",
                        "The full name of your virtual airline.\nExample: `Air India Virtual`",
                        false,
                    )
                    .field(
                        "🔖 Callsign Prefix / Suffix (Optional)",
                        "Text before and after the flight number in pilot callsigns.\n\
                         `Air India 001VA` has prefix `Air India` and suffix `VA`.",
                        false,
                    )
                    .footer("Click 'Proceed' to fill in your VA details");
            })
            .actions(|row| {
                row.button(Button::new(proceed, "▶️ Proceed"));
            })
            .ephemeral()
            .build();
        reply.reply(message).await?;
        Ok(())
    }
}

pub struct InitServerFlow;

#[async_trait]
impl ComponentHandler for InitServerFlow {
    fn routes(&self) -> &'static [(Domain, &'static str)] {
        &[(Domain::InitServer, "proceed"), (Domain::InitServer, "submit")]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        route: ComponentRoute,
        reply: &mut ReplyController,
    ) -> HandlerResult {
        match route {
            ComponentRoute::InitServerProceed => {
                let form_id = ComponentRoute::InitServerSubmit.token()?;
                let modal = Modal::new(form_id, "Initialize VA Server")
                    .input(TextInput::short(FIELD_VA_CODE, "VA Code (3-5 characters)").length(3, 5))
                    .input(TextInput::short(FIELD_VA_NAME, "VA Name").length(3, 50))
                    .input(
                        TextInput::short(FIELD_PREFIX, "Callsign Prefix (Optional)")
                            .required(false)
                            .length(0, 30),
                    )
                    .input(
                        TextInput::short(FIELD_SUFFIX, "Callsign Suffix (Optional)")
                            .required(false)
                            .length(0, 30),
                    );
                reply.show_modal(modal).await?;
                Ok(())
            }
            ComponentRoute::InitServerSubmit => submit(ctx, reply).await,
            other => Err(unexpected_route(&other)),
        }
    }
}

async fn submit(ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
    if !ctx.in_guild() {
        return Err(HandlerError::InvalidInput(GUILD_ONLY.to_owned()));
    }
    let form = submitted_form(ctx)?;
    let va_code = required_field(form, FIELD_VA_CODE)?.to_ascii_uppercase();
    validate_va_code(&va_code)?;
    let va_name = required_field(form, FIELD_VA_NAME)?;
    validate_va_name(va_name)?;

    let request = ServerInitRequest {
        va_code,
        va_name: va_name.to_owned(),
        callsign_prefix: form.field(FIELD_PREFIX).map(str::to_owned),
        callsign_suffix: form.field(FIELD_SUFFIX).map(str::to_owned),
    };

    reply.defer(true).await?;
    let outcome = ctx.api.init_server(&ctx.identity, &request).await?;
    reply.edit(outcome_message(&request, &outcome)).await?;
    Ok(())
}

fn outcome_message(request: &ServerInitRequest, outcome: &RegistrationOutcome) -> MessagePayload {
    MessageBuilder::new()
        .embed(|embed| {
            if outcome.status {
                embed
                    .title("✅ Server Initialized")
                    .color(COLOR_SUCCESS)
                    .field("VA Code", &request.va_code, true)
                    .field("VA Name", &request.va_name, true);
            } else {
                embed.title("❌ Server Initialization Failed").color(COLOR_ERROR);
            }
            if let Some(message) = outcome.message.as_deref().filter(|message| !message.is_empty()) {
                embed.description(message);
            }
            for step in &outcome.steps {
                let icon = if step.status { "✅" } else { "❌" };
                embed.field(format!("{icon} {}", step.name), step.message.clone(), false);
            }
        })
        .build()
}

#[cfg(test)]
mod tests {
    use comrade_core::domain::validation::ValidationError;

    use super::*;
    use crate::reply::ReplyState;
    use crate::testing::{button_event, command_event, modal_event, BackendCall, Harness, StubBackend};

    #[tokio::test]
    async fn command_offers_proceed_button() {
        let harness = Harness::new(StubBackend::default());
        let (result, _) = harness.command(&InitServerCommand, command_event("initserver")).await;
        result.expect("initserver");

        let payload = harness.calls().await[0].payload();
        assert_eq!(payload["components"][0]["components"][0]["custom_id"], "initserver_proceed");
        assert_eq!(payload["flags"], 64);
    }

    #[tokio::test]
    async fn direct_messages_are_refused() {
        let harness = Harness::new(StubBackend::default());
        let mut dm = command_event("initserver");
        dm.origin.guild_id = None;
        let (result, state) = harness.command(&InitServerCommand, dm).await;

        assert!(matches!(result, Err(HandlerError::InvalidInput(message)) if message == GUILD_ONLY));
        assert_eq!(state, ReplyState::Created);
    }

    #[tokio::test]
    async fn proceed_opens_the_details_form() {
        let harness = Harness::new(StubBackend::default());
        let (result, state) =
            harness.component(&InitServerFlow, button_event("initserver_proceed")).await;
        result.expect("modal");

        assert_eq!(state, ReplyState::Terminal);
        let modal = harness.calls().await[0].payload();
        assert_eq!(modal["custom_id"], "initserver_submit");
        assert_eq!(modal["components"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn bad_va_code_is_rejected_locally() {
        let harness = Harness::new(StubBackend::default());
        let submit = modal_event(
            "initserver_submit",
            &[("vaCode", "A!"), ("vaName", "Air India Virtual")],
        );
        let (result, _) = harness.component(&InitServerFlow, submit).await;

        assert!(matches!(result, Err(HandlerError::Validation(ValidationError::VaCode))));
        assert!(harness.backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn valid_details_initialise_the_server() {
        let harness = Harness::new(StubBackend::default());
        let submit = modal_event(
            "initserver_submit",
            &[("vaCode", "aava"), ("vaName", "Air India Virtual"), ("callsignSuffix", "VA")],
        );
        let (result, state) = harness.component(&InitServerFlow, submit).await;
        result.expect("init");

        assert_eq!(state, ReplyState::Edited);
        assert_eq!(
            harness.backend.calls().await,
            vec![BackendCall::InitServer(ServerInitRequest {
                va_code: "AAVA".to_owned(),
                va_name: "Air India Virtual".to_owned(),
                callsign_prefix: None,
                callsign_suffix: Some("VA".to_owned()),
            })]
        );
        let edit = harness.calls().await[1].payload();
        assert_eq!(edit["embeds"][0]["title"], "✅ Server Initialized");
    }
}
