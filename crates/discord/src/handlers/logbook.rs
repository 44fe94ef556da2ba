use async_trait::async_trait;
use comrade_core::domain::flight::{FlightHistoryPage, LOGBOOK_PAGE_SIZE};

use super::unexpected_route;
use crate::context::{HandlerContext, HandlerError, HandlerResult};
use crate::events::CommandInvocation;
use crate::messages::{Button, ButtonStyle, MessageBuilder, MessagePayload};
use crate::registry::{CommandHandler, ComponentHandler};
use crate::render::RenderedTable;
use crate::reply::ReplyController;
use crate::token::{ComponentRoute, Domain, EncodeError, PageDirection};

const IFC_ID_OPTION: &str = "ifc_id";

pub struct LogbookCommand;

#[async_trait]
impl CommandHandler for LogbookCommand {
    fn name(&self) -> &'static str {
        "logbook"
    }

    fn description(&self) -> &'static str {
        "Show a pilot's recent flights"
    }

    fn usage(&self) -> &'static str {
        "/logbook ifc_id"
    }

    fn validate(&self, invocation: &CommandInvocation) -> Result<(), HandlerError> {
        let ifc_id = invocation
            .string_option(IFC_ID_OPTION)
            .map(str::trim)
            .filter(|ifc_id| !ifc_id.is_empty())
            .ok_or_else(|| HandlerError::InvalidInput("`ifc_id` is required.".to_owned()))?;

        // The paging buttons carry the id; the widest page number must still fit.
        let widest = ComponentRoute::FlightsPage {
            direction: PageDirection::Next,
            ifc_id: ifc_id.to_owned(),
            page: u32::MAX,
        };
        match widest.token() {
            Ok(_) => Ok(()),
            Err(EncodeError::TooLong { .. }) => Err(HandlerError::InvalidInput(
                "That IFC username is too long to page through. Try a shorter one.".to_owned(),
            )),
            Err(error) => Err(error.into()),
        }
    }

    async fn execute(&self, ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
        let ifc_id = ctx
            .event
            .command()
            .and_then(|invocation| invocation.string_option(IFC_ID_OPTION))
            .map(str::trim)
            .ok_or_else(|| HandlerError::InvalidInput("`ifc_id` is required.".to_owned()))?
            .to_owned();

        reply.defer(true).await?;
        let message = logbook_page(ctx, &ifc_id, 1).await?;
        reply.edit(message).await?;
        Ok(())
    }
}

/// `flights_prev` / `flights_next`: the page carried in the token is the one shown.
pub struct FlightsPager;

#[async_trait]
impl ComponentHandler for FlightsPager {
    fn routes(&self) -> &'static [(Domain, &'static str)] {
        &[(Domain::Flights, "prev"), (Domain::Flights, "next")]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        route: ComponentRoute,
        reply: &mut ReplyController,
    ) -> HandlerResult {
        let ComponentRoute::FlightsPage { ifc_id, page, .. } = route else {
            return Err(unexpected_route(&route));
        };

        reply.defer_update().await?;
        let message = logbook_page(ctx, &ifc_id, page).await?;
        reply.edit(message).await?;
        Ok(())
    }
}

async fn logbook_page(
    ctx: &HandlerContext,
    ifc_id: &str,
    page: u32,
) -> Result<MessagePayload, HandlerError> {
    let history = ctx.api.user_logbook(&ctx.identity, ifc_id, page).await?;
    if history.is_empty() && page == 1 {
        return Ok(MessagePayload::text(format!("No flights found for **{ifc_id}**.")));
    }
    let table = ctx.renderer.render_logbook(&history).await?;
    Ok(page_message(ifc_id, page, &history, table)?)
}

fn page_message(
    ifc_id: &str,
    page: u32,
    history: &FlightHistoryPage,
    table: RenderedTable,
) -> Result<MessagePayload, EncodeError> {
    let previous = ComponentRoute::FlightsPage {
        direction: PageDirection::Previous,
        ifc_id: ifc_id.to_owned(),
        page: page.saturating_sub(1).max(1),
    }
    .token()?;
    let next = ComponentRoute::FlightsPage {
        direction: PageDirection::Next,
        ifc_id: ifc_id.to_owned(),
        page: page.saturating_add(1),
    }
    .token()?;
    let last_page = history.records.len() < LOGBOOK_PAGE_SIZE;

    let body = if history.is_empty() {
        format!("No more flights on page {page}.")
    } else {
        table.text
    };

    let mut builder = MessageBuilder::new()
        .content(format!("**Logbook for {ifc_id}**, page {page}\n{body}"))
        .actions(|row| {
            row.button(
                Button::new(previous, "◀ Previous")
                    .style(ButtonStyle::Secondary)
                    .disabled(page <= 1),
            )
            .button(Button::new(next, "Next ▶").style(ButtonStyle::Secondary).disabled(last_page));
        });
    if let Some(attachment) = table.attachment {
        builder = builder.attachment(attachment);
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use comrade_core::domain::flight::FlightRecord;

    use super::*;
    use crate::events::OptionValue;
    use crate::reply::ReplyState;
    use crate::testing::{button_event, invocation_event, BackendCall, Harness, StubBackend};

    fn record() -> FlightRecord {
        FlightRecord {
            timestamp: "2025-01-08T20:03:00Z".parse().expect("timestamp"),
            origin: Some("EGLL".to_owned()),
            dest: Some("KJFK".to_owned()),
            equipment: "B77W".to_owned(),
            landings: 1,
            violations: 0,
            server: "Expert".to_owned(),
            callsign: None,
            map_url: None,
        }
    }

    fn backend_with(records: usize, page: u32) -> StubBackend {
        StubBackend {
            logbook: Ok(FlightHistoryPage { records: vec![record(); records], page }),
            ..StubBackend::default()
        }
    }

    fn logbook_event(ifc_id: &str) -> crate::events::InboundEvent {
        invocation_event(
            CommandInvocation::new("logbook")
                .with_option("ifc_id", OptionValue::String(ifc_id.to_owned())),
        )
    }

    #[tokio::test]
    async fn first_page_is_deferred_then_edited_with_paging_buttons() {
        let harness = Harness::new(backend_with(LOGBOOK_PAGE_SIZE, 1));
        let (result, state) = harness.command(&LogbookCommand, logbook_event("pilotA")).await;
        result.expect("logbook");

        assert_eq!(state, ReplyState::Edited);
        let calls = harness.calls().await;
        assert_eq!(calls[0].callback_type(), Some(5));
        assert!(calls[0].is_ephemeral());

        let payload = calls[1].payload();
        let buttons = &payload["components"][0]["components"];
        assert_eq!(buttons[0]["custom_id"], "flights_prev_pilotA_1");
        assert_eq!(buttons[0]["disabled"], true);
        assert_eq!(buttons[1]["custom_id"], "flights_next_pilotA_2");
        assert!(buttons[1].get("disabled").is_none());
        assert!(payload["content"].as_str().is_some_and(|text| text.contains("EGLL-KJFK")));
    }

    #[tokio::test]
    async fn blank_ifc_id_is_rejected_without_backend_call() {
        let harness = Harness::new(StubBackend::default());
        let (result, _) = harness.command(&LogbookCommand, logbook_event("   ")).await;

        assert!(result.is_err_and(|error| error.user_facing().is_some()));
        assert!(harness.backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn ids_too_wide_for_paging_tokens_get_a_validation_message() {
        let harness = Harness::new(StubBackend::default());
        let (result, state) =
            harness.command(&LogbookCommand, logbook_event(&"a_".repeat(20))).await;

        let error = result.expect_err("too wide");
        assert!(error.user_facing().is_some_and(|message| message.contains("too long")));
        assert_eq!(state, ReplyState::Created);
        assert!(harness.backend.calls().await.is_empty());
    }

    #[test]
    fn underscored_ids_that_fit_are_accepted() {
        let invocation = CommandInvocation::new("logbook")
            .with_option("ifc_id", OptionValue::String("pilot_a.b".to_owned()));
        assert!(LogbookCommand.validate(&invocation).is_ok());
    }

    #[tokio::test]
    async fn next_button_fetches_the_page_in_its_token() {
        let harness = Harness::new(backend_with(3, 3));
        let (result, state) =
            harness.component(&FlightsPager, button_event("flights_next_pilotA_3")).await;
        result.expect("page");

        assert_eq!(state, ReplyState::Edited);
        assert_eq!(
            harness.backend.calls().await,
            vec![BackendCall::Logbook { ifc_id: "pilotA".to_owned(), page: 3 }]
        );
        let calls = harness.calls().await;
        assert_eq!(calls[0].callback_type(), Some(6));
        let buttons = calls[1].payload()["components"][0]["components"].clone();
        assert_eq!(buttons[0]["custom_id"], "flights_prev_pilotA_2");
        assert_eq!(buttons[1]["disabled"], true);
    }

    #[tokio::test]
    async fn empty_first_page_says_so() {
        let harness = Harness::new(StubBackend::default());
        let (result, _) = harness.command(&LogbookCommand, logbook_event("pilotA")).await;
        result.expect("logbook");

        let calls = harness.calls().await;
        assert_eq!(calls[1].content().as_deref(), Some("No flights found for **pilotA**."));
    }
}
