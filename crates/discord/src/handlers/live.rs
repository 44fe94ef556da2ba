use async_trait::async_trait;

use crate::context::{HandlerContext, HandlerResult};
use crate::messages::{MessageBuilder, MessagePayload};
use crate::registry::CommandHandler;
use crate::reply::ReplyController;

pub struct LiveCommand;

#[async_trait]
impl CommandHandler for LiveCommand {
    fn name(&self) -> &'static str {
        "live"
    }

    fn description(&self) -> &'static str {
        "Fetch VA live flights"
    }

    async fn execute(&self, ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
        reply.defer(false).await?;
        let live = ctx.api.live_flights(&ctx.identity).await?;
        let flights = live.data;

        let message = if flights.is_empty() {
            MessagePayload::text("No live flights right now.")
        } else {
            let table = ctx.renderer.render_live(&flights).await?;
            let mut builder = MessageBuilder::new()
                .content(format!("**Live flights ({})**\n{}", flights.len(), table.text));
            if let Some(attachment) = table.attachment {
                builder = builder.attachment(attachment);
            }
            builder.build()
        };
        reply.edit(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use comrade_core::domain::flight::LiveFlight;

    use super::*;
    use crate::reply::ReplyState;
    use crate::testing::{command_event, BackendCall, Harness, StubBackend};

    fn flight(callsign: &str) -> LiveFlight {
        LiveFlight {
            callsign: callsign.to_owned(),
            username: "pilotA".to_owned(),
            aircraft: "A320".to_owned(),
            livery: "Air India".to_owned(),
            altitude: 36_000,
            speed: 452.4,
            origin: "VABB".to_owned(),
            destination: "VIDP".to_owned(),
            last_report: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn no_flights_is_a_plain_notice() {
        let harness = Harness::new(StubBackend::default());
        let (result, state) = harness.command(&LiveCommand, command_event("live")).await;
        result.expect("live");

        assert_eq!(state, ReplyState::Edited);
        assert_eq!(harness.backend.calls().await, vec![BackendCall::LiveFlights]);
        assert_eq!(harness.calls().await[1].content().as_deref(), Some("No live flights right now."));
    }

    #[tokio::test]
    async fn flights_are_rendered_as_a_table() {
        let harness = Harness::new(StubBackend {
            live: Ok(vec![flight("AI101"), flight("AI202")]),
            ..StubBackend::default()
        });
        let (result, _) = harness.command(&LiveCommand, command_event("live")).await;
        result.expect("live");

        let content = harness.calls().await[1].content().unwrap_or_default();
        assert!(content.starts_with("**Live flights (2)**"), "{content}");
        assert!(content.contains("AI202"));
        assert!(content.contains("36000ft"));
    }
}
