use async_trait::async_trait;
use comrade_core::domain::service::DashboardLink;

use crate::context::{HandlerContext, HandlerResult};
use crate::messages::{Button, MessageBuilder, MessagePayload, COLOR_INFO};
use crate::registry::CommandHandler;
use crate::reply::ReplyController;

pub struct DashboardCommand;

#[async_trait]
impl CommandHandler for DashboardCommand {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn description(&self) -> &'static str {
        "Get a secure link to the flight dashboard"
    }

    async fn execute(&self, ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
        // The link is a one-time credential; only the caller may see it.
        reply.defer(true).await?;
        let link = ctx.api.dashboard_link(&ctx.identity).await?;
        reply.edit(link_message(&link)).await?;
        Ok(())
    }
}

fn link_message(link: &DashboardLink) -> MessagePayload {
    let minutes = link.expires_in / 60;
    MessageBuilder::new()
        .embed(|embed| {
            embed
                .title("🚀 Dashboard Access")
                .color(COLOR_INFO)
                .description(format!(
                    "Use the button below to open your flight dashboard.\n\n\
                     ⏱️ This link expires in **{minutes} minutes**\n\
                     🔒 For security, this link can only be used once"
                ));
        })
        .actions(|row| {
            row.button(Button::link(&link.url, "📊 Open Dashboard"));
        })
        .build()
}
