use async_trait::async_trait;
use comrade_core::domain::service::HealthReport;

use crate::context::{HandlerContext, HandlerResult};
use crate::messages::{MessageBuilder, MessagePayload, COLOR_SUCCESS, COLOR_WARNING};
use crate::registry::CommandHandler;
use crate::reply::ReplyController;

pub struct StatusCommand;

#[async_trait]
impl CommandHandler for StatusCommand {
    fn name(&self) -> &'static str {
        "status"
    }

    fn description(&self) -> &'static str {
        "Check system health"
    }

    async fn execute(&self, ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
        let report = ctx.api.health().await?;
        reply.reply(health_message(&report)).await?;
        Ok(())
    }
}

fn health_message(report: &HealthReport) -> MessagePayload {
    let (icon, color) =
        if report.is_healthy() { ("🟢", COLOR_SUCCESS) } else { ("🟠", COLOR_WARNING) };

    MessageBuilder::new()
        .embed(|embed| {
            embed.title("Status").color(color).description(format!(
                "{icon} Overall: **{}**\nUptime: {}",
                report.status,
                if report.uptime.is_empty() { "unknown" } else { report.uptime.as_str() }
            ));
            for (name, service) in &report.services {
                let value = match &service.details {
                    Some(details) => format!("{}\n{details}", service.status),
                    None => service.status.clone(),
                };
                embed.field(name, value, true);
            }
            if let Some(up_since) = &report.up_since {
                embed.footer(format!("Up since {up_since}"));
            }
        })
        .build()
}
