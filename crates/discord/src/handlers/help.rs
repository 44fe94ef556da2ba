use async_trait::async_trait;

use crate::context::{HandlerContext, HandlerError, HandlerResult};
use crate::events::CommandInvocation;
use crate::messages::{MessageBuilder, MessagePayload, COLOR_INFO};
use crate::registry::{CommandHandler, CommandSummary};
use crate::reply::ReplyController;

const COMMAND_OPTION: &str = "command";

/// Lists the registered commands, or explains one of them.
pub struct HelpCommand {
    commands: Vec<CommandSummary>,
}

impl HelpCommand {
    pub const NAME: &'static str = "help";
    pub const DESCRIPTION: &'static str = "Get help with Comrade Bot commands";
    pub const USAGE: &'static str = "/help [command]";

    pub fn new(commands: Vec<CommandSummary>) -> Self {
        Self { commands }
    }

    fn find(&self, name: &str) -> Option<&CommandSummary> {
        let name = name.trim().trim_start_matches('/');
        self.commands.iter().find(|summary| summary.name.eq_ignore_ascii_case(name))
    }

    fn overview(&self) -> MessagePayload {
        let lines: Vec<String> = self
            .commands
            .iter()
            .map(|summary| format!("`/{}` - {}", summary.name, summary.description))
            .collect();

        MessageBuilder::new()
            .embed(|embed| {
                embed
                    .title("Comrade Bot Commands")
                    .color(COLOR_INFO)
                    .description(lines.join("\n"))
                    .footer("Use /help <command> for details on one command");
            })
            .ephemeral()
            .build()
    }

    fn details(summary: &CommandSummary) -> MessagePayload {
        MessageBuilder::new()
            .embed(|embed| {
                embed
                    .title(format!("/{}", summary.name))
                    .color(COLOR_INFO)
                    .description(summary.description)
                    .field("Usage", format!("`{}`", summary.usage), false);
            })
            .ephemeral()
            .build()
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        Self::DESCRIPTION
    }

    fn usage(&self) -> &'static str {
        Self::USAGE
    }

    fn validate(&self, invocation: &CommandInvocation) -> Result<(), HandlerError> {
        match invocation.string_option(COMMAND_OPTION) {
            Some(name) if self.find(name).is_none() => Err(HandlerError::InvalidInput(format!(
                "Unknown command `{name}`. Use `/help` to see every command."
            ))),
            _ => Ok(()),
        }
    }

    async fn execute(&self, ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
        let requested = ctx
            .event
            .command()
            .and_then(|invocation| invocation.string_option(COMMAND_OPTION))
            .and_then(|name| self.find(name));

        let message = match requested {
            Some(summary) => Self::details(summary),
            None => self.overview(),
        };
        reply.reply(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::OptionValue;
    use crate::handlers::default_registry;
    use crate::testing::{command_event, invocation_event, Harness, StubBackend};

    fn help() -> HelpCommand {
        let registry = default_registry().expect("registry");
        HelpCommand::new(registry.summaries())
    }

    #[tokio::test]
    async fn overview_lists_every_command_ephemerally() {
        let harness = Harness::new(StubBackend::default());
        let (result, _) = harness.command(&help(), command_event("help")).await;
        result.expect("help");

        let calls = harness.calls().await;
        assert!(calls[0].is_ephemeral());
        let description = calls[0].payload()["embeds"][0]["description"]
            .as_str()
            .unwrap_or_default()
            .to_owned();
        for name in ["/status", "/logbook", "/register", "/dashboard"] {
            assert!(description.contains(name), "missing {name} in {description}");
        }
    }

    #[tokio::test]
    async fn named_command_shows_its_usage() {
        let harness = Harness::new(StubBackend::default());
        let event = invocation_event(
            CommandInvocation::new("help")
                .with_option("command", OptionValue::String("/Logbook".to_owned())),
        );
        let (result, _) = harness.command(&help(), event).await;
        result.expect("help");

        let embed = harness.calls().await[0].payload()["embeds"][0].clone();
        assert_eq!(embed["title"], "/logbook");
        assert_eq!(embed["fields"][0]["value"], "`/logbook ifc_id`");
    }

    #[tokio::test]
    async fn unknown_command_is_rejected_before_execution() {
        let harness = Harness::new(StubBackend::default());
        let event = invocation_event(
            CommandInvocation::new("help")
                .with_option("command", OptionValue::String("teleport".to_owned())),
        );
        let (result, _) = harness.command(&help(), event).await;

        let error = result.expect_err("unknown command");
        assert!(error.user_facing().is_some_and(|message| message.contains("teleport")));
        assert!(harness.calls().await.is_empty());
    }
}
