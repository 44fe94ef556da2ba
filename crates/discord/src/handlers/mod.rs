//! Command and component handlers for the bot's features.
//!
//! Commands are looked up by name in the [`CommandRegistry`]; buttons, select menus and
//! modals are looked up by the `(domain, action)` of their continuation token in the
//! [`ComponentTable`]. Both tables are built once at startup by [`default_registry`] and
//! [`default_components`].

mod dashboard;
mod help;
mod initserver;
mod live;
mod logbook;
mod pilot;
mod pirep;
mod register;
mod stats;
mod status;

use comrade_core::domain::validation::ValidationError;

use crate::context::{HandlerContext, HandlerError};
use crate::events::ModalSubmission;
use crate::registry::{CommandRegistry, CommandSummary, ComponentTable, RegistryError};
use crate::token::ComponentRoute;

pub use dashboard::DashboardCommand;
pub use help::HelpCommand;
pub use initserver::{InitServerCommand, InitServerFlow};
pub use live::LiveCommand;
pub use logbook::{FlightsPager, LogbookCommand};
pub use pilot::{PilotManageCommand, PilotOperations};
pub use pirep::{LogCommand, PirepFlow};
pub use register::{RegisterCommand, RegisterFlow};
pub use stats::StatsCommand;
pub use status::StatusCommand;

/// Every slash command the bot serves. `help` lists the others, so it is registered last.
pub fn default_registry() -> Result<CommandRegistry, RegistryError> {
    let mut registry = CommandRegistry::new();
    registry.register(StatusCommand)?;
    registry.register(RegisterCommand)?;
    registry.register(LogbookCommand)?;
    registry.register(InitServerCommand)?;
    registry.register(PilotManageCommand)?;
    registry.register(StatsCommand)?;
    registry.register(LogCommand)?;
    registry.register(LiveCommand)?;
    registry.register(DashboardCommand)?;

    let mut summaries = registry.summaries();
    summaries.push(CommandSummary {
        name: HelpCommand::NAME,
        description: HelpCommand::DESCRIPTION,
        usage: HelpCommand::USAGE,
    });
    summaries.sort_by_key(|summary| summary.name);
    registry.register(HelpCommand::new(summaries))?;
    Ok(registry)
}

pub fn default_components() -> Result<ComponentTable, RegistryError> {
    let mut table = ComponentTable::new();
    table.register(FlightsPager)?;
    table.register(RegisterFlow)?;
    table.register(InitServerFlow)?;
    table.register(PirepFlow)?;
    table.register(PilotOperations)?;
    Ok(table)
}

pub(crate) fn required_field<'a>(
    submission: &'a ModalSubmission,
    field: &str,
) -> Result<&'a str, HandlerError> {
    submission
        .field(field)
        .ok_or_else(|| ValidationError::MissingField { field: field.to_owned() }.into())
}

pub(crate) fn submitted_form(ctx: &HandlerContext) -> Result<&ModalSubmission, HandlerError> {
    ctx.event
        .modal()
        .ok_or_else(|| HandlerError::Internal("expected a modal submission".to_owned()))
}

/// The component table only routes a handler its own `(domain, action)` pairs.
pub(crate) fn unexpected_route(route: &ComponentRoute) -> HandlerError {
    HandlerError::Internal(format!("no handler arm for route {}_{}", route.domain(), route.action()))
}

/// Capitalises the first letter of a backend role name.
pub(crate) fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
