use comrade_core::Identity;

use crate::token::ComponentKind;

/// One user-triggered interaction delivered by the platform. Immutable once received.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundEvent {
    pub id: String,
    pub application_id: String,
    /// Interaction token used for every reply call; valid for a bounded window.
    pub interaction_token: String,
    pub origin: Origin,
    pub kind: InteractionKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Origin {
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionKind {
    Command(CommandInvocation),
    Button(ButtonPress),
    SelectMenu(MenuSelection),
    ModalSubmit(ModalSubmission),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InteractionType {
    Command,
    Button,
    SelectMenu,
    ModalSubmit,
}

impl InteractionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Button => "button",
            Self::SelectMenu => "select_menu",
            Self::ModalSubmit => "modal_submit",
        }
    }
}

impl InteractionKind {
    pub fn interaction_type(&self) -> InteractionType {
        match self {
            Self::Command(_) => InteractionType::Command,
            Self::Button(_) => InteractionType::Button,
            Self::SelectMenu(_) => InteractionType::SelectMenu,
            Self::ModalSubmit(_) => InteractionType::ModalSubmit,
        }
    }

    /// `custom_id` and component kind for component interactions.
    pub fn component(&self) -> Option<(&str, ComponentKind)> {
        match self {
            Self::Command(_) => None,
            Self::Button(press) => Some((&press.custom_id, ComponentKind::Button)),
            Self::SelectMenu(selection) => {
                Some((&selection.custom_id, ComponentKind::SelectMenu))
            }
            Self::ModalSubmit(submission) => Some((&submission.custom_id, ComponentKind::Modal)),
        }
    }
}

impl InboundEvent {
    pub fn identity(&self) -> Identity {
        Identity { guild_id: self.origin.guild_id.clone(), user_id: self.origin.user_id.clone() }
    }

    pub fn interaction_type(&self) -> InteractionType {
        self.kind.interaction_type()
    }

    pub fn command(&self) -> Option<&CommandInvocation> {
        match &self.kind {
            InteractionKind::Command(invocation) => Some(invocation),
            _ => None,
        }
    }

    pub fn modal(&self) -> Option<&ModalSubmission> {
        match &self.kind {
            InteractionKind::ModalSubmit(submission) => Some(submission),
            _ => None,
        }
    }

    pub fn selected_values(&self) -> &[String] {
        match &self.kind {
            InteractionKind::SelectMenu(selection) => &selection.values,
            _ => &[],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandInvocation {
    pub name: String,
    pub subcommand: Option<String>,
    pub options: Vec<CommandOption>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandOption {
    pub name: String,
    pub value: OptionValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    /// Snowflake of a user, channel, role or mentionable.
    Entity(String),
}

impl CommandInvocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), subcommand: None, options: Vec::new() }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.push(CommandOption { name: name.into(), value });
        self
    }

    fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.iter().find(|option| option.name == name).map(|option| &option.value)
    }

    pub fn string_option(&self, name: &str) -> Option<&str> {
        match self.option(name)? {
            OptionValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn user_option(&self, name: &str) -> Option<&str> {
        match self.option(name)? {
            OptionValue::Entity(id) => Some(id.as_str()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonPress {
    pub custom_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuSelection {
    pub custom_id: String,
    pub values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalSubmission {
    pub custom_id: String,
    pub fields: Vec<ModalField>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalField {
    pub custom_id: String,
    pub value: String,
}

impl ModalSubmission {
    /// Trimmed value of a submitted field; absent and blank fields are `None`.
    pub fn field(&self, custom_id: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.custom_id == custom_id)
            .map(|field| field.value.trim())
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: InteractionKind) -> InboundEvent {
        InboundEvent {
            id: "1".to_owned(),
            application_id: "2".to_owned(),
            interaction_token: "tok".to_owned(),
            origin: Origin {
                guild_id: Some("g".to_owned()),
                channel_id: None,
                user_id: "u".to_owned(),
            },
            kind,
        }
    }

    #[test]
    fn typed_option_accessors_reject_other_types() {
        let invocation = CommandInvocation::new("pilotmanage")
            .with_option("function", OptionValue::String("sync_user".to_owned()))
            .with_option("target_user", OptionValue::Entity("99".to_owned()))
            .with_option("page", OptionValue::Integer(2));

        assert_eq!(invocation.string_option("function"), Some("sync_user"));
        assert_eq!(invocation.user_option("target_user"), Some("99"));
        assert_eq!(invocation.string_option("target_user"), None);
        assert_eq!(invocation.string_option("page"), None);
        assert_eq!(invocation.user_option("missing"), None);
    }

    #[test]
    fn blank_modal_fields_read_as_absent() {
        let submission = ModalSubmission {
            custom_id: "register_submit".to_owned(),
            fields: vec![
                ModalField { custom_id: "ifcId".to_owned(), value: "  john_doe ".to_owned() },
                ModalField { custom_id: "callsign".to_owned(), value: "   ".to_owned() },
            ],
        };

        assert_eq!(submission.field("ifcId"), Some("john_doe"));
        assert_eq!(submission.field("callsign"), None);
        assert_eq!(submission.field("lastFlight"), None);
    }

    #[test]
    fn component_exposes_custom_id_and_kind() {
        let press = event(InteractionKind::Button(ButtonPress {
            custom_id: "register_new".to_owned(),
        }));
        assert_eq!(press.kind.component(), Some(("register_new", ComponentKind::Button)));
        assert_eq!(press.identity(), Identity::new(Some("g"), "u"));

        let command = event(InteractionKind::Command(CommandInvocation::new("help")));
        assert_eq!(command.kind.component(), None);
        assert!(command.selected_values().is_empty());
    }
}
