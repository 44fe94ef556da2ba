//! Raw interaction JSON, as delivered by the gateway, parsed into [`InboundEvent`].

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::events::{
    ButtonPress, CommandInvocation, CommandOption, InboundEvent, InteractionKind, MenuSelection,
    ModalField, ModalSubmission, OptionValue, Origin,
};

const APPLICATION_COMMAND: u8 = 2;
const MESSAGE_COMPONENT: u8 = 3;
const MODAL_SUBMIT: u8 = 5;

const OPTION_SUB_COMMAND: u8 = 1;
const OPTION_SUB_COMMAND_GROUP: u8 = 2;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("interaction type {interaction_type} is not handled")]
    Unsupported { interaction_type: u8 },
    #[error("component type {component_type} is not handled")]
    UnsupportedComponent { component_type: u8 },
    #[error("interaction is missing `{0}`")]
    Missing(&'static str),
    #[error("option `{name}` carries no usable value")]
    InvalidOption { name: String },
    #[error("malformed interaction payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct RawInteraction {
    id: String,
    application_id: String,
    #[serde(rename = "type")]
    interaction_type: u8,
    token: String,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    member: Option<RawMember>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct RawMember {
    user: Option<RawUser>,
}

#[derive(Deserialize)]
struct RawUser {
    id: String,
}

#[derive(Deserialize)]
struct RawCommandData {
    name: String,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Deserialize)]
struct RawOption {
    name: String,
    #[serde(rename = "type")]
    option_type: u8,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Deserialize)]
struct RawComponentData {
    custom_id: String,
    component_type: u8,
    #[serde(default)]
    values: Vec<String>,
}

#[derive(Deserialize)]
struct RawModalData {
    custom_id: String,
    #[serde(default)]
    components: Vec<RawModalRow>,
}

#[derive(Deserialize)]
struct RawModalRow {
    #[serde(default)]
    components: Vec<RawModalInput>,
}

#[derive(Deserialize)]
struct RawModalInput {
    custom_id: String,
    #[serde(default)]
    value: Option<String>,
}

pub fn parse_interaction_str(raw: &str) -> Result<InboundEvent, WireError> {
    parse_interaction(serde_json::from_str(raw)?)
}

pub fn parse_interaction(raw: Value) -> Result<InboundEvent, WireError> {
    let raw: RawInteraction = serde_json::from_value(raw)?;

    // Guild interactions carry the user under `member`, direct messages under `user`.
    let user_id = raw
        .member
        .and_then(|member| member.user)
        .or(raw.user)
        .map(|user| user.id)
        .ok_or(WireError::Missing("user"))?;

    let kind = match raw.interaction_type {
        APPLICATION_COMMAND => InteractionKind::Command(command(required_data(raw.data)?)?),
        MESSAGE_COMPONENT => component(required_data(raw.data)?)?,
        MODAL_SUBMIT => InteractionKind::ModalSubmit(modal(required_data(raw.data)?)?),
        // pings are answered by the gateway itself; autocomplete is not offered
        interaction_type => return Err(WireError::Unsupported { interaction_type }),
    };

    Ok(InboundEvent {
        id: raw.id,
        application_id: raw.application_id,
        interaction_token: raw.token,
        origin: Origin { guild_id: raw.guild_id, channel_id: raw.channel_id, user_id },
        kind,
    })
}

fn required_data(data: Option<Value>) -> Result<Value, WireError> {
    data.ok_or(WireError::Missing("data"))
}

fn command(data: Value) -> Result<CommandInvocation, WireError> {
    let data: RawCommandData = serde_json::from_value(data)?;
    let mut invocation = CommandInvocation::new(data.name);

    let mut options = data.options;
    let leading = options.first().map(|first| first.option_type);
    if let Some(leading) = leading {
        match leading {
            OPTION_SUB_COMMAND => {
                let sub = options.remove(0);
                invocation.subcommand = Some(sub.name);
                options = sub.options;
            }
            OPTION_SUB_COMMAND_GROUP => {
                let group = options.remove(0);
                let mut inner = group.options;
                if inner.is_empty() {
                    invocation.subcommand = Some(group.name);
                    options = Vec::new();
                } else {
                    let sub = inner.remove(0);
                    invocation.subcommand = Some(format!("{} {}", group.name, sub.name));
                    options = sub.options;
                }
            }
            _ => {}
        }
    }

    invocation.options = options.into_iter().map(option).collect::<Result<_, _>>()?;
    Ok(invocation)
}

fn option(raw: RawOption) -> Result<CommandOption, WireError> {
    let invalid = || WireError::InvalidOption { name: raw.name.clone() };
    let value = raw.value.as_ref().ok_or_else(invalid)?;

    let value = match raw.option_type {
        3 => OptionValue::String(value.as_str().ok_or_else(invalid)?.to_owned()),
        4 => OptionValue::Integer(value.as_i64().ok_or_else(invalid)?),
        5 => OptionValue::Boolean(value.as_bool().ok_or_else(invalid)?),
        10 => OptionValue::Number(value.as_f64().ok_or_else(invalid)?),
        // user, channel, role, mentionable, attachment: snowflakes
        6..=9 | 11 => OptionValue::Entity(snowflake(value).ok_or_else(invalid)?),
        _ => return Err(invalid()),
    };

    Ok(CommandOption { name: raw.name, value })
}

fn snowflake(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn component(data: Value) -> Result<InteractionKind, WireError> {
    let data: RawComponentData = serde_json::from_value(data)?;
    match data.component_type {
        2 => Ok(InteractionKind::Button(ButtonPress { custom_id: data.custom_id })),
        3 | 5..=8 => Ok(InteractionKind::SelectMenu(MenuSelection {
            custom_id: data.custom_id,
            values: data.values,
        })),
        component_type => Err(WireError::UnsupportedComponent { component_type }),
    }
}

fn modal(data: Value) -> Result<ModalSubmission, WireError> {
    let data: RawModalData = serde_json::from_value(data)?;
    let fields = data
        .components
        .into_iter()
        .flat_map(|row| row.components)
        .map(|input| ModalField {
            custom_id: input.custom_id,
            value: input.value.unwrap_or_default(),
        })
        .collect();

    Ok(ModalSubmission { custom_id: data.custom_id, fields })
}
