//! [`InteractionResponder`] over the platform's REST API.

use std::time::Duration;

use async_trait::async_trait;
use comrade_core::config::DiscordConfig;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::messages::{Attachment, MessagePayload};
use crate::reply::{InitialResponse, InteractionHandle, InteractionResponder, PlatformError};

const USER_AGENT: &str = concat!("DiscordBot (comrade, ", env!("CARGO_PKG_VERSION"), ")");
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const CODE_UNKNOWN_WEBHOOK: u64 = 10015;
const CODE_UNKNOWN_INTERACTION: u64 = 10062;
const CODE_ALREADY_ACKNOWLEDGED: u64 = 40060;
const CODE_INVALID_WEBHOOK_TOKEN: u64 = 50027;

pub struct DiscordRestResponder {
    client: Client,
    base_url: String,
}

impl DiscordRestResponder {
    pub fn new(config: &DiscordConfig) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| PlatformError::Transport(error.to_string()))?;

        Ok(Self { client, base_url: config.rest_base_url.trim_end_matches('/').to_owned() })
    }

    fn callback_url(&self, interaction: &InteractionHandle) -> String {
        format!("{}/interactions/{}/{}/callback", self.base_url, interaction.id, interaction.token)
    }

    fn webhook_url(&self, interaction: &InteractionHandle) -> String {
        format!("{}/webhooks/{}/{}", self.base_url, interaction.application_id, interaction.token)
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Value,
        attachments: &[Attachment],
    ) -> Result<(), PlatformError> {
        let request = self.client.request(method, url);
        let request = if attachments.is_empty() {
            request.json(&body)
        } else {
            request.multipart(multipart(body, attachments)?)
        };

        let response = request.send().await.map_err(|error| {
            warn!(event_name = "platform.transport_failed", error = %error, "platform call failed");
            PlatformError::Transport(error.to_string())
        })?;
        check(response).await
    }
}

#[async_trait]
impl InteractionResponder for DiscordRestResponder {
    async fn create_response(
        &self,
        interaction: &InteractionHandle,
        response: &InitialResponse,
    ) -> Result<(), PlatformError> {
        debug!(
            event_name = "platform.interaction_callback",
            correlation_id = %interaction.id,
            callback_type = response.callback_type(),
            "sending initial response"
        );
        let mut body = response.body()?;
        if let Some(data) = body.get_mut("data") {
            attach_references(data, response.attachments());
        }
        self.send(Method::POST, self.callback_url(interaction), body, response.attachments()).await
    }

    async fn edit_original(
        &self,
        interaction: &InteractionHandle,
        message: &MessagePayload,
    ) -> Result<(), PlatformError> {
        debug!(
            event_name = "platform.edit_original",
            correlation_id = %interaction.id,
            "editing original response"
        );
        let url = format!("{}/messages/@original", self.webhook_url(interaction));
        let mut body = message_body(message)?;
        attach_references(&mut body, &message.attachments);
        self.send(Method::PATCH, url, body, &message.attachments).await
    }

    async fn create_followup(
        &self,
        interaction: &InteractionHandle,
        message: &MessagePayload,
    ) -> Result<(), PlatformError> {
        debug!(
            event_name = "platform.followup",
            correlation_id = %interaction.id,
            "sending follow-up message"
        );
        let mut body = message_body(message)?;
        attach_references(&mut body, &message.attachments);
        self.send(Method::POST, self.webhook_url(interaction), body, &message.attachments).await
    }
}

fn message_body(message: &MessagePayload) -> Result<Value, PlatformError> {
    serde_json::to_value(message).map_err(|error| PlatformError::Encode(error.to_string()))
}

/// Uploaded files are referenced from the JSON body by their part index.
fn attach_references(body: &mut Value, attachments: &[Attachment]) {
    if attachments.is_empty() {
        return;
    }
    let references: Vec<Value> = attachments
        .iter()
        .enumerate()
        .map(|(index, attachment)| json!({ "id": index, "filename": attachment.filename }))
        .collect();
    body["attachments"] = Value::Array(references);
}

fn multipart(body: Value, attachments: &[Attachment]) -> Result<Form, PlatformError> {
    let mut form = Form::new().text("payload_json", body.to_string());
    for (index, attachment) in attachments.iter().enumerate() {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.filename.clone())
            .mime_str(&attachment.content_type)
            .map_err(|error| PlatformError::Encode(error.to_string()))?;
        form = form.part(format!("files[{index}]"), part);
    }
    Ok(form)
}

async fn check(response: Response) -> Result<(), PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    let error = platform_error(status.as_u16(), &body);
    warn!(
        event_name = "platform.request_rejected",
        status = status.as_u16(),
        error = %error,
        "platform rejected call"
    );
    Err(error)
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    retry_after: Option<f64>,
}

pub(crate) fn platform_error(status: u16, body: &str) -> PlatformError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let code = parsed.as_ref().and_then(|body| body.code);

    match code {
        Some(CODE_UNKNOWN_INTERACTION | CODE_UNKNOWN_WEBHOOK | CODE_INVALID_WEBHOOK_TOKEN) => {
            return PlatformError::UnknownInteraction
        }
        Some(CODE_ALREADY_ACKNOWLEDGED) => return PlatformError::AlreadyAcknowledged,
        _ => {}
    }

    if status == 429 {
        let seconds = parsed.as_ref().and_then(|body| body.retry_after).unwrap_or(1.0);
        return PlatformError::RateLimited { retry_after_ms: (seconds * 1000.0).ceil() as u64 };
    }

    PlatformError::Http {
        status,
        code,
        message: parsed.and_then(|body| body.message).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;

    fn responder() -> DiscordRestResponder {
        DiscordRestResponder::new(&DiscordConfig {
            bot_token: SecretString::from("token".to_owned()),
            application_id: "2200".to_owned(),
            gateway_url: "wss://gateway.example.test".to_owned(),
            rest_base_url: "https://discord.example.test/api/v10/".to_owned(),
        })
        .expect("responder")
    }

    fn handle() -> InteractionHandle {
        InteractionHandle {
            id: "1100".to_owned(),
            application_id: "2200".to_owned(),
            token: "tok".to_owned(),
        }
    }

    #[test]
    fn endpoints_follow_the_interaction_coordinates() {
        let responder = responder();
        assert_eq!(
            responder.callback_url(&handle()),
            "https://discord.example.test/api/v10/interactions/1100/tok/callback"
        );
        assert_eq!(
            responder.webhook_url(&handle()),
            "https://discord.example.test/api/v10/webhooks/2200/tok"
        );
    }

    #[test]
    fn platform_codes_map_to_typed_errors() {
        assert_eq!(
            platform_error(404, r#"{"message":"Unknown interaction","code":10062}"#),
            PlatformError::UnknownInteraction
        );
        assert_eq!(
            platform_error(400, r#"{"message":"already acknowledged","code":40060}"#),
            PlatformError::AlreadyAcknowledged
        );
        assert_eq!(
            platform_error(429, r#"{"message":"slow down","retry_after":0.25,"global":false}"#),
            PlatformError::RateLimited { retry_after_ms: 250 }
        );
        assert_eq!(
            platform_error(500, "oops"),
            PlatformError::Http { status: 500, code: None, message: String::new() }
        );
    }

    #[test]
    fn attachments_are_referenced_by_index() {
        let mut body = json!({ "content": "logbook" });
        attach_references(
            &mut body,
            &[Attachment {
                filename: "logbook.png".to_owned(),
                content_type: "image/png".to_owned(),
                bytes: vec![0x89],
            }],
        );
        assert_eq!(body["attachments"], json!([{ "id": 0, "filename": "logbook.png" }]));

        let mut plain = json!({ "content": "x" });
        attach_references(&mut plain, &[]);
        assert!(plain.get("attachments").is_none());
    }
}
