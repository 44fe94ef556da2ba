//! Gateway connection: the single persistent websocket interactions arrive on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::events::InboundEvent;
use crate::wire::parse_interaction;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

/// Interactions only need the GUILDS intent.
pub const INTENT_GUILDS: u64 = 1;
const OUTBOUND_BUFFER: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("gateway failed to connect: {0}")]
    Connect(String),
    #[error("gateway read failed: {0}")]
    Receive(String),
    #[error("gateway session ended: {0}")]
    SessionEnded(String),
    #[error("gateway disconnect failed: {0}")]
    Disconnect(String),
}

#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `Ok(None)` once the transport was shut down deliberately.
    async fn next_event(&self) -> Result<Option<InboundEvent>, TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopGatewayTransport;

#[async_trait]
impl GatewayTransport for NoopGatewayTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<InboundEvent>, TransportError> {
        Ok(None)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GatewayFrame {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum FrameAction {
    Deliver(Box<InboundEvent>),
    HeartbeatNow,
    Reconnect(&'static str),
    Ignore,
}

/// Decides what a received frame means for the session.
pub(crate) fn classify(frame: GatewayFrame) -> FrameAction {
    match frame.op {
        OP_DISPATCH => match frame.t.as_deref() {
            Some("INTERACTION_CREATE") => match parse_interaction(frame.d) {
                Ok(event) => FrameAction::Deliver(Box::new(event)),
                Err(error) => {
                    warn!(
                        event_name = "ingress.discord.interaction_rejected",
                        error = %error,
                        "unparseable interaction dropped"
                    );
                    FrameAction::Ignore
                }
            },
            Some("READY") => {
                info!(event_name = "ingress.discord.ready", "gateway session ready");
                FrameAction::Ignore
            }
            _ => FrameAction::Ignore,
        },
        OP_HEARTBEAT => FrameAction::HeartbeatNow,
        OP_RECONNECT => FrameAction::Reconnect("server requested reconnect"),
        OP_INVALID_SESSION => FrameAction::Reconnect("invalid session"),
        OP_HEARTBEAT_ACK => {
            trace!("heartbeat acknowledged");
            FrameAction::Ignore
        }
        _ => FrameAction::Ignore,
    }
}

pub(crate) fn identify_payload(token: &str, intents: u64) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "comrade",
                "device": "comrade"
            }
        }
    })
}

/// Sequence 0 means no dispatch seen yet (the gateway numbers from 1).
pub(crate) fn heartbeat_payload(sequence: u64) -> Value {
    let last = if sequence == 0 { Value::Null } else { json!(sequence) };
    json!({ "op": OP_HEARTBEAT, "d": last })
}

struct SessionControl {
    outbound: mpsc::Sender<Message>,
    writer: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

impl SessionControl {
    fn abort(&self) {
        self.heartbeat.abort();
        self.writer.abort();
    }
}

pub struct DiscordGatewayTransport {
    url: String,
    token: SecretString,
    intents: u64,
    sequence: Arc<AtomicU64>,
    source: Mutex<Option<WsSource>>,
    control: Mutex<Option<SessionControl>>,
}

impl DiscordGatewayTransport {
    pub fn new(url: impl Into<String>, token: SecretString) -> Self {
        Self {
            url: url.into(),
            token,
            intents: INTENT_GUILDS,
            sequence: Arc::new(AtomicU64::new(0)),
            source: Mutex::new(None),
            control: Mutex::new(None),
        }
    }

    async fn send(&self, message: Message) -> Result<(), TransportError> {
        let control = self.control.lock().await;
        let Some(control) = control.as_ref() else {
            return Err(TransportError::SessionEnded("not connected".to_owned()));
        };
        control
            .outbound
            .send(message)
            .await
            .map_err(|_| TransportError::SessionEnded("writer stopped".to_owned()))
    }
}

async fn read_hello(source: &mut WsSource) -> Result<Duration, TransportError> {
    while let Some(message) = source.next().await {
        let message = message.map_err(|error| TransportError::Connect(error.to_string()))?;
        let Message::Text(text) = message else {
            continue;
        };
        let frame: GatewayFrame = serde_json::from_str(text.as_str())
            .map_err(|error| TransportError::Connect(format!("bad hello frame: {error}")))?;
        if frame.op != OP_HELLO {
            return Err(TransportError::Connect(format!("expected hello, got op {}", frame.op)));
        }
        let interval = frame.d["heartbeat_interval"]
            .as_u64()
            .ok_or_else(|| TransportError::Connect("hello without heartbeat_interval".to_owned()))?;
        return Ok(Duration::from_millis(interval));
    }
    Err(TransportError::Connect("gateway closed before hello".to_owned()))
}

fn spawn_writer(mut sink: WsSink, mut outbound: mpsc::Receiver<Message>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let closing = matches!(message, Message::Close(_));
            if let Err(error) = sink.send(message).await {
                warn!(event_name = "ingress.discord.send_failed", error = %error, "gateway write failed");
                break;
            }
            if closing {
                break;
            }
        }
        let _ = sink.close().await;
    })
}

fn spawn_heartbeat(
    every: Duration,
    sequence: Arc<AtomicU64>,
    outbound: mpsc::Sender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        loop {
            ticker.tick().await;
            let beat = heartbeat_payload(sequence.load(Ordering::Relaxed));
            if outbound.send(Message::Text(beat.to_string().into())).await.is_err() {
                break;
            }
            trace!("heartbeat sent");
        }
    })
}

#[async_trait]
impl GatewayTransport for DiscordGatewayTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let (stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (sink, mut source) = stream.split();

        let interval = read_hello(&mut source).await?;
        debug!(heartbeat_ms = interval.as_millis() as u64, "gateway hello received");

        self.sequence.store(0, Ordering::Relaxed);
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let writer = spawn_writer(sink, outbound_rx);
        let heartbeat = spawn_heartbeat(interval, self.sequence.clone(), outbound.clone());

        if let Some(previous) =
            self.control.lock().await.replace(SessionControl { outbound, writer, heartbeat })
        {
            previous.abort();
        }
        *self.source.lock().await = Some(source);

        let identify = identify_payload(self.token.expose_secret(), self.intents);
        self.send(Message::Text(identify.to_string().into())).await?;
        info!(event_name = "ingress.discord.identified", "gateway identify sent");
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<InboundEvent>, TransportError> {
        let mut guard = self.source.lock().await;
        let Some(source) = guard.as_mut() else {
            return Ok(None);
        };

        loop {
            let message = match source.next().await {
                Some(Ok(message)) => message,
                Some(Err(error)) => return Err(TransportError::Receive(error.to_string())),
                None => return Err(TransportError::SessionEnded("stream closed".to_owned())),
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    let reason = frame.map_or_else(
                        || "close frame".to_owned(),
                        |frame| format!("closed with code {}", u16::from(frame.code)),
                    );
                    return Err(TransportError::SessionEnded(reason));
                }
                _ => continue,
            };

            let frame: GatewayFrame = match serde_json::from_str(text.as_str()) {
                Ok(frame) => frame,
                Err(error) => {
                    warn!(error = %error, "undecodable gateway frame skipped");
                    continue;
                }
            };
            if let Some(sequence) = frame.s {
                self.sequence.store(sequence, Ordering::Relaxed);
            }

            match classify(frame) {
                FrameAction::Deliver(event) => return Ok(Some(*event)),
                FrameAction::HeartbeatNow => {
                    let beat = heartbeat_payload(self.sequence.load(Ordering::Relaxed));
                    self.send(Message::Text(beat.to_string().into())).await?;
                }
                FrameAction::Reconnect(reason) => {
                    return Err(TransportError::SessionEnded(reason.to_owned()))
                }
                FrameAction::Ignore => {}
            }
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if let Some(control) = self.control.lock().await.take() {
            control.heartbeat.abort();
            // The writer closes the sink after forwarding the close frame.
            control
                .outbound
                .send(Message::Close(None))
                .await
                .map_err(|_| TransportError::Disconnect("writer already stopped".to_owned()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn frame(value: Value) -> GatewayFrame {
        serde_json::from_value(value).expect("frame")
    }

    #[test]
    fn interaction_dispatch_is_delivered() {
        let action = classify(frame(json!({
            "op": 0,
            "s": 42,
            "t": "INTERACTION_CREATE",
            "d": {
                "id": "1", "application_id": "2", "type": 2, "token": "t",
                "user": {"id": "3"}, "data": {"name": "status"}
            }
        })));
        let FrameAction::Deliver(event) = action else {
            panic!("expected delivery, got {action:?}");
        };
        assert_eq!(event.command().map(|command| command.name.as_str()), Some("status"));
    }

    #[test]
    fn unsupported_interactions_are_ignored_not_fatal() {
        let action = classify(frame(json!({
            "op": 0, "t": "INTERACTION_CREATE",
            "d": {"id": "1", "application_id": "2", "type": 1, "token": "t", "user": {"id": "3"}}
        })));
        assert_eq!(action, FrameAction::Ignore);
        assert_eq!(classify(frame(json!({"op": 0, "t": "GUILD_CREATE", "d": {}}))), FrameAction::Ignore);
    }

    #[test]
    fn control_opcodes_map_to_session_actions() {
        assert_eq!(classify(frame(json!({"op": 1}))), FrameAction::HeartbeatNow);
        assert!(matches!(classify(frame(json!({"op": 7}))), FrameAction::Reconnect(_)));
        assert!(matches!(classify(frame(json!({"op": 9, "d": false}))), FrameAction::Reconnect(_)));
        assert_eq!(classify(frame(json!({"op": 11}))), FrameAction::Ignore);
    }

    #[test]
    fn heartbeat_carries_last_sequence() {
        assert_eq!(heartbeat_payload(0), json!({"op": 1, "d": null}));
        assert_eq!(heartbeat_payload(42), json!({"op": 1, "d": 42}));
    }

    #[test]
    fn identify_requests_guild_intent() {
        let payload = identify_payload("bot-token", INTENT_GUILDS);
        assert_eq!(payload["op"], 2);
        assert_eq!(payload["d"]["intents"], 1);
        assert_eq!(payload["d"]["token"], "bot-token");
    }

    #[tokio::test]
    async fn unconnected_transport_yields_no_events() {
        let transport =
            DiscordGatewayTransport::new("wss://gateway.example.test", "token".to_owned().into());
        assert_eq!(transport.next_event().await, Ok(None));
        assert_eq!(transport.disconnect().await, Ok(()));
    }
}
