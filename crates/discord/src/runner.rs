use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::dispatch::Dispatcher;
use crate::gateway::{GatewayTransport, NoopGatewayTransport, TransportError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

struct SessionFailure {
    /// The session got past `connect` before failing.
    established: bool,
    error: TransportError,
}

/// Pumps gateway events into the dispatcher. Each event is dispatched on its own task so a
/// slow handler never holds up acknowledgement of the next interaction.
pub struct GatewayRunner {
    transport: Arc<dyn GatewayTransport>,
    dispatcher: Arc<Dispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl GatewayRunner {
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        dispatcher: Arc<Dispatcher>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    /// Runner with no live connection; `start` returns immediately.
    pub fn idle(dispatcher: Arc<Dispatcher>) -> Self {
        Self::new(Arc::new(NoopGatewayTransport), dispatcher, ReconnectPolicy::default())
    }

    pub async fn start(&self) -> Result<()> {
        let mut in_flight = JoinSet::new();
        let mut attempt = 0;

        loop {
            match self.connect_and_pump(attempt, &mut in_flight).await {
                Ok(()) => break,
                Err(failure) => {
                    if failure.established {
                        attempt = 0;
                    }
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %failure.error,
                        "gateway transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "gateway retries exhausted; continuing process without crash"
                        );
                        break;
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            log_join_failure(joined);
        }
        Ok(())
    }

    async fn connect_and_pump(
        &self,
        attempt: u32,
        in_flight: &mut JoinSet<()>,
    ) -> Result<(), SessionFailure> {
        info!(attempt, "opening gateway connection");
        self.transport
            .connect()
            .await
            .map_err(|error| SessionFailure { established: false, error })?;
        info!(attempt, "gateway connected");

        loop {
            let next = self
                .transport
                .next_event()
                .await
                .map_err(|error| SessionFailure { established: true, error })?;
            let Some(event) = next else {
                info!(attempt, "gateway stream closed");
                self.transport
                    .disconnect()
                    .await
                    .map_err(|error| SessionFailure { established: true, error })?;
                return Ok(());
            };

            info!(
                event_name = "ingress.discord.event_received",
                correlation_id = %event.id,
                interaction_type = event.interaction_type().as_str(),
                guild_id = event.origin.guild_id.as_deref().unwrap_or("dm"),
                "received interaction"
            );

            while let Some(joined) = in_flight.try_join_next() {
                log_join_failure(joined);
            }
            let dispatcher = self.dispatcher.clone();
            in_flight.spawn(async move {
                dispatcher.dispatch(event).await;
            });
        }
    }
}

fn log_join_failure(joined: Result<(), tokio::task::JoinError>) {
    if let Err(join_error) = joined {
        error!(error = %join_error, "dispatch task aborted");
    }
}
