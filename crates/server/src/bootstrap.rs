use std::sync::Arc;

use comrade_api::HttpBackendApi;
use comrade_core::config::{AppConfig, ConfigError};
use comrade_core::{ApiError, BackendApi};
use comrade_discord::gateway::{DiscordGatewayTransport, GatewayTransport};
use comrade_discord::handlers::{default_components, default_registry};
use comrade_discord::registry::RegistryError;
use comrade_discord::render::TextTableRenderer;
use comrade_discord::reply::PlatformError;
use comrade_discord::{Dispatcher, DiscordRestResponder, GatewayRunner, ReconnectPolicy};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub backend: Arc<dyn BackendApi>,
    pub transport: Arc<dyn GatewayTransport>,
    pub runner: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("backend client could not be built: {0}")]
    Backend(#[source] ApiError),
    #[error("platform client could not be built: {0}")]
    Platform(#[source] PlatformError),
    #[error("handler registration failed: {0}")]
    Registry(#[from] RegistryError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let backend: Arc<dyn BackendApi> =
        Arc::new(HttpBackendApi::new(&config.backend).map_err(BootstrapError::Backend)?);
    let responder =
        Arc::new(DiscordRestResponder::new(&config.discord).map_err(BootstrapError::Platform)?);

    let commands = default_registry()?;
    let components = default_components()?;
    for (domain, action) in components.unserved_routes() {
        warn!(
            event_name = "system.bootstrap.route_unserved",
            correlation_id = "bootstrap",
            route = %format!("{domain}_{action}"),
            "component route has no handler"
        );
    }
    info!(
        event_name = "system.bootstrap.handlers_registered",
        correlation_id = "bootstrap",
        commands = commands.len(),
        component_routes = components.len(),
        "interaction handlers registered"
    );

    let dispatcher = Arc::new(Dispatcher::new(
        commands,
        components,
        responder,
        backend.clone(),
        Arc::new(TextTableRenderer),
    ));
    let transport: Arc<dyn GatewayTransport> = Arc::new(DiscordGatewayTransport::new(
        config.discord.gateway_url.clone(),
        config.discord.bot_token.clone(),
    ));
    let runner = GatewayRunner::new(transport.clone(), dispatcher, ReconnectPolicy::default());

    Ok(Application { config, backend, transport, runner })
}

#[cfg(test)]
mod tests {
    use comrade_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?)
    }

    fn overrides(bot_token: &str) -> LoadOptions {
        LoadOptions {
            config_path: Some("does-not-exist/comrade.toml".into()),
            overrides: ConfigOverrides {
                discord_bot_token: Some(bot_token.to_owned()),
                discord_application_id: Some("123456789012345678".to_owned()),
                backend_base_url: Some("http://localhost:9999".to_owned()),
                backend_api_key: Some("test-key".to_owned()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[test]
    fn bootstrap_fails_fast_without_bot_token() {
        let result = bootstrap(overrides(" "));

        let error = result.err().expect("missing token must fail");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("discord.bot_token"));
    }

    #[test]
    fn bootstrap_wires_every_handler() {
        let app = bootstrap(overrides("test-bot-token")).expect("bootstrap");

        assert_eq!(app.config.discord.application_id, "123456789012345678");
        assert!(app.config.server.graceful_shutdown_secs > 0);
    }
}
