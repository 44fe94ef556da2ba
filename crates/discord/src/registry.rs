//! Static handler tables, built once at startup and read-only afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{HandlerContext, HandlerError, HandlerResult};
use crate::events::CommandInvocation;
use crate::reply::ReplyController;
use crate::token::{route_spec, ComponentRoute, Domain, ROUTES};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command `{0}` is registered twice")]
    DuplicateCommand(String),
    #[error("no handler for command `{0}`")]
    CommandNotFound(String),
    #[error("component route `{domain}_{action}` is registered twice")]
    DuplicateRoute { domain: Domain, action: &'static str },
    #[error("component route `{domain}_{action}` is not in the routing table")]
    UnknownRoute { domain: Domain, action: &'static str },
    #[error("no handler for component route `{domain}_{action}`")]
    RouteNotFound { domain: Domain, action: String },
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Example invocation shown by `/help <command>`.
    fn usage(&self) -> &'static str {
        self.name()
    }

    /// Checked before `execute`; a user-facing error here is answered without running it.
    fn validate(&self, _invocation: &CommandInvocation) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn execute(&self, ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSummary {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
}

#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        H: CommandHandler + 'static,
    {
        let name = handler.name();
        if self.handlers.contains_key(name) {
            return Err(RegistryError::DuplicateCommand(name.to_owned()));
        }
        self.handlers.insert(name, Arc::new(handler));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn CommandHandler>, RegistryError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::CommandNotFound(name.to_owned()))
    }

    /// Registered commands sorted by name.
    pub fn summaries(&self) -> Vec<CommandSummary> {
        let sorted: BTreeMap<_, _> = self.handlers.iter().collect();
        sorted
            .into_values()
            .map(|handler| CommandSummary {
                name: handler.name(),
                description: handler.description(),
                usage: handler.usage(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
pub trait ComponentHandler: Send + Sync {
    /// `(domain, action)` pairs served by this handler.
    fn routes(&self) -> &'static [(Domain, &'static str)];

    async fn handle(
        &self,
        ctx: &HandlerContext,
        route: ComponentRoute,
        reply: &mut ReplyController,
    ) -> HandlerResult;
}

/// Fixed `(domain, action)` routing table for buttons, select menus and modals.
#[derive(Default)]
pub struct ComponentTable {
    handlers: HashMap<(Domain, &'static str), Arc<dyn ComponentHandler>>,
}

impl ComponentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        H: ComponentHandler + 'static,
    {
        let handler: Arc<dyn ComponentHandler> = Arc::new(handler);
        for &(domain, action) in handler.routes() {
            if route_spec(domain, action).is_none() {
                return Err(RegistryError::UnknownRoute { domain, action });
            }
            if self.handlers.contains_key(&(domain, action)) {
                return Err(RegistryError::DuplicateRoute { domain, action });
            }
            self.handlers.insert((domain, action), handler.clone());
        }
        Ok(())
    }

    pub fn lookup(
        &self,
        domain: Domain,
        action: &str,
    ) -> Result<Arc<dyn ComponentHandler>, RegistryError> {
        route_spec(domain, action)
            .and_then(|spec| self.handlers.get(&(spec.domain, spec.action)))
            .cloned()
            .ok_or_else(|| RegistryError::RouteNotFound { domain, action: action.to_owned() })
    }

    /// Routing-table entries with no handler registered.
    pub fn unserved_routes(&self) -> Vec<(Domain, &'static str)> {
        ROUTES
            .iter()
            .map(|spec| (spec.domain, spec.action))
            .filter(|key| !self.handlers.contains_key(key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
