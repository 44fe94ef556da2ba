//! Discord interface for Comrade: routes every interaction to a handler and owns its reply.
//!
//! - **Gateway** (`gateway`, `runner`) - WebSocket session with heartbeat and reconnect
//! - **Wire** (`wire`, `events`) - Interaction JSON into typed `InboundEvent`s
//! - **Tokens** (`token`) - Component `custom_id`s that carry their own state
//! - **Registry** (`registry`, `handlers`) - Slash commands and component handlers
//! - **Replies** (`reply`, `rest`, `messages`) - One controller per interaction, bound to
//!   the acknowledgement deadline and the token window
//! - **Boundary** (`boundary`) - Turns any handler failure into a visible answer
//!
//! # Architecture
//!
//! ```text
//! Gateway → GatewayRunner → Dispatcher ─┬→ CommandRegistry → CommandHandler
//!                                       └→ ComponentTable  → ComponentHandler
//!                                                   ↓
//!                        ReplyController → InteractionResponder (REST)
//! ```
//!
//! # Key Types
//!
//! - `GatewayRunner` - Session loop; one task per interaction
//! - `Dispatcher` - Classifies events and runs the error boundary
//! - `ReplyController` - The reply state machine
//! - `ComponentRoute` - Typed view of a continuation token

pub mod boundary;
pub mod context;
pub mod dispatch;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod messages;
pub mod registry;
pub mod render;
pub mod reply;
pub mod rest;
pub mod runner;
pub mod token;
pub mod wire;

#[cfg(test)]
mod testing;

pub use dispatch::Dispatcher;
pub use gateway::{DiscordGatewayTransport, GatewayTransport};
pub use reply::ReplyController;
pub use rest::DiscordRestResponder;
pub use runner::{GatewayRunner, ReconnectPolicy};
