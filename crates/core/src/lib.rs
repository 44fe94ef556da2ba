pub mod api;
pub mod config;
pub mod domain;
pub mod errors;

pub use api::{ApiResult, BackendApi, Identity};
pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use errors::{ApiError, InterfaceError};
