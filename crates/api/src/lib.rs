//! HTTP client for the virtual-airline backend.

pub mod client;
pub mod envelope;

pub use client::HttpBackendApi;
pub use envelope::ApiEnvelope;
