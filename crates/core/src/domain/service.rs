use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub up_since: Option<String>,
    #[serde(default)]
    pub uptime: String,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "ok" | "up" | "healthy")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInitRequest {
    pub va_code: String,
    pub va_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign_suffix: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardLink {
    pub url: String,
    /// Seconds until the link stops working.
    #[serde(default = "default_link_ttl")]
    pub expires_in: u64,
}

fn default_link_ttl() -> u64 {
    900
}

/// Backend confirmation for operations that return no payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: String,
}

/// A backend payload together with the backend-reported response time.
#[derive(Clone, Debug, PartialEq)]
pub struct Timed<T> {
    pub data: T,
    pub response_time: Option<String>,
}

impl<T> Timed<T> {
    pub fn new(data: T) -> Self {
        Self { data, response_time: None }
    }
}
