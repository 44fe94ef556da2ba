use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flights per logbook page as served by the backend.
pub const LOGBOOK_PAGE_SIZE: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default, alias = "destination")]
    pub dest: Option<String>,
    #[serde(default)]
    pub equipment: String,
    #[serde(default)]
    pub landings: u32,
    #[serde(default)]
    pub violations: u32,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default, alias = "mapUrl")]
    pub map_url: Option<String>,
}

impl FlightRecord {
    pub fn route(&self) -> String {
        format!(
            "{}-{}",
            self.origin.as_deref().filter(|value| !value.is_empty()).unwrap_or("?"),
            self.dest.as_deref().filter(|value| !value.is_empty()).unwrap_or("?")
        )
    }

    /// One-letter server code: E(xpert), C(asual), T(raining) or `?`.
    pub fn server_code(&self) -> char {
        let server = self.server.to_ascii_lowercase();
        if server.contains("expert") {
            'E'
        } else if server.contains("casual") {
            'C'
        } else if server.contains("training") {
            'T'
        } else {
            '?'
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightHistoryPage {
    #[serde(default)]
    pub records: Vec<FlightRecord>,
    #[serde(default)]
    pub page: u32,
}

impl FlightHistoryPage {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveFlight {
    pub callsign: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub aircraft: String,
    #[serde(default)]
    pub livery: String,
    #[serde(default)]
    pub altitude: i64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(alias = "lastReport")]
    pub last_report: DateTime<Utc>,
}
