use serde::{Deserialize, Serialize};

/// Platform limit on text inputs per modal.
pub const MAX_MODAL_INPUTS: usize = 5;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PirepConfig {
    #[serde(default)]
    pub user_info: PirepUserInfo,
    #[serde(default)]
    pub available_modes: Vec<FlightMode>,
}

impl PirepConfig {
    pub fn valid_modes(&self) -> impl Iterator<Item = &FlightMode> {
        self.available_modes.iter().filter(|mode| mode.is_valid())
    }

    pub fn mode(&self, mode_id: &str) -> Option<&FlightMode> {
        self.available_modes.iter().find(|mode| mode.mode_id == mode_id)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PirepUserInfo {
    #[serde(default)]
    pub callsign: String,
    #[serde(default)]
    pub current_route: String,
    #[serde(default)]
    pub current_aircraft: String,
    #[serde(default)]
    pub current_livery: String,
    #[serde(default)]
    pub current_altitude: Option<f64>,
    #[serde(default)]
    pub current_speed: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeStatus {
    Valid,
    #[serde(other)]
    Invalid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlightMode {
    pub mode_id: String,
    pub display_name: String,
    pub status: ModeStatus,
    #[serde(default)]
    pub error_reason: Option<String>,
    #[serde(default)]
    pub requires_route_selection: bool,
    #[serde(default)]
    pub autofill_route: Option<String>,
    #[serde(default)]
    pub fields: Vec<ModeField>,
}

impl FlightMode {
    pub fn is_valid(&self) -> bool {
        self.status == ModeStatus::Valid
    }

    /// Number of form inputs the mode needs, including the route input.
    pub fn input_count(&self) -> usize {
        usize::from(self.requires_route_selection) + self.fields.len()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Textarea,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PirepSubmission {
    pub mode: String,
    pub flight_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pilot_remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_kg: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cargo_kg: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passengers: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PirepReceipt {
    #[serde(default)]
    pub pirep_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
