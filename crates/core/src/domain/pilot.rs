use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::validation::ValidationError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub if_community_id: String,
    #[serde(default)]
    pub current_va: Option<VaMembership>,
}

impl UserDetails {
    pub fn is_linked(&self) -> bool {
        self.current_va.as_ref().is_some_and(|va| va.is_member)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaMembership {
    #[serde(default)]
    pub is_member: bool,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub callsign: Option<String>,
}

/// Where a caller stands relative to this server's virtual airline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    RegisteredUnlinked { ifc_username: String },
    Linked { ifc_username: String, role: String },
}

impl From<&UserDetails> for RegistrationState {
    fn from(details: &UserDetails) -> Self {
        match (&details.is_active, &details.current_va) {
            (true, Some(va)) if va.is_member => Self::Linked {
                ifc_username: details.if_community_id.clone(),
                role: va.role.clone(),
            },
            (true, _) => {
                Self::RegisteredUnlinked { ifc_username: details.if_community_id.clone() }
            }
            (false, _) => Self::Unregistered,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub ifc_id: String,
    pub last_flight: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationOutcome {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub ifc_id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub steps: Vec<RegistrationStep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStep {
    pub name: String,
    pub status: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PilotRole {
    Pilot,
    Staff,
}

impl PilotRole {
    pub const ALL: [PilotRole; 2] = [PilotRole::Pilot, PilotRole::Staff];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pilot => "pilot",
            Self::Staff => "staff",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pilot => "Pilot",
            Self::Staff => "Staff",
        }
    }
}

impl fmt::Display for PilotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PilotRole {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pilot" => Ok(Self::Pilot),
            "staff" => Ok(Self::Staff),
            other => Err(ValidationError::UnknownRole(other.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSync {
    pub target_user_id: String,
    pub callsign: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub target_user_id: String,
    pub role: PilotRole,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PilotStats {
    #[serde(default)]
    pub game_stats: Option<GameStats>,
    #[serde(default)]
    pub career_mode_data: Option<CareerModeStats>,
    #[serde(default)]
    pub provider_data: Option<ProviderData>,
    #[serde(default)]
    pub metadata: StatsMetadata,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    /// Seconds.
    #[serde(default)]
    pub flight_time: Option<u64>,
    #[serde(default)]
    pub online_flights: Option<u64>,
    #[serde(default)]
    pub landing_count: Option<u64>,
    #[serde(default)]
    pub xp: Option<u64>,
    #[serde(default)]
    pub grade: Option<u32>,
    #[serde(default)]
    pub violations: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CareerModeStats {
    #[serde(default)]
    pub airline: Option<String>,
    #[serde(default)]
    pub aircraft: Option<String>,
    #[serde(default)]
    pub total_cm_hours: Option<u64>,
    #[serde(default)]
    pub required_hours_to_next: Option<u64>,
    #[serde(default)]
    pub last_career_mode_flight: Option<String>,
    #[serde(default)]
    pub assigned_routes: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderData {
    #[serde(default)]
    pub join_date: Option<String>,
    #[serde(default)]
    pub last_activity: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub callsign: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsMetadata {
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub last_fetched: Option<String>,
    #[serde(default)]
    pub va_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{PilotRole, RegistrationState, UserDetails, VaMembership};

    #[test]
    fn registration_state_follows_membership() {
        let unregistered = UserDetails::default();
        assert_eq!(RegistrationState::from(&unregistered), RegistrationState::Unregistered);

        let unlinked = UserDetails {
            is_active: true,
            if_community_id: "john_doe".to_owned(),
            current_va: Some(VaMembership { is_member: false, ..VaMembership::default() }),
        };
        assert_eq!(
            RegistrationState::from(&unlinked),
            RegistrationState::RegisteredUnlinked { ifc_username: "john_doe".to_owned() }
        );

        let linked = UserDetails {
            current_va: Some(VaMembership {
                is_member: true,
                role: "staff".to_owned(),
                callsign: Some("001".to_owned()),
            }),
            ..unlinked
        };
        assert!(linked.is_linked());
        assert!(matches!(
            RegistrationState::from(&linked),
            RegistrationState::Linked { ref role, .. } if role == "staff"
        ));
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Staff".parse::<PilotRole>().expect("staff"), PilotRole::Staff);
        assert!("captain".parse::<PilotRole>().is_err());
    }
}
