use async_trait::async_trait;

use crate::domain::flight::{FlightHistoryPage, LiveFlight};
use crate::domain::pilot::{
    MemberSync, PilotStats, RegistrationOutcome, RegistrationRequest, RoleAssignment, UserDetails,
};
use crate::domain::pirep::{PirepConfig, PirepReceipt, PirepSubmission};
use crate::domain::service::{Acknowledgement, DashboardLink, HealthReport, ServerInitRequest, Timed};
use crate::errors::ApiError;

/// Who is asking: the originating server (if any) and the invoking user.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity {
    pub guild_id: Option<String>,
    pub user_id: String,
}

impl Identity {
    pub fn new(guild_id: Option<impl Into<String>>, user_id: impl Into<String>) -> Self {
        Self { guild_id: guild_id.map(Into::into), user_id: user_id.into() }
    }

    /// Server id as sent to the backend; direct messages carry an empty value.
    pub fn guild_header(&self) -> &str {
        self.guild_id.as_deref().unwrap_or("")
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Boundary to the virtual-airline backend. Every call is keyed by the caller's identity.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn health(&self) -> ApiResult<HealthReport>;

    async fn user_logbook(
        &self,
        identity: &Identity,
        ifc_id: &str,
        page: u32,
    ) -> ApiResult<FlightHistoryPage>;

    async fn user_details(&self, identity: &Identity) -> ApiResult<UserDetails>;

    async fn register_user(
        &self,
        identity: &Identity,
        request: &RegistrationRequest,
    ) -> ApiResult<RegistrationOutcome>;

    async fn link_user(&self, identity: &Identity, callsign: &str) -> ApiResult<Acknowledgement>;

    async fn init_server(
        &self,
        identity: &Identity,
        request: &ServerInitRequest,
    ) -> ApiResult<RegistrationOutcome>;

    async fn pirep_config(&self, identity: &Identity) -> ApiResult<PirepConfig>;

    async fn submit_pirep(
        &self,
        identity: &Identity,
        submission: &PirepSubmission,
    ) -> ApiResult<Timed<PirepReceipt>>;

    async fn sync_member(&self, identity: &Identity, sync: &MemberSync)
        -> ApiResult<Acknowledgement>;

    async fn assign_role(
        &self,
        identity: &Identity,
        assignment: &RoleAssignment,
    ) -> ApiResult<Acknowledgement>;

    async fn pilot_stats(&self, identity: &Identity) -> ApiResult<Timed<PilotStats>>;

    async fn live_flights(&self, identity: &Identity) -> ApiResult<Timed<Vec<LiveFlight>>>;

    async fn dashboard_link(&self, identity: &Identity) -> ApiResult<DashboardLink>;
}
