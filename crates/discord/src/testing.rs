//! In-memory fakes for the platform and backend collaborators.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use comrade_core::domain::flight::{FlightHistoryPage, LiveFlight};
use comrade_core::domain::pilot::{
    MemberSync, PilotStats, RegistrationOutcome, RegistrationRequest, RoleAssignment, UserDetails,
};
use comrade_core::domain::pirep::{PirepConfig, PirepReceipt, PirepSubmission};
use comrade_core::domain::service::{
    Acknowledgement, DashboardLink, HealthReport, ServerInitRequest, Timed,
};
use comrade_core::{ApiError, ApiResult, BackendApi, Identity};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::context::{HandlerContext, HandlerResult};
use crate::dispatch::{routing_key, RoutingKey};
use crate::events::{
    ButtonPress, CommandInvocation, InboundEvent, InteractionKind, MenuSelection, ModalField,
    ModalSubmission, Origin,
};
use crate::messages::{MessagePayload, EPHEMERAL};
use crate::registry::{CommandHandler, ComponentHandler};
use crate::render::TextTableRenderer;
use crate::reply::{
    InitialResponse, InteractionHandle, InteractionResponder, PlatformError, ReplyController,
    ReplyDeadlines, ReplyState,
};

pub(crate) fn event(kind: InteractionKind) -> InboundEvent {
    InboundEvent {
        id: "interaction-1".to_owned(),
        application_id: "app-1".to_owned(),
        interaction_token: "token-1".to_owned(),
        origin: Origin {
            guild_id: Some("guild-1".to_owned()),
            channel_id: Some("channel-1".to_owned()),
            user_id: "user-1".to_owned(),
        },
        kind,
    }
}

pub(crate) fn command_event(name: &str) -> InboundEvent {
    invocation_event(CommandInvocation::new(name))
}

pub(crate) fn invocation_event(invocation: CommandInvocation) -> InboundEvent {
    event(InteractionKind::Command(invocation))
}

pub(crate) fn button_event(custom_id: &str) -> InboundEvent {
    event(InteractionKind::Button(ButtonPress { custom_id: custom_id.to_owned() }))
}

pub(crate) fn select_event(custom_id: &str, values: &[&str]) -> InboundEvent {
    event(InteractionKind::SelectMenu(MenuSelection {
        custom_id: custom_id.to_owned(),
        values: values.iter().map(|value| (*value).to_owned()).collect(),
    }))
}

pub(crate) fn modal_event(custom_id: &str, fields: &[(&str, &str)]) -> InboundEvent {
    event(InteractionKind::ModalSubmit(ModalSubmission {
        custom_id: custom_id.to_owned(),
        fields: fields
            .iter()
            .map(|(id, value)| ModalField { custom_id: (*id).to_owned(), value: (*value).to_owned() })
            .collect(),
    }))
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum RecordedCall {
    Response { callback_type: u8, body: Value },
    Edit(MessagePayload),
    FollowUp(MessagePayload),
}

impl RecordedCall {
    pub(crate) fn content(&self) -> Option<String> {
        match self {
            Self::Response { body, .. } => {
                body["data"]["content"].as_str().map(str::to_owned)
            }
            Self::Edit(message) | Self::FollowUp(message) => message.content.clone(),
        }
    }

    pub(crate) fn is_ephemeral(&self) -> bool {
        match self {
            Self::Response { body, .. } => {
                body["data"]["flags"].as_u64().is_some_and(|flags| flags & EPHEMERAL != 0)
            }
            Self::Edit(message) | Self::FollowUp(message) => message.is_ephemeral(),
        }
    }

    pub(crate) fn is_initial(&self) -> bool {
        matches!(self, Self::Response { .. })
    }

    pub(crate) fn callback_type(&self) -> Option<u8> {
        match self {
            Self::Response { callback_type, .. } => Some(*callback_type),
            _ => None,
        }
    }

    /// Message (or modal) JSON as the platform would receive it.
    pub(crate) fn payload(&self) -> Value {
        match self {
            Self::Response { body, .. } => body["data"].clone(),
            Self::Edit(message) | Self::FollowUp(message) => {
                serde_json::to_value(message).unwrap_or_default()
            }
        }
    }
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<RecordedCall>,
    failures: VecDeque<PlatformError>,
}

/// Records every successful platform call; scripted failures are consumed in order.
#[derive(Default)]
pub(crate) struct RecordingResponder {
    state: Mutex<RecorderState>,
}

impl RecordingResponder {
    pub(crate) async fn fail_next(&self, error: PlatformError) {
        self.state.lock().await.failures.push_back(error);
    }

    pub(crate) async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    async fn record(&self, call: RecordedCall) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        state.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl InteractionResponder for RecordingResponder {
    async fn create_response(
        &self,
        _interaction: &InteractionHandle,
        response: &InitialResponse,
    ) -> Result<(), PlatformError> {
        let body = response.body()?;
        self.record(RecordedCall::Response { callback_type: response.callback_type(), body }).await
    }

    async fn edit_original(
        &self,
        _interaction: &InteractionHandle,
        message: &MessagePayload,
    ) -> Result<(), PlatformError> {
        self.record(RecordedCall::Edit(message.clone())).await
    }

    async fn create_followup(
        &self,
        _interaction: &InteractionHandle,
        message: &MessagePayload,
    ) -> Result<(), PlatformError> {
        self.record(RecordedCall::FollowUp(message.clone())).await
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum BackendCall {
    Health,
    Logbook { ifc_id: String, page: u32 },
    UserDetails,
    Register(RegistrationRequest),
    Link { callsign: String },
    InitServer(ServerInitRequest),
    PirepConfig,
    SubmitPirep(PirepSubmission),
    SyncMember(MemberSync),
    AssignRole(RoleAssignment),
    PilotStats,
    LiveFlights,
    DashboardLink,
}

/// Canned backend. Every call is recorded with the identity it was made for.
pub(crate) struct StubBackend {
    pub(crate) health: ApiResult<HealthReport>,
    pub(crate) user_details: ApiResult<UserDetails>,
    pub(crate) logbook: ApiResult<FlightHistoryPage>,
    pub(crate) registration: ApiResult<RegistrationOutcome>,
    pub(crate) acknowledgement: ApiResult<Acknowledgement>,
    pub(crate) pirep_config: ApiResult<PirepConfig>,
    pub(crate) pirep_receipt: ApiResult<PirepReceipt>,
    pub(crate) stats: ApiResult<PilotStats>,
    pub(crate) live: ApiResult<Vec<LiveFlight>>,
    pub(crate) dashboard: ApiResult<DashboardLink>,
    pub(crate) calls: Mutex<Vec<(Identity, BackendCall)>>,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self {
            health: Ok(HealthReport {
                status: "ok".to_owned(),
                uptime: "1h".to_owned(),
                ..HealthReport::default()
            }),
            user_details: Ok(UserDetails::default()),
            logbook: Ok(FlightHistoryPage::default()),
            registration: Ok(RegistrationOutcome { status: true, ..RegistrationOutcome::default() }),
            acknowledgement: Ok(Acknowledgement { message: "done".to_owned() }),
            pirep_config: Ok(PirepConfig::default()),
            pirep_receipt: Ok(PirepReceipt {
                pirep_id: Some("pirep-1".to_owned()),
                status: Some("pending".to_owned()),
            }),
            stats: Ok(PilotStats::default()),
            live: Ok(Vec::new()),
            dashboard: Ok(DashboardLink {
                url: "https://dashboard.example.test/session/abc".to_owned(),
                expires_in: 900,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl StubBackend {
    /// Every operation fails with `error`.
    pub(crate) fn failing(error: ApiError) -> Self {
        Self {
            health: Err(error.clone()),
            user_details: Err(error.clone()),
            logbook: Err(error.clone()),
            registration: Err(error.clone()),
            acknowledgement: Err(error.clone()),
            pirep_config: Err(error.clone()),
            pirep_receipt: Err(error.clone()),
            stats: Err(error.clone()),
            live: Err(error.clone()),
            dashboard: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().await.iter().map(|(_, call)| call.clone()).collect()
    }

    pub(crate) async fn identities(&self) -> Vec<Identity> {
        self.calls.lock().await.iter().map(|(identity, _)| identity.clone()).collect()
    }

    async fn record(&self, identity: &Identity, call: BackendCall) {
        self.calls.lock().await.push((identity.clone(), call));
    }
}

#[async_trait]
impl BackendApi for StubBackend {
    async fn health(&self) -> ApiResult<HealthReport> {
        self.record(&Identity::new(None::<String>, "probe"), BackendCall::Health).await;
        self.health.clone()
    }

    async fn user_logbook(
        &self,
        identity: &Identity,
        ifc_id: &str,
        page: u32,
    ) -> ApiResult<FlightHistoryPage> {
        self.record(identity, BackendCall::Logbook { ifc_id: ifc_id.to_owned(), page }).await;
        self.logbook.clone()
    }

    async fn user_details(&self, identity: &Identity) -> ApiResult<UserDetails> {
        self.record(identity, BackendCall::UserDetails).await;
        self.user_details.clone()
    }

    async fn register_user(
        &self,
        identity: &Identity,
        request: &RegistrationRequest,
    ) -> ApiResult<RegistrationOutcome> {
        self.record(identity, BackendCall::Register(request.clone())).await;
        self.registration.clone()
    }

    async fn link_user(&self, identity: &Identity, callsign: &str) -> ApiResult<Acknowledgement> {
        self.record(identity, BackendCall::Link { callsign: callsign.to_owned() }).await;
        self.acknowledgement.clone()
    }

    async fn init_server(
        &self,
        identity: &Identity,
        request: &ServerInitRequest,
    ) -> ApiResult<RegistrationOutcome> {
        self.record(identity, BackendCall::InitServer(request.clone())).await;
        self.registration.clone()
    }

    async fn pirep_config(&self, identity: &Identity) -> ApiResult<PirepConfig> {
        self.record(identity, BackendCall::PirepConfig).await;
        self.pirep_config.clone()
    }

    async fn submit_pirep(
        &self,
        identity: &Identity,
        submission: &PirepSubmission,
    ) -> ApiResult<Timed<PirepReceipt>> {
        self.record(identity, BackendCall::SubmitPirep(submission.clone())).await;
        self.pirep_receipt.clone().map(Timed::new)
    }

    async fn sync_member(
        &self,
        identity: &Identity,
        sync: &MemberSync,
    ) -> ApiResult<Acknowledgement> {
        self.record(identity, BackendCall::SyncMember(sync.clone())).await;
        self.acknowledgement.clone()
    }

    async fn assign_role(
        &self,
        identity: &Identity,
        assignment: &RoleAssignment,
    ) -> ApiResult<Acknowledgement> {
        self.record(identity, BackendCall::AssignRole(assignment.clone())).await;
        self.acknowledgement.clone()
    }

    async fn pilot_stats(&self, identity: &Identity) -> ApiResult<Timed<PilotStats>> {
        self.record(identity, BackendCall::PilotStats).await;
        self.stats.clone().map(Timed::new)
    }

    async fn live_flights(&self, identity: &Identity) -> ApiResult<Timed<Vec<LiveFlight>>> {
        self.record(identity, BackendCall::LiveFlights).await;
        self.live.clone().map(Timed::new)
    }

    async fn dashboard_link(&self, identity: &Identity) -> ApiResult<DashboardLink> {
        self.record(identity, BackendCall::DashboardLink).await;
        self.dashboard.clone()
    }
}

/// Runs one handler directly against the fakes, bypassing the dispatcher's boundary.
pub(crate) struct Harness {
    pub(crate) responder: Arc<RecordingResponder>,
    pub(crate) backend: Arc<StubBackend>,
}

impl Harness {
    pub(crate) fn new(backend: StubBackend) -> Self {
        Self { responder: Arc::new(RecordingResponder::default()), backend: Arc::new(backend) }
    }

    fn prepare(&self, event: InboundEvent) -> (HandlerContext, ReplyController) {
        let event = Arc::new(event);
        let reply =
            ReplyController::new(self.responder.clone(), &event, ReplyDeadlines::default());
        let ctx = HandlerContext::new(event, self.backend.clone(), Arc::new(TextTableRenderer));
        (ctx, reply)
    }

    pub(crate) async fn command<H: CommandHandler>(
        &self,
        handler: &H,
        event: InboundEvent,
    ) -> (HandlerResult, ReplyState) {
        let (ctx, mut reply) = self.prepare(event);
        let validated = ctx.event.command().map_or(Ok(()), |invocation| handler.validate(invocation));
        let result = match validated {
            Ok(()) => handler.execute(&ctx, &mut reply).await,
            Err(error) => Err(error),
        };
        (result, reply.state())
    }

    pub(crate) async fn component<H: ComponentHandler>(
        &self,
        handler: &H,
        event: InboundEvent,
    ) -> (HandlerResult, ReplyState) {
        let Ok(RoutingKey::Component(route)) = routing_key(&event) else {
            panic!("event does not carry a routable component token");
        };
        let (ctx, mut reply) = self.prepare(event);
        let result = handler.handle(&ctx, route, &mut reply).await;
        (result, reply.state())
    }

    pub(crate) async fn calls(&self) -> Vec<RecordedCall> {
        self.responder.calls().await
    }
}
