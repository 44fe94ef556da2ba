use std::time::Duration;

use async_trait::async_trait;
use comrade_core::config::BackendConfig;
use comrade_core::domain::flight::{FlightHistoryPage, LiveFlight};
use comrade_core::domain::pilot::{
    MemberSync, PilotStats, RegistrationOutcome, RegistrationRequest, RoleAssignment, UserDetails,
};
use comrade_core::domain::pirep::{PirepConfig, PirepReceipt, PirepSubmission};
use comrade_core::domain::service::{
    Acknowledgement, DashboardLink, HealthReport, ServerInitRequest, Timed,
};
use comrade_core::{ApiError, ApiResult, BackendApi, Identity};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::envelope::{error_for_status, ApiEnvelope};

/// Header names are fixed by the backend: the guild id travels as `X-Discord-Id`.
pub const HEADER_GUILD_ID: &str = "X-Discord-Id";
pub const HEADER_USER_ID: &str = "X-Server-Id";
pub const HEADER_API_KEY: &str = "X-API-Key";

/// `BackendApi` over HTTP/JSON. Identity travels in request headers on every call.
#[derive(Clone)]
pub struct HttpBackendApi {
    client: Client,
    base_url: Url,
    api_key: SecretString,
}

impl HttpBackendApi {
    pub fn new(config: &BackendConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|error| {
            ApiError::Transport(format!("invalid backend base url `{}`: {error}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Transport(format!(
                "backend base url `{}` cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        Ok(Self { client, base_url, api_key: config.api_key.clone() })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn identity_headers(&self, identity: &Identity) -> ApiResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_GUILD_ID, header_value(identity.guild_header())?);
        headers.insert(HEADER_USER_ID, header_value(&identity.user_id)?);
        let mut key = header_value(self.api_key.expose_secret())?;
        key.set_sensitive(true);
        headers.insert(HEADER_API_KEY, key);
        Ok(headers)
    }

    fn request(
        &self,
        method: Method,
        identity: &Identity,
        segments: &[&str],
    ) -> ApiResult<RequestBuilder> {
        let url = self.endpoint(segments);
        debug!(
            event_name = "backend.request",
            method = %method,
            path = url.path(),
            user_id = %identity.user_id,
            "calling backend"
        );
        Ok(self.client.request(method, url).headers(self.identity_headers(identity)?))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ApiResult<ApiEnvelope<T>> {
        let response = request.send().await.map_err(|error| {
            warn!(event_name = "backend.transport_failed", error = %error, "backend request failed");
            ApiError::Transport(error.to_string())
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| ApiError::Transport(error.to_string()))?;

        if !status.is_success() {
            let error = error_for_status(status.as_u16(), &body);
            warn!(
                event_name = "backend.request_rejected",
                status = status.as_u16(),
                error = %error,
                "backend returned an error status"
            );
            return Err(error);
        }

        serde_json::from_str::<ApiEnvelope<T>>(&body)
            .map_err(|error| ApiError::Decode(error.to_string()))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        identity: &Identity,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> ApiResult<ApiEnvelope<T>> {
        let request = self.request(Method::GET, identity, segments)?.query(query);
        self.execute(request).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        identity: &Identity,
        segments: &[&str],
        body: &B,
    ) -> ApiResult<ApiEnvelope<T>> {
        let request = self.request(Method::POST, identity, segments)?.json(body);
        self.execute(request).await
    }
}

fn header_value(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ApiError::Transport("identity contains characters not allowed in headers".to_string()))
}

#[async_trait]
impl BackendApi for HttpBackendApi {
    async fn health(&self) -> ApiResult<HealthReport> {
        let response = self
            .client
            .get(self.endpoint(&["healthCheck"]))
            .send()
            .await
            .map_err(|error| ApiError::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status.as_u16(), &body));
        }
        response.json::<HealthReport>().await.map_err(|error| ApiError::Decode(error.to_string()))
    }

    async fn user_logbook(
        &self,
        identity: &Identity,
        ifc_id: &str,
        page: u32,
    ) -> ApiResult<FlightHistoryPage> {
        self.get(identity, &["api", "v1", "users", ifc_id, "flights"], &[("page", page.to_string())])
            .await?
            .into_data()
    }

    async fn user_details(&self, identity: &Identity) -> ApiResult<UserDetails> {
        self.get(identity, &["api", "v1", "user", "details"], &[]).await?.into_data()
    }

    async fn register_user(
        &self,
        identity: &Identity,
        request: &RegistrationRequest,
    ) -> ApiResult<RegistrationOutcome> {
        self.post(identity, &["api", "v1", "users", "register"], request).await?.into_data()
    }

    async fn link_user(&self, identity: &Identity, callsign: &str) -> ApiResult<Acknowledgement> {
        let envelope: ApiEnvelope<serde_json::Value> = self
            .post(identity, &["api", "v1", "users", "link"], &json!({ "callsign": callsign }))
            .await?;
        Ok(envelope.into_acknowledgement())
    }

    async fn init_server(
        &self,
        identity: &Identity,
        request: &ServerInitRequest,
    ) -> ApiResult<RegistrationOutcome> {
        self.post(identity, &["api", "v1", "server", "init"], request).await?.into_data()
    }

    async fn pirep_config(&self, identity: &Identity) -> ApiResult<PirepConfig> {
        self.get(identity, &["api", "v1", "pireps", "config"], &[]).await?.into_data()
    }

    async fn submit_pirep(
        &self,
        identity: &Identity,
        submission: &PirepSubmission,
    ) -> ApiResult<Timed<PirepReceipt>> {
        self.post(identity, &["api", "v1", "pireps", "submit"], submission).await?.into_timed()
    }

    async fn sync_member(
        &self,
        identity: &Identity,
        sync: &MemberSync,
    ) -> ApiResult<Acknowledgement> {
        let envelope: ApiEnvelope<serde_json::Value> =
            self.post(identity, &["api", "v1", "members", "sync"], sync).await?;
        Ok(envelope.into_acknowledgement())
    }

    async fn assign_role(
        &self,
        identity: &Identity,
        assignment: &RoleAssignment,
    ) -> ApiResult<Acknowledgement> {
        let envelope: ApiEnvelope<serde_json::Value> =
            self.post(identity, &["api", "v1", "members", "role"], assignment).await?;
        Ok(envelope.into_acknowledgement())
    }

    async fn pilot_stats(&self, identity: &Identity) -> ApiResult<Timed<PilotStats>> {
        self.get(identity, &["api", "v1", "pilot", "stats"], &[]).await?.into_timed()
    }

    async fn live_flights(&self, identity: &Identity) -> ApiResult<Timed<Vec<LiveFlight>>> {
        self.get(identity, &["api", "v1", "va", "live"], &[]).await?.into_timed()
    }

    async fn dashboard_link(&self, identity: &Identity) -> ApiResult<DashboardLink> {
        self.post(identity, &["api", "v1", "dashboard", "link"], &json!({})).await?.into_data()
    }
}
