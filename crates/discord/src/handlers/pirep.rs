//! `/log` and the PIREP form. The mode picked on the first message travels in the
//! button token, and again in the form token, so the submit knows which mode it files.

use async_trait::async_trait;
use comrade_core::domain::pirep::{
    FieldKind, FlightMode, ModeField, PirepConfig, PirepReceipt, PirepSubmission, MAX_MODAL_INPUTS,
};
use comrade_core::domain::service::Timed;
use comrade_core::domain::validation::parse_optional_number;
use tracing::info;

use super::{required_field, submitted_form, unexpected_route};
use crate::context::{HandlerContext, HandlerError, HandlerResult};
use crate::messages::{
    Button, MessageBuilder, MessagePayload, Modal, TextInput, COLOR_INFO, COLOR_SUCCESS,
    COLOR_WARNING,
};
use crate::registry::{CommandHandler, ComponentHandler};
use crate::reply::ReplyController;
use crate::token::{ComponentRoute, Domain, EncodeError};

const FIELD_ROUTE: &str = "route_id";
const FIELD_FLIGHT_TIME: &str = "flight_time";
const FIELD_REMARKS: &str = "pilot_remarks";
const FIELD_FUEL: &str = "fuel_kg";
const FIELD_CARGO: &str = "cargo_kg";
const FIELD_PASSENGERS: &str = "passengers";

const BUTTONS_PER_ROW: usize = 5;

pub struct LogCommand;

#[async_trait]
impl CommandHandler for LogCommand {
    fn name(&self) -> &'static str {
        "log"
    }

    fn description(&self) -> &'static str {
        "File a PIREP for your current flight"
    }

    async fn execute(&self, ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
        reply.defer(true).await?;
        let config = ctx.api.pirep_config(&ctx.identity).await?;
        reply.edit(mode_picker(&config)?).await?;
        Ok(())
    }
}

fn mode_picker(config: &PirepConfig) -> Result<MessagePayload, EncodeError> {
    let flight = &config.user_info;
    let valid: Vec<&FlightMode> = config.valid_modes().collect();

    if valid.is_empty() {
        let reasons: Vec<String> = config
            .available_modes
            .iter()
            .map(|mode| {
                let reason = mode.error_reason.as_deref().unwrap_or("not eligible");
                format!("• **{}**: {reason}", mode.display_name)
            })
            .collect();
        let message = MessageBuilder::new()
            .embed(|embed| {
                embed
                    .title("No Valid Modes")
                    .color(COLOR_WARNING)
                    .description(format!(
                        "❌ Your current flight is not eligible for any PIREP modes.\n\n\
                         **Current Flight:**\nRoute: {}\nAircraft: {}\n\n{}",
                        or_na(&flight.current_route),
                        or_na(&flight.current_aircraft),
                        reasons.join("\n"),
                    ));
            })
            .build();
        return Ok(message);
    }

    let buttons = valid
        .iter()
        .map(|mode| -> Result<Button, EncodeError> {
            let id = ComponentRoute::PirepMode { mode_id: mode.mode_id.clone() }.token()?;
            Ok(Button::new(id, mode.display_name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let listing: Vec<String> =
        valid.iter().map(|mode| format!("• **{}**", mode.display_name)).collect();

    let mut builder = MessageBuilder::new().embed(|embed| {
        embed.title("PIREP Filing").color(COLOR_INFO).description(format!(
            "Select a flight mode to file your PIREP.\n\n**Current Flight:**\n\
             Callsign: {}\nRoute: {}\nAircraft: {}\n\n**Available Modes:**\n{}",
            or_na(&flight.callsign),
            or_na(&flight.current_route),
            or_na(&flight.current_aircraft),
            listing.join("\n"),
        ));
    });
    for chunk in buttons.chunks(BUTTONS_PER_ROW) {
        builder = builder.actions(|row| {
            for button in chunk {
                row.button(button.clone());
            }
        });
    }
    Ok(builder.build())
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

pub struct PirepFlow;

#[async_trait]
impl ComponentHandler for PirepFlow {
    fn routes(&self) -> &'static [(Domain, &'static str)] {
        &[(Domain::Pirep, "mode"), (Domain::Pirep, "submit")]
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        route: ComponentRoute,
        reply: &mut ReplyController,
    ) -> HandlerResult {
        match route {
            ComponentRoute::PirepMode { mode_id } => {
                let config = ctx.api.pirep_config(&ctx.identity).await?;
                reply.show_modal(pirep_form(&config, &mode_id)?).await?;
                Ok(())
            }
            ComponentRoute::PirepSubmit { mode_id } => submit(ctx, reply, mode_id).await,
            other => Err(unexpected_route(&other)),
        }
    }
}

fn pirep_form(config: &PirepConfig, mode_id: &str) -> Result<Modal, HandlerError> {
    let mode = config.mode(mode_id).ok_or_else(|| {
        HandlerError::InvalidInput(format!("Flight mode `{mode_id}` is no longer available."))
    })?;
    if !mode.is_valid() {
        let reason = mode.error_reason.as_deref().unwrap_or("not eligible");
        return Err(HandlerError::InvalidInput(format!("Mode not valid: {reason}")));
    }
    if mode.input_count() > MAX_MODAL_INPUTS {
        return Err(HandlerError::Internal(format!(
            "mode {mode_id} needs {} inputs, a form holds {MAX_MODAL_INPUTS}",
            mode.input_count()
        )));
    }

    let form_id = ComponentRoute::PirepSubmit { mode_id: mode.mode_id.clone() }.token()?;
    let mut modal = Modal::new(form_id, format!("{} - PIREP", mode.display_name));

    if mode.requires_route_selection {
        let mut route = TextInput::short(FIELD_ROUTE, "Route (e.g., LFPG-EGLL)")
            .placeholder("Enter the route code");
        let prefill = mode
            .autofill_route
            .as_deref()
            .filter(|route| !route.is_empty())
            .or(Some(config.user_info.current_route.as_str()).filter(|route| !route.is_empty()));
        if let Some(prefill) = prefill {
            route = route.value(prefill);
        }
        modal = modal.input(route);
    }
    for field in &mode.fields {
        modal = modal.input(field_input(field));
    }
    Ok(modal)
}

fn field_input(field: &ModeField) -> TextInput {
    let input = match field.kind {
        FieldKind::Textarea => TextInput::paragraph(&field.name, &field.label),
        FieldKind::Number => {
            TextInput::short(&field.name, &field.label).placeholder("Enter a number")
        }
        FieldKind::Text => TextInput::short(&field.name, &field.label),
    }
    .required(field.required);

    match field.name.as_str() {
        FIELD_FLIGHT_TIME => input.placeholder("HH:MM"),
        FIELD_FUEL => input.placeholder("e.g., 15000"),
        FIELD_CARGO => input.placeholder("e.g., 5000"),
        FIELD_PASSENGERS => input.placeholder("e.g., 200"),
        _ => input,
    }
}

async fn submit(ctx: &HandlerContext, reply: &mut ReplyController, mode: String) -> HandlerResult {
    let form = submitted_form(ctx)?;
    let submission = PirepSubmission {
        mode,
        flight_time: required_field(form, FIELD_FLIGHT_TIME)?.to_owned(),
        route_id: form.field(FIELD_ROUTE).map(str::to_owned),
        pilot_remarks: form.field(FIELD_REMARKS).map(str::to_owned),
        fuel_kg: parse_optional_number(FIELD_FUEL, form.field(FIELD_FUEL))?,
        cargo_kg: parse_optional_number(FIELD_CARGO, form.field(FIELD_CARGO))?,
        passengers: parse_optional_number(FIELD_PASSENGERS, form.field(FIELD_PASSENGERS))?,
    };
    info!(
        event_name = "handler.pirep_submitted",
        correlation_id = %ctx.correlation_id(),
        mode = %submission.mode,
        "submitting pirep"
    );

    reply.defer(false).await?;
    let receipt = ctx.api.submit_pirep(&ctx.identity, &submission).await?;
    reply.edit(receipt_message(&submission, &receipt)).await?;
    Ok(())
}

fn receipt_message(submission: &PirepSubmission, receipt: &Timed<PirepReceipt>) -> MessagePayload {
    let mut summary = vec![
        format!("**Mode:** {}", submission.mode),
        String::new(),
        "**Flight Data:**".to_owned(),
        format!("Flight Time: {}", submission.flight_time),
    ];
    if let Some(route) = &submission.route_id {
        summary.push(format!("Route: {route}"));
    }
    if let Some(remarks) = &submission.pilot_remarks {
        summary.push(format!("Remarks: {remarks}"));
    }
    if let Some(fuel) = submission.fuel_kg {
        summary.push(format!("Fuel: {fuel} kg"));
    }
    if let Some(cargo) = submission.cargo_kg {
        summary.push(format!("Cargo: {cargo} kg"));
    }
    if let Some(passengers) = submission.passengers {
        summary.push(format!("Passengers: {passengers}"));
    }

    MessageBuilder::new()
        .embed(|embed| {
            embed
                .title("✅ PIREP Submitted Successfully")
                .color(COLOR_SUCCESS)
                .description(summary.join("\n"))
                .field("PIREP ID", receipt.data.pirep_id.as_deref().unwrap_or("N/A"), true)
                .field("Processing Time", receipt.response_time.as_deref().unwrap_or("N/A"), true);
        })
        .build()
}

#[cfg(test)]
mod tests {
    use comrade_core::domain::pirep::{ModeStatus, PirepUserInfo};
    use comrade_core::domain::validation::ValidationError;

    use super::*;
    use crate::reply::ReplyState;
    use crate::testing::{button_event, command_event, modal_event, BackendCall, Harness, StubBackend};

    fn field(name: &str, kind: FieldKind, required: bool) -> ModeField {
        ModeField { name: name.to_owned(), label: name.to_owned(), kind, required }
    }

    fn mode(id: &str, status: ModeStatus) -> FlightMode {
        FlightMode {
            mode_id: id.to_owned(),
            display_name: id.to_uppercase(),
            status,
            error_reason: (status == ModeStatus::Invalid).then(|| "wrong aircraft".to_owned()),
            requires_route_selection: true,
            autofill_route: None,
            fields: vec![
                field(FIELD_FLIGHT_TIME, FieldKind::Text, true),
                field(FIELD_FUEL, FieldKind::Number, false),
                field(FIELD_REMARKS, FieldKind::Textarea, false),
            ],
        }
    }

    fn backend(modes: Vec<FlightMode>) -> StubBackend {
        StubBackend {
            pirep_config: Ok(PirepConfig {
                user_info: PirepUserInfo {
                    callsign: "AAVA001".to_owned(),
                    current_route: "VABB-VIDP".to_owned(),
                    current_aircraft: "A320".to_owned(),
                    ..PirepUserInfo::default()
                },
                available_modes: modes,
            }),
            ..StubBackend::default()
        }
    }

    #[tokio::test]
    async fn log_offers_a_button_per_valid_mode() {
        let modes = (1..=6).map(|n| mode(&format!("m{n}"), ModeStatus::Valid)).collect();
        let harness = Harness::new(backend(modes));
        let (result, state) = harness.command(&LogCommand, command_event("log")).await;
        result.expect("log");

        assert_eq!(state, ReplyState::Edited);
        let calls = harness.calls().await;
        assert!(calls[0].is_ephemeral());
        let rows = calls[1].payload()["components"].clone();
        assert_eq!(rows[0]["components"].as_array().map(Vec::len), Some(5));
        assert_eq!(rows[1]["components"][0]["custom_id"], "pirep_mode_m6");
    }

    #[tokio::test]
    async fn log_explains_when_no_mode_is_valid() {
        let harness = Harness::new(backend(vec![mode("classic", ModeStatus::Invalid)]));
        let (result, _) = harness.command(&LogCommand, command_event("log")).await;
        result.expect("log");

        let edit = harness.calls().await[1].payload();
        assert_eq!(edit["components"], serde_json::json!([]));
        let description = edit["embeds"][0]["description"].as_str().unwrap_or_default().to_owned();
        assert!(description.contains("wrong aircraft"), "{description}");
    }

    #[tokio::test]
    async fn mode_button_opens_form_with_route_prefilled() {
        let harness = Harness::new(backend(vec![mode("classic", ModeStatus::Valid)]));
        let (result, state) =
            harness.component(&PirepFlow, button_event("pirep_mode_classic")).await;
        result.expect("form");

        assert_eq!(state, ReplyState::Terminal);
        let modal = harness.calls().await[0].payload();
        assert_eq!(modal["custom_id"], "pirep_submit_classic");
        assert_eq!(modal["title"], "CLASSIC - PIREP");
        let inputs = modal["components"].clone();
        assert_eq!(inputs[0]["components"][0]["value"], "VABB-VIDP");
        assert_eq!(inputs[1]["components"][0]["placeholder"], "HH:MM");
        assert_eq!(inputs[3]["components"][0]["style"], 2);
    }

    #[tokio::test]
    async fn invalid_mode_is_refused_with_its_reason() {
        let harness = Harness::new(backend(vec![mode("classic", ModeStatus::Invalid)]));
        let (result, state) =
            harness.component(&PirepFlow, button_event("pirep_mode_classic")).await;

        let message = result.expect_err("invalid").user_facing().unwrap_or_default();
        assert_eq!(message, "Mode not valid: wrong aircraft");
        assert_eq!(state, ReplyState::Created);
    }

    #[tokio::test]
    async fn oversized_mode_is_an_internal_error() {
        let mut wide = mode("wide", ModeStatus::Valid);
        wide.fields.extend([
            field(FIELD_CARGO, FieldKind::Number, false),
            field(FIELD_PASSENGERS, FieldKind::Number, false),
        ]);
        let harness = Harness::new(backend(vec![wide]));
        let (result, _) = harness.component(&PirepFlow, button_event("pirep_mode_wide")).await;

        assert!(matches!(result, Err(HandlerError::Internal(_))));
        assert!(harness.calls().await.is_empty());
    }

    #[tokio::test]
    async fn submit_files_the_report_publicly() {
        let harness = Harness::new(StubBackend::default());
        let event = modal_event(
            "pirep_submit_classic",
            &[("route_id", "VABB-VIDP"), ("flight_time", "02:15"), ("fuel_kg", " 15000 ")],
        );
        let (result, state) = harness.component(&PirepFlow, event).await;
        result.expect("submit");

        assert_eq!(state, ReplyState::Edited);
        assert_eq!(
            harness.backend.calls().await,
            vec![BackendCall::SubmitPirep(PirepSubmission {
                mode: "classic".to_owned(),
                flight_time: "02:15".to_owned(),
                route_id: Some("VABB-VIDP".to_owned()),
                fuel_kg: Some(15000),
                ..PirepSubmission::default()
            })]
        );
        let calls = harness.calls().await;
        assert!(!calls[0].is_ephemeral());
        let embed = calls[1].payload()["embeds"][0].clone();
        assert_eq!(embed["title"], "✅ PIREP Submitted Successfully");
        assert_eq!(embed["fields"][0]["value"], "pirep-1");
    }

    #[tokio::test]
    async fn non_numeric_fuel_is_rejected_before_defer() {
        let harness = Harness::new(StubBackend::default());
        let event =
            modal_event("pirep_submit_classic", &[("flight_time", "01:00"), ("fuel_kg", "lots")]);
        let (result, state) = harness.component(&PirepFlow, event).await;

        assert!(matches!(
            result,
            Err(HandlerError::Validation(ValidationError::NotANumber { field })) if field == "fuel_kg"
        ));
        assert_eq!(state, ReplyState::Created);
        assert!(harness.backend.calls().await.is_empty());
    }
}
