//! Turns result sets into something postable. Called after the interaction is deferred,
//! so implementations may take their time (e.g. rasterising a table image).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comrade_core::domain::flight::{FlightHistoryPage, LiveFlight};
use thiserror::Error;

use crate::messages::{Attachment, MAX_CONTENT_LEN};

pub const LOGBOOK_LEGEND: &str =
    "L - Landings | V - Violations | S - Server (E - Expert, C - Casual, T - Training)";

const MAX_CELL_CHARS: usize = 16;
/// Room kept for the closing fence and the "more rows" note.
const TABLE_RESERVE: usize = 48;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedTable {
    pub text: String,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("table rendering failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait FlightRenderer: Send + Sync {
    async fn render_logbook(&self, page: &FlightHistoryPage) -> Result<RenderedTable, RenderError>;

    async fn render_live(&self, flights: &[LiveFlight]) -> Result<RenderedTable, RenderError>;
}

/// Monospace code-block tables. Never produces an attachment.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextTableRenderer;

impl TextTableRenderer {
    pub fn render_live_at(&self, flights: &[LiveFlight], now: DateTime<Utc>) -> String {
        let rows = flights
            .iter()
            .map(|flight| {
                vec![
                    flight.callsign.clone(),
                    flight.username.clone(),
                    flight.aircraft.clone(),
                    format!("{}ft", flight.altitude),
                    format!("{:.0}kt", flight.speed),
                    flight.origin.clone(),
                    flight.destination.clone(),
                    seen_ago(now, flight.last_report),
                ]
            })
            .collect();

        format_table(
            &["Callsign", "User", "Aircraft", "Alt", "Spd", "From", "To", "Seen"],
            rows,
            "",
        )
    }
}

#[async_trait]
impl FlightRenderer for TextTableRenderer {
    async fn render_logbook(&self, page: &FlightHistoryPage) -> Result<RenderedTable, RenderError> {
        let rows = page
            .records
            .iter()
            .map(|record| {
                vec![
                    record.timestamp.format("%b %-d %H:%M").to_string(),
                    record.route(),
                    record.equipment.clone(),
                    format!("{}/{}/{}", record.landings, record.violations, record.server_code()),
                ]
            })
            .collect();

        let text = format_table(&["Time", "Route", "Equip", "L/V/S"], rows, LOGBOOK_LEGEND);
        Ok(RenderedTable { text, attachment: None })
    }

    async fn render_live(&self, flights: &[LiveFlight]) -> Result<RenderedTable, RenderError> {
        Ok(RenderedTable { text: self.render_live_at(flights, Utc::now()), attachment: None })
    }
}

fn seen_ago(now: DateTime<Utc>, at: DateTime<Utc>) -> String {
    let minutes = (now - at).num_minutes().max(0);
    match minutes {
        0 => "now".to_owned(),
        1..=59 => format!("{minutes}m"),
        _ => format!("{}h", minutes / 60),
    }
}

fn clip(value: &str) -> String {
    value.chars().take(MAX_CELL_CHARS).collect()
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}", width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_owned()
}

/// Left-aligned columns inside a code fence, cut short before the message limit.
fn format_table(headers: &[&str], rows: Vec<Vec<String>>, footer: &str) -> String {
    let rows: Vec<Vec<String>> =
        rows.into_iter().map(|row| row.iter().map(|cell| clip(cell)).collect()).collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(column, header)| {
            rows.iter()
                .filter_map(|row| row.get(column))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let budget = MAX_CONTENT_LEN.saturating_sub(footer.chars().count() + TABLE_RESERVE);
    let mut text = String::from("```\n");
    text.push_str(&render_line(headers.iter().copied(), &widths));
    let mut used = text.chars().count();

    let mut shown = 0usize;
    for row in &rows {
        let rendered = render_line(row.iter().map(String::as_str), &widths);
        let cost = rendered.chars().count() + 1;
        if used + cost > budget {
            break;
        }
        text.push('\n');
        text.push_str(&rendered);
        used += cost;
        shown += 1;
    }
    text.push_str("\n```");

    if shown < rows.len() {
        text.push_str(&format!("\n… and {} more", rows.len() - shown));
    }
    if !footer.is_empty() {
        text.push('\n');
        text.push_str(footer);
    }
    text
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use comrade_core::domain::flight::{FlightHistoryPage, FlightRecord, LiveFlight};

    use super::{FlightRenderer, TextTableRenderer, LOGBOOK_LEGEND};
    use crate::messages::MAX_CONTENT_LEN;

    fn record(minute: u32) -> FlightRecord {
        FlightRecord {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 8, 20, minute, 0).single().expect("time"),
            origin: Some("KLAX".to_owned()),
            dest: Some("KSFO".to_owned()),
            equipment: "A320".to_owned(),
            landings: 1,
            violations: 0,
            server: "Expert".to_owned(),
            callsign: None,
            map_url: None,
        }
    }

    #[tokio::test]
    async fn logbook_renders_rows_and_legend() {
        let page = FlightHistoryPage { records: vec![record(3)], page: 1 };
        let table = TextTableRenderer.render_logbook(&page).await.expect("render");

        assert!(table.attachment.is_none());
        assert!(table.text.starts_with("```\nTime"));
        assert!(table.text.contains("Jan 8 20:03  KLAX-KSFO  A320   1/0/E"));
        assert!(table.text.ends_with(LOGBOOK_LEGEND));
    }

    #[tokio::test]
    async fn oversized_logbook_stays_under_the_message_limit() {
        let page = FlightHistoryPage { records: (0..200).map(|i| record(i % 60)).collect(), page: 1 };
        let table = TextTableRenderer.render_logbook(&page).await.expect("render");

        assert!(table.text.chars().count() <= MAX_CONTENT_LEN);
        assert!(table.text.contains("more"));
        assert!(table.text.contains("\n```\n"));
    }

    #[test]
    fn live_table_shows_relative_report_age() {
        let now = Utc.with_ymd_and_hms(2025, 1, 8, 21, 0, 0).single().expect("time");
        let flight = LiveFlight {
            callsign: "AAL123".to_owned(),
            username: "pilotA".to_owned(),
            aircraft: "B738".to_owned(),
            livery: "American".to_owned(),
            altitude: 35_000,
            speed: 451.6,
            origin: "KJFK".to_owned(),
            destination: "KLAX".to_owned(),
            last_report: now - Duration::minutes(5),
        };

        let text = TextTableRenderer.render_live_at(&[flight], now);
        assert!(text.contains("AAL123"));
        assert!(text.contains("35000ft"));
        assert!(text.contains("452kt"));
        assert!(text.contains("5m"));
    }
}
