use async_trait::async_trait;
use comrade_core::domain::pilot::PilotStats;
use comrade_core::domain::service::Timed;

use crate::context::{HandlerContext, HandlerResult};
use crate::messages::{MessageBuilder, MessagePayload, COLOR_INFO};
use crate::registry::CommandHandler;
use crate::reply::ReplyController;

pub struct StatsCommand;

#[async_trait]
impl CommandHandler for StatsCommand {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn description(&self) -> &'static str {
        "View your pilot statistics and activity"
    }

    async fn execute(&self, ctx: &HandlerContext, reply: &mut ReplyController) -> HandlerResult {
        reply.defer(false).await?;
        let stats = ctx.api.pilot_stats(&ctx.identity).await?;
        reply.edit(stats_message(&stats)).await?;
        Ok(())
    }
}

/// `"45m"`, `"2h"`, `"2h 5m"`.
fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = seconds % 3600 / 60;
    match (hours, minutes) {
        (0, minutes) => format!("{minutes}m"),
        (hours, 0) => format!("{hours}h"),
        (hours, minutes) => format!("{hours}h {minutes}m"),
    }
}

fn stats_message(stats: &Timed<PilotStats>) -> MessagePayload {
    let data = &stats.data;
    let mut sections: Vec<(&str, Vec<String>)> = Vec::new();

    if let Some(game) = &data.game_stats {
        let mut lines = Vec::new();
        if let Some(seconds) = game.flight_time.filter(|value| *value > 0) {
            lines.push(format!("**Flight Time:** {}", format_duration(seconds)));
        }
        let counters = [
            ("Online Flights", game.online_flights),
            ("Landings", game.landing_count),
            ("XP", game.xp),
            ("Violations", game.violations),
        ];
        for (label, value) in counters {
            if let Some(value) = value.filter(|value| *value > 0) {
                lines.push(format!("**{label}:** {value}"));
            }
        }
        if let Some(grade) = game.grade.filter(|grade| *grade > 0) {
            lines.push(format!("**Grade:** {grade}"));
        }
        sections.push(("🎮 Game Statistics", lines));
    }

    if let Some(career) = &data.career_mode_data {
        let mut lines = Vec::new();
        if let (Some(airline), Some(aircraft)) = (&career.airline, &career.aircraft) {
            lines.push(format!("**Airline:** {airline} ({aircraft})"));
        }
        if let Some(hours) = career.total_cm_hours.filter(|value| *value > 0) {
            lines.push(format!("**Total Hours:** {}", format_duration(hours)));
        }
        if let Some(next) = career.required_hours_to_next.filter(|value| *value > 0) {
            lines.push(format!("**To Next Level:** {}", format_duration(next)));
        }
        if let Some(last) = &career.last_career_mode_flight {
            lines.push(format!("**Last Flight:** {last}"));
        }
        if !career.assigned_routes.is_empty() {
            lines.push(format!("**Routes Assigned:** {}", career.assigned_routes.len()));
        }
        sections.push(("✈️ Career Mode", lines));
    }

    if let Some(provider) = &data.provider_data {
        let entries = [
            ("Join Date", &provider.join_date),
            ("Last Activity", &provider.last_activity),
            ("Region", &provider.region),
            ("Callsign", &provider.callsign),
        ];
        let lines = entries
            .into_iter()
            .filter_map(|(label, value)| value.as_ref().map(|value| format!("**{label}:** {value}")))
            .collect();
        sections.push(("📋 Provider Information", lines));
    }

    let mut info = vec![format!("**Cached:** {}", if data.metadata.cached { "Yes" } else { "No" })];
    if let Some(fetched) = &data.metadata.last_fetched {
        info.push(format!("**Last Updated:** {fetched}"));
    }
    sections.push(("ℹ️ Data Info", info));

    let footer = format!(
        "{} • Response time: {}",
        data.metadata.va_name.as_deref().unwrap_or("Virtual Airline"),
        stats.response_time.as_deref().unwrap_or("N/A"),
    );

    MessageBuilder::new()
        .embed(|embed| {
            embed.title("Your Pilot Statistics").color(COLOR_INFO).footer(footer);
            for (name, lines) in sections.into_iter().filter(|(_, lines)| !lines.is_empty()) {
                embed.field(name, lines.join("\n"), false);
            }
        })
        .build()
}
