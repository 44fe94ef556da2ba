use std::time::Duration;

use comrade_api::HttpBackendApi;
use comrade_core::config::{AppConfig, LoadOptions};
use comrade_core::BackendApi;
use secrecy::ExposeSecret;
use serde::Serialize;

use super::{escape_json, CommandResult, EXIT_NOT_READY};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_NOT_READY };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_bot_token(&config));
            checks.push(check_backend_reachability(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["bot_token_readiness", "backend_reachability"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Presence is enforced by config validation; this checks the three-segment token shape.
fn check_bot_token(config: &AppConfig) -> DoctorCheck {
    let token = config.discord.bot_token.expose_secret().trim().to_owned();
    let segments: Vec<&str> = token.split('.').collect();
    let well_formed = segments.len() == 3 && segments.iter().all(|segment| !segment.is_empty());

    if well_formed {
        DoctorCheck {
            name: "bot_token_readiness",
            status: CheckStatus::Pass,
            details: "bot token is present and well formed".to_string(),
        }
    } else {
        DoctorCheck {
            name: "bot_token_readiness",
            status: CheckStatus::Fail,
            details: "bot token does not look like `<id>.<timestamp>.<hmac>`; reset it in the developer portal".to_string(),
        }
    }
}

fn check_backend_reachability(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "backend_reachability",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let timeout = Duration::from_secs(config.backend.timeout_secs);
    let result = runtime.block_on(async {
        let backend = HttpBackendApi::new(&config.backend)
            .map_err(|error| format!("failed to build backend client: {error}"))?;
        match tokio::time::timeout(timeout, backend.health()).await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(error)) => Err(format!("backend health probe failed: {error}")),
            Err(_) => Err(format!("backend did not answer within {}s", timeout.as_secs())),
        }
    });

    match result {
        Ok(report) if report.is_healthy() => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Pass,
            details: format!("`{}` reports `{}`", config.backend.base_url, report.status),
        },
        Ok(report) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Fail,
            details: format!("`{}` reports `{}`", config.backend.base_url, report.status),
        },
        Err(error) => {
            DoctorCheck { name: "backend_reachability", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
