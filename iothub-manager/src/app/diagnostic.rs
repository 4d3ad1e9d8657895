//! `--diagnostic` command
//!
//! Prints the resolved configuration and probes the registry.

use std::fmt::Display;
use std::io::IsTerminal;
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::app::options::AppOptions;
use crate::app::state::AppState;
use crate::authn::token_mngr::TokenManagerExt;
use crate::hub::ConfigurationRegistry;
use crate::storage::settings::Settings;

/// Status of a diagnostic check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
}

/// Result of a single diagnostic check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn from_result<E: Display>(name: &str, started: Instant, result: Result<String, E>) -> Self {
        let (status, message) = match result {
            Ok(message) => (CheckStatus::Pass, message),
            Err(e) => (CheckStatus::Fail, e.to_string()),
        };
        Self {
            name: name.to_string(),
            status,
            message,
            duration: started.elapsed(),
        }
    }
}

/// Run the checks and print a report; returns the number of failed checks
pub async fn run_diagnostic(settings: &Settings) -> usize {
    let use_color = std::io::stdout().is_terminal();
    let mut results = Vec::new();

    let started = Instant::now();
    let options = AppOptions::from_settings(settings);
    results.push(CheckResult::from_result(
        "configuration",
        started,
        options.as_ref().map(|o| {
            format!(
                "hub {} (api-version {})",
                o.services.connection.host_name(),
                o.services.hub.api_version
            )
        }),
    ));

    if let Ok(options) = &options {
        results.extend(check_registry(options).await);
    }

    println!();
    println!("  iothub-manager diagnostic");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    for result in &results {
        let duration_ms = result.duration.as_millis();
        let line = match (&result.status, use_color) {
            (CheckStatus::Pass, true) => format!(
                "    {} {:<16} {} ({duration_ms}ms)",
                "✓".green(),
                result.name,
                result.message
            ),
            (CheckStatus::Pass, false) => format!(
                "    [OK]   {:<16} {} ({duration_ms}ms)",
                result.name, result.message
            ),
            (CheckStatus::Fail, true) => format!(
                "    {} {:<16} {} ({duration_ms}ms)",
                "✗".red(),
                result.name,
                result.message.red()
            ),
            (CheckStatus::Fail, false) => format!(
                "    [FAIL] {:<16} {} ({duration_ms}ms)",
                result.name, result.message
            ),
        };
        if result.status == CheckStatus::Fail {
            fail_count += 1;
        }
        println!("{line}");
    }

    println!();
    if fail_count > 0 {
        println!("  {} check(s) failed.", fail_count);
    } else {
        println!("  All checks passed.");
    }

    fail_count
}

async fn check_registry(options: &AppOptions) -> Vec<CheckResult> {
    let started = Instant::now();
    let state = match AppState::init(&options.services) {
        Ok(state) => state,
        Err(e) => return vec![CheckResult::from_result("client", started, Err(e))],
    };

    let token = state
        .token_mngr
        .get_token()
        .await
        .map(|t| format!("signed, expires {}", t.expires_at()));
    let token_check = CheckResult::from_result("sas token", started, token);

    let started = Instant::now();
    let listing = state
        .http_client
        .get_configurations(options.services.deployments.max_deployments)
        .await
        .map(|configurations| format!("{} configuration(s) visible", configurations.len()));
    let registry_check = CheckResult::from_result("registry", started, listing);

    vec![token_check, registry_check]
}
