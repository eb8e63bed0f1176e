//! Status command implementation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Health response from the server.
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    polling: bool,
    last_cycle_at: Option<String>,
    components: HashMap<String, ComponentStatus>,
}

/// Component status from the server.
#[derive(Debug, Deserialize)]
struct ComponentStatus {
    status: String,
    message: Option<String>,
}

/// Query a running producer's health and metrics endpoints.
pub async fn run(url: &str) -> Result<()> {
    let base = url.trim_end_matches('/');
    println!("Checking health at {}...\n", base);

    let client = reqwest::Client::new();

    match client.get(format!("{}/health", base)).send().await {
        Ok(response) => {
            let status_code = response.status();
            match response.json::<HealthResponse>().await {
                Ok(health) => print_health_status(&health, status_code.as_u16()),
                Err(e) => {
                    println!("Failed to parse health response: {}", e);
                    println!("HTTP Status: {}", status_code);
                }
            }
        }
        Err(e) => {
            println!("Failed to connect to health endpoint: {}", e);
            println!("\nIs the gh2k producer running?");
            println!("Start it with: gh2k produce --config <path-to-config>");
            return Ok(());
        }
    }

    println!("\n--- Metrics ---");
    let text = client
        .get(format!("{}/metrics", base))
        .send()
        .await
        .context("Failed to fetch metrics")?
        .text()
        .await
        .context("Failed to read metrics")?;
    print_metrics(&text);

    Ok(())
}

fn status_tag(status: &str) -> &'static str {
    match status {
        "healthy" => "[OK]",
        "degraded" => "[WARN]",
        "unhealthy" => "[FAIL]",
        _ => "[?]",
    }
}

fn print_health_status(health: &HealthResponse, status_code: u16) {
    println!(
        "{} Overall Status: {} (HTTP {})",
        status_tag(&health.status),
        health.status.to_uppercase(),
        status_code
    );
    println!(
        "Polling: {}{}",
        if health.polling { "yes" } else { "no" },
        health
            .last_cycle_at
            .as_deref()
            .map(|t| format!(" (last cycle {})", t))
            .unwrap_or_default()
    );
    println!();

    let mut names: Vec<_> = health.components.keys().collect();
    names.sort();
    if !names.is_empty() {
        println!("Components:");
        for name in names {
            let status = &health.components[name];
            match &status.message {
                Some(msg) => println!(
                    "  {} {}: {} ({})",
                    status_tag(&status.status),
                    name,
                    status.status,
                    msg
                ),
                None => println!("  {} {}: {}", status_tag(&status.status), name, status.status),
            }
        }
    }
}

/// Pull the unlabelled sample values out of Prometheus text.
fn parse_samples(metrics_text: &str) -> HashMap<&str, u64> {
    metrics_text
        .lines()
        .filter(|line| !line.starts_with('#') && !line.is_empty())
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let value = parts.next()?.parse::<u64>().ok()?;
            Some((name, value))
        })
        .collect()
}

fn print_metrics(metrics_text: &str) {
    let values = parse_samples(metrics_text);

    let rows = [
        ("gh2k_cycles_total", "Poll Cycles:      "),
        ("gh2k_cycles_failed_total", "Failed Cycles:    "),
        ("gh2k_events_fetched_total", "Events Fetched:   "),
        ("gh2k_events_published_total", "Events Published: "),
        ("gh2k_publish_throttled_total", "Throttled Puts:   "),
    ];

    let mut printed = false;
    for (metric, label) in rows {
        if let Some(v) = values.get(metric) {
            println!("{}{}", label, format_number(*v));
            printed = true;
        }
    }

    if !printed {
        println!("No metrics available yet.");
    }
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
