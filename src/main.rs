//! CLI entry point for the civic complaint heat map.
//!
//! Provides subcommands for watching the aggregation service on its refresh
//! cadence, taking a one-off weighted snapshot, and focusing a ranked issue.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use civic_heatmap::config::DashboardConfig;
use civic_heatmap::dashboard::{Dashboard, DashboardEvent, Reaction};
use civic_heatmap::fetch::BasicClient;
use civic_heatmap::filter::CategoryFilterState;
use civic_heatmap::heat::HeatLayerOptions;
use civic_heatmap::infra::aggregation::AggregationClient;
use civic_heatmap::models::Coordinates;
use civic_heatmap::output::{append_records, print_json, print_pretty};
use civic_heatmap::poller::{PollSettings, fetch_snapshot, snapshot_event, spawn_pollers};
use civic_heatmap::refresh::SnapshotKind;
use civic_heatmap::services::dashboard_api::DashboardApi;
use civic_heatmap::viewport::ViewportController;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "civic_heatmap")]
#[command(about = "Complaint heat map dashboard core", long_about = None)]
struct Cli {
    /// Base URL of the aggregation service (overrides DASHBOARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Refresh period in seconds (overrides REFRESH_INTERVAL_SECS)
    #[arg(long, global = true)]
    interval: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the aggregation service and keep the dashboard up to date.
    ///
    /// Operator commands are read from stdin, one per line:
    /// `toggle <category>`, `issue <rank>`, `point <id>`, `clear`.
    Watch {
        /// Device latitude used to seed the initial view
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Device longitude used to seed the initial view
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
    },
    /// Fetch once and print the weighted heat view
    Snapshot {
        /// CSV file to append weighted points to
        #[arg(short, long)]
        output: Option<String>,

        /// Category filter to switch off (repeatable)
        #[arg(short, long)]
        disable: Vec<String>,
    },
    /// Fetch once and focus the issue with the given rank
    Focus {
        #[arg(short, long)]
        rank: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/civic_heatmap.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("civic_heatmap.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = DashboardConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(secs) = cli.interval {
        anyhow::ensure!(secs > 0, "--interval must be greater than zero");
        config.refresh_interval = Duration::from_secs(secs);
    }
    debug!(?config, "Configuration loaded");

    let http = BasicClient::with_timeout(config.api_timeout)?;
    let api = Arc::new(AggregationClient::new(&config.api_url, http)?);

    match cli.command {
        Commands::Watch { lat, lng } => {
            let position = Coordinates::from_parts(lat, lng);
            watch(api, &config, position).await?;
        }
        Commands::Snapshot { output, disable } => {
            let mut filters = CategoryFilterState::new(config.category_filters.clone());
            for label in &disable {
                if !filters.set_enabled(label, false) {
                    warn!(label = %label, "Unknown category filter, ignoring");
                }
            }

            let mut dashboard = Dashboard::new(filters, ViewportController::new(config.home));
            load_once(&mut dashboard, api.as_ref(), &config).await;

            let view = dashboard.view(Instant::now());
            print_pretty(&view);
            print_json(&HeatLayerOptions::default())?;
            print_json(&view)?;
            print_json(&dashboard.statistics().category_breakdown())?;

            if let Some(path) = output {
                append_records(&path, &view.points)
                    .with_context(|| format!("Writing CSV to {path}"))?;
                info!(path = %path, rows = view.points.len(), "Heat view appended");
            }
        }
        Commands::Focus { rank } => {
            let mut dashboard = Dashboard::new(
                CategoryFilterState::new(config.category_filters.clone()),
                ViewportController::new(config.home),
            );
            load_once(&mut dashboard, api.as_ref(), &config).await;

            match dashboard.handle(DashboardEvent::IssueClicked { rank }, Instant::now()) {
                Reaction::Focus(transition) => {
                    info!(
                        rank,
                        duration_ms = transition.duration.as_millis() as u64,
                        "Camera transition planned"
                    );
                    print_json(&dashboard.viewport().selection())?;
                }
                _ => info!(rank, "No map location for this issue"),
            }
        }
    }

    Ok(())
}

/// Fetches each snapshot kind once and feeds the results to the dashboard.
async fn load_once<A: DashboardApi>(dashboard: &mut Dashboard, api: &A, config: &DashboardConfig) {
    for kind in SnapshotKind::ALL {
        let result = fetch_snapshot(api, kind, config.issue_limit).await;
        dashboard.handle(snapshot_event(kind, 1, result), Instant::now());
    }
    for advisory in dashboard.advisories() {
        warn!(kind = %advisory.kind, error = %advisory.message, "Snapshot unavailable");
    }
}

/// Runs the pollers and the event loop until Ctrl+C.
#[tracing::instrument(skip(api, config), fields(api_url = %config.api_url))]
async fn watch<A>(api: Arc<A>, config: &DashboardConfig, position: Option<Coordinates>) -> Result<()>
where
    A: DashboardApi + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pollers = spawn_pollers(
        api,
        PollSettings {
            interval: config.refresh_interval,
            issue_limit: config.issue_limit,
        },
        tx.clone(),
    );

    let mut dashboard = Dashboard::new(
        CategoryFilterState::new(config.category_filters.clone()),
        ViewportController::new(config.home),
    );
    // Geolocation is a one-shot; absence keeps the configured center.
    dashboard.handle(DashboardEvent::GeolocationResolved(position), Instant::now());

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Watching; press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(event) => {
                        let _ = tx.send(event);
                    }
                    None => warn!(input = %line, "Unrecognised command"),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "Stdin closed");
                    stdin_open = false;
                }
            },
            Some(event) = rx.recv() => {
                match dashboard.handle(event, Instant::now()) {
                    Reaction::Focus(transition) => {
                        let tx = tx.clone();
                        let generation = transition.generation;
                        info!(
                            generation,
                            lat = transition.to.center.latitude,
                            lng = transition.to.center.longitude,
                            zoom = transition.to.zoom,
                            "Focusing"
                        );
                        tokio::spawn(async move {
                            tokio::time::sleep(transition.duration).await;
                            let _ = tx.send(DashboardEvent::TransitionFinished { generation });
                        });
                    }
                    Reaction::Redraw => {
                        let view = dashboard.view(Instant::now());
                        info!(
                            visible = view.points.len(),
                            clusters = dashboard.clusters().len(),
                            issues = dashboard.issues().len(),
                            total_complaints = dashboard.statistics().total_complaints,
                            state = ?view.state,
                            advisories = view.advisories.len(),
                            "View updated"
                        );
                    }
                    Reaction::Reset(viewport) => {
                        info!(
                            lat = viewport.center.latitude,
                            lng = viewport.center.longitude,
                            zoom = viewport.zoom,
                            "Viewport reset"
                        );
                    }
                    Reaction::Nothing => {}
                }
            }
        }
    }

    pollers.shutdown().await;
    Ok(())
}

/// Parses one operator command line into an event.
fn parse_command(line: &str) -> Option<DashboardEvent> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match verb {
        "toggle" if !rest.is_empty() => Some(DashboardEvent::FilterToggled(rest.to_string())),
        "issue" => rest
            .parse()
            .ok()
            .map(|rank| DashboardEvent::IssueClicked { rank }),
        "point" if !rest.is_empty() => Some(DashboardEvent::PointClicked {
            id: rest.to_string(),
        }),
        "clear" => Some(DashboardEvent::SelectionCleared),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert!(matches!(
            parse_command("toggle Water Supply"),
            Some(DashboardEvent::FilterToggled(label)) if label == "Water Supply"
        ));
        assert!(matches!(
            parse_command(" issue 2 "),
            Some(DashboardEvent::IssueClicked { rank: 2 })
        ));
        assert!(matches!(parse_command("clear"), Some(DashboardEvent::SelectionCleared)));
        assert!(parse_command("issue two").is_none());
        assert!(parse_command("toggle").is_none());
        assert!(parse_command("").is_none());
    }
}
