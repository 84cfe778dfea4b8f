// Classbook - classroom notebook
// Entry point: opens a data directory and reports the dashboard

use classbook::config::DEFAULT_DATA_DIR;
use classbook::services::notes::active_notes;
use classbook::services::DashboardStats;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classbook=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Classbook");

    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    let state = classbook::app::setup(&data_dir).await?;

    let store = state.records.lock().await;
    let stats = DashboardStats::compute(store.records());

    tracing::info!(
        "{} students, {} log entries, {} open notes",
        store.students().len(),
        store.logs().len(),
        active_notes(store.notes()).len()
    );
    tracing::info!(
        "Behavior: {} positive, {} neutral, {} needing improvement",
        stats.behavior.positive,
        stats.behavior.neutral,
        stats.behavior.needs_improvement
    );
    for (subject, grades) in &stats.academic {
        tracing::info!("{}: {} review(s)", subject, grades.total());
    }
    if let Some(top) = stats.needs_improvement.first() {
        tracing::info!("Most needs-improvement entries: {} ({})", top.name, top.count);
    }

    Ok(())
}
