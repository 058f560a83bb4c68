use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use engie::kernel::state::PrimaryDisplay;
use engie::{Controller, EngieConfig, HttpAnalysisClient, PageSnapshot, StaticPage, TextBufferHost};
use tracing_subscriber::EnvFilter;

const CADENCE: Duration = Duration::from_millis(250);

fn usage() -> String {
    "usage: engie <page.html> [config.toml]".to_string()
}

fn read_page(path: &PathBuf) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading page {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let page_path = PathBuf::from(args.next().ok_or_else(|| anyhow::anyhow!(usage()))?);
    let config = match args.next() {
        Some(path) => EngieConfig::load(&path).with_context(|| format!("loading config {}", path))?,
        None => EngieConfig::default(),
    }
    .apply_env_overrides();

    tracing::info!("Engie booting against {}", config.api.base_url);

    let mut html = read_page(&page_path)?;
    let page = Arc::new(StaticPage::new(PageSnapshot::new(html.clone())));
    let api = Arc::new(HttpAnalysisClient::new(config.api.clone()));
    let host = Arc::new(TextBufferHost::new(String::new()));
    let controller = Controller::new(config, api, page.clone(), host.clone())?;

    let _log = controller.store().subscribe(|state| {
        match state.primary_display() {
            PrimaryDisplay::Suggestions => {
                if let Some(s) = state.current_suggestion() {
                    tracing::info!(
                        "[v{}] {} of {}: '{}' -> '{}'",
                        state.version,
                        state.current_suggestion_index() + 1,
                        state.active_suggestions().len(),
                        s.original,
                        s.suggestion
                    );
                }
            }
            PrimaryDisplay::Ideation => {
                tracing::info!("[v{}] idea: {}", state.version, state.ideation_message().unwrap_or_default())
            }
            PrimaryDisplay::Encouragement => {
                tracing::info!("[v{}] {}", state.version, state.encouragement_message().unwrap_or_default())
            }
            PrimaryDisplay::Nothing => tracing::trace!("[v{}] mood {:?}", state.version, state.mood),
        }
    });

    // First pass over whatever is already on the page.
    controller.notify_text_changed();
    spawn_page_tone(&controller);

    let mut cadence = tokio::time::interval(CADENCE);
    cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!("Engie active. Edit {} to see it react. Press Ctrl+C to stop.", page_path.display());

    loop {
        tokio::select! {
            _ = cadence.tick() => {
                let latest = match read_page(&page_path) {
                    Ok(latest) => latest,
                    Err(e) => {
                        tracing::warn!("{:#}", e);
                        continue;
                    }
                };
                if latest != html {
                    html = latest;
                    page.set_html(html.clone());
                    controller.notify_text_changed();
                    spawn_page_tone(&controller);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    controller.cleanup();
    tracing::info!("Applied {} suggestion(s) this session", controller.state().applied_count);
    Ok(())
}

fn spawn_page_tone(controller: &Controller) {
    let controller = controller.clone();
    tokio::spawn(async move {
        controller.analyze_page_tone().await;
    });
}
