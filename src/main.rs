//! Harbor Updater — console host.
//!
//! Runs the update subsystem standalone: prompts render on stdout and read
//! choices from stdin, and subsystem events are logged as they arrive. The
//! desktop shell embeds [`harbor_updater::app::App`] the same way and swaps
//! in its own prompter.

use std::io::Write;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use harbor_updater::app::{self, App};
use harbor_updater::services::notification_scheduler::Prompter;

/// Prompter rendering dialogs on the terminal.
struct StdioPrompter;

impl Prompter for StdioPrompter {
    fn show_prompt(&self, title: &str, message: &str, detail: &str, buttons: &[&str]) -> usize {
        println!("\n[{}] {}", title, message);
        if !detail.is_empty() {
            println!("{}", detail);
        }
        for (i, button) in buttons.iter().enumerate() {
            println!("  {}) {}", i + 1, button);
        }
        print!("> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return buttons.len().saturating_sub(1);
        }
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=buttons.len()).contains(&n) => n - 1,
            // Anything else counts as dismissing the prompt.
            _ => buttons.len().saturating_sub(1),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if app::was_updated() {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            "running for the first time after an update"
        );
    }

    let app = App::start(None, Arc::new(StdioPrompter))?;

    let mut events = app.subscribe();
    let event_logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(?event, "update event");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    event_logger.abort();
    app.shutdown().await;
    Ok(())
}
