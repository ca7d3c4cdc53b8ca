//! Wiring shared by the commands: directory, provider, tools and agent.

use medibook_agent::AgentLoop;
use medibook_config::AppConfig;
use medibook_core::error::{Error, Result};
use medibook_core::event::EventBus;
use medibook_providers::OpenAiCompatProvider;
use medibook_tools::ClinicDirectory;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// The configured clinic directory, or the bundled sample.
pub fn load_directory(config: &AppConfig) -> Result<ClinicDirectory> {
    match &config.directory.path {
        Some(path) => {
            let directory = ClinicDirectory::load(path).map_err(|e| Error::Config {
                message: e.to_string(),
            })?;
            tracing::info!(
                path = %path.display(),
                clinics = directory.clinics.len(),
                doctors = directory.doctors.len(),
                "Loaded clinic directory"
            );
            Ok(directory)
        }
        None => Ok(ClinicDirectory::sample()),
    }
}

/// Build the agent loop for `config`.
pub fn build_agent(config: &AppConfig, event_bus: Arc<EventBus>) -> Result<AgentLoop> {
    let provider = Arc::new(OpenAiCompatProvider::from_config(&config.agent)?);
    let directory = Arc::new(load_directory(config)?);
    let tools = Arc::new(medibook_tools::default_registry(directory));
    Ok(AgentLoop::from_config(provider, tools, event_bus, config))
}

/// Print operator-facing events (reasoning, healed calls, tool timings)
/// at debug level.
pub fn spawn_event_logger(event_bus: &EventBus) {
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::debug!(event = ?event, "Domain event"),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "Event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}
