//! Domain lookup tools for MediBook.
//!
//! Five tools over a shared [`ClinicDirectory`]: clinic, service and doctor
//! search plus two schedule lookups. Names are matched without regard to
//! case or Vietnamese diacritics, so "Canh" finds "Cảnh".

pub mod clinics;
pub mod directory;
pub mod doctors;
pub mod schedule;
pub mod services;

use medibook_core::tool::{Parameters, ToolRegistry};
use std::sync::Arc;

pub use directory::{ClinicDirectory, DirectoryError};

/// Create a registry with all five tools over one directory.
pub fn default_registry(directory: Arc<ClinicDirectory>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(clinics::SearchClinicsTool::new(directory.clone())));
    registry.register(Box::new(services::SearchServicesTool::new(directory.clone())));
    registry.register(Box::new(doctors::SearchDoctorsTool::new(directory.clone())));
    registry.register(Box::new(schedule::CheckDoctorScheduleTool::new(directory.clone())));
    registry.register(Box::new(schedule::FindAvailableDoctorsTool::new(directory)));
    registry
}

/// A non-blank string parameter.
pub(crate) fn text_param<'a>(parameters: &'a Parameters, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medibook_core::tool::{ToolCall, ToolName};
    use serde_json::json;

    #[test]
    fn registry_covers_vocabulary() {
        let registry = default_registry(Arc::new(ClinicDirectory::sample()));
        let names: Vec<&str> = ToolName::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(registry.names(), names);
        assert_eq!(registry.definitions().len(), 5);
    }

    #[tokio::test]
    async fn dispatch_turns_missing_arguments_into_error_payload() {
        let registry = default_registry(Arc::new(ClinicDirectory::sample()));
        let call = ToolCall::new("call_1", "check_doctor_schedule", Parameters::new());
        let result = registry.dispatch(&call).await;
        assert!(result.is_error());
        assert_eq!(result.output["tool"], json!("check_doctor_schedule"));
    }
}
