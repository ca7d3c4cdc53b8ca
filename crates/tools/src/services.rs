//! `search_services`: find medical services and their prices.

use async_trait::async_trait;
use medibook_core::error::ToolError;
use medibook_core::tool::{Parameters, Tool, ToolName};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::directory::ClinicDirectory;
use crate::text_param;

pub struct SearchServicesTool {
    directory: Arc<ClinicDirectory>,
}

impl SearchServicesTool {
    pub fn new(directory: Arc<ClinicDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for SearchServicesTool {
    fn name(&self) -> ToolName {
        ToolName::SearchServices
    }

    fn description(&self) -> &str {
        "Search medical services by name, optionally restricted to one clinic. Returns prices in VND."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "serviceName": {
                    "type": "string",
                    "description": "Part of the service name, e.g. 'niềng răng'"
                },
                "clinicName": {
                    "type": "string",
                    "description": "Restrict to clinics whose name contains this"
                }
            }
        })
    }

    async fn execute(&self, parameters: Parameters) -> Result<Value, ToolError> {
        let service = text_param(&parameters, "serviceName");
        let clinic = text_param(&parameters, "clinicName");

        let services: Vec<Value> = self
            .directory
            .search_services(service, clinic)
            .into_iter()
            .map(|s| {
                let clinic_name = self
                    .directory
                    .clinic(&s.clinic_id)
                    .map(|c| c.name.as_str())
                    .unwrap_or_default();
                json!({
                    "id": s.id,
                    "name": s.name,
                    "clinic": clinic_name,
                    "priceVnd": s.price_vnd,
                    "durationMinutes": s.duration_minutes,
                })
            })
            .collect();

        Ok(json!({ "count": services.len(), "services": services }))
    }
}
