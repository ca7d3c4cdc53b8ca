//! `search_clinics`: find clinics by location and/or name.

use async_trait::async_trait;
use medibook_core::error::ToolError;
use medibook_core::tool::{Parameters, Tool, ToolName};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::directory::ClinicDirectory;
use crate::text_param;

pub struct SearchClinicsTool {
    directory: Arc<ClinicDirectory>,
}

impl SearchClinicsTool {
    pub fn new(directory: Arc<ClinicDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for SearchClinicsTool {
    fn name(&self) -> ToolName {
        ToolName::SearchClinics
    }

    fn description(&self) -> &str {
        "Search clinics by location (district, city or street) and/or clinic name."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "District, city or street, e.g. 'Quận 1'"
                },
                "query": {
                    "type": "string",
                    "description": "Part of the clinic name"
                }
            }
        })
    }

    async fn execute(&self, parameters: Parameters) -> Result<Value, ToolError> {
        let location = text_param(&parameters, "location");
        let query = text_param(&parameters, "query");

        let clinics: Vec<Value> = self
            .directory
            .search_clinics(location, query)
            .into_iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "name": c.name,
                    "address": format!("{}, {}, {}", c.address, c.district, c.city),
                    "phone": c.phone,
                })
            })
            .collect();

        Ok(json!({ "count": clinics.len(), "clinics": clinics }))
    }
}
