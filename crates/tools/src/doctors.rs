//! `search_doctors`: find doctors by name and/or specialty.
//!
//! Any match asks the user a follow-up question rather than handing the raw
//! list back to the agent: one match confirms the doctor and offers the
//! schedule, several matches ask which one was meant.

use async_trait::async_trait;
use medibook_core::error::ToolError;
use medibook_core::tool::{Parameters, STATUS_DISAMBIGUATION, Tool, ToolName};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::directory::{ClinicDirectory, Doctor};
use crate::text_param;

pub struct SearchDoctorsTool {
    directory: Arc<ClinicDirectory>,
}

impl SearchDoctorsTool {
    pub fn new(directory: Arc<ClinicDirectory>) -> Self {
        Self { directory }
    }

    fn describe(&self, doctor: &Doctor) -> String {
        match self.directory.clinic(&doctor.clinic_id) {
            Some(clinic) => format!(
                "{} (chuyên khoa {}, {})",
                doctor.display_name(),
                doctor.specialty,
                clinic.name
            ),
            None => format!("{} (chuyên khoa {})", doctor.display_name(), doctor.specialty),
        }
    }

    fn summary(&self, doctor: &Doctor) -> Value {
        json!({
            "id": doctor.id,
            "name": doctor.display_name(),
            "specialty": doctor.specialty,
            "clinic": self.directory.clinic(&doctor.clinic_id).map(|c| c.name.as_str()),
        })
    }
}

#[async_trait]
impl Tool for SearchDoctorsTool {
    fn name(&self) -> ToolName {
        ToolName::SearchDoctors
    }

    fn description(&self) -> &str {
        "Search doctors by (partial) name and/or specialty. At least one of doctorName or specialty is required."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "doctorName": {
                    "type": "string",
                    "description": "Full or partial doctor name, accents optional"
                },
                "specialty": {
                    "type": "string",
                    "description": "Medical specialty, e.g. 'Tim mạch'"
                }
            }
        })
    }

    async fn execute(&self, parameters: Parameters) -> Result<Value, ToolError> {
        let name = text_param(&parameters, "doctorName");
        let specialty = text_param(&parameters, "specialty");
        if name.is_none() && specialty.is_none() {
            return Err(ToolError::InvalidArguments(
                "doctorName or specialty is required".into(),
            ));
        }

        let found = self.directory.search_doctors(name, specialty);
        let doctors: Vec<Value> = found.iter().map(|d| self.summary(d)).collect();

        Ok(match found.as_slice() {
            [] => json!({ "doctors": [], "count": 0 }),
            [doctor] => json!({
                "status": STATUS_DISAMBIGUATION,
                "message": format!("Tôi tìm thấy {}.", self.describe(doctor)),
                "question": "Bạn có muốn xem lịch khám của bác sĩ không?",
                "doctors": doctors,
                "count": 1,
            }),
            many => {
                let listing = many
                    .iter()
                    .enumerate()
                    .map(|(i, d)| format!("{}. {}", i + 1, self.describe(d)))
                    .collect::<Vec<_>>()
                    .join("\n");
                json!({
                    "status": STATUS_DISAMBIGUATION,
                    "message": format!("Tôi tìm thấy {} bác sĩ phù hợp:\n{}", many.len(), listing),
                    "question": "Bạn muốn chọn bác sĩ nào?",
                    "doctors": doctors,
                    "count": many.len(),
                })
            }
        })
    }
}
