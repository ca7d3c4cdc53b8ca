//! Schedule lookups: `check_doctor_schedule` and `find_available_doctors`.
//!
//! Both answer with a ready-to-send `formattedMessage`, so the agent is not
//! asked to reformat a slot list it would only copy anyway.

use async_trait::async_trait;
use chrono::NaiveDate;
use medibook_core::calendar::{describe_date, parse_date};
use medibook_core::error::ToolError;
use medibook_core::tool::{Parameters, STATUS_DISAMBIGUATION, Tool, ToolName};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::directory::ClinicDirectory;
use crate::text_param;

fn required_date(parameters: &Parameters) -> Result<NaiveDate, ToolError> {
    let raw = text_param(parameters, "date")
        .ok_or_else(|| ToolError::InvalidArguments("date is required (dd/mm/yyyy)".into()))?;
    parse_date(raw)
        .ok_or_else(|| ToolError::InvalidArguments(format!("Invalid date '{raw}', expected dd/mm/yyyy")))
}

pub struct CheckDoctorScheduleTool {
    directory: Arc<ClinicDirectory>,
}

impl CheckDoctorScheduleTool {
    pub fn new(directory: Arc<ClinicDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for CheckDoctorScheduleTool {
    fn name(&self) -> ToolName {
        ToolName::CheckDoctorSchedule
    }

    fn description(&self) -> &str {
        "List the free 30-minute appointment slots of one doctor on a given date."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "doctorName": {
                    "type": "string",
                    "description": "Doctor name, accents optional"
                },
                "date": {
                    "type": "string",
                    "description": "Date in dd/mm/yyyy"
                }
            },
            "required": ["doctorName", "date"]
        })
    }

    async fn execute(&self, parameters: Parameters) -> Result<Value, ToolError> {
        let name = text_param(&parameters, "doctorName")
            .ok_or_else(|| ToolError::InvalidArguments("doctorName is required".into()))?;
        let date = required_date(&parameters)?;
        let day = describe_date(date);

        let found = self.directory.search_doctors(Some(name), None);
        let doctor = match found.as_slice() {
            [] => {
                return Err(ToolError::ExecutionFailed {
                    tool_name: ToolName::CheckDoctorSchedule.to_string(),
                    reason: format!("No doctor matches '{name}'"),
                });
            }
            [doctor] => *doctor,
            many => {
                let names: Vec<String> = many.iter().map(|d| d.display_name()).collect();
                return Ok(json!({
                    "status": STATUS_DISAMBIGUATION,
                    "message": format!("Có {} bác sĩ tên phù hợp: {}.", many.len(), names.join(", ")),
                    "question": format!("Bạn muốn xem lịch của bác sĩ nào vào {day}?"),
                }));
            }
        };

        let slots: Vec<String> = self
            .directory
            .free_slots(doctor, date)
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect();

        let message = if !self.directory.works_on(doctor, date) {
            format!("{} không làm việc vào {day}.", doctor.display_name())
        } else if slots.is_empty() {
            format!("{} đã kín lịch vào {day}.", doctor.display_name())
        } else {
            let lines: Vec<String> = slots.iter().map(|s| format!("- {s}")).collect();
            format!(
                "Lịch trống của {} vào {day}:\n{}\nBạn muốn đặt khung giờ nào?",
                doctor.display_name(),
                lines.join("\n")
            )
        };

        Ok(json!({
            "doctor": doctor.display_name(),
            "date": day,
            "slots": slots,
            "formattedMessage": message,
        }))
    }
}

pub struct FindAvailableDoctorsTool {
    directory: Arc<ClinicDirectory>,
}

impl FindAvailableDoctorsTool {
    pub fn new(directory: Arc<ClinicDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for FindAvailableDoctorsTool {
    fn name(&self) -> ToolName {
        ToolName::FindAvailableDoctors
    }

    fn description(&self) -> &str {
        "Find doctors with free appointment slots on a given date, optionally filtered by specialty."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": {
                    "type": "string",
                    "description": "Date in dd/mm/yyyy"
                },
                "specialty": {
                    "type": "string",
                    "description": "Medical specialty, e.g. 'Nhi khoa'"
                }
            },
            "required": ["date"]
        })
    }

    async fn execute(&self, parameters: Parameters) -> Result<Value, ToolError> {
        let date = required_date(&parameters)?;
        let specialty = text_param(&parameters, "specialty");
        let day = describe_date(date);

        let available: Vec<(String, &str, usize)> = self
            .directory
            .search_doctors(None, specialty)
            .into_iter()
            .map(|d| (d.display_name(), d.specialty.as_str(), self.directory.free_slots(d, date).len()))
            .filter(|(_, _, free)| *free > 0)
            .collect();

        let message = if available.is_empty() {
            format!("Không có bác sĩ nào còn lịch trống vào {day}.")
        } else {
            let lines: Vec<String> = available
                .iter()
                .map(|(name, specialty, free)| format!("- {name} ({specialty}): {free} khung giờ trống"))
                .collect();
            format!("Các bác sĩ còn lịch trống vào {day}:\n{}", lines.join("\n"))
        };

        let doctors: Vec<Value> = available
            .iter()
            .map(|(name, specialty, free)| json!({ "name": name, "specialty": specialty, "freeSlots": free }))
            .collect();

        Ok(json!({
            "date": day,
            "doctors": doctors,
            "formattedMessage": message,
        }))
    }
}
