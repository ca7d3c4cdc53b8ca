//! In-memory clinic directory backing the lookup tools.
//!
//! Holds clinics, their services, and doctors with weekly working hours and
//! already-booked slots. Loaded from a JSON file, or from the bundled sample
//! when no file is configured.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Length of one appointment slot.
pub const SLOT_MINUTES: u32 = 30;

const SAMPLE_DIRECTORY: &str = include_str!("../data/sample_directory.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub id: String,
    pub name: String,
    pub address: String,
    pub district: String,
    pub city: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub clinic_id: String,
    pub price_vnd: u64,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    #[serde(default = "default_title")]
    pub title: String,
    pub specialty: String,
    pub clinic_id: String,
    #[serde(default)]
    pub working_hours: Vec<WorkingHours>,
    #[serde(default)]
    pub booked: Vec<BookedSlot>,
}

fn default_title() -> String {
    "BS.".into()
}

impl Doctor {
    /// `BS. Trần Văn Cảnh`
    pub fn display_name(&self) -> String {
        format!("{} {}", self.title, self.name)
    }
}

/// A weekly working window, times as `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub weekday: Weekday,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlot {
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicDirectory {
    #[serde(default)]
    pub clinics: Vec<Clinic>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub doctors: Vec<Doctor>,
}

impl ClinicDirectory {
    /// Load a directory from a JSON file.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path).map_err(|e| DirectoryError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        serde_json::from_str(json).map_err(|e| DirectoryError::Parse(e.to_string()))
    }

    /// The bundled sample directory.
    pub fn sample() -> Self {
        Self::from_json(SAMPLE_DIRECTORY).unwrap_or_else(|e| {
            warn!(error = %e, "Bundled sample directory is invalid, starting empty");
            Self::default()
        })
    }

    pub fn clinic(&self, id: &str) -> Option<&Clinic> {
        self.clinics.iter().find(|c| c.id == id)
    }

    /// Clinics whose address matches `location` and whose name matches `query`.
    pub fn search_clinics(&self, location: Option<&str>, query: Option<&str>) -> Vec<&Clinic> {
        self.clinics
            .iter()
            .filter(|c| {
                location.is_none_or(|loc| {
                    matches(&c.address, loc) || matches(&c.district, loc) || matches(&c.city, loc)
                })
            })
            .filter(|c| query.is_none_or(|q| matches(&c.name, q)))
            .collect()
    }

    pub fn search_services(&self, service: Option<&str>, clinic: Option<&str>) -> Vec<&Service> {
        self.services
            .iter()
            .filter(|s| service.is_none_or(|q| matches(&s.name, q)))
            .filter(|s| {
                clinic.is_none_or(|q| self.clinic(&s.clinic_id).is_some_and(|c| matches(&c.name, q)))
            })
            .collect()
    }

    pub fn search_doctors(&self, name: Option<&str>, specialty: Option<&str>) -> Vec<&Doctor> {
        self.doctors
            .iter()
            .filter(|d| name.is_none_or(|q| matches(&d.name, q)))
            .filter(|d| specialty.is_none_or(|q| matches(&d.specialty, q)))
            .collect()
    }

    /// Unbooked slots of a doctor on a date, in time order.
    pub fn free_slots(&self, doctor: &Doctor, date: NaiveDate) -> Vec<NaiveTime> {
        let weekday = date.weekday();
        let mut slots: Vec<NaiveTime> = doctor
            .working_hours
            .iter()
            .filter(|w| w.weekday == weekday)
            .filter_map(|w| Some((minutes_of(&w.start)?, minutes_of(&w.end)?)))
            .flat_map(|(start, end)| {
                (start..end)
                    .step_by(SLOT_MINUTES as usize)
                    .filter(move |m| m + SLOT_MINUTES <= end)
            })
            .filter_map(|m| NaiveTime::from_hms_opt(m / 60, m % 60, 0))
            .filter(|t| {
                !doctor
                    .booked
                    .iter()
                    .any(|b| b.date == date && minutes_of(&b.time) == Some(minutes_since_midnight(*t)))
            })
            .collect();
        slots.sort();
        slots.dedup();
        slots
    }

    /// Whether the doctor has working hours on that weekday at all.
    pub fn works_on(&self, doctor: &Doctor, date: NaiveDate) -> bool {
        doctor.working_hours.iter().any(|w| w.weekday == date.weekday())
    }
}

fn minutes_of(hhmm: &str) -> Option<u32> {
    NaiveTime::parse_from_str(hhmm.trim(), "%H:%M")
        .ok()
        .map(minutes_since_midnight)
}

fn minutes_since_midnight(t: NaiveTime) -> u32 {
    use chrono::Timelike;
    t.hour() * 60 + t.minute()
}

/// Accent- and case-insensitive containment.
pub fn matches(haystack: &str, needle: &str) -> bool {
    let needle = fold(needle);
    needle.is_empty() || fold(haystack).contains(needle.trim())
}

const ACCENT_GROUPS: &[(&str, char)] = &[
    ("àáạảãâầấậẩẫăằắặẳẵ", 'a'),
    ("èéẹẻẽêềếệểễ", 'e'),
    ("ìíịỉĩ", 'i'),
    ("òóọỏõôồốộổỗơờớợởỡ", 'o'),
    ("ùúụủũưừứựửữ", 'u'),
    ("ỳýỵỷỹ", 'y'),
    ("đ", 'd'),
];

/// Lowercase and strip Vietnamese diacritics: `"Cảnh"` → `"canh"`.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            ACCENT_GROUPS
                .iter()
                .find(|(group, _)| group.contains(c))
                .map_or(c, |(_, base)| *base)
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Failed to read directory file at {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid directory data: {0}")]
    Parse(String),
}
