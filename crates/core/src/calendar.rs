//! Date helpers in the clinic's locale (Vietnamese weekday names, `dd/mm/yyyy`).

use chrono::{Datelike, NaiveDate, Weekday};

/// Display format for dates shown to users and to the agent.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Vietnamese name of a weekday.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Thứ Hai",
        Weekday::Tue => "Thứ Ba",
        Weekday::Wed => "Thứ Tư",
        Weekday::Thu => "Thứ Năm",
        Weekday::Fri => "Thứ Sáu",
        Weekday::Sat => "Thứ Bảy",
        Weekday::Sun => "Chủ Nhật",
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `Thứ Hai (20/10/2025)`
pub fn describe_date(date: NaiveDate) -> String {
    format!("{} ({})", weekday_name(date.weekday()), format_date(date))
}

/// Parse `dd/mm/yyyy`, falling back to ISO `yyyy-mm-dd`.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
        .ok()
}
