//! Dynamic system instruction.
//!
//! Rebuilt for every agent call: the assistant persona, the current local
//! time, and a calendar of the surrounding days. With the calendar in the
//! prompt the model looks dates up instead of computing them.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc};
use medibook_config::OrchestrationConfig;
use medibook_core::calendar::{describe_date, format_date, weekday_name};
use medibook_core::provider::ToolDefinition;

/// Marker appended to today's calendar entry.
pub const TODAY_MARKER: &str = "Hôm nay";

pub struct ContextBuilder {
    assistant_name: String,
    utc_offset: FixedOffset,
    days_back: i64,
    days_forward: i64,
    tools: Vec<ToolDefinition>,
}

impl ContextBuilder {
    /// Vietnam time, two days back and twelve forward.
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
            utc_offset: offset_hours(7),
            days_back: 2,
            days_forward: 12,
            tools: Vec::new(),
        }
    }

    pub fn from_config(assistant_name: impl Into<String>, config: &OrchestrationConfig) -> Self {
        Self {
            utc_offset: offset_hours(config.utc_offset_hours),
            days_back: i64::from(config.calendar_days_back),
            days_forward: i64::from(config.calendar_days_forward),
            ..Self::new(assistant_name)
        }
    }

    /// Describe these tools in the instruction text.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Calendar lines from `days_back` before to `days_forward` after
    /// `today` (exclusive), e.g. `Thứ Hai (20/10/2025 - Hôm nay)`.
    pub fn calendar_window(&self, today: NaiveDate) -> Vec<String> {
        (-self.days_back..self.days_forward)
            .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
            .map(|day| {
                if day == today {
                    format!(
                        "{} ({} - {TODAY_MARKER})",
                        weekday_name(day.weekday()),
                        format_date(day)
                    )
                } else {
                    describe_date(day)
                }
            })
            .collect()
    }

    /// The system instruction for a call made at `now`.
    pub fn build(&self, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.utc_offset);
        let today = local.date_naive();

        let mut prompt = format!(
            "Bạn là {name}, trợ lý đặt lịch khám của hệ thống phòng khám. \
             Trả lời bằng tiếng Việt, ngắn gọn và lịch sự. \
             Chỉ dùng thông tin lấy từ công cụ tra cứu về phòng khám, dịch vụ, bác sĩ và lịch khám; \
             không tự bịa thông tin.\n\n\
             Thời gian hiện tại: {time}, {date} (UTC{offset}).\n\
             Lịch tham khảo (dùng để đổi \"hôm nay\", \"ngày mai\", \"thứ Hai tuần sau\"... \
             thành ngày cụ thể, không tự tính ngày):\n",
            name = self.assistant_name,
            time = local.format("%H:%M"),
            date = describe_date(today),
            offset = self.utc_offset,
        );
        for line in self.calendar_window(today) {
            prompt.push_str("- ");
            prompt.push_str(&line);
            prompt.push('\n');
        }
        prompt.push_str("Ngày truyền cho công cụ luôn theo định dạng dd/mm/yyyy.");

        if !self.tools.is_empty() {
            prompt.push_str("\n\nCông cụ có thể gọi:\n");
            for tool in &self.tools {
                prompt.push_str(&format!("- {}: {}\n", tool.name, tool.description));
            }
            prompt.push_str(
                "Để gọi công cụ, trả về JSON dạng {\"name\": \"<tên công cụ>\", \"parameters\": {...}}.",
            );
        }

        prompt
    }
}

fn offset_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}
