use chrono::Weekday;
use regex::RegexBuilder;

use super::PageFilter;
use crate::error::AppError;
use crate::models::DayFilterConfig;

/// Built-in day labels, Monday first, tried in this order.
pub const BUILTIN_DAY_LABELS: [[&str; 7]; 3] = [
    [
        "Pondělí", "Úterý", "Středa", "Čtvrtek", "Pátek", "Sobota", "Neděle",
    ],
    [
        "Pondeli", "Utery", "Streda", "Ctvrtek", "Patek", "Sobota", "Nedele",
    ],
    [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ],
];

/// Keeps the text between today's and tomorrow's day label.
pub struct DayFilter {
    config: DayFilterConfig,
    weekday: Weekday,
}

impl DayFilter {
    pub fn new(config: DayFilterConfig, weekday: Weekday) -> Self {
        Self { config, weekday }
    }

    /// Indices of today and tomorrow in a Monday-first list (Sunday wraps to Monday).
    fn pivot(&self) -> (usize, usize) {
        let today = self.weekday.num_days_from_monday() as usize;
        (today, (today + 1) % 7)
    }

    /// Case-insensitive `[start, end)` lookup; `None` for a label that is not found.
    fn locate(
        content: &str,
        today: &str,
        tomorrow: &str,
    ) -> Result<(Option<usize>, Option<usize>), AppError> {
        let start = find_label(content, today, 0)?.map(|(_, end)| end);
        let end = find_label(content, tomorrow, start.unwrap_or(0))?.map(|(begin, _)| begin);
        Ok((start, end))
    }
}

fn find_label(content: &str, label: &str, from: usize) -> Result<Option<(usize, usize)>, AppError> {
    if label.trim().is_empty() {
        return Ok(None);
    }
    let re = RegexBuilder::new(&regex::escape(label))
        .case_insensitive(true)
        .build()
        .map_err(|e| AppError::FilterError {
            filter: "day",
            message: e.to_string(),
        })?;
    Ok(re.find_at(content, from).map(|m| (m.start(), m.end())))
}

impl PageFilter for DayFilter {
    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn name(&self) -> &'static str {
        "day"
    }

    fn filter(&self, content: &str) -> Result<String, AppError> {
        let (today, tomorrow) = self.pivot();
        let days = &self.config.days;

        if !days.is_empty() {
            if days.len() != 7 {
                return Err(AppError::FilterError {
                    filter: "day",
                    message: format!("expected 7 day labels, got {}", days.len()),
                });
            }
            let (start, end) = Self::locate(content, &days[today], &days[tomorrow])?;
            let start = start.unwrap_or(0);
            let end = end.unwrap_or(content.len());
            return Ok(content[start..end].to_string());
        }

        for labels in &BUILTIN_DAY_LABELS {
            if let (Some(start), Some(end)) = Self::locate(content, labels[today], labels[tomorrow])? {
                return Ok(content[start..end].to_string());
            }
        }

        tracing::debug!(weekday = %self.weekday, "No day labels found, keeping content");
        Ok(content.to_string())
    }
}
