use super::{PageFilter, find_boundaries};
use crate::error::AppError;
use crate::models::{CutFilterConfig, CutLineFilterConfig};

/// Keeps the slice between the `before` and `after` markers.
pub struct CutFilter {
    config: CutFilterConfig,
}

impl CutFilter {
    pub fn new(config: CutFilterConfig) -> Self {
        Self { config }
    }
}

impl PageFilter for CutFilter {
    fn is_enabled(&self) -> bool {
        !self.config.before.is_empty() || !self.config.after.is_empty()
    }

    fn name(&self) -> &'static str {
        "cut"
    }

    fn filter(&self, content: &str) -> Result<String, AppError> {
        let (start, end) = find_boundaries(content, &self.config.before, &self.config.after);
        Ok(content[start..end].to_string())
    }
}

/// Drops or truncates individual lines.
pub struct CutLineFilter {
    config: CutLineFilterConfig,
}

impl CutLineFilter {
    pub fn new(config: CutLineFilterConfig) -> Self {
        Self { config }
    }

    fn process_line<'a>(&self, line: &'a str) -> Option<&'a str> {
        let cfg = &self.config;
        if !cfg.contains.is_empty() && line.contains(&cfg.contains) {
            return None;
        }
        if !cfg.starts_with.is_empty() && line.starts_with(&cfg.starts_with) {
            return None;
        }

        let line = if cfg.cut_after.is_empty() {
            line
        } else {
            let (start, end) = find_boundaries(line, "", &cfg.cut_after);
            &line[start..end]
        };

        if cfg.min_len > 0 && line.chars().count() < cfg.min_len {
            return None;
        }

        (!line.is_empty()).then_some(line)
    }
}

impl PageFilter for CutLineFilter {
    fn is_enabled(&self) -> bool {
        let cfg = &self.config;
        !cfg.contains.is_empty()
            || !cfg.starts_with.is_empty()
            || !cfg.cut_after.is_empty()
            || cfg.min_len > 0
    }

    fn name(&self) -> &'static str {
        "cut_line"
    }

    fn filter(&self, content: &str) -> Result<String, AppError> {
        Ok(content
            .split('\n')
            .filter_map(|line| self.process_line(line))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
