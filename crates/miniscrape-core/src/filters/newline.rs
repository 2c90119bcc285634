use std::sync::LazyLock;

use regex::Regex;

use super::PageFilter;
use crate::error::AppError;

static NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").expect("valid regex"));

/// Collapses runs of newlines into one.
pub struct NewLineFilter;

impl PageFilter for NewLineFilter {
    fn is_enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "newline"
    }

    fn filter(&self, content: &str) -> Result<String, AppError> {
        Ok(NEWLINES.replace_all(content, "\n").into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_newline_runs() {
        let out = NewLineFilter.filter("a\n\n\nb\nc\n\n").unwrap();
        assert_eq!(out, "a\nb\nc\n");
    }

    #[test]
    fn leaves_single_newlines_alone() {
        assert_eq!(NewLineFilter.filter("a\nb").unwrap(), "a\nb");
    }
}
