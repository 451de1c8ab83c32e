//! Classification and counting of extracted result rows.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::extractor::ErrorRow;
use crate::payload::UNKNOWN_KEY;

/// `[Topic] category text: detail` or `[Topic] category text - detail`.
static CATEGORY_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\[[^\]]+\]\s*(.*?)(?::| - )"));

/// Positional view of a result row.
///
/// The list renders a leading selection column, then date, journal code,
/// type, entry, message and user.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RowFields<'a> {
    pub date: &'a str,
    pub code: &'a str,
    pub kind: &'a str,
    pub entry: &'a str,
    pub message: &'a str,
    pub user: &'a str,
}

impl<'a> RowFields<'a> {
    pub fn from_row(row: &'a [String]) -> Self {
        let field = |i: usize| row.get(i).map(String::as_str).unwrap_or_default();
        Self {
            date: field(1),
            code: field(2),
            kind: field(3),
            entry: field(4),
            message: field(5),
            user: field(6),
        }
    }
}

/// Category → count, plus the grand total.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSummary {
    pub categories: BTreeMap<String, usize>,
    pub total: usize,
}

impl ErrorSummary {
    pub fn count(&self, category: &str) -> usize {
        self.categories.get(category).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl fmt::Display for ErrorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut by_count: Vec<_> = self.categories.iter().collect();
        by_count.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (category, count) in by_count {
            writeln!(f, "{:>6}  {}", count, category)?;
        }
        write!(f, "{:>6}  total", self.total)
    }
}

/// Stateless row classifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorSummarizer;

impl ErrorSummarizer {
    /// Category of a row's message, or `"unknown"` when it has no `[Topic] text:` shape.
    pub fn classify(row: &[String]) -> String {
        Self::classify_message(RowFields::from_row(row).message)
    }

    pub fn classify_message(message: &str) -> String {
        let Ok(pattern) = CATEGORY_PATTERN.as_ref() else {
            return UNKNOWN_KEY.to_string();
        };
        pattern
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().split(':').next().unwrap_or_default().trim())
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_KEY.to_string())
    }

    pub fn summarize(rows: &[ErrorRow]) -> ErrorSummary {
        let mut summary = ErrorSummary::default();
        for row in rows {
            *summary.categories.entry(Self::classify(row)).or_insert(0) += 1;
            summary.total += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(message: &str) -> ErrorRow {
        ["", "2024-01-01", "J1", "X", "100", message, "u1"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn test_classify_colon() {
        assert_eq!(
            ErrorSummarizer::classify(&row("[GLTransactions] Period is closed: 2023-4")),
            "Period is closed"
        );
    }

    #[test]
    fn test_classify_dash() {
        assert_eq!(
            ErrorSummarizer::classify(&row("[GLTransactions] Entry already exists - 70/10023")),
            "Entry already exists"
        );
    }

    #[test]
    fn test_classify_first_delimiter_wins() {
        assert_eq!(
            ErrorSummarizer::classify_message("[Topic] Account - blocked: 400000"),
            "Account"
        );
    }

    #[test]
    fn test_classify_without_pattern_is_unknown() {
        assert_eq!(ErrorSummarizer::classify(&row("Created: 70-10023")), "unknown");
        assert_eq!(ErrorSummarizer::classify(&row("[GLTransactions] no delimiter")), "unknown");
        assert_eq!(ErrorSummarizer::classify(&[]), "unknown");
    }

    #[test]
    fn test_classify_empty_capture_is_its_own_category() {
        assert_eq!(ErrorSummarizer::classify(&row("[GLTransactions] : empty")), "");
    }

    #[test]
    fn test_row_fields() {
        let r = row("msg");
        let fields = RowFields::from_row(&r);
        assert_eq!(fields.date, "2024-01-01");
        assert_eq!(fields.entry, "100");
        assert_eq!(fields.message, "msg");
        assert_eq!(fields.user, "u1");
    }

    #[test]
    fn test_summarize() {
        let rows = vec![
            row("[GLTransactions] Period is closed: 2023-4"),
            row("[GLTransactions] Period is closed: 2023-5"),
            row("[GLTransactions] Unknown account: 999"),
            row("garbage"),
        ];
        let summary = ErrorSummarizer::summarize(&rows);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.count("Period is closed"), 2);
        assert_eq!(summary.count("Unknown account"), 1);
        assert_eq!(summary.count("unknown"), 1);
        assert_eq!(summary.categories.len(), 3);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = ErrorSummarizer::summarize(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary.to_string(), "     0  total");
    }

    #[test]
    fn test_display_orders_by_count() {
        let rows = vec![
            row("[T] B: x"),
            row("[T] A: x"),
            row("[T] B: y"),
        ];
        let text = ErrorSummarizer::summarize(&rows).to_string();
        assert_eq!(text, "     2  B\n     1  A\n     3  total");
    }
}
