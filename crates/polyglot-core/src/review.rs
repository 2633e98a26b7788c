//! Parsing of free-text review replies.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)line\s*(\d+)").expect("line regex should be valid"));

static KIND_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(error|warning|suggestion)").expect("issue kind regex should be valid")
});

/// What a review finding reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Error,
    Warning,
    #[default]
    Suggestion,
}

/// How urgent a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl IssueKind {
    pub const fn severity(self) -> Severity {
        match self {
            Self::Error => Severity::High,
            Self::Warning => Severity::Medium,
            Self::Suggestion => Severity::Low,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Suggestion => "suggestion",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// One finding from a review reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    /// First `line <n>` mentioned, if any.
    pub line: Option<u32>,
    /// The whole reply line.
    pub message: String,
    pub severity: Severity,
}

impl Issue {
    /// Classifies one line of a review reply.
    pub fn from_line(line: &str) -> Self {
        let kind = KIND_REGEX
            .captures(line)
            .map_or(IssueKind::Suggestion, |caps| match caps[1].to_lowercase().as_str() {
                "error" => IssueKind::Error,
                "warning" => IssueKind::Warning,
                _ => IssueKind::Suggestion,
            });
        let line_number = LINE_REGEX.captures(line).and_then(|caps| caps[1].parse().ok());

        Self { kind, line: line_number, message: line.to_string(), severity: kind.severity() }
    }
}

/// Non-empty lines of `text`, trimmed.
pub fn review_lines(text: &str) -> Vec<String> {
    text.lines().map(str::trim).filter(|line| !line.is_empty()).map(str::to_string).collect()
}

/// One [`Issue`] per non-empty line of `text`.
pub fn parse_issues(text: &str) -> Vec<Issue> {
    review_lines(text).iter().map(|line| Issue::from_line(line)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_lines() {
        let lines = review_lines("  first issue \n\n\t\nsecond issue\r\n");
        assert_eq!(lines, vec!["first issue", "second issue"]);
        assert!(review_lines("").is_empty());
    }

    #[test]
    fn test_error_with_line() {
        let issue = Issue::from_line("Error at line 3: variable not defined");
        assert_eq!(issue.kind, IssueKind::Error);
        assert_eq!(issue.line, Some(3));
        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.message, "Error at line 3: variable not defined");
    }

    #[test]
    fn test_warning_case_insensitive() {
        let issue = Issue::from_line("WARNING: unused import on LINE12");
        assert_eq!(issue.kind, IssueKind::Warning);
        assert_eq!(issue.line, Some(12));
        assert_eq!(issue.severity, Severity::Medium);
    }

    #[test]
    fn test_defaults_to_suggestion() {
        let issue = Issue::from_line("Consider using a HashMap here");
        assert_eq!(issue.kind, IssueKind::Suggestion);
        assert_eq!(issue.line, None);
        assert_eq!(issue.severity, Severity::Low);
    }

    #[test]
    fn test_first_keyword_wins() {
        let issue = Issue::from_line("Suggestion: this error handling on line 4 is redundant");
        assert_eq!(issue.kind, IssueKind::Suggestion);
        assert_eq!(issue.line, Some(4));
    }

    #[test]
    fn test_parse_issues_skips_blank_lines() {
        let issues = parse_issues("Error on line 1\n\nWarning on line 2\nNice code");
        assert_eq!(issues.len(), 3);
        let kinds: Vec<IssueKind> = issues.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![IssueKind::Error, IssueKind::Warning, IssueKind::Suggestion]);
    }

    #[test]
    fn test_issue_serializes_type_key() {
        let json = serde_json::to_value(Issue::from_line("error line 7")).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["line"], 7);
        assert_eq!(json["severity"], "high");
    }
}
