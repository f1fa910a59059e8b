//! Work status shared by phases, subphases and phase tasks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status vocabulary of the work breakdown.
///
/// Stored values are `Todo`, `Progress`, `Review` and `Completed`; the
/// long forms (`Not Started`, `In Progress`) are accepted on input. Anything
/// else is kept verbatim and contributes no progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkStatus {
    Todo,
    Progress,
    Review,
    Completed,
    Other(String),
}

impl WorkStatus {
    /// Parse a stored or user-typed status, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace('_', " ").as_str() {
            "todo" | "to do" | "not started" => Self::Todo,
            "progress" | "in progress" => Self::Progress,
            "review" | "in review" => Self::Review,
            "completed" | "complete" | "done" => Self::Completed,
            _ => Self::Other(s.trim().to_string()),
        }
    }

    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Todo => "Todo",
            Self::Progress => "Progress",
            Self::Review => "Review",
            Self::Completed => "Completed",
            Self::Other(s) => s,
        }
    }

    /// Percentage credited for this status when no finer-grained data exists.
    #[must_use]
    pub const fn progress_weight(&self) -> f64 {
        match self {
            Self::Todo | Self::Other(_) => 0.0,
            Self::Progress => 50.0,
            Self::Review => 90.0,
            Self::Completed => 100.0,
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for WorkStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<WorkStatus> for String {
    fn from(s: WorkStatus) -> Self {
        s.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_and_short_forms() {
        assert_eq!(WorkStatus::parse("Todo"), WorkStatus::Todo);
        assert_eq!(WorkStatus::parse("Not Started"), WorkStatus::Todo);
        assert_eq!(WorkStatus::parse("in_progress"), WorkStatus::Progress);
        assert_eq!(WorkStatus::parse("PROGRESS"), WorkStatus::Progress);
        assert_eq!(WorkStatus::parse("Review"), WorkStatus::Review);
        assert_eq!(WorkStatus::parse("done"), WorkStatus::Completed);
        assert_eq!(
            WorkStatus::parse("Blocked"),
            WorkStatus::Other("Blocked".to_string())
        );
    }

    #[test]
    fn test_progress_weights() {
        assert!((WorkStatus::Todo.progress_weight() - 0.0).abs() < f64::EPSILON);
        assert!((WorkStatus::Progress.progress_weight() - 50.0).abs() < f64::EPSILON);
        assert!((WorkStatus::Review.progress_weight() - 90.0).abs() < f64::EPSILON);
        assert!((WorkStatus::Completed.progress_weight() - 100.0).abs() < f64::EPSILON);
        assert!((WorkStatus::Other("x".into()).progress_weight() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&WorkStatus::Progress).unwrap();
        assert_eq!(json, "\"Progress\"");
        let back: WorkStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(back, WorkStatus::Progress);
    }
}
