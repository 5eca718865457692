//! Agent config validation: non-fatal checks reported as warnings.

use crate::schema::AgentConfig;

/// A single validation finding with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// Findings from one validation pass. Agent configs never hard-fail, so all
/// findings are warnings.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &AgentConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if matches!(&config.name, Some(n) if n.trim().is_empty()) {
        report.warn("name", "Blank name; the agent identifier is used instead");
    }
    for (i, goal) in config.goals.iter().enumerate() {
        if goal.trim().is_empty() {
            report.warn(format!("goals[{i}]"), "Blank goal is ignored");
        }
    }
    for (field, value) in [("tone", &config.tone), ("style", &config.style)] {
        if matches!(value, Some(v) if v.trim().is_empty()) {
            report.warn(field, format!("Blank {field}; the default is used instead"));
        }
    }

    report
}
