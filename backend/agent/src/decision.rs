//! Decision record parsing and the choice→directive table.
//!
//! The canonical decision text is four lowercase labelled lines, the same
//! shape the decide-phase grammar emits:
//!
//! ```text
//! mood: Curious
//! reflection: I want to know where this is heading.
//! choice: Ask
//! justification: A question would move things forward.
//! ```

use roundtable_core::{DecisionChoice, Mood, RoundtableError};
use serde::Serialize;
use tracing::warn;

/// Used when the decision record names no known choice.
pub const FALLBACK_CHOICE: DecisionChoice = DecisionChoice::Respond;

/// Fields pulled out of a decision record. Unmatched fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedDecision {
    pub choice: String,
    pub mood: String,
    pub reflection: String,
    pub justification: String,
}

impl ParsedDecision {
    pub fn is_empty(&self) -> bool {
        self.choice.is_empty()
            && self.mood.is_empty()
            && self.reflection.is_empty()
            && self.justification.is_empty()
    }

    /// The named choice, or [`RoundtableError::Parse`] when it is missing or unknown.
    pub fn choice(&self) -> Result<DecisionChoice, RoundtableError> {
        if self.choice.is_empty() {
            return Err(RoundtableError::Parse("decision names no choice".to_string()));
        }
        self.choice
            .parse()
            .map_err(|_| RoundtableError::Parse(format!("unknown choice '{}'", self.choice)))
    }

    pub fn mood(&self) -> Option<Mood> {
        self.mood.parse().ok()
    }
}

/// Parse a decision record line by line. Later duplicates of a label win.
pub fn parse_decision(text: &str) -> ParsedDecision {
    let mut parsed = ParsedDecision::default();
    for line in text.trim().lines() {
        let line = line.trim();
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match label {
            "choice" => parsed.choice = value,
            "mood" => parsed.mood = value,
            "reflection" => parsed.reflection = value,
            "justification" => parsed.justification = value,
            _ => {}
        }
    }
    parsed
}

/// The user prompt chosen for the respond phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    pub choice: DecisionChoice,
    pub text: &'static str,
    /// True when the record named no known choice and [`FALLBACK_CHOICE`] was used.
    pub fallback: bool,
}

/// Look up the directive for a parsed decision, falling back to
/// [`FALLBACK_CHOICE`] with a warning when the choice is missing or unknown.
pub fn resolve_directive(decision: &ParsedDecision) -> Directive {
    match decision.choice() {
        Ok(choice) => Directive {
            choice,
            text: choice.directive(),
            fallback: false,
        },
        Err(e) => {
            warn!(
                error = %e,
                fallback = %FALLBACK_CHOICE,
                "No directive for decision choice; using fallback"
            );
            Directive {
                choice: FALLBACK_CHOICE,
                text: FALLBACK_CHOICE.directive(),
                fallback: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_fields() {
        let parsed = parse_decision("choice: Ask\nmood: Curious\njustification: because reasons");
        assert_eq!(parsed.choice, "Ask");
        assert_eq!(parsed.mood, "Curious");
        assert_eq!(parsed.justification, "because reasons");
        assert_eq!(parsed.reflection, "");
        assert_eq!(parsed.choice().unwrap(), DecisionChoice::Ask);
        assert_eq!(parsed.mood(), Some(Mood::Curious));
    }

    #[test]
    fn non_matching_text_is_all_empty() {
        let parsed =
            parse_decision("Mood: Happy Reflection: fine. Decision: Ask Reason: it fits.");
        assert!(parsed.is_empty());
        assert!(parse_decision("[no summary available]").is_empty());
        assert!(parse_decision("").is_empty());
    }

    #[test]
    fn values_keep_inner_colons() {
        let parsed = parse_decision("reflection: time: it flies.");
        assert_eq!(parsed.reflection, "time: it flies.");
    }

    #[test]
    fn known_choice_maps_to_its_directive() {
        let parsed = parse_decision("choice: Silence");
        let directive = resolve_directive(&parsed);
        assert_eq!(directive.choice, DecisionChoice::Silence);
        assert_eq!(directive.text, "(Chose not to speak. Return '[silence]' or nothing.)");
        assert!(!directive.fallback);
    }

    #[test]
    fn unknown_or_missing_choice_is_a_parse_error() {
        let err = parse_decision("choice: Dance").choice().unwrap_err();
        assert!(matches!(err, RoundtableError::Parse(ref m) if m.contains("'Dance'")));
        assert!(matches!(
            ParsedDecision::default().choice(),
            Err(RoundtableError::Parse(_))
        ));
    }

    #[test]
    fn missing_choice_falls_back_to_respond() {
        let directive = resolve_directive(&ParsedDecision::default());
        assert_eq!(directive.choice, DecisionChoice::Respond);
        assert!(directive.fallback);

        let directive = resolve_directive(&parse_decision("choice: ask"));
        assert_eq!(directive.choice, DecisionChoice::Respond);
        assert!(directive.fallback);
    }
}
