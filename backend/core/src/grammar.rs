//! Typed output grammars for constrained generation.
//!
//! Each grammar carries the GBNF text sent to llama-server and a validator for
//! the text that comes back. Generated text is checked, never assumed to conform:
//! the token budget can cut sampling short and some providers ignore `grammar`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{DecisionChoice, Mood};

const SUMMARY_PREFIX: &str = "Overall Summary:";
const SUMMARY_MIN: usize = 10;
const SUMMARY_MAX: usize = 5000;

/// `'-.` is a range, so `( ) * +` are admitted along with `' , - .`.
const SUMMARY_CLASS: &str = "[a-zA-Z ,'-.]";

static SUMMARY_BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{SUMMARY_CLASS}*$")).expect("valid summary regex")
});

static DECISION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^mood: (?P<mood>[A-Za-z]+)\n",
        r"reflection: [a-zA-Z ,'-]{10,300}\.\n",
        r"choice: (?P<choice>[A-Za-z]+)\n",
        r"justification: [a-zA-Z ,'-]{10,300}\.$",
    ))
    .expect("valid decision regex")
});

/// Which phase output a grammar constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarKind {
    Summary,
    Decision,
}

/// A GBNF grammar plus the validator for text generated under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputGrammar {
    kind: GrammarKind,
    gbnf: String,
}

/// Returned text that does not conform to the grammar it was generated under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarViolation {
    pub kind: GrammarKind,
    pub reason: String,
}

impl fmt::Display for GrammarViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} grammar violated: {}", self.kind, self.reason)
    }
}

impl std::error::Error for GrammarViolation {}

impl OutputGrammar {
    /// `"Overall Summary:"` followed by 10–5000 characters of plain prose.
    pub fn summary() -> Self {
        let gbnf = format!(
            "root ::= \"{SUMMARY_PREFIX}\" summary\nsummary ::= {SUMMARY_CLASS}{{{SUMMARY_MIN},{SUMMARY_MAX}}}\n"
        );
        Self { kind: GrammarKind::Summary, gbnf }
    }

    /// Four labelled lines: mood, reflection, choice, justification.
    pub fn decision() -> Self {
        let moods = alternatives(Mood::ALL.iter().map(Mood::as_str));
        let choices = alternatives(DecisionChoice::ALL.iter().map(DecisionChoice::as_str));
        let gbnf = format!(
            concat!(
                "root ::= \"mood: \" mood \"\\n\" \"reflection: \" reflection \"\\n\" ",
                "\"choice: \" choice \"\\n\" \"justification: \" reason\n",
                "mood ::= {moods}\n",
                "reflection ::= [a-zA-Z ,'-]{{10,300}} \".\"\n",
                "choice ::= {choices}\n",
                "reason ::= [a-zA-Z ,'-]{{10,300}} \".\"\n",
            ),
            moods = moods,
            choices = choices,
        );
        Self { kind: GrammarKind::Decision, gbnf }
    }

    pub fn kind(&self) -> GrammarKind {
        self.kind
    }

    pub fn gbnf(&self) -> &str {
        &self.gbnf
    }

    /// Check generated (already trimmed) text against this grammar.
    pub fn validate(&self, text: &str) -> Result<(), GrammarViolation> {
        match self.kind {
            GrammarKind::Summary => validate_summary(text),
            GrammarKind::Decision => validate_decision(text),
        }
        .map_err(|reason| GrammarViolation { kind: self.kind, reason })
    }
}

fn alternatives<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn validate_summary(text: &str) -> Result<(), String> {
    let body = text
        .strip_prefix(SUMMARY_PREFIX)
        .ok_or_else(|| format!("missing '{SUMMARY_PREFIX}' prefix"))?;
    let len = body.chars().count();
    if !(SUMMARY_MIN..=SUMMARY_MAX).contains(&len) {
        return Err(format!("summary length {len} outside {SUMMARY_MIN}..={SUMMARY_MAX}"));
    }
    if !SUMMARY_BODY_RE.is_match(body) {
        return Err("summary contains characters outside the allowed class".to_string());
    }
    Ok(())
}

fn validate_decision(text: &str) -> Result<(), String> {
    let caps = DECISION_RE
        .captures(text)
        .ok_or_else(|| "text is not four labelled decision lines".to_string())?;
    caps["mood"].parse::<Mood>()?;
    caps["choice"].parse::<DecisionChoice>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_accepts_plain_prose() {
        let g = OutputGrammar::summary();
        assert!(g.validate("Overall Summary: Two agents debate the tides.").is_ok());
    }

    #[test]
    fn summary_rejects_missing_prefix_and_short_body() {
        let g = OutputGrammar::summary();
        assert!(g.validate("Two agents debate the tides.").is_err());
        assert!(g.validate("Overall Summary: hi").is_err());
        assert!(g.validate("Overall Summary: numbers 123 are not allowed").is_err());
    }

    #[test]
    fn summary_class_is_the_quote_to_dot_range() {
        let g = OutputGrammar::summary();
        assert!(g.gbnf().contains("summary ::= [a-zA-Z ,'-.]{10,5000}"));
        assert!(g.validate("Overall Summary: Ada (the host) asks, Bob + Cy reply.").is_ok());
        assert!(g.validate("Overall Summary: they argue * loudly * now").is_ok());
        assert!(g.validate("Overall Summary: a question? not allowed here").is_err());
        assert!(g.validate("Overall Summary: slashes / are not allowed").is_err());
    }

    #[test]
    fn decision_accepts_canonical_lines() {
        let text = "mood: Curious\n\
                    reflection: I want to know where this is heading.\n\
                    choice: Ask\n\
                    justification: A question would move things forward.";
        assert!(OutputGrammar::decision().validate(text).is_ok());
    }

    #[test]
    fn decision_rejects_unknown_choice() {
        let text = "mood: Curious\n\
                    reflection: I want to know where this is heading.\n\
                    choice: Shout\n\
                    justification: A question would move things forward.";
        let err = OutputGrammar::decision().validate(text).unwrap_err();
        assert_eq!(err.kind, GrammarKind::Decision);
        assert!(err.reason.contains("Shout"));
    }

    #[test]
    fn decision_gbnf_lists_every_choice() {
        let g = OutputGrammar::decision();
        for choice in DecisionChoice::ALL {
            assert!(g.gbnf().contains(&format!("\"{choice}\"")));
        }
        assert!(g.gbnf().contains("\"choice: \""));
    }
}
