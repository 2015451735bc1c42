use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Label grouping attachment points that follow the same connection rule.
///
/// An AP class is written `rule:subclass` (e.g. `amide:0`). The rule selects the bond type
/// used when the AP is bonded; the subclass distinguishes the two ends of asymmetric rules.
/// Rules may contain ASCII letters, digits, `+`, `-` and `.`; every other character is
/// reserved by the graph text encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApClass {
    rule: String,
    subclass: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseApClassError {
    #[error("AP class '{0}' is missing the ':' separator")]
    MissingSeparator(String),
    #[error("AP class '{0}' has an empty rule")]
    EmptyRule(String),
    #[error("AP class '{0}' has a rule with reserved characters")]
    InvalidRule(String),
    #[error("AP class '{0}' has a non-numeric subclass")]
    InvalidSubclass(String),
}

impl ApClass {
    pub fn new(rule: &str, subclass: u32) -> Result<Self, ParseApClassError> {
        if rule.is_empty() {
            return Err(ParseApClassError::EmptyRule(format!("{rule}:{subclass}")));
        }
        if !rule.chars().all(is_rule_char) {
            return Err(ParseApClassError::InvalidRule(format!("{rule}:{subclass}")));
        }
        Ok(Self {
            rule: rule.to_string(),
            subclass,
        })
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn subclass(&self) -> u32 {
        self.subclass
    }
}

fn is_rule_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')
}

impl FromStr for ApClass {
    type Err = ParseApClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (rule, subclass) = trimmed
            .split_once(':')
            .ok_or_else(|| ParseApClassError::MissingSeparator(trimmed.to_string()))?;
        let subclass = subclass
            .parse::<u32>()
            .map_err(|_| ParseApClassError::InvalidSubclass(trimmed.to_string()))?;
        if rule.is_empty() {
            return Err(ParseApClassError::EmptyRule(trimmed.to_string()));
        }
        if !rule.chars().all(is_rule_char) {
            return Err(ParseApClassError::InvalidRule(trimmed.to_string()));
        }
        Ok(Self {
            rule: rule.to_string(),
            subclass,
        })
    }
}

impl fmt::Display for ApClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.rule, self.subclass)
    }
}
