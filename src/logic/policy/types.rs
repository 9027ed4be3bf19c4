//! Policy Types
//!
//! Whitelist/exclusive rules and the rule set the loop evaluates.
//! KHÔNG chứa matching logic - chỉ data structures.

use serde::{Deserialize, Serialize};

// ============================================================================
// RULE ENUMS
// ============================================================================

/// Which process field a rule looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchField {
    ProcessName,
    CommandLine,
}

impl MatchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::ProcessName => "name",
            MatchField::CommandLine => "command_line",
        }
    }
}

/// How the pattern is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    /// Equality after trimming both sides
    Exact,
    /// Case-sensitive substring search
    Substring,
}

/// What a match means for the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    /// "Whitelist": no corrective action while a match runs
    Suppress,
    /// Keep the feature on only while a match runs
    Exclusive,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Suppress => "suppress",
            RuleKind::Exclusive => "exclusive",
        }
    }
}

// ============================================================================
// RULE ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// Pattern was blank after trimming
    EmptyPattern { line: usize },
    /// `[` without a closing `]`
    UnterminatedFlags { line: usize },
    /// Flag letter we don't know
    UnknownFlag { line: usize, flag: char },
    /// Rule file could not be read
    Io { message: String },
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleError::EmptyPattern { line } => write!(f, "Line {}: empty pattern", line),
            RuleError::UnterminatedFlags { line } => write!(f, "Line {}: missing ']' after flags", line),
            RuleError::UnknownFlag { line, flag } => write!(f, "Line {}: unknown flag '{}'", line, flag),
            RuleError::Io { message } => write!(f, "Cannot read rules: {}", message),
        }
    }
}

impl std::error::Error for RuleError {}

impl From<std::io::Error> for RuleError {
    fn from(err: std::io::Error) -> Self {
        RuleError::Io { message: err.to_string() }
    }
}

// ============================================================================
// POLICY RULE
// ============================================================================

/// One whitelist/exclusive entry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRule {
    field: MatchField,
    mode: MatchMode,
    kind: RuleKind,
    pattern: String,
}

impl PolicyRule {
    /// Build a rule; the pattern is trimmed and must not be empty.
    /// `line` is only used for the error.
    pub fn new(
        field: MatchField,
        mode: MatchMode,
        kind: RuleKind,
        pattern: &str,
        line: usize,
    ) -> Result<Self, RuleError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(RuleError::EmptyPattern { line });
        }

        Ok(Self {
            field,
            mode,
            kind,
            pattern: pattern.to_string(),
        })
    }

    pub fn field(&self) -> MatchField {
        self.field
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Compare against one (possibly absent) process field
    pub fn matches_value(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        let value = value.trim();

        match self.mode {
            MatchMode::Exact => value == self.pattern,
            MatchMode::Substring => value.contains(self.pattern.as_str()),
        }
    }
}

// ============================================================================
// RULE SET
// ============================================================================

/// Any-of collection of rules. Replaced wholesale on reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<PolicyRule>,
    has_exclusive_rule: bool,
}

impl RuleSet {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        let has_exclusive_rule = rules.iter().any(|r| r.kind == RuleKind::Exclusive);
        Self {
            rules,
            has_exclusive_rule,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_exclusive_rule(&self) -> bool {
        self.has_exclusive_rule
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// (suppress, exclusive) rule counts for logging
    pub fn counts(&self) -> (usize, usize) {
        let exclusive = self.rules.iter().filter(|r| r.kind == RuleKind::Exclusive).count();
        (self.rules.len() - exclusive, exclusive)
    }
}

// ============================================================================
// TESTS
// ============================================================================
