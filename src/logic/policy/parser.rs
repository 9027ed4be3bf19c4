//! Whitelist Parser
//!
//! Line format:
//! ```text
//! # comment
//! game.exe              <- suppress, exact, process name
//! [cse] Netflix         <- exclusive, substring, command line
//! ```
//! Flags: `c` command line, `s` substring, `e` exclusive.

use std::fs;
use std::path::Path;

use super::types::{MatchField, MatchMode, PolicyRule, RuleError, RuleKind, RuleSet};

/// Parse a whole rule source. Any bad line rejects the source.
pub fn parse_rules(text: &str) -> Result<RuleSet, RuleError> {
    let mut rules = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        rules.push(parse_line(line, line_no)?);
    }

    Ok(RuleSet::new(rules))
}

/// Read and parse the rule file. A missing file means no rules.
pub fn load_rules(path: &Path) -> Result<RuleSet, RuleError> {
    if !path.exists() {
        log::debug!("No whitelist at {:?}", path);
        return Ok(RuleSet::empty());
    }

    let text = fs::read_to_string(path)?;
    parse_rules(&text)
}

fn parse_line(line: &str, line_no: usize) -> Result<PolicyRule, RuleError> {
    let mut field = MatchField::ProcessName;
    let mut mode = MatchMode::Exact;
    let mut kind = RuleKind::Suppress;

    let pattern = match line.strip_prefix('[') {
        Some(rest) => {
            let end = rest
                .find(']')
                .ok_or(RuleError::UnterminatedFlags { line: line_no })?;

            for flag in rest[..end].chars().filter(|c| !c.is_whitespace()) {
                match flag.to_ascii_lowercase() {
                    'c' => field = MatchField::CommandLine,
                    's' => mode = MatchMode::Substring,
                    'e' => kind = RuleKind::Exclusive,
                    _ => return Err(RuleError::UnknownFlag { line: line_no, flag }),
                }
            }

            &rest[end + 1..]
        }
        None => line,
    };

    PolicyRule::new(field, mode, kind, pattern, line_no)
}

// ============================================================================
// TESTS
// ============================================================================
