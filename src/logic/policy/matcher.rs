//! Process Matcher
//!
//! Existential checks: does any running process hit a suppress rule,
//! does any hit an exclusive rule.

use crate::logic::processes::{ProcessEntry, ProcessSource};

use super::types::{MatchField, RuleKind, RuleSet};

/// Result of matching one snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStatus {
    pub suppress_matched: bool,
    pub exclusive_matched: bool,
}

/// Match a snapshot against the rule set
pub fn matches(snapshot: &[ProcessEntry], rules: &RuleSet) -> MatchStatus {
    let mut status = MatchStatus::default();
    if rules.is_empty() {
        return status;
    }

    let want_exclusive = rules.has_exclusive_rule();

    for process in snapshot {
        for rule in rules.rules() {
            let value = match rule.field() {
                MatchField::ProcessName => process.name.as_deref(),
                MatchField::CommandLine => process.command_line.as_deref(),
            };

            if !rule.matches_value(value) {
                continue;
            }

            match rule.kind() {
                RuleKind::Suppress => status.suppress_matched = true,
                RuleKind::Exclusive => status.exclusive_matched = true,
            }
        }

        // Nothing left to learn once both flags that can be set are set
        if status.suppress_matched && (status.exclusive_matched || !want_exclusive) {
            break;
        }
    }

    status
}

/// Take a snapshot and match it. Enumeration failure never blocks the
/// feature: it only drops the gates for this tick.
pub fn evaluate(source: &mut dyn ProcessSource, rules: &RuleSet) -> MatchStatus {
    if rules.is_empty() {
        return MatchStatus::default();
    }

    match source.snapshot() {
        Ok(snapshot) => matches(&snapshot, rules),
        Err(e) => {
            log::warn!("Process snapshot failed, ignoring whitelist this tick: {}", e);
            MatchStatus::default()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::parser::parse_rules;
    use crate::logic::processes::{ProcessError, ProcessSnapshot};

    fn snapshot() -> Vec<ProcessEntry> {
        vec![
            ProcessEntry::new(Some("explorer.exe"), Some(r"C:\Windows\explorer.exe")),
            ProcessEntry::new(Some("game.exe"), None),
            ProcessEntry::new(None, Some("browser.exe --app=Netflix")),
        ]
    }

    struct FailingSource;

    impl ProcessSource for FailingSource {
        fn prepare(&mut self) -> Result<(), ProcessError> {
            Ok(())
        }
        fn snapshot(&mut self) -> Result<ProcessSnapshot, ProcessError> {
            Err(ProcessError::Other("access denied".to_string()))
        }
        fn release(&mut self) {}
    }

    #[test]
    fn test_empty_rules_never_match() {
        assert_eq!(matches(&snapshot(), &RuleSet::empty()), MatchStatus::default());
        assert_eq!(matches(&[], &RuleSet::empty()), MatchStatus::default());
    }

    #[test]
    fn test_exact_name_suppress() {
        let rules = parse_rules("game.exe").unwrap();
        let status = matches(&snapshot(), &rules);
        assert!(status.suppress_matched);
        assert!(!status.exclusive_matched);
    }

    #[test]
    fn test_exact_does_not_match_partial() {
        let rules = parse_rules("game").unwrap();
        assert!(!matches(&snapshot(), &rules).suppress_matched);
    }

    #[test]
    fn test_substring_command_line_exclusive() {
        let rules = parse_rules("[cse] Netflix").unwrap();
        let status = matches(&snapshot(), &rules);
        assert!(status.exclusive_matched);
        assert!(!status.suppress_matched);
    }

    #[test]
    fn test_absent_field_never_matches() {
        // game.exe has no command line, the third process has no name
        let rules = parse_rules("[cs] game\n[s] browser").unwrap();
        assert_eq!(matches(&snapshot(), &rules), MatchStatus::default());
    }

    #[test]
    fn test_both_kinds() {
        let rules = parse_rules("game.exe\n[cse] Netflix").unwrap();
        let status = matches(&snapshot(), &rules);
        assert!(status.suppress_matched);
        assert!(status.exclusive_matched);
    }

    #[test]
    fn test_idempotent() {
        let rules = parse_rules("game.exe\n[e] vlc.exe\n[cs] explorer").unwrap();
        let snap = snapshot();
        assert_eq!(matches(&snap, &rules), matches(&snap, &rules));
    }

    #[test]
    fn test_snapshot_failure_opens_gates() {
        let rules = parse_rules("game.exe\n[e] vlc.exe").unwrap();
        assert_eq!(evaluate(&mut FailingSource, &rules), MatchStatus::default());
    }
}
