//! Policy Engine
//!
//! CHỈ chứa logic quyết định - không có types definitions.
//! Input: feature state + rule flags + match status
//! Output: Decision

use super::matcher::MatchStatus;

/// What the loop should do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A suppress rule matched; hands off
    Suppressed,
    /// Feature is already where policy wants it
    Satisfied,
    /// Feature is off and should be on
    TurnOn,
    /// Feature is on but no exclusive process runs
    TurnOff,
}

impl Decision {
    /// Desired feature state after toggling, if a correction is warranted
    pub fn desired_state(&self) -> Option<bool> {
        match self {
            Decision::TurnOn => Some(true),
            Decision::TurnOff => Some(false),
            Decision::Suppressed | Decision::Satisfied => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Suppressed => "suppressed",
            Decision::Satisfied => "satisfied",
            Decision::TurnOn => "turn_on",
            Decision::TurnOff => "turn_off",
        }
    }
}

/// Suppress wins over everything, exclusive logic included
pub fn decide(is_on: bool, has_exclusive_rule: bool, status: MatchStatus) -> Decision {
    if status.suppress_matched {
        return Decision::Suppressed;
    }

    let needs_on = !is_on && (!has_exclusive_rule || status.exclusive_matched);
    let needs_off = is_on && has_exclusive_rule && !status.exclusive_matched;

    if needs_on {
        Decision::TurnOn
    } else if needs_off {
        Decision::TurnOff
    } else {
        Decision::Satisfied
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn status(suppress: bool, exclusive: bool) -> MatchStatus {
        MatchStatus {
            suppress_matched: suppress,
            exclusive_matched: exclusive,
        }
    }

    #[test]
    fn test_plain_keep_on() {
        assert_eq!(decide(false, false, status(false, false)), Decision::TurnOn);
        assert_eq!(decide(true, false, status(false, false)), Decision::Satisfied);
    }

    #[test]
    fn test_exclusive_rules() {
        assert_eq!(decide(false, true, status(false, true)), Decision::TurnOn);
        assert_eq!(decide(false, true, status(false, false)), Decision::Satisfied);
        assert_eq!(decide(true, true, status(false, false)), Decision::TurnOff);
        assert_eq!(decide(true, true, status(false, true)), Decision::Satisfied);
    }

    #[test]
    fn test_suppress_wins() {
        for is_on in [false, true] {
            for has_exclusive in [false, true] {
                assert_eq!(
                    decide(is_on, has_exclusive, status(true, true)),
                    Decision::Suppressed
                );
            }
        }
    }

    #[test]
    fn test_desired_state() {
        assert_eq!(Decision::TurnOn.desired_state(), Some(true));
        assert_eq!(Decision::TurnOff.desired_state(), Some(false));
        assert_eq!(Decision::Satisfied.desired_state(), None);
    }
}
