//! Policy Module
//!
//! Quyết định có cần sửa trạng thái feature hay không.
//!
//! ## Structure
//! - `types`: Rule types (PolicyRule, RuleSet, RuleError)
//! - `parser`: Whitelist file -> RuleSet
//! - `matcher`: RuleSet x process snapshot -> MatchStatus
//! - `engine`: Decision logic
//!
//! ## Usage
//! ```ignore
//! let rules = policy::load_rules(&path)?;
//! let status = policy::evaluate(&mut processes, &rules);
//! match policy::decide(is_on, rules.has_exclusive_rule(), status) {
//!     Decision::TurnOn | Decision::TurnOff => correct(),
//!     Decision::Suppressed | Decision::Satisfied => {}
//! }
//! ```

pub mod types;
pub mod parser;
pub mod matcher;
pub mod engine;

// Re-export main types for convenience
pub use types::{
    MatchField,
    MatchMode,
    RuleKind,
    PolicyRule,
    RuleSet,
    RuleError,
};

pub use parser::{parse_rules, load_rules};

pub use matcher::{matches, evaluate, MatchStatus};

pub use engine::{decide, Decision};
