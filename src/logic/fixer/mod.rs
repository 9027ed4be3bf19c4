//! Fixer - the control loop
//!
//! Một tick: refresh → disabled → back-off → probe → match → decide → act.
//! Runs on its own thread; the shell talks to it only through `LoopControl`.

pub mod conflict;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;

use crate::logic::actuator::CorrectiveActuator;
use crate::logic::config::FixerConfig;
use crate::logic::control::LoopControl;
use crate::logic::policy::{self, RuleError, RuleSet};
use crate::logic::probe::{self, FeatureProbe};
use crate::logic::processes::{ProcessError, ProcessSource};

use conflict::{ConflictState, Gate, Verdict};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// What one tick ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    Disabled,
    BackingOff,
    /// No exclusive rule and the feature is on
    AlreadyOn,
    Suppressed,
    Satisfied,
    Corrected { desired_on: bool },
    ConflictDeclared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub tick_interval: Duration,
    pub conflict_threshold: u32,
    pub backoff_ticks: u64,
}

impl LoopSettings {
    pub fn from_config(config: &FixerConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            conflict_threshold: config.conflict_threshold,
            backoff_ticks: config.backoff_ticks(),
        }
    }
}

/// Fresh rules and actuator after a (re)load
pub struct Reloaded {
    /// New timing, when the source carries it
    pub settings: Option<LoopSettings>,
    /// Replacement state reader; `None` keeps the current one
    pub probe: Option<Box<dyn FeatureProbe>>,
    /// Where the whitelist now lives, for the file watcher
    pub whitelist_path: Option<PathBuf>,
    pub rules: Result<RuleSet, RuleError>,
    pub actuator: CorrectiveActuator,
    pub warnings: Vec<String>,
}

/// Source of everything that is rebuilt on refresh
pub trait Reconfigure: Send {
    fn reload(&mut self) -> Reloaded;
}

/// Re-reads config.json and the whitelist from disk
pub struct ConfigReloader {
    config_path: PathBuf,
}

impl ConfigReloader {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }
}

impl Reconfigure for ConfigReloader {
    fn reload(&mut self) -> Reloaded {
        let (config, mut warnings) = FixerConfig::load_or_default(&self.config_path);

        let (actuator, actuator_warnings) = CorrectiveActuator::from_config(&config);
        warnings.extend(actuator_warnings);

        let whitelist_path = config.whitelist_path();
        Reloaded {
            settings: Some(LoopSettings::from_config(&config)),
            probe: Some(probe::from_config(&config.probe)),
            rules: policy::load_rules(&whitelist_path),
            whitelist_path: Some(whitelist_path),
            actuator,
            warnings,
        }
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Errors that stop the loop
#[derive(Debug)]
pub enum FixerError {
    ProcessEnumeration(ProcessError),
}

impl std::fmt::Display for FixerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixerError::ProcessEnumeration(e) => {
                write!(f, "Cannot enumerate processes for the whitelist: {}", e)
            }
        }
    }
}

impl std::error::Error for FixerError {}

impl From<ProcessError> for FixerError {
    fn from(e: ProcessError) -> Self {
        FixerError::ProcessEnumeration(e)
    }
}

// ============================================================================
// FIXER
// ============================================================================

pub struct Fixer {
    settings: LoopSettings,
    probe: Box<dyn FeatureProbe>,
    processes: Box<dyn ProcessSource>,
    reconfigure: Box<dyn Reconfigure>,
    rules: RuleSet,
    actuator: CorrectiveActuator,
    conflict: ConflictState,
    whitelist_path: Option<PathBuf>,
    tick: u64,
}

impl Fixer {
    pub fn new(
        settings: LoopSettings,
        probe: Box<dyn FeatureProbe>,
        processes: Box<dyn ProcessSource>,
        reconfigure: Box<dyn Reconfigure>,
    ) -> Self {
        Self {
            settings,
            probe,
            processes,
            reconfigure,
            rules: RuleSet::empty(),
            actuator: CorrectiveActuator::empty(),
            conflict: ConflictState::default(),
            whitelist_path: None,
            tick: 0,
        }
    }

    pub fn settings(&self) -> LoopSettings {
        self.settings
    }

    /// First load of rules and actuator
    pub fn initialize(&mut self, control: &LoopControl) -> Result<(), FixerError> {
        self.reload(control)
    }

    fn reload(&mut self, control: &LoopControl) -> Result<(), FixerError> {
        // Old derived state goes before the new one is built
        self.rules = RuleSet::empty();
        self.actuator = CorrectiveActuator::empty();

        let Reloaded { settings, probe, whitelist_path, rules, actuator, warnings } = self.reconfigure.reload();
        for warning in warnings {
            control.post_warning(warning);
        }

        if let Some(probe) = probe {
            log::info!("State check: {}", probe.name());
            self.probe = probe;
        }

        if let Some(path) = whitelist_path.filter(|p| self.whitelist_path.as_ref() != Some(p)) {
            log::debug!("Whitelist path: {:?}", path);
            control.announce_whitelist_path(path.clone());
            self.whitelist_path = Some(path);
        }

        if let Some(settings) = settings.filter(|s| *s != self.settings) {
            log::info!("Loop settings changed: {:?}", settings);
            self.settings = settings;
            self.conflict = ConflictState::default();
        }

        self.actuator = actuator;
        match rules {
            Ok(rules) => self.rules = rules,
            Err(e) => {
                log::warn!("Whitelist rejected: {}", e);
                control.post_warning(format!("Whitelist error: {} - running with no rules until fixed", e));
            }
        }

        let (suppress, exclusive) = self.rules.counts();
        log::info!(
            "Loaded {} whitelist / {} exclusive rules, transports {:?}",
            suppress,
            exclusive,
            self.actuator.transport_names()
        );

        // Process handles are only held while some rule needs them
        if self.rules.is_empty() {
            self.processes.release();
        } else {
            self.processes.prepare()?;
        }
        Ok(())
    }

    /// One pass of the loop. Errors are fatal.
    pub fn tick(&mut self, control: &LoopControl) -> Result<TickOutcome, FixerError> {
        self.tick += 1;

        // 1. Pending refresh
        if control.take_refresh() {
            log::info!("Refresh requested, reloading configuration");
            self.reload(control)?;
        }
        let threshold = self.settings.conflict_threshold;

        // 2. Disabled: forget any conflict
        if control.is_disabled() {
            self.conflict.reset();
            return Ok(TickOutcome::Disabled);
        }

        // 3. Back-off gate
        match self.conflict.gate(self.tick, threshold, self.settings.backoff_ticks) {
            Gate::Wait => return Ok(TickOutcome::BackingOff),
            Gate::Reprobe => log::info!("Back-off elapsed at tick {}, re-checking", self.tick),
            Gate::Proceed => {}
        }

        // 4. Probe
        let is_on = self.probe.is_on();
        let has_exclusive = self.rules.has_exclusive_rule();
        if !has_exclusive && is_on {
            self.conflict.reset();
            return Ok(TickOutcome::AlreadyOn);
        }

        // 5. Match + decide
        let status = policy::evaluate(self.processes.as_mut(), &self.rules);
        let decision = policy::decide(is_on, has_exclusive, status);
        log::debug!("Tick {}: on={} {:?} -> {}", self.tick, is_on, status, decision.as_str());

        let Some(desired_on) = decision.desired_state() else {
            self.conflict.reset();
            return Ok(match decision {
                policy::Decision::Suppressed => TickOutcome::Suppressed,
                _ => TickOutcome::Satisfied,
            });
        };

        // 6. Act, unless this is one correction too many
        match self.conflict.record_needed(self.tick, threshold) {
            Verdict::DeclareConflict => {
                log::warn!(
                    "Instant replay flipped back {} ticks in a row, backing off for {} ticks",
                    threshold,
                    self.settings.backoff_ticks
                );
                Ok(TickOutcome::ConflictDeclared)
            }
            Verdict::Correct => {
                self.actuator.toggle(desired_on);
                Ok(TickOutcome::Corrected { desired_on })
            }
        }
    }

    /// Loop until cancelled or a fatal error. Fatal errors go to the mailbox.
    pub fn run(mut self, control: &LoopControl) {
        log::info!(
            "Fixer loop started (tick {:?}, conflict after {}, back-off {} ticks)",
            self.settings.tick_interval,
            self.settings.conflict_threshold,
            self.settings.backoff_ticks
        );

        if let Err(e) = self.initialize(control) {
            log::error!("Fixer init failed: {}", e);
            control.report_fatal(e.to_string());
            return;
        }

        while !control.is_cancelled() {
            match self.tick(control) {
                Ok(outcome) => control.record_outcome(outcome),
                Err(e) => {
                    log::error!("Fixer stopped: {}", e);
                    control.report_fatal(e.to_string());
                    break;
                }
            }

            if !control.sleep(self.settings.tick_interval) {
                break;
            }
        }

        log::info!("Fixer loop stopped after {} ticks", self.tick);
    }
}

impl Drop for Fixer {
    fn drop(&mut self) {
        self.processes.release();
    }
}

/// Run the fixer on a named worker thread
pub fn spawn(fixer: Fixer, control: Arc<LoopControl>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("fixer".to_string())
        .spawn(move || fixer.run(&control))
}
