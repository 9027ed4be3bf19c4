//! Console Commands - API cho người dùng
//!
//! One command per line on stdin: `pause [minutes]`, `resume`, `reload`,
//! `status`, `help`, `quit`.

use std::time::Duration;

use crate::constants::MAX_PAUSE_MINUTES;
use crate::logic::control::LoopControl;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Disable corrections, indefinitely or for N minutes
    Pause(Option<u64>),
    Resume,
    /// Re-read config and whitelist
    Reload,
    Status,
    Help,
    Quit,
}

/// What the shell should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

pub const HELP: &str = "\
Commands:
  pause [minutes]  stop correcting (for N minutes, or until resume)
  resume           start correcting again
  reload           re-read config.json and the whitelist
  status           show loop state as JSON
  quit             stop and exit";

impl Command {
    /// Parse one input line. Blank lines are `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "pause" | "disable" => match words.next() {
                None => Command::Pause(None),
                Some(arg) => match arg.parse::<u64>() {
                    Ok(minutes) if minutes > MAX_PAUSE_MINUTES => {
                        return Err(format!(
                            "pause: {} minutes is too long (max {}), use 'pause' without a number",
                            minutes, MAX_PAUSE_MINUTES
                        ))
                    }
                    Ok(minutes) if minutes > 0 => Command::Pause(Some(minutes)),
                    _ => return Err(format!("pause: '{}' is not a positive number of minutes", arg)),
                },
            },
            "resume" | "enable" => Command::Resume,
            "reload" | "refresh" => Command::Reload,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("Unknown command '{}' (try 'help')", other)),
        };

        if let Some(extra) = words.next() {
            return Err(format!("{}: unexpected argument '{}'", verb, extra));
        }
        Ok(Some(command))
    }
}

// ============================================================================
// EXECUTION
// ============================================================================

pub fn execute(command: Command, control: &LoopControl) -> Reply {
    match command {
        Command::Pause(None) => {
            control.set_disabled(true);
            log::info!("Corrections paused");
            Reply::Text("Paused until 'resume'".to_string())
        }
        Command::Pause(Some(minutes)) => match minutes.checked_mul(60) {
            Some(secs) => {
                control.disable_for(Duration::from_secs(secs));
                log::info!("Corrections paused for {} min", minutes);
                Reply::Text(format!("Paused for {} minute(s)", minutes))
            }
            None => {
                control.set_disabled(true);
                Reply::Text("Pause too long, paused until 'resume'".to_string())
            }
        },
        Command::Resume => {
            control.set_disabled(false);
            log::info!("Corrections resumed");
            Reply::Text("Resumed".to_string())
        }
        Command::Reload => {
            control.request_refresh();
            Reply::Text("Reload scheduled for the next tick".to_string())
        }
        Command::Status => match serde_json::to_string_pretty(&control.status()) {
            Ok(json) => Reply::Text(json),
            Err(e) => Reply::Text(format!("Cannot render status: {}", e)),
        },
        Command::Help => Reply::Text(HELP.to_string()),
        Command::Quit => Reply::Quit,
    }
}

// ============================================================================
// TESTS
// ============================================================================
