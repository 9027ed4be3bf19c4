//! Console Shell
//!
//! Foreground side of the app: reads commands from stdin, relays warnings
//! from the fixer thread, and shuts everything down on quit, Ctrl+C or a
//! fatal error.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::logic::control::LoopControl;
use crate::logic::watch::ConfigWatcher;

use super::commands::{self, Command, Reply};

/// How often the mailbox is checked
const MAILBOX_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    Interrupted,
    Fatal(String),
}

impl ExitReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitReason::Quit | ExitReason::Interrupted => 0,
            ExitReason::Fatal(_) => 1,
        }
    }
}

/// Log pending warnings; return a fatal message if one arrived
fn drain_mailbox(control: &LoopControl) -> Option<String> {
    while let Some(warning) = control.take_warning() {
        log::warn!("{}", warning);
    }
    control.take_fatal()
}

async fn serve(control: &LoopControl, worker: &JoinHandle<()>, watcher: &mut ConfigWatcher) -> ExitReason {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut poll = tokio::time::interval(MAILBOX_POLL);

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match Command::parse(&line) {
                        Ok(Some(command)) => match commands::execute(command, control) {
                            Reply::Text(text) => println!("{}", text),
                            Reply::Quit => return ExitReason::Quit,
                        },
                        Ok(None) => {}
                        Err(e) => println!("{}", e),
                    },
                    Ok(None) => {
                        log::debug!("stdin closed, running without console commands");
                        stdin_open = false;
                    }
                    Err(e) => {
                        log::warn!("stdin read failed: {} - console commands disabled", e);
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                return ExitReason::Interrupted;
            }
            _ = poll.tick() => {
                if let Some(message) = drain_mailbox(control) {
                    return ExitReason::Fatal(message);
                }
                if let Some(path) = control.take_whitelist_path() {
                    watcher.update_whitelist(path);
                }
                if worker.is_finished() {
                    return ExitReason::Fatal("fixer thread exited unexpectedly".to_string());
                }
            }
        }
    }
}

/// Run until quit. Cancels and joins the worker before returning;
/// the file watcher stops when this returns.
pub fn run(control: Arc<LoopControl>, worker: JoinHandle<()>, mut watcher: ConfigWatcher) -> std::io::Result<ExitReason> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

    println!("{} v{} - type 'help' for commands", crate::constants::APP_NAME, crate::constants::APP_VERSION);
    let reason = runtime.block_on(serve(&control, &worker, &mut watcher));

    control.cancel();
    if worker.join().is_err() {
        log::error!("Fixer thread panicked");
    }
    // anything posted while stopping
    while let Some(warning) = control.take_warning() {
        log::warn!("{}", warning);
    }

    log::info!("Shutdown complete ({:?})", reason);
    Ok(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_mailbox() {
        let control = LoopControl::new();
        assert_eq!(drain_mailbox(&control), None);

        control.post_warning("whitelist error".to_string());
        control.report_fatal("boom".to_string());
        assert_eq!(drain_mailbox(&control).as_deref(), Some("boom"));
        assert!(control.take_warning().is_none());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitReason::Quit.exit_code(), 0);
        assert_eq!(ExitReason::Interrupted.exit_code(), 0);
        assert_eq!(ExitReason::Fatal("x".to_string()).exit_code(), 1);
    }
}
