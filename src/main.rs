//! Replay Guard - Main Entry Point
//!
//! Keeps instant replay on (or, with exclusive rules, on only while those
//! programs run) and backs off when something else keeps flipping it.

mod api;
mod logic;
pub mod constants;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use env_logger::Env;

use logic::config::FixerConfig;
use logic::control::LoopControl;
use logic::fixer::{self, ConfigReloader, Fixer, LoopSettings};
use logic::processes::SysinfoProcesses;
use logic::{probe, watch};

fn init_logging(log_file: Option<&Path>) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {} - logging to stderr", path.display(), e),
        }
    }

    builder.init();
}

fn main() {
    let config_path = constants::get_config_path();
    // Warnings resurface through the fixer's first reload
    let (config, _) = FixerConfig::load_or_default(&config_path);

    init_logging(config.log_file.as_deref());
    log::info!("Starting {} v{}", constants::APP_NAME, constants::APP_VERSION);
    log::info!("Config: {:?}", config_path);

    match FixerConfig::save_default_if_missing(&config_path) {
        Ok(true) => log::info!("Created default config, edit it and run 'reload'"),
        Ok(false) => {}
        Err(e) => log::warn!("Could not write default config: {}", e),
    }

    let control = Arc::new(LoopControl::new());

    let fixer = Fixer::new(
        LoopSettings::from_config(&config),
        probe::from_config(&config.probe),
        Box::new(SysinfoProcesses::new()),
        Box::new(ConfigReloader::new(config_path.clone())),
    );

    let worker = match fixer::spawn(fixer, control.clone()) {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("Failed to start fixer thread: {}", e);
            std::process::exit(1);
        }
    };

    let watcher = watch::ConfigWatcher::new(config_path, config.whitelist_path(), control.clone());

    let code = match api::run(control, worker, watcher) {
        Ok(reason) => {
            if let api::ExitReason::Fatal(message) = &reason {
                log::error!("Fatal: {}", message);
            }
            reason.exit_code()
        }
        Err(e) => {
            log::error!("Console failed: {}", e);
            1
        }
    };

    std::process::exit(code);
}
