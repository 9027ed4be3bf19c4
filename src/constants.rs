//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Environment variables override the file paths and the tick interval.

use std::path::PathBuf;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "ReplayGuard";

/// Default polling interval (seconds)
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 10;

/// Consecutive "needs correction" ticks that count as a fight with another controller
pub const DEFAULT_CONFLICT_THRESHOLD: u32 = 3;

/// Smallest usable conflict threshold (the back-off re-probe sets `streak = threshold - 2`)
pub const MIN_CONFLICT_THRESHOLD: u32 = 2;

/// Cool-down after a conflict is declared (seconds)
pub const DEFAULT_BACKOFF_SECS: u64 = 300;

/// Longest accepted tick interval (seconds, one day)
pub const MAX_TICK_INTERVAL_SECS: u64 = 86_400;

/// Longest accepted back-off (seconds, one week)
pub const MAX_BACKOFF_SECS: u64 = 7 * 86_400;

/// Longest timed pause from the console (minutes, one week)
pub const MAX_PAUSE_MINUTES: u64 = 7 * 24 * 60;

/// Registry key holding the capture settings (under HKEY_CURRENT_USER)
pub const DEFAULT_REGISTRY_KEY: &str = r"SOFTWARE\NVIDIA Corporation\Global\ShadowPlay\NVSPCAPS";

/// Registry value flagging instant replay as enabled
pub const DEFAULT_REGISTRY_VALUE: &str = "{1B1D3DAA-601D-49E5-8508-81736CA28C6D}";

/// Registry value holding the capture temp directory
pub const DEFAULT_TEMP_PATH_VALUE: &str = "TempFilePath";

/// Sub-directory of the temp directory where replay buffers live
pub const TEMP_FILES_SUBDIR: &str = "9343b833-e7af-42ea-8a61-31bc41eefe2b";

/// Named file mapping publishing the control endpoint
pub const DEFAULT_ENDPOINT_MAPPING: &str = "{8BA1E16C-FC54-4595-9782-E370A5FBE8DA}";

/// Control endpoint route for instant replay
pub const DEFAULT_ENDPOINT_PATH: &str = "/ShadowPlay/v.1.0/InstantReplay/Enable";

/// Header carrying the endpoint secret
pub const SECURITY_COOKIE_HEADER: &str = "X_LOCAL_SECURITY_COOKIE";

/// HTTP request timeout (milliseconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3_000;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Application data directory (`%LOCALAPPDATA%\ReplayGuard` on Windows)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get config file path from environment or use default
pub fn get_config_path() -> PathBuf {
    std::env::var("REPLAY_GUARD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| get_data_dir().join("config.json"))
}

/// Get whitelist path from environment or use default
pub fn get_whitelist_path() -> PathBuf {
    std::env::var("REPLAY_GUARD_WHITELIST")
        .map(PathBuf::from)
        .unwrap_or_else(|_| get_data_dir().join("whitelist.txt"))
}

/// Get tick interval override from environment
pub fn get_tick_interval_override() -> Option<u64> {
    std::env::var("REPLAY_GUARD_TICK_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs| *secs > 0)
}
