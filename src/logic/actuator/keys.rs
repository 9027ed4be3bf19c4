//! Keyboard Transport
//!
//! Presses the toggle shortcut: every key down in order, then every key up
//! in the same order. Default shortcut is Alt+Shift+F10.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::logic::win32::{self, KeyEvent};

use super::types::ActuatorError;
use super::Transport;

// ============================================================================
// SCAN CODES
// ============================================================================

const SCANCODE_LALT: u16 = 0x38;
const SCANCODE_LSHIFT: u16 = 0x2A;
const SCANCODE_F10: u16 = 0x44;

/// Set-1 scan codes by key name
static KEY_CODES: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    let mut codes = HashMap::new();

    codes.insert("alt", SCANCODE_LALT);
    codes.insert("lalt", SCANCODE_LALT);
    codes.insert("shift", SCANCODE_LSHIFT);
    codes.insert("lshift", SCANCODE_LSHIFT);
    codes.insert("rshift", 0x36);
    codes.insert("ctrl", 0x1D);
    codes.insert("lctrl", 0x1D);
    codes.insert("esc", 0x01);
    codes.insert("tab", 0x0F);
    codes.insert("enter", 0x1C);
    codes.insert("space", 0x39);

    // F1..F10 are contiguous, F11/F12 are not
    for (i, name) in ["f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10"].iter().enumerate() {
        codes.insert(*name, 0x3B + i as u16);
    }
    codes.insert("f11", 0x57);
    codes.insert("f12", 0x58);

    let rows: [(&[&'static str], u16); 4] = [
        (&["1", "2", "3", "4", "5", "6", "7", "8", "9", "0"], 0x02),
        (&["q", "w", "e", "r", "t", "y", "u", "i", "o", "p"], 0x10),
        (&["a", "s", "d", "f", "g", "h", "j", "k", "l"], 0x1E),
        (&["z", "x", "c", "v", "b", "n", "m"], 0x2C),
    ];
    for (keys, first) in rows {
        for (i, key) in keys.iter().enumerate() {
            codes.insert(*key, first + i as u16);
        }
    }

    codes
});

fn scan_code(name: &str) -> Result<u16, ActuatorError> {
    let key = name.trim().to_ascii_lowercase();

    if let Some(hex) = key.strip_prefix("0x") {
        return u16::from_str_radix(hex, 16)
            .ok()
            .filter(|code| *code != 0)
            .ok_or_else(|| ActuatorError::InvalidKey { name: name.to_string() });
    }

    KEY_CODES
        .get(key.as_str())
        .copied()
        .ok_or_else(|| ActuatorError::InvalidKey { name: name.to_string() })
}

// ============================================================================
// SHORTCUT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    scan_codes: Vec<u16>,
}

impl Default for Shortcut {
    fn default() -> Self {
        Self {
            scan_codes: vec![SCANCODE_LALT, SCANCODE_LSHIFT, SCANCODE_F10],
        }
    }
}

impl Shortcut {
    /// Parse an ordered key list, e.g. `["alt", "shift", "f10"]`
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, ActuatorError> {
        if names.is_empty() {
            return Err(ActuatorError::InvalidKey { name: String::new() });
        }

        let scan_codes = names
            .iter()
            .map(|name| scan_code(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { scan_codes })
    }

    /// Configured shortcut, or the default plus a warning when it is unusable
    pub fn from_config(names: Option<&[String]>) -> (Self, Option<String>) {
        let Some(names) = names else {
            return (Self::default(), None);
        };

        match Self::parse(names) {
            Ok(shortcut) => (shortcut, None),
            Err(e) => {
                log::warn!("Invalid shortcut {:?}: {} - using Alt+Shift+F10", names, e);
                (
                    Self::default(),
                    Some(format!("Invalid shortcut {:?} ({}), using Alt+Shift+F10", names, e)),
                )
            }
        }
    }

    pub fn scan_codes(&self) -> &[u16] {
        &self.scan_codes
    }

    /// All presses, then all releases, same order
    pub fn events(&self) -> Vec<KeyEvent> {
        let presses = self.scan_codes.iter().map(|&scan_code| KeyEvent { scan_code, down: true });
        let releases = self.scan_codes.iter().map(|&scan_code| KeyEvent { scan_code, down: false });
        presses.chain(releases).collect()
    }
}

// ============================================================================
// KEY SENDER
// ============================================================================

/// Injects key events into the input stream
pub trait KeySender: Send {
    fn send(&mut self, events: &[KeyEvent]) -> Result<(), ActuatorError>;
}

/// `SendInput` on Windows
pub struct SystemKeySender;

impl KeySender for SystemKeySender {
    fn send(&mut self, events: &[KeyEvent]) -> Result<(), ActuatorError> {
        win32::send_keys(events).map_err(|message| ActuatorError::InputFailed { message })
    }
}

// ============================================================================
// TRANSPORT
// ============================================================================

pub struct KeyTransport {
    shortcut: Shortcut,
    sender: Box<dyn KeySender>,
}

impl KeyTransport {
    pub fn new(shortcut: Shortcut, sender: Box<dyn KeySender>) -> Self {
        Self { shortcut, sender }
    }
}

impl Transport for KeyTransport {
    fn name(&self) -> &'static str {
        "keyboard"
    }

    /// The shortcut flips the state; the desired value only matters for logging
    fn try_toggle(&mut self, _desired_on: bool) -> Result<(), ActuatorError> {
        self.sender.send(&self.shortcut.events())
    }
}

// ============================================================================
// TESTS
// ============================================================================
