//! Controller-facing state shared between the engine and its collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine/Controller state
///
/// The operational state a controller reports. The executor only reads it
/// to decide whether the machine is idle and to forward it to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControllerState {
    /// Not connected to any controller
    #[default]
    Disconnected,
    /// In the process of connecting to controller
    Connecting,
    /// Connected and idle, ready for commands
    Idle,
    /// Executing queued commands
    Run,
    /// Motion paused, awaiting resume
    Hold,
    /// Manual jog/movement mode
    Jog,
    /// Machine alarm state (requires manual intervention)
    Alarm,
    /// Check mode (dry-run without machine movement)
    Check,
    /// Safety door interlock triggered
    Door,
    /// Homing cycle in progress
    Home,
    /// Low-power sleep state
    Sleep,
}

impl ControllerState {
    /// Check if this state indicates the controller is connected
    pub fn is_connected(&self) -> bool {
        !matches!(
            self,
            ControllerState::Disconnected | ControllerState::Connecting
        )
    }

    /// Check if this state indicates an error condition
    pub fn is_error(&self) -> bool {
        matches!(self, ControllerState::Alarm | ControllerState::Door)
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Idle => "Idle",
            Self::Run => "Run",
            Self::Hold => "Hold",
            Self::Jog => "Jog",
            Self::Alarm => "Alarm",
            Self::Check => "Check",
            Self::Door => "Door",
            Self::Home => "Home",
            Self::Sleep => "Sleep",
        };
        f.write_str(name)
    }
}

/// Last-known modal state of the controller's command parser.
///
/// Unknown values are NaN. The executor reads this to avoid re-sending an
/// unchanged feed or power word and writes it back after every command so
/// it stays authoritative for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParserState {
    /// Programmed feed rate (F word)
    pub feed: f64,
    /// Spindle speed or laser power (S word)
    pub power: f64,
    /// Current Z
    pub z: f64,
    /// Current X
    pub x: f64,
    /// Current Y
    pub y: f64,
    /// Spindle/laser on (M3/M4 seen without a following M5)
    pub engraving_active: bool,
}

impl Default for ParserState {
    fn default() -> Self {
        Self::unknown()
    }
}

impl ParserState {
    /// State with every value unknown.
    pub fn unknown() -> Self {
        Self {
            feed: f64::NAN,
            power: f64::NAN,
            z: f64::NAN,
            x: f64::NAN,
            y: f64::NAN,
            engraving_active: false,
        }
    }

    /// Whether the Z position is known.
    pub fn z_known(&self) -> bool {
        self.z.is_finite()
    }

    /// Update the tracked words from one command line.
    ///
    /// Parenthesised comments and anything after `;` are ignored. Words that
    /// do not carry modal state are skipped.
    pub fn apply(&mut self, command: &str) {
        let code = strip_comments(command);
        for (letter, value) in words(&code) {
            match letter {
                'F' => self.feed = value,
                'S' => self.power = value,
                'X' => self.x = value,
                'Y' => self.y = value,
                'Z' => self.z = value,
                'M' => {
                    let m = value.round() as i64;
                    if m == 3 || m == 4 {
                        self.engraving_active = true;
                    } else if m == 5 || m == 2 || m == 30 {
                        self.engraving_active = false;
                    }
                }
                _ => {}
            }
        }
    }
}

/// Drop `(...)` comments and everything after a `;`.
pub fn strip_comments(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut depth = 0usize;
    for c in line.chars() {
        match c {
            ';' if depth == 0 => break,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Split a command line into letter/value words.
///
/// Words whose value does not parse are dropped.
pub fn words(code: &str) -> Vec<(char, f64)> {
    let mut result = Vec::new();
    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        if !c.is_ascii_alphabetic() {
            continue;
        }
        let mut number = String::new();
        while let Some(&n) = chars.peek() {
            if n.is_ascii_digit() || n == '.' || n == '-' || n == '+' || n == 'e' || n == 'E' {
                // 'e' only counts as an exponent when digits are already collected
                if (n == 'e' || n == 'E') && number.is_empty() {
                    break;
                }
                number.push(n);
                chars.next();
            } else if n == ' ' && number.is_empty() {
                chars.next();
            } else {
                break;
            }
        }
        if let Ok(v) = number.parse::<f64>() {
            result.push((c.to_ascii_uppercase(), v));
        }
    }
    result
}
