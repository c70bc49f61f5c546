//! Operating modes and their tone/verbosity hints.
//!
//! The mode set is closed: a mode is selected at session start, changed only
//! by the `mode:` command, and there is always exactly one active mode.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    General,
    Tutor,
    Focus,
    Health,
    Mood,
}

/// Tone and verbosity hints handed to the generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeHints {
    pub tone: &'static str,
    pub verbosity: &'static str,
}

impl Mode {
    /// All modes, in presentation order.
    pub const ALL: [Mode; 5] = [
        Mode::General,
        Mode::Tutor,
        Mode::Focus,
        Mode::Health,
        Mode::Mood,
    ];

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::General => "general",
            Mode::Tutor => "tutor",
            Mode::Focus => "focus",
            Mode::Health => "health",
            Mode::Mood => "mood",
        }
    }

    /// The fixed hint pair for this mode.
    pub fn hints(self) -> ModeHints {
        match self {
            Mode::General => ModeHints {
                tone: "neutral",
                verbosity: "balanced",
            },
            Mode::Tutor => ModeHints {
                tone: "patient and educational",
                verbosity: "detailed",
            },
            Mode::Focus => ModeHints {
                tone: "direct and concise",
                verbosity: "brief",
            },
            Mode::Health => ModeHints {
                tone: "careful and non-diagnostic",
                verbosity: "balanced",
            },
            Mode::Mood => ModeHints {
                tone: "supportive and warm",
                verbosity: "balanced",
            },
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a mode name, case-insensitively and ignoring surrounding whitespace.
/// Returns `None` for names outside the closed set.
pub fn parse_mode(value: &str) -> Option<Mode> {
    let lowered = value.trim().to_lowercase();
    Mode::ALL.into_iter().find(|m| m.as_str() == lowered)
}
