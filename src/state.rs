//! Per-session mutable state.
//!
//! One `SessionState` is created per process and threaded through the router
//! and command interpreter by mutable reference. It is never a global, so
//! independent sessions stay possible and tests stay hermetic.

use std::collections::BTreeMap;

use crate::config::Settings;
use crate::modes::Mode;

/// Mutable per-session state: active mode, bounded history, capability flags.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// The active operating mode. Exactly one at all times.
    pub mode: Mode,
    /// Capability flags rendered by the `status` command.
    pub capabilities: BTreeMap<String, bool>,
    history: Vec<String>,
    max_history: usize,
}

impl SessionState {
    /// Create session state from settings, starting in general mode.
    pub fn new(settings: &Settings) -> Self {
        Self {
            mode: Mode::General,
            capabilities: settings.capabilities.clone(),
            history: Vec::new(),
            max_history: settings.max_short_term_memory,
        }
    }

    /// Append an entry to the history log, evicting the oldest entries when
    /// over capacity. Eviction trims from the front and never reorders.
    pub fn remember(&mut self, entry: String) {
        self.history.push(entry);
        let overflow = self.history.len().saturating_sub(self.max_history);
        if overflow > 0 {
            self.history.drain(..overflow);
        }
    }

    /// The full history, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// The most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[String] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}
