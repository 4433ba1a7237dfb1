//! Recently picked colors.
//!
//! Entries are canonical `#RRGGBB` strings, newest first. The list never
//! holds duplicates and never grows past `max`; when full, the oldest
//! entries are evicted.

use serde::{Deserialize, Serialize};

use crate::color::normalize_hex;

pub const DEFAULT_HISTORY_MAX: usize = 20;

/// What to do when a color that is already in the history is picked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicatePolicy {
    /// Move the existing entry to index 0.
    #[default]
    MoveToFront,
    /// Leave the existing entry where it is.
    KeepPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorHistory {
    pub max: usize,
    pub recent: Vec<String>,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

impl Default for ColorHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_MAX, DuplicatePolicy::default())
    }
}

impl ColorHistory {
    pub fn new(max: usize, on_duplicate: DuplicatePolicy) -> Self {
        Self {
            max,
            recent: Vec::new(),
            on_duplicate,
        }
    }

    /// Record a pick. Malformed hex is ignored. Returns the canonical form
    /// that was recorded.
    pub fn push(&mut self, hex: &str) -> Option<String> {
        let hex = normalize_hex(hex)?;

        match self.recent.iter().position(|c| *c == hex) {
            Some(pos) => {
                if self.on_duplicate == DuplicatePolicy::MoveToFront && pos > 0 {
                    let entry = self.recent.remove(pos);
                    self.recent.insert(0, entry);
                }
            }
            None => self.recent.insert(0, hex.clone()),
        }

        self.recent.truncate(self.max);
        Some(hex)
    }

    /// Remove one color. No-op if absent.
    pub fn remove(&mut self, hex: &str) {
        if let Some(hex) = normalize_hex(hex) {
            self.recent.retain(|c| *c != hex);
        }
    }

    /// Change the cap, evicting the oldest entries beyond it.
    pub fn set_max(&mut self, max: usize) {
        self.max = max;
        self.recent.truncate(max);
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }

    pub fn contains(&self, hex: &str) -> bool {
        normalize_hex(hex).is_some_and(|hex| self.recent.contains(&hex))
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}
