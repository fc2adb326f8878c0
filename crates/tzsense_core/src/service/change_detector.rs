//! Timezone novelty detection.

/// Remembers the last reported timezone id.
///
/// An empty last-known value means "unknown", so the first non-empty id is
/// always novel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeDetector {
    last_known: String,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new id when it differs case-insensitively from the last
    /// known one, updating the stored value. Returns `None` otherwise and
    /// leaves state untouched.
    pub fn check_and_update(&mut self, current_timezone_id: &str) -> Option<String> {
        if self.last_known.to_lowercase() == current_timezone_id.to_lowercase() {
            return None;
        }
        self.last_known = current_timezone_id.to_string();
        Some(self.last_known.clone())
    }

    pub fn last_known(&self) -> &str {
        &self.last_known
    }

    pub fn is_unknown(&self) -> bool {
        self.last_known.trim().is_empty()
    }
}
