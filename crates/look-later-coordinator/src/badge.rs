use parking_lot::Mutex;
use std::sync::Arc;

/// The extension icon's counter.
pub trait BadgeSurface: Send + Sync + 'static {
    /// Replaces the displayed text. An empty string hides the badge.
    fn show(&self, text: &str);
}

/// A badge held in memory; clones share the same text.
#[derive(Debug, Clone, Default)]
pub struct SharedBadge {
    text: Arc<Mutex<String>>,
}

impl SharedBadge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.text.lock().clone()
    }
}

impl BadgeSurface for SharedBadge {
    fn show(&self, text: &str) {
        *self.text.lock() = text.to_string();
    }
}
