use serde::{Deserialize, Serialize};

pub const DEFAULT_FONT: &str = "sans-serif";
pub const DEFAULT_SIZE: u32 = 75;

/// Popup typography, stored independently of the links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub font: String,
    /// Font size as a percentage.
    pub size: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            font: DEFAULT_FONT.to_string(),
            size: DEFAULT_SIZE,
        }
    }
}

impl Preferences {
    /// The size as shown next to the options slider, e.g. `"75%"`.
    pub fn size_label(&self) -> String {
        format!("{}%", self.size)
    }
}
