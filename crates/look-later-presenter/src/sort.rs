use look_later_core::LinkRecord;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// How the popup orders the link list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortMode {
    /// Oldest capture first.
    #[default]
    TimeForward,
    /// Newest capture first.
    TimeBackward,
    /// By link text, A to Z, ignoring case and accents.
    Alphabetical,
    /// By link text, Z to A.
    Omegapsical,
}

impl SortMode {
    pub const ALL: [SortMode; 4] = [
        SortMode::TimeForward,
        SortMode::TimeBackward,
        SortMode::Alphabetical,
        SortMode::Omegapsical,
    ];

    /// Control id of the sort button for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::TimeForward => "time_forward",
            SortMode::TimeBackward => "time_backward",
            SortMode::Alphabetical => "alphabetical",
            SortMode::Omegapsical => "omegapsical",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == name)
    }

    /// Total order over records for this mode.
    pub fn compare(&self, a: &LinkRecord, b: &LinkRecord) -> Ordering {
        match self {
            SortMode::TimeForward => a.timestamp.cmp(&b.timestamp),
            SortMode::TimeBackward => b.timestamp.cmp(&a.timestamp),
            SortMode::Alphabetical => compare_text(a, b),
            SortMode::Omegapsical => compare_text(b, a),
        }
    }
}

impl Display for SortMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case- and accent-folded form of `text` used for ordering.
fn collation_key(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn compare_text(a: &LinkRecord, b: &LinkRecord) -> Ordering {
    collation_key(&a.text)
        .cmp(&collation_key(&b.text))
        .then_with(|| a.text.cmp(&b.text))
        .then_with(|| a.timestamp.cmp(&b.timestamp))
}

/// Orders `records` in place.
pub fn sort_links(records: &mut [LinkRecord], mode: SortMode) {
    records.sort_by(|a, b| mode.compare(a, b));
}
