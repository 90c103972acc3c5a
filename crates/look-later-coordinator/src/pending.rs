use look_later_core::LinkRecord;

/// The link waiting for the user to confirm "Store to Look Later".
///
/// Armed by a capture notification and consumed by the menu confirmation.
/// A second capture before confirmation replaces the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PendingCapture {
    #[default]
    Empty,
    Armed(LinkRecord),
}

impl PendingCapture {
    /// Arms with `record`, returning the capture it replaced, if any.
    pub fn arm(&mut self, record: LinkRecord) -> Option<LinkRecord> {
        match std::mem::replace(self, PendingCapture::Armed(record)) {
            PendingCapture::Armed(previous) => Some(previous),
            PendingCapture::Empty => None,
        }
    }

    /// Empties the slot and returns the armed record.
    pub fn take(&mut self) -> Option<LinkRecord> {
        match std::mem::take(self) {
            PendingCapture::Armed(record) => Some(record),
            PendingCapture::Empty => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, PendingCapture::Armed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: i64) -> LinkRecord {
        LinkRecord::new(timestamp, "https://a.example", "", "")
    }

    #[test]
    fn starts_empty() {
        assert_eq!(PendingCapture::default(), PendingCapture::Empty);
    }

    #[test]
    fn arm_overwrites() {
        let mut pending = PendingCapture::Empty;

        assert_eq!(pending.arm(record(1)), None);
        assert_eq!(pending.arm(record(2)), Some(record(1)));
        assert_eq!(pending, PendingCapture::Armed(record(2)));
    }

    #[test]
    fn take_empties() {
        let mut pending = PendingCapture::Armed(record(1));

        assert_eq!(pending.take(), Some(record(1)));
        assert_eq!(pending.take(), None);
        assert!(!pending.is_armed());
    }
}
