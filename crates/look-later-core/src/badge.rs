/// Largest count shown verbatim on the badge.
pub const BADGE_MAX: i64 = 999;

/// Formats a link count for the extension icon badge.
///
/// Counts above 999 display as `"999+"`; zero or negative counts clear the
/// badge.
pub fn badge_text(count: i64) -> String {
    if count > BADGE_MAX {
        format!("{BADGE_MAX}+")
    } else if count <= 0 {
        String::new()
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_for_zero_or_negative() {
        assert_eq!(badge_text(0), "");
        assert_eq!(badge_text(-3), "");
    }

    #[test]
    fn verbatim_up_to_limit() {
        assert_eq!(badge_text(1), "1");
        assert_eq!(badge_text(42), "42");
        assert_eq!(badge_text(999), "999");
    }

    #[test]
    fn capped_above_limit() {
        assert_eq!(badge_text(1000), "999+");
        assert_eq!(badge_text(123_456), "999+");
    }
}
