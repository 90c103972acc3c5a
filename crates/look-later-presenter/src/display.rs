use jiff::tz::TimeZone;
use jiff::Timestamp;
use look_later_core::StorageUsage;
use typed_builder::TypedBuilder;

pub const DEFAULT_URI_HEAD_CHARS: usize = 16;
pub const DEFAULT_URI_TAIL_CHARS: usize = 16;

const ELLIPSIS: char = '…';
const ONE_DAY_MS: i64 = 24 * 60 * 60 * 1000;
const ONE_WEEK_MS: i64 = 7 * ONE_DAY_MS;
const KILO: u64 = 1024;
const MEGA: u64 = 1024 * 1024;

const TIME_FORMAT: &str = "%-I:%M:%S %p";
const WEEK_FORMAT: &str = "%a %-I:%M:%S %p";
const FULL_FORMAT: &str = "%b %d, %Y, %-I:%M:%S %p";

/// How rows are rendered into text.
#[derive(Debug, Clone, TypedBuilder)]
pub struct DisplaySettings {
    /// Characters kept from the start of an abbreviated URI.
    #[builder(default = DEFAULT_URI_HEAD_CHARS)]
    pub uri_head_chars: usize,
    /// Characters kept from the end of an abbreviated URI.
    #[builder(default = DEFAULT_URI_TAIL_CHARS)]
    pub uri_tail_chars: usize,
    /// Zone capture times are shown in.
    #[builder(default = TimeZone::system())]
    pub time_zone: TimeZone,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Replaces the middle of a long URI with an ellipsis.
///
/// A URI of at least `head + tail` characters becomes its first `head`
/// characters, `…`, and its last `tail` characters. Shorter ones are
/// returned unchanged.
pub fn abbreviate_uri(uri: &str, head: usize, tail: usize) -> String {
    let len = uri.chars().count();
    if len < head + tail {
        return uri.to_string();
    }

    let mut preview: String = uri.chars().take(head).collect();
    preview.push(ELLIPSIS);
    preview.extend(uri.chars().skip(len - tail));
    preview
}

/// Formats a capture time relative to `now`.
///
/// Captures younger than a day show the time only, younger than a week add
/// the weekday, and older ones show the full date.
pub fn format_timestamp(timestamp_ms: i64, now: Timestamp, tz: &TimeZone) -> String {
    let Ok(captured) = Timestamp::from_millisecond(timestamp_ms) else {
        return timestamp_ms.to_string();
    };

    let age = now.as_millisecond() - timestamp_ms;
    let format = if age < ONE_DAY_MS {
        TIME_FORMAT
    } else if age < ONE_WEEK_MS {
        WEEK_FORMAT
    } else {
        FULL_FORMAT
    };

    captured.to_zoned(tz.clone()).strftime(format).to_string()
}

/// Scales a byte count to bytes, Kb or Mb.
pub fn scale_size(bytes: u64) -> String {
    if bytes < KILO {
        format!("{bytes} bytes")
    } else if bytes < MEGA {
        format!("{:.2} Kb", bytes as f64 / KILO as f64)
    } else {
        format!("{:.2} Mb", bytes as f64 / MEGA as f64)
    }
}

/// Storage usage line, e.g. `1.50 Kb (0.03%)`.
pub fn usage_report(usage: &StorageUsage) -> String {
    format!(
        "{} ({:.2}%)",
        scale_size(usage.bytes_in_use),
        usage.percent_used()
    )
}
