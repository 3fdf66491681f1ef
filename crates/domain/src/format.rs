use chrono::{Duration, NaiveDateTime};

/// Length of the parent quote shown above a reply.
pub const EXCERPT_CHARS: usize = 25;

/// Renders a comment timestamp relative to `now`: `Today 14:05`,
/// `Yesterday 09:30`, or `05/01/24, 12:00` for anything older (or newer).
pub fn format_timestamp(ts: NaiveDateTime, now: NaiveDateTime) -> String {
    let day = ts.date();
    if day == now.date() {
        return format!("Today {}", ts.format("%H:%M"));
    }
    if Some(day) == now.date().checked_sub_signed(Duration::days(1)) {
        return format!("Yesterday {}", ts.format("%H:%M"));
    }
    ts.format("%m/%d/%y, %H:%M").to_string()
}

/// Cuts `text` to `max_chars` characters, marking the cut with `...`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
