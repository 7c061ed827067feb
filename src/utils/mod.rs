/// Cuts `text` to at most `max_chars` characters, appending `...` when anything was dropped.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_marker() {
        assert_eq!(truncate_with_marker("", 5), "");
        assert_eq!(truncate_with_marker("short", 5), "short");
        assert_eq!(truncate_with_marker("longer text", 6), "longer...");
        // multi-byte characters must not be split
        assert_eq!(truncate_with_marker("ñañañaña", 3), "ñañ...");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(33.33333), 33.33);
        assert_eq!(round2(66.666), 66.67);
        assert_eq!(round2(100.0), 100.0);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(212), "3:32");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3725), "1:02:05");
    }
}
