//! Positional comma-delimited line encoding.

use crate::event::Event;
use crate::wire::escape::escape;

/// Field delimiter. Never appears unescaped inside a field.
pub const DELIMITER: char = ',';

/// Number of positional fields in a wire line.
pub const FIELD_COUNT: usize = 10;

/// Encode an event as a wire line: ten escaped fields joined by the
/// delimiter, newline terminated.
pub fn encode_line(event: &Event) -> String {
    let fields = [
        escape(&event.pk),
        escape(&event.state),
        escape(&event.timestamp.to_string()),
        escape(&event.thread_stamp),
        escape(event.kind.wire_name()),
        escape(&event.identity),
        escape(&event.callstack),
        escape(&event.param1),
        escape(&event.param2),
        escape(&event.param3),
    ];
    let mut out = fields.join(",");
    out.push('\n');
    out
}

/// Extract field `index` (0-based) from a wire line.
///
/// Scans linearly from the start of the line on every call; callers needing
/// several fields re-scan each time. Index 9 returns the remainder after the
/// ninth delimiter. Returns `None` when the line has too few delimiters.
/// Escaping is not reversed; use [`unescape`](crate::wire::unescape) if the
/// original payload text is needed.
pub fn field_at(line: &str, index: usize) -> Option<&str> {
    if index >= FIELD_COUNT {
        return None;
    }
    let line = line.trim_end_matches(['\r', '\n']);
    let mut start = 0;
    for _ in 0..index {
        start += line[start..].find(DELIMITER)? + 1;
    }
    if index == FIELD_COUNT - 1 {
        return Some(&line[start..]);
    }
    match line[start..].find(DELIMITER) {
        Some(end) => Some(&line[start..start + end]),
        None => Some(&line[start..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventKind};

    fn sample_event() -> Event {
        Event {
            pk: "-1".to_string(),
            state: "-1".to_string(),
            timestamp: 1616460579243,
            thread_stamp: "main-1".to_string(),
            kind: EventKind::Permission,
            identity: "8e024c669b8aa469-37e64854-175d95a6ab1-8000".to_string(),
            callstack: "DISABLED".to_string(),
            param1: "setContextClassLoader".to_string(),
            param2: String::new(),
            param3: String::new(),
        }
    }

    #[test]
    fn encodes_reference_line() {
        let line = encode_line(&sample_event());
        assert_eq!(
            line,
            "-1,-1,1616460579243,main-1,PERMISSION,\
             8e024c669b8aa469-37e64854-175d95a6ab1-8000,DISABLED,\
             setContextClassLoader,,\n"
        );
    }

    #[test]
    fn every_field_extracts_back() {
        let line = encode_line(&sample_event());
        let expected = [
            "-1",
            "-1",
            "1616460579243",
            "main-1",
            "PERMISSION",
            "8e024c669b8aa469-37e64854-175d95a6ab1-8000",
            "DISABLED",
            "setContextClassLoader",
            "",
            "",
        ];
        for (i, want) in expected.iter().enumerate() {
            assert_eq!(field_at(&line, i), Some(*want), "field {i}");
        }
    }

    #[test]
    fn last_field_is_remainder_after_ninth_delimiter() {
        // A raw delimiter after the ninth comma stays part of field 9.
        let line = "0,1,2,3,4,5,6,7,8,tail,with,commas";
        assert_eq!(field_at(line, 9), Some("tail,with,commas"));
    }

    #[test]
    fn payload_delimiters_do_not_shift_fields() {
        let mut event = sample_event();
        event.param1 = "a,b".to_string();
        event.param2 = "second".to_string();
        let line = encode_line(&event);
        assert_eq!(field_at(&line, 7), Some("a&#44;b"));
        assert_eq!(field_at(&line, 8), Some("second"));
    }

    #[test]
    fn short_line_yields_none() {
        assert_eq!(field_at("a,b,c", 5), None);
        assert_eq!(field_at("", 1), None);
    }

    #[test]
    fn out_of_range_index_yields_none() {
        let line = encode_line(&sample_event());
        assert_eq!(field_at(&line, 10), None);
    }
}
