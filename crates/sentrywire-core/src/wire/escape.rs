//! Allow-list escaping for wire field payloads.
//!
//! Any character outside the safe set becomes a numeric character reference
//! `&#<codepoint>;`. The field delimiter is never in the safe set, so payload
//! text can never be confused with field structure.

/// Characters that pass through unescaped: ASCII letters, digits, space, and
/// `()=.@-_\`.
fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '(' | ')' | '=' | '.' | '@' | '-' | '_' | '\\')
}

/// Escape a field payload for the wire.
///
/// Pure and total: any input has a defined output, and an empty input encodes
/// to an empty string with no reference markers.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if is_safe(c) {
            out.push(c);
        } else {
            out.push_str("&#");
            out.push_str(&(c as u32).to_string());
            out.push(';');
        }
    }
    out
}

/// Reverse numeric character references produced by [`escape`].
///
/// Tolerant: text containing no references (or malformed ones) passes through
/// unchanged rather than erroring.
pub fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("&#") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        match tail.find(';') {
            Some(end) if tail[..end].chars().all(|c| c.is_ascii_digit()) && end > 0 => {
                let decoded = tail[..end]
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32);
                match decoded {
                    Some(c) => out.push(c),
                    // Out-of-range codepoint: keep the reference verbatim.
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &tail[end + 1..];
            }
            _ => {
                // No terminator or non-numeric body: not a reference.
                out.push_str("&#");
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_text_passes_through() {
        let s = "setContextClassLoader (rule=1) a-b_c.d@e\\f";
        assert_eq!(escape(s), s);
    }

    #[test]
    fn delimiter_is_always_escaped() {
        let escaped = escape("a,b,c");
        assert_eq!(escaped, "a&#44;b&#44;c");
        assert!(!escaped.contains(','));
    }

    #[test]
    fn empty_input_encodes_empty() {
        assert_eq!(escape(""), "");
        assert_eq!(unescape(""), "");
    }

    #[test]
    fn non_ascii_uses_codepoint_references() {
        assert_eq!(escape("café"), "caf&#233;");
        assert_eq!(escape("λ"), "&#955;");
    }

    #[test]
    fn unescape_reverses_escape() {
        for s in ["a,b", "tab\there", "quote\"inside", "mixed é λ , ;", "&#44;"] {
            assert_eq!(unescape(&escape(s)), s);
        }
    }

    #[test]
    fn escape_is_stable_on_escaped_form() {
        // escape(unescape(escape(s))) == escape(s) for payloads with
        // disallowed characters.
        for s in ["a,b", "x;y", "새로운"] {
            let once = escape(s);
            assert_eq!(escape(&unescape(&once)), once);
        }
    }

    #[test]
    fn malformed_references_pass_through() {
        assert_eq!(unescape("a&#b"), "a&#b");
        assert_eq!(unescape("a&#12"), "a&#12");
        assert_eq!(unescape("a&#;b"), "a&#;b");
    }

    #[test]
    fn out_of_range_reference_kept_verbatim() {
        assert_eq!(unescape("&#1114112;"), "&#1114112;");
    }
}
