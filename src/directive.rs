//! `{{PAUSE:X}}` markers embedded in the text to type.
//!
//! Markers are removed from the stream and turned into [`Directive`]s at the
//! character offset where they appeared. Anything that starts like a marker but
//! does not parse is kept as literal text.

use crate::model::Directive;

pub const DIRECTIVE_PREFIX: &str = "{{PAUSE:";
pub const DIRECTIVE_SUFFIX: &str = "}}";
pub const MIN_PAUSE_SECS: f64 = 0.0;
pub const MAX_PAUSE_SECS: f64 = 60.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedText {
    pub text: String,
    pub directives: Vec<Directive>,
    pub warnings: Vec<String>,
}

/// Extract pause directives, returning the cleaned text and the directives in
/// firing order.
pub fn parse_directives(raw: &str) -> ParsedText {
    let mut out = ParsedText::default();
    let mut emitted_chars = 0usize;
    let mut rest = raw;

    while let Some(idx) = rest.find(DIRECTIVE_PREFIX) {
        let (before, candidate) = rest.split_at(idx);
        out.text.push_str(before);
        emitted_chars += before.chars().count();

        match match_directive(candidate) {
            Some((raw_secs, consumed)) => {
                let secs = clamp_pause(raw_secs);
                if secs != raw_secs {
                    let warning = format!(
                        "pause of {raw_secs}s at offset {emitted_chars} clamped to {secs}s"
                    );
                    log::warn!("{warning}");
                    out.warnings.push(warning);
                }
                out.directives.push(Directive {
                    offset: emitted_chars,
                    secs,
                });
                rest = &candidate[consumed..];
            }
            None => {
                let warning = format!(
                    "malformed pause directive at offset {emitted_chars}; typing it literally"
                );
                log::warn!("{warning}");
                out.warnings.push(warning);

                // Keep only the first brace so an overlapping marker can still match.
                out.text.push('{');
                emitted_chars += 1;
                rest = &candidate[1..];
            }
        }
    }

    out.text.push_str(rest);
    out
}

/// Match a marker at the start of `s`, returning the duration and its byte length.
fn match_directive(s: &str) -> Option<(f64, usize)> {
    let body = s.strip_prefix(DIRECTIVE_PREFIX)?;
    let bytes = body.as_bytes();
    let mut idx = 0usize;

    if bytes.first() == Some(&b'-') {
        idx += 1;
    }

    let int_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == int_start {
        return None;
    }

    if bytes.get(idx) == Some(&b'.') {
        let frac_start = idx + 1;
        let mut end = frac_start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end == frac_start {
            return None;
        }
        idx = end;
    }

    let number = &body[..idx];
    if !body[idx..].starts_with(DIRECTIVE_SUFFIX) {
        return None;
    }

    let secs: f64 = number.parse().ok()?;
    if !secs.is_finite() {
        return None;
    }

    Some((secs, DIRECTIVE_PREFIX.len() + idx + DIRECTIVE_SUFFIX.len()))
}

pub fn clamp_pause(secs: f64) -> f64 {
    secs.clamp(MIN_PAUSE_SECS, MAX_PAUSE_SECS)
}

pub fn has_pause_directives(raw: &str) -> bool {
    !parse_directives(raw).directives.is_empty()
}

/// Text as it will be typed, without any markers.
pub fn strip_directives(raw: &str) -> String {
    parse_directives(raw).text
}

pub fn total_pause_secs(directives: &[Directive]) -> f64 {
    directives.iter().map(|d| d.secs).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn removes_marker_and_records_offset() {
        let parsed = parse_directives("A{{PAUSE:2}}B");
        assert_eq!(parsed.text, "AB");
        assert_eq!(parsed.directives, vec![Directive { offset: 1, secs: 2.0 }]);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn later_offsets_account_for_removed_markers() {
        let parsed = parse_directives("{{PAUSE:1}}ab{{PAUSE:0.5}}{{PAUSE:3}}c\n{{PAUSE:4}}");
        assert_eq!(parsed.text, "abc\n");
        assert_eq!(
            parsed.directives,
            vec![
                Directive { offset: 0, secs: 1.0 },
                Directive { offset: 2, secs: 0.5 },
                Directive { offset: 2, secs: 3.0 },
                Directive { offset: 4, secs: 4.0 },
            ]
        );
    }

    #[test]
    fn durations_are_clamped() {
        let high = parse_directives("x{{PAUSE:120}}y");
        assert_eq!(high.directives[0].secs, 60.0);
        assert_eq!(high.warnings.len(), 1);

        let low = parse_directives("x{{PAUSE:-3}}y");
        assert_eq!(low.text, "xy");
        assert_eq!(low.directives[0].secs, 0.0);
    }

    #[test]
    fn malformed_markers_are_typed_literally() {
        for raw in [
            "a{{PAUSE:abc}}b",
            "a{{PAUSE:2}b",
            "a{{PAUSE:}}b",
            "a{{PAUSE:1.}}b",
            "a{{pause:1}}b",
        ] {
            let parsed = parse_directives(raw);
            assert_eq!(parsed.text, raw, "{raw}");
            assert!(parsed.directives.is_empty(), "{raw}");
        }
    }

    #[test]
    fn malformed_prefix_does_not_hide_following_marker() {
        let parsed = parse_directives("{{PAUSE:x{{PAUSE:1}}y");
        assert_eq!(parsed.text, "{{PAUSE:xy");
        assert_eq!(parsed.directives, vec![Directive { offset: 9, secs: 1.0 }]);
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let parsed = parse_directives("é{{PAUSE:1}}x");
        assert_eq!(parsed.directives[0].offset, 1);
    }

    #[test]
    fn helpers() {
        let raw = "a{{PAUSE:1.5}}b{{PAUSE:2}}";
        assert!(has_pause_directives(raw));
        assert!(!has_pause_directives("plain {{text}}"));
        assert_eq!(strip_directives(raw), "ab");
        assert_eq!(total_pause_secs(&parse_directives(raw).directives), 3.5);
    }
}
