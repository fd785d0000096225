use crate::model::Directive;

fn is_indent(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Remove the leading run of spaces and tabs from every line, for targets that
/// auto-indent on Enter.
///
/// Directive offsets are rewritten against the filtered text: every removed
/// character before a directive shifts it left by one.
pub fn strip_leading_whitespace(text: &str, directives: &mut [Directive]) -> String {
    let mut out = String::with_capacity(text.len());
    // kept_before[i] = number of kept characters before input position i.
    let mut kept_before = Vec::with_capacity(text.len() + 1);
    let mut kept = 0usize;
    let mut at_line_start = true;

    for c in text.chars() {
        kept_before.push(kept);

        if at_line_start && is_indent(c) {
            continue;
        }

        at_line_start = c == '\n';
        out.push(c);
        kept += 1;
    }
    kept_before.push(kept);

    for directive in directives.iter_mut() {
        let idx = directive.offset.min(kept_before.len() - 1);
        directive.offset = kept_before[idx];
    }

    out
}

/// Apply the filter only when enabled, leaving text and offsets untouched otherwise.
pub fn apply(text: String, directives: &mut [Directive], enabled: bool) -> String {
    if enabled {
        strip_leading_whitespace(&text, directives)
    } else {
        text
    }
}
