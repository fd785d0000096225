use crate::language::LanguageProfile;
use crate::model::{Category, Span};

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Clone)]
struct Pattern {
    chars: Vec<char>,
    /// Require a non-identifier character (or text edge) before the match.
    lead_boundary: bool,
    /// Require a non-identifier character (or text edge) after the match.
    trail_boundary: bool,
}

impl Pattern {
    fn new(text: &str, always_bounded: bool) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let first = chars.first().copied().map(is_identifier_char).unwrap_or(false);
        let last = chars.last().copied().map(is_identifier_char).unwrap_or(false);
        Self {
            lead_boundary: always_bounded || first,
            trail_boundary: always_bounded || last,
            chars,
        }
    }

    fn matches_at(&self, text: &[char], pos: usize) -> bool {
        let end = pos + self.chars.len();
        if end > text.len() || text[pos..end] != self.chars[..] {
            return false;
        }
        if self.lead_boundary && pos > 0 && is_identifier_char(text[pos - 1]) {
            return false;
        }
        if self.trail_boundary && end < text.len() && is_identifier_char(text[end]) {
            return false;
        }
        true
    }
}

/// Per-profile lookup table: patterns grouped by tier, longest first.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    boilerplate: Vec<Pattern>,
    keywords: Vec<Pattern>,
    brackets: Vec<char>,
    punctuation: Vec<char>,
}

fn compile_tier(patterns: &[&str], always_bounded: bool) -> Vec<Pattern> {
    let mut out: Vec<Pattern> = patterns
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| Pattern::new(p, always_bounded))
        .collect();
    // Stable sort keeps profile order as the tie-break between equal lengths.
    out.sort_by(|a, b| b.chars.len().cmp(&a.chars.len()));
    out
}

impl PatternClassifier {
    pub fn new(profile: &LanguageProfile) -> Self {
        Self {
            boilerplate: compile_tier(profile.boilerplate, false),
            keywords: compile_tier(profile.keywords, true),
            brackets: profile.brackets.to_vec(),
            punctuation: profile.punctuation.to_vec(),
        }
    }

    /// Length of the highest-precedence match at `pos`, if any.
    fn match_at(&self, text: &[char], pos: usize) -> Option<(Category, usize)> {
        if let Some(p) = self.boilerplate.iter().find(|p| p.matches_at(text, pos)) {
            return Some((Category::Boilerplate, p.chars.len()));
        }
        if let Some(p) = self.keywords.iter().find(|p| p.matches_at(text, pos)) {
            return Some((Category::Keyword, p.chars.len()));
        }
        let c = text[pos];
        if self.brackets.contains(&c) {
            return Some((Category::Bracket, 1));
        }
        if self.punctuation.contains(&c) {
            return Some((Category::Punctuation, 1));
        }
        None
    }

    /// Split `text` into contiguous spans. Concatenating the span texts in
    /// order yields `text` again.
    pub fn classify(&self, text: &str) -> Vec<Span> {
        let chars: Vec<char> = text.chars().collect();
        let mut spans = Vec::new();
        let mut plain_start: Option<usize> = None;
        let mut pos = 0usize;

        let flush_plain = |spans: &mut Vec<Span>, start: Option<usize>, end: usize| {
            if let Some(start) = start {
                spans.push(Span {
                    start,
                    len: end - start,
                    category: Category::Plain,
                    text: chars[start..end].iter().collect(),
                });
            }
        };

        while pos < chars.len() {
            match self.match_at(&chars, pos) {
                Some((category, len)) => {
                    flush_plain(&mut spans, plain_start.take(), pos);
                    spans.push(Span {
                        start: pos,
                        len,
                        category,
                        text: chars[pos..pos + len].iter().collect(),
                    });
                    pos += len;
                }
                None => {
                    plain_start.get_or_insert(pos);
                    pos += 1;
                }
            }
        }
        flush_plain(&mut spans, plain_start.take(), pos);

        spans
    }
}
