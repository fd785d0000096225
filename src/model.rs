use serde::{Deserialize, Serialize};

pub const PLAN_VERSION: u32 = 1;

/// A fully processed typing session: the text that will actually be typed,
/// its classification, and the pauses to fire along the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingPlan {
    pub version: u32,
    pub config: PlanConfig,
    pub text: String,
    pub spans: Vec<Span>,
    pub directives: Vec<Directive>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl TypingPlan {
    /// Number of characters that will be emitted.
    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    /// Per-character category lookup, indexed by stream position.
    pub fn categories(&self) -> Vec<Category> {
        let mut out = Vec::with_capacity(self.len_chars());
        for span in &self.spans {
            out.extend(std::iter::repeat(span.category).take(span.len));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    pub language: String,
    pub wpm_min: f64,
    pub wpm_max: f64,
    pub skip_leading_whitespace: bool,
    pub statement_pause_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Keyword,
    Boilerplate,
    Bracket,
    Punctuation,
    Plain,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Keyword,
        Category::Boilerplate,
        Category::Bracket,
        Category::Punctuation,
        Category::Plain,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Keyword => "keyword",
            Category::Boilerplate => "boilerplate",
            Category::Bracket => "bracket",
            Category::Punctuation => "punctuation",
            Category::Plain => "plain",
        }
    }
}

/// A classified run of the typed stream. `start` and `len` count characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub len: usize,
    pub category: Category,
    pub text: String,
}

/// A `{{PAUSE:X}}` marker, already removed from the stream.
///
/// `offset` is the character position in the typed stream at which the pause
/// fires, i.e. before the character at that position is typed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub offset: usize,
    pub secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Read-only view of a session for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub position: usize,
    pub total: usize,
    pub state: ControlState,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.position as f64) * 100.0 / (self.total as f64)
    }
}
