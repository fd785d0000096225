use crate::model::{Category, TypingPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Typing,
    Pause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// Stream position at which the line should be shown (before that character is typed).
    pub position: usize,
    pub kind: TraceKind,
    pub line: String,
}

/// Precompute console trace lines so they can be printed *before* the
/// associated run of characters starts during playback.
///
/// Each source line becomes one `Typing "..."...` entry, annotated with the
/// fast patterns it contains; each pause directive becomes a `Pause Xs...` entry.
pub fn plan_console_trace(plan: &TypingPlan) -> Vec<TraceEvent> {
    let mut tracer = LineTracer::default();
    let mut directives = plan.directives.iter().peekable();

    for span in &plan.spans {
        for (i, c) in span.text.chars().enumerate() {
            let position = span.start + i;
            while let Some(d) = directives.next_if(|d| d.offset == position) {
                tracer.flush();
                tracer.events.push(pause_event(position, d.secs));
            }
            tracer.push(position, c);
        }
        if span.category != Category::Plain && span.category != Category::Punctuation {
            tracer.note(span.category, &span.text);
        }
    }

    tracer.flush();
    for d in directives {
        tracer.events.push(pause_event(d.offset, d.secs));
    }

    tracer.events
}

pub fn pause_line(secs: f64) -> String {
    format!("Pause {secs:.1}s...")
}

fn pause_event(position: usize, secs: f64) -> TraceEvent {
    TraceEvent {
        position,
        kind: TraceKind::Pause,
        line: pause_line(secs),
    }
}

#[derive(Debug, Default)]
struct LineTracer {
    start: Option<usize>,
    line: String,
    fast: Vec<String>,
    events: Vec<TraceEvent>,
}

impl LineTracer {
    fn push(&mut self, position: usize, c: char) {
        self.start.get_or_insert(position);
        self.line.push(c);
        if c == '\n' {
            self.flush();
        }
    }

    fn note(&mut self, category: Category, text: &str) {
        if category == Category::Bracket {
            return;
        }
        self.fast.push(format!("{} {text}", category.label()));
    }

    fn flush(&mut self) {
        let Some(start) = self.start.take() else {
            self.fast.clear();
            return;
        };
        let mut line = format!("Typing \"{}\"...", escape_for_log(&self.line));
        if !self.fast.is_empty() {
            line.push_str(&format!(" [{}]", self.fast.join(", ")));
        }
        self.events.push(TraceEvent {
            position: start,
            kind: TraceKind::Typing,
            line,
        });
        self.line.clear();
        self.fast.clear();
    }
}

pub fn escape_for_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
