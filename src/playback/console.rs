use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::controller::{KeyEmitter, Renderer, SessionEvent, POLL_TICK};
use crate::model::Progress;
use crate::trace::{pause_line, TraceEvent, TraceKind};

const RESET: &str = "\x1b[0m";
const BLUE: &str = "\x1b[34m";
const YELLOW: &str = "\x1b[33m";

/// Color the leading "Typing"/"Pause" word of a trace line for a terminal.
pub fn paint_trace_line(line: &str) -> String {
    if let Some(rest) = line.strip_prefix("Typing") {
        format!("{BLUE}Typing{RESET}{rest}")
    } else if let Some(rest) = line.strip_prefix("Pause") {
        format!("{YELLOW}Pause{RESET}{rest}")
    } else {
        line.to_string()
    }
}

/// Sleep until `duration` has passed or `stop` is raised, whichever comes first.
/// Returns false if interrupted.
pub fn sleep_unless_stopped(stop: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(POLL_TICK));
    }
}

/// Print a "<what> in Ns..." countdown, one line per second.
/// Returns false if `stop` was raised before it finished.
pub fn countdown(stop: &AtomicBool, secs: u64, what: &str) -> bool {
    if secs == 0 {
        return !stop.load(Ordering::SeqCst);
    }
    eprintln!("Focus the target editor window. {what} in {secs}s...");
    for remaining in (1..=secs).rev() {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        eprintln!("{remaining}...");
        if !sleep_unless_stopped(stop, Duration::from_secs(1)) {
            return false;
        }
    }
    true
}

/// Prints session events to stderr and remembers the first emission failure.
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    trace: bool,
    failure: Mutex<Option<String>>,
}

impl ConsoleRenderer {
    pub fn new(trace: bool) -> Self {
        Self {
            trace,
            failure: Mutex::new(None),
        }
    }

    pub fn failure(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Renderer for ConsoleRenderer {
    fn progress(&self, progress: Progress) {
        log::debug!(
            "{:?} {}/{} ({:.0}%)",
            progress.state,
            progress.position,
            progress.total,
            progress.percent()
        );
    }

    fn event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Started { total } => eprintln!(
                "Typing {total} characters. Controls (then Enter): p=pause, c=continue, s=stop, b=boost"
            ),
            SessionEvent::Paused { position } => eprintln!("Paused at character {position}."),
            SessionEvent::Resumed { position } => eprintln!("Continuing at character {position}."),
            SessionEvent::Stopped { position } => eprintln!("Stopped at character {position}."),
            SessionEvent::Completed { total } => eprintln!("Done: typed {total} characters."),
            SessionEvent::Boosted { wpm_min, wpm_max } => {
                eprintln!("Speed boost: now {wpm_min:.0}-{wpm_max:.0} WPM.")
            }
            SessionEvent::DirectivePause { secs, .. } => {
                if self.trace {
                    eprintln!("{}", paint_trace_line(&pause_line(secs)));
                }
            }
            SessionEvent::Warning(msg) => eprintln!("warning: {msg}"),
            SessionEvent::Rejected(err) => eprintln!("{err}"),
            SessionEvent::Failed { position, reason } => {
                eprintln!("Typing failed at character {position}: {reason}");
                self.failure
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .get_or_insert(reason);
            }
        }
    }
}

/// Prints each source line's trace just before its first character is emitted.
pub struct TracedEmitter {
    inner: Box<dyn KeyEmitter>,
    events: Vec<TraceEvent>,
    next_event: usize,
    position: usize,
}

impl TracedEmitter {
    pub fn new(inner: Box<dyn KeyEmitter>, events: Vec<TraceEvent>) -> Self {
        let events = events
            .into_iter()
            .filter(|e| e.kind == TraceKind::Typing)
            .collect();
        Self {
            inner,
            events,
            next_event: 0,
            position: 0,
        }
    }
}

impl KeyEmitter for TracedEmitter {
    fn emit(&mut self, c: char) -> Result<()> {
        while let Some(event) = self.events.get(self.next_event) {
            if event.position > self.position {
                break;
            }
            eprintln!("{}", paint_trace_line(&event.line));
            self.next_event += 1;
        }
        self.inner.emit(c)?;
        self.position += 1;
        Ok(())
    }
}
