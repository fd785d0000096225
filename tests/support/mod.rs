#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use typist::controller::{KeyEmitter, Renderer, SessionEvent};
use typist::model::Progress;

/// Records every emitted character with the time it arrived.
#[derive(Clone, Default)]
pub struct RecordingEmitter {
    pub typed: Arc<Mutex<Vec<(char, Instant)>>>,
    /// Fail when asked to emit this character.
    pub fail_on: Option<char>,
}

impl RecordingEmitter {
    pub fn failing_on(c: char) -> Self {
        Self {
            fail_on: Some(c),
            ..Default::default()
        }
    }

    pub fn text(&self) -> String {
        self.typed.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.typed.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn len(&self) -> usize {
        self.typed.lock().unwrap().len()
    }
}

impl KeyEmitter for RecordingEmitter {
    fn emit(&mut self, c: char) -> Result<()> {
        if self.fail_on == Some(c) {
            return Err(anyhow!("injection rejected for {c:?}"));
        }
        self.typed.lock().unwrap().push((c, Instant::now()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub events: Mutex<Vec<SessionEvent>>,
    pub progress: Mutex<Vec<Progress>>,
}

impl RecordingRenderer {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress_log(&self) -> Vec<Progress> {
        self.progress.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn progress(&self, progress: Progress) {
        self.progress.lock().unwrap().push(progress);
    }

    fn event(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
