//! Session state machine and the background task that types a plan.
//!
//! Control commands arrive on the caller's thread; a single worker thread emits
//! characters. Both sides go through one lock-protected [`Session`], and every
//! wait in the worker is a loop of short sleeps that re-checks that state, so
//! pause and stop take effect within one polling tick.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::delay::DelayModel;
use crate::language::LanguageProfile;
use crate::model::{Category, ControlState, Progress, TypingPlan};
use crate::planner::{generate_plan, validate_plan, TypingConfig};

/// Upper bound on how long the worker goes without looking at the control state.
pub const POLL_TICK: Duration = Duration::from_millis(50);
pub const DEFAULT_PROGRESS_EVERY: usize = 10;

/// Causes a character to appear at the OS input layer.
pub trait KeyEmitter: Send {
    fn emit(&mut self, c: char) -> Result<()>;
}

/// Observes a session. Called from both the control thread and the worker.
pub trait Renderer: Send + Sync {
    fn progress(&self, progress: Progress);
    fn event(&self, event: SessionEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Continue,
    Stop,
    Boost,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Start => "start",
            Command::Pause => "pause",
            Command::Continue => "continue",
            Command::Stop => "stop",
            Command::Boost => "boost",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    InvalidTransition {
        command: Command,
        state: ControlState,
    },
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::InvalidTransition { command, state } => {
                write!(f, "cannot {command} while {state:?}")
            }
        }
    }
}

impl std::error::Error for ControlError {}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started { total: usize },
    Paused { position: usize },
    Resumed { position: usize },
    Stopped { position: usize },
    Completed { total: usize },
    Boosted { wpm_min: f64, wpm_max: f64 },
    DirectivePause { position: usize, secs: f64 },
    Warning(String),
    Rejected(ControlError),
    Failed { position: usize, reason: String },
}

#[derive(Debug)]
struct Session {
    state: ControlState,
    position: usize,
    total: usize,
    delay: Option<DelayModel>,
    /// Bumped on every start and stop so a stale worker notices it lost its session.
    generation: u64,
}

impl Session {
    fn progress(&self) -> Progress {
        Progress {
            position: self.position,
            total: self.total,
            state: self.state,
        }
    }
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct TypingController {
    session: Arc<Mutex<Session>>,
    emitter: Arc<Mutex<Box<dyn KeyEmitter>>>,
    renderer: Arc<dyn Renderer>,
    worker: Mutex<Option<JoinHandle<()>>>,
    time_scale: f64,
    progress_every: usize,
    seed: Option<u64>,
}

impl TypingController {
    pub fn new(emitter: Box<dyn KeyEmitter>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session {
                state: ControlState::Idle,
                position: 0,
                total: 0,
                delay: None,
                generation: 0,
            })),
            emitter: Arc::new(Mutex::new(emitter)),
            renderer,
            worker: Mutex::new(None),
            time_scale: 1.0,
            progress_every: DEFAULT_PROGRESS_EVERY,
            seed: None,
        }
    }

    /// Multiply every wait (character delays and pause directives) by `scale`.
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        if scale.is_finite() && scale >= 0.0 {
            self.time_scale = scale;
        }
        self
    }

    /// Report progress every `n` characters (state changes are always reported).
    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn progress(&self) -> Progress {
        lock(&self.session).progress()
    }

    pub fn state(&self) -> ControlState {
        lock(&self.session).state
    }

    /// Build a plan from raw text and start typing it.
    pub fn start(&self, raw_text: &str, cfg: &TypingConfig) -> Result<()> {
        let plan = generate_plan(raw_text, cfg)?;
        self.start_plan(plan)
    }

    pub fn start_plan(&self, plan: TypingPlan) -> Result<()> {
        // Held for the whole call so concurrent starts serialize.
        let mut worker = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.transition(
            Command::Start,
            &[ControlState::Idle, ControlState::Stopped],
            |_| (),
        )?;

        let validated = validate_plan(&plan)?;

        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                log::warn!("previous typing worker panicked");
            }
        }

        let total = plan.len_chars();
        let generation = self.transition(
            Command::Start,
            &[ControlState::Idle, ControlState::Stopped],
            |session| {
                session.generation += 1;
                session.state = ControlState::Running;
                session.position = 0;
                session.total = total;
                session.delay = Some(validated.delay);
                session.generation
            },
        )?;

        log::info!(
            "starting session: {total} chars, language {}, {} pause directive(s)",
            plan.config.language,
            plan.directives.len()
        );
        for warning in &plan.warnings {
            self.renderer.event(SessionEvent::Warning(warning.clone()));
        }
        self.renderer.event(SessionEvent::Started { total });
        self.renderer.progress(self.progress());

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(generation)),
            None => StdRng::from_entropy(),
        };

        let ctx = Worker {
            session: Arc::clone(&self.session),
            emitter: Arc::clone(&self.emitter),
            renderer: Arc::clone(&self.renderer),
            generation,
            chars: plan.text.chars().collect(),
            categories: plan.categories(),
            directives: plan
                .directives
                .iter()
                .map(|d| (d.offset, Duration::from_secs_f64(d.secs)))
                .collect(),
            profile: validated.profile,
            time_scale: self.time_scale,
            progress_every: self.progress_every,
            rng,
        };

        let session = Arc::clone(&self.session);
        let renderer = Arc::clone(&self.renderer);
        let handle = std::thread::Builder::new()
            .name("typist-worker".to_string())
            .spawn(move || {
                if panic::catch_unwind(AssertUnwindSafe(|| ctx.run())).is_err() {
                    fail_session(
                        &session,
                        renderer.as_ref(),
                        generation,
                        None,
                        "typing worker panicked".to_string(),
                    );
                }
            })
            .map_err(|e| anyhow!("failed to spawn typing worker: {e}"))?;
        *worker = Some(handle);

        Ok(())
    }

    pub fn pause(&self) -> Result<(), ControlError> {
        let progress = self.transition(Command::Pause, &[ControlState::Running], |session| {
            session.state = ControlState::Paused;
            session.progress()
        })?;
        log::info!("paused at {}", progress.position);
        self.renderer.event(SessionEvent::Paused {
            position: progress.position,
        });
        self.renderer.progress(progress);
        Ok(())
    }

    /// Continue a paused session at the exact character it stopped before.
    pub fn resume(&self) -> Result<(), ControlError> {
        let progress = self.transition(Command::Continue, &[ControlState::Paused], |session| {
            session.state = ControlState::Running;
            session.progress()
        })?;
        log::info!("resumed at {}", progress.position);
        self.renderer.event(SessionEvent::Resumed {
            position: progress.position,
        });
        self.renderer.progress(progress);
        Ok(())
    }

    /// Abandon the session. The next start begins from scratch.
    pub fn stop(&self) -> Result<(), ControlError> {
        let (position, progress) = self.transition(
            Command::Stop,
            &[ControlState::Running, ControlState::Paused],
            |session| {
                let position = session.position;
                session.state = ControlState::Stopped;
                session.position = 0;
                session.generation += 1;
                (position, session.progress())
            },
        )?;
        log::info!("stopped at {position}");
        self.renderer.event(SessionEvent::Stopped { position });
        self.renderer.progress(progress);
        Ok(())
    }

    /// Speed up every delay computed after this call by the boost factor.
    pub fn boost(&self) -> Result<(), ControlError> {
        let range = self.transition(
            Command::Boost,
            &[ControlState::Running, ControlState::Paused],
            |session| {
                session.delay.as_mut().map(|delay| {
                    delay.boost();
                    delay.range()
                })
            },
        )?;
        if let Some(range) = range {
            log::info!("speed boost: {:.0}-{:.0} WPM", range.min(), range.max());
            self.renderer.event(SessionEvent::Boosted {
                wpm_min: range.min(),
                wpm_max: range.max(),
            });
        }
        Ok(())
    }

    pub fn command(&self, command: Command) -> Result<(), ControlError> {
        match command {
            Command::Pause => self.pause(),
            Command::Continue => self.resume(),
            Command::Stop => self.stop(),
            Command::Boost => self.boost(),
            // Starting needs text and a config; see `start`.
            Command::Start => self.transition(command, &[], |_| ()),
        }
    }

    /// Block until the worker of the current session has exited.
    ///
    /// Returns once the session completes, is stopped, or fails.
    pub fn wait(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::warn!("typing worker panicked");
            }
        }
    }

    /// Apply `apply` under the session lock if the current state allows `command`.
    /// Rejections are reported to the renderer after the lock is released.
    fn transition<T>(
        &self,
        command: Command,
        allowed: &[ControlState],
        apply: impl FnOnce(&mut Session) -> T,
    ) -> Result<T, ControlError> {
        let outcome = {
            let mut session = lock(&self.session);
            if allowed.contains(&session.state) {
                Ok(apply(&mut session))
            } else {
                Err(ControlError::InvalidTransition {
                    command,
                    state: session.state,
                })
            }
        };
        if let Err(err) = &outcome {
            log::debug!("rejected: {err}");
            self.renderer.event(SessionEvent::Rejected(err.clone()));
        }
        outcome
    }
}

impl Drop for TypingController {
    fn drop(&mut self) {
        {
            let mut session = lock(&self.session);
            if matches!(session.state, ControlState::Running | ControlState::Paused) {
                session.state = ControlState::Stopped;
                session.position = 0;
            }
            session.generation += 1;
        }
        self.wait();
    }
}

enum Step {
    Exit,
    Idle,
    Directive { position: usize, remaining: Duration, fresh: bool, secs: f64 },
    Char { position: usize, delay: Duration },
    Fail { position: usize, reason: String },
    Complete,
}

enum WaitOutcome {
    Elapsed,
    Interrupted { remaining: Duration },
}

struct Worker {
    session: Arc<Mutex<Session>>,
    emitter: Arc<Mutex<Box<dyn KeyEmitter>>>,
    renderer: Arc<dyn Renderer>,
    generation: u64,
    chars: Vec<char>,
    categories: Vec<Category>,
    /// (offset, duration) in firing order.
    directives: Vec<(usize, Duration)>,
    profile: &'static LanguageProfile,
    time_scale: f64,
    progress_every: usize,
    rng: StdRng,
}

impl Worker {
    fn run(mut self) {
        let mut next_directive = 0usize;
        let mut directive_left: Option<Duration> = None;

        loop {
            match self.next_step(next_directive, &mut directive_left) {
                Step::Exit => return,
                Step::Idle => std::thread::sleep(POLL_TICK),
                Step::Complete => {
                    let total = self.chars.len();
                    log::info!("session complete: {total} chars");
                    self.renderer.event(SessionEvent::Completed { total });
                    self.renderer.progress(Progress {
                        position: total,
                        total,
                        state: ControlState::Idle,
                    });
                    return;
                }
                Step::Directive {
                    position,
                    remaining,
                    fresh,
                    secs,
                } => {
                    if fresh {
                        log::debug!("pause directive: {secs}s at {position}");
                        self.renderer
                            .event(SessionEvent::DirectivePause { position, secs });
                    }
                    match self.wait(remaining) {
                        WaitOutcome::Elapsed => next_directive += 1,
                        WaitOutcome::Interrupted { remaining } => {
                            directive_left = Some(remaining);
                        }
                    }
                }
                Step::Fail { position, reason } => {
                    fail_session(
                        &self.session,
                        self.renderer.as_ref(),
                        self.generation,
                        Some(position),
                        reason,
                    );
                    return;
                }
                Step::Char { position, delay } => {
                    if let WaitOutcome::Interrupted { .. } = self.wait(delay) {
                        // The delay is recomputed on resume.
                        continue;
                    }
                    if !self.still_running() {
                        continue;
                    }
                    if !self.emit(position) {
                        return;
                    }
                }
            }
        }
    }

    fn next_step(&mut self, next_directive: usize, directive_left: &mut Option<Duration>) -> Step {
        let session = lock(&self.session);
        if session.generation != self.generation {
            return Step::Exit;
        }
        let state = session.state;
        match state {
            ControlState::Idle | ControlState::Stopped => Step::Exit,
            ControlState::Paused => Step::Idle,
            ControlState::Running => {
                let position = session.position;

                if let Some(&(offset, duration)) = self.directives.get(next_directive) {
                    if offset == position {
                        let fresh = directive_left.is_none();
                        let remaining = directive_left
                            .take()
                            .unwrap_or_else(|| self.scaled(duration));
                        return Step::Directive {
                            position,
                            remaining,
                            fresh,
                            secs: duration.as_secs_f64(),
                        };
                    }
                }

                if position >= self.chars.len() {
                    drop(session);
                    return self.finish();
                }

                let Some(delay_model) = session.delay.as_ref() else {
                    return Step::Exit;
                };
                let after_statement_end = position > 0
                    && self
                        .profile
                        .is_statement_terminator(self.chars[position - 1]);
                let category = self
                    .categories
                    .get(position)
                    .copied()
                    .unwrap_or(Category::Plain);
                match delay_model.char_delay(category, after_statement_end, &mut self.rng) {
                    Ok(delay) => Step::Char {
                        position,
                        delay: self.scaled(delay),
                    },
                    Err(err) => Step::Fail {
                        position,
                        reason: format!("{err:#}"),
                    },
                }
            }
        }
    }

    fn finish(&self) -> Step {
        let mut session = lock(&self.session);
        if session.generation != self.generation || session.state != ControlState::Running {
            return Step::Idle;
        }
        session.state = ControlState::Idle;
        session.position = self.chars.len();
        Step::Complete
    }

    fn scaled(&self, d: Duration) -> Duration {
        d.mul_f64(self.time_scale)
    }

    fn still_running(&self) -> bool {
        let session = lock(&self.session);
        session.generation == self.generation && session.state == ControlState::Running
    }

    /// Sleep for `duration` in ticks, giving up as soon as the session leaves Running.
    fn wait(&self, duration: Duration) -> WaitOutcome {
        let mut remaining = duration;
        loop {
            if !self.still_running() {
                return WaitOutcome::Interrupted { remaining };
            }
            if remaining.is_zero() {
                return WaitOutcome::Elapsed;
            }
            let step = remaining.min(POLL_TICK);
            std::thread::sleep(step);
            remaining -= step;
        }
    }

    /// Emit the character at `position`. Returns false if the worker should exit.
    fn emit(&mut self, position: usize) -> bool {
        let c = self.chars[position];
        let result = {
            let mut emitter = self
                .emitter
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            emitter.emit(c)
        };

        if let Err(err) = result {
            fail_session(
                &self.session,
                self.renderer.as_ref(),
                self.generation,
                Some(position),
                format!("{err:#}"),
            );
            return false;
        }

        let mut session = lock(&self.session);
        if session.generation != self.generation {
            return false;
        }
        // A pause that arrived mid-emit still counts the character as typed.
        session.position = position + 1;
        let progress = session.progress();
        drop(session);

        if progress.position % self.progress_every == 0 {
            self.renderer.progress(progress);
        }
        true
    }
}

/// Abandon the session of `generation` after an error, unless it was already
/// stopped or replaced. `position` defaults to the last typed character.
fn fail_session(
    session: &Mutex<Session>,
    renderer: &dyn Renderer,
    generation: u64,
    position: Option<usize>,
    reason: String,
) {
    let mut guard = lock(session);
    if guard.generation != generation
        || !matches!(guard.state, ControlState::Running | ControlState::Paused)
    {
        return;
    }
    let position = position.unwrap_or(guard.position);
    guard.state = ControlState::Stopped;
    guard.position = 0;
    guard.generation += 1;
    let progress = guard.progress();
    drop(guard);

    log::warn!("session failed at {position}: {reason}");
    renderer.event(SessionEvent::Failed { position, reason });
    renderer.progress(progress);
}
