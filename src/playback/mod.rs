//! Backend selection and the interactive play loop behind `typist play`/`run`.

pub mod backends;
pub mod console;

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use anyhow::{anyhow, Context, Result};

use crate::controller::{Command, ControlError, KeyEmitter, TypingController};
use crate::keyboard::find_first_unsupported_char;
use crate::model::{ControlState, TypingPlan};
use crate::trace::plan_console_trace;
use self::console::{countdown, ConsoleRenderer, TracedEmitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackBackend {
    Auto,
    Wayland,
    X11,
    /// Print typed characters to stdout instead of injecting keystrokes.
    Stdout,
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn auto_backend() -> PlaybackBackend {
    let wayland_env = env_is_set("WAYLAND_DISPLAY") || env_is_set("WAYLAND_SOCKET");
    let x11_env = env_is_set("DISPLAY");

    // Prefer Wayland if both are present (common in Wayland sessions with Xwayland).
    if wayland_env {
        if cfg!(feature = "wayland") {
            return PlaybackBackend::Wayland;
        }

        // If Wayland is detected but not supported in this build, fall back to X11 if available.
        // Otherwise return Wayland so the caller can surface a helpful "detected but disabled"
        // error.
        if cfg!(feature = "x11") && x11_env {
            return PlaybackBackend::X11;
        }
        return PlaybackBackend::Wayland;
    }

    if x11_env {
        return PlaybackBackend::X11;
    }

    // Unknown/unsupported environment.
    PlaybackBackend::Auto
}

fn backend_unavailable_message() -> String {
    let xdg_session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_else(|_| "".to_string());

    let mut parts = Vec::new();

    if env_is_set("WAYLAND_DISPLAY") {
        parts.push("WAYLAND_DISPLAY is set".to_string());
    }
    if env_is_set("WAYLAND_SOCKET") {
        parts.push("WAYLAND_SOCKET is set".to_string());
    }
    if env_is_set("DISPLAY") {
        parts.push("DISPLAY is set".to_string());
    }
    if !xdg_session_type.is_empty() {
        parts.push(format!("XDG_SESSION_TYPE={xdg_session_type}"));
    }

    if parts.is_empty() {
        "No display session detected (expected Wayland or X11 environment variables).".to_string()
    } else {
        format!("Detected environment: {}", parts.join(", "))
    }
}

fn require_supported_backend(
    #[allow(unused_variables)] selected: PlaybackBackend,
    resolved: PlaybackBackend,
) -> Result<()> {
    match resolved {
        PlaybackBackend::Wayland => {
            #[cfg(feature = "wayland")]
            {
                Ok(())
            }

            #[cfg(not(feature = "wayland"))]
            {
                let how = match selected {
                    PlaybackBackend::Auto => "detected",
                    _ => "requested",
                };
                Err(anyhow!(
                    "Wayland backend {how} but is disabled in this build. (Rebuild with `--features wayland`.) {details}",
                    how = how,
                    details = backend_unavailable_message()
                ))
            }
        }
        PlaybackBackend::X11 => {
            #[cfg(feature = "x11")]
            {
                Ok(())
            }

            #[cfg(not(feature = "x11"))]
            {
                let how = match selected {
                    PlaybackBackend::Auto => "detected",
                    _ => "requested",
                };
                Err(anyhow!(
                    "X11 backend {how} but is disabled in this build. (Rebuild with `--features x11`.) {details}",
                    how = how,
                    details = backend_unavailable_message()
                ))
            }
        }
        PlaybackBackend::Stdout => Ok(()),
        PlaybackBackend::Auto => {
            let mut forced = Vec::new();
            if cfg!(feature = "wayland") {
                forced.push("--backend wayland");
            }
            if cfg!(feature = "x11") {
                forced.push("--backend x11");
            }
            let hint = if forced.is_empty() {
                "This build has no playback backends enabled."
            } else if forced.len() == 1 {
                "Try passing the available backend flag to force it."
            } else {
                "Try forcing a backend."
            };

            Err(anyhow!(
                "No supported playback backend detected. {details}\n\
                 {hint} {}",
                forced.join(" or "),
                details = backend_unavailable_message(),
                hint = hint,
            ))
        }
    }
}

pub fn resolve_backend(requested: PlaybackBackend) -> Result<PlaybackBackend> {
    let resolved = match requested {
        PlaybackBackend::Auto => auto_backend(),
        other => other,
    };

    require_supported_backend(requested, resolved)?;
    Ok(resolved)
}

pub fn preflight_backend(
    requested: PlaybackBackend,
    seat_name: Option<&str>,
) -> Result<PlaybackBackend> {
    if let Some(name) = seat_name {
        if name.trim().is_empty() {
            return Err(anyhow!("--seat must not be empty"));
        }
    }

    let resolved = resolve_backend(requested)?;

    if seat_name.is_some() && resolved != PlaybackBackend::Wayland {
        return Err(anyhow!(
            "--seat is Wayland-only and is not supported on {resolved:?}"
        ));
    }

    Ok(resolved)
}

/// Open the key emitter for an already resolved backend.
pub fn open_emitter(backend: PlaybackBackend, seat_name: Option<&str>) -> Result<Box<dyn KeyEmitter>> {
    #[cfg(not(feature = "wayland"))]
    let _ = seat_name;

    match backend {
        PlaybackBackend::Stdout => Ok(Box::new(backends::WriterEmitter::new(std::io::stdout()))),
        PlaybackBackend::Wayland => {
            #[cfg(feature = "wayland")]
            {
                Ok(Box::new(backends::wayland::WaylandEmitter::connect(seat_name)?))
            }

            #[cfg(not(feature = "wayland"))]
            {
                Err(anyhow!(
                    "Wayland backend is disabled in this build (rebuild with `--features wayland`)."
                ))
            }
        }
        PlaybackBackend::X11 => {
            #[cfg(feature = "x11")]
            {
                Ok(Box::new(backends::x11::X11Emitter::connect()?))
            }

            #[cfg(not(feature = "x11"))]
            {
                Err(anyhow!(
                    "X11 backend is disabled in this build (rebuild with `--features x11`)."
                ))
            }
        }
        PlaybackBackend::Auto => Err(anyhow!("no backend resolved")),
    }
}

/// Map one line typed on stdin during playback to a control command.
pub fn parse_control_line(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(Command::Pause),
        "c" | "continue" | "resume" => Some(Command::Continue),
        "s" | "stop" => Some(Command::Stop),
        "b" | "boost" => Some(Command::Boost),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct PlayOptions {
    pub backend: PlaybackBackend,
    pub countdown_secs: u64,
    pub seat: Option<String>,
    pub trace: bool,
    pub seed: Option<u64>,
}

/// Type `plan` into the focused window, honoring Ctrl+C and stdin control lines.
pub fn play_plan(plan: TypingPlan, opts: &PlayOptions) -> Result<()> {
    let backend = preflight_backend(opts.backend, opts.seat.as_deref())?;
    if backend != PlaybackBackend::Stdout {
        if let Some((idx, c)) = find_first_unsupported_char(&plan.text) {
            log::warn!("{c:?} at byte {idx} has no US-QWERTY keystroke; typing will stop there");
        }
    }
    let mut emitter = open_emitter(backend, opts.seat.as_deref())?;
    if opts.trace {
        emitter = Box::new(TracedEmitter::new(emitter, plan_console_trace(&plan)));
    }

    let renderer = Arc::new(ConsoleRenderer::new(opts.trace));
    let mut controller = TypingController::new(emitter, renderer.clone());
    if let Some(seed) = opts.seed {
        controller = controller.with_seed(seed);
    }
    let controller = Arc::new(controller);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        let controller = Arc::downgrade(&controller);
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
            stop_if_active(&controller);
        })
        .context("failed to install Ctrl+C handler")?;
    }

    if !countdown(stop.as_ref(), opts.countdown_secs, "Starting") {
        return Err(anyhow!("aborted"));
    }

    controller.start_plan(plan)?;
    spawn_stdin_controls(
        Arc::downgrade(&controller),
        Arc::clone(&stop),
        opts.countdown_secs,
    )?;
    controller.wait();

    if let Some(reason) = renderer.failure() {
        return Err(anyhow!("typing failed: {reason}"));
    }
    if stop.load(Ordering::SeqCst) || controller.state() == ControlState::Stopped {
        return Err(anyhow!("aborted"));
    }
    Ok(())
}

fn stop_if_active(controller: &Weak<TypingController>) {
    if let Some(controller) = controller.upgrade() {
        if matches!(
            controller.state(),
            ControlState::Running | ControlState::Paused
        ) {
            let _ = controller.stop();
        }
    }
}

/// Continue a paused session after giving the user `secs` seconds to refocus
/// the target window. A raised `stop` abandons the countdown without resuming.
pub fn resume_after_countdown(
    controller: &TypingController,
    stop: &AtomicBool,
    secs: u64,
) -> Result<(), ControlError> {
    if controller.state() != ControlState::Paused {
        // Let the controller report the rejection.
        return controller.resume();
    }
    if !countdown(stop, secs, "Continuing") {
        return Ok(());
    }
    controller.resume()
}

fn spawn_stdin_controls(
    controller: Weak<TypingController>,
    stop: Arc<AtomicBool>,
    countdown_secs: u64,
) -> Result<()> {
    std::thread::Builder::new()
        .name("typist-controls".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { return };
                let Some(controller) = controller.upgrade() else {
                    return;
                };
                match parse_control_line(&line) {
                    // Rejections are already reported through the renderer.
                    Some(Command::Continue) => {
                        let _ = resume_after_countdown(&controller, &stop, countdown_secs);
                    }
                    Some(command) => {
                        let _ = controller.command(command);
                    }
                    None if line.trim().is_empty() => {}
                    None => eprintln!("unknown control {:?} (use p, c, s or b)", line.trim()),
                }
            }
        })
        .context("failed to spawn stdin control thread")?;
    Ok(())
}
