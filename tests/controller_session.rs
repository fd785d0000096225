mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;

use typist::controller::{Command, ControlError, SessionEvent, TypingController};
use typist::model::ControlState;
use typist::planner::TypingConfig;

use support::{wait_until, RecordingEmitter, RecordingRenderer};

fn config(wpm: f64) -> TypingConfig {
    TypingConfig {
        wpm_min: wpm,
        wpm_max: wpm,
        statement_pause_ms: 0,
        ..Default::default()
    }
}

fn controller(emitter: &RecordingEmitter) -> (TypingController, Arc<RecordingRenderer>) {
    let renderer = Arc::new(RecordingRenderer::default());
    let controller = TypingController::new(Box::new(emitter.clone()), renderer.clone())
        .with_seed(7)
        .with_progress_every(1);
    (controller, renderer)
}

fn alphabet_text(len: usize) -> String {
    (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect()
}

#[test]
fn types_the_whole_stream_and_completes() {
    let emitter = RecordingEmitter::default();
    let (controller, renderer) = controller(&emitter);
    let text = "public static void main() {\n  System.out.println(\"Hi\");\n}";

    controller.start(text, &config(6000.0)).unwrap();
    controller.wait();

    assert_eq!(emitter.text(), text);
    assert_eq!(controller.state(), ControlState::Idle);
    let progress = controller.progress();
    assert_eq!(progress.position, progress.total);
    assert_eq!(progress.total, text.chars().count());

    let events = renderer.events();
    assert_eq!(events.first(), Some(&SessionEvent::Started { total: text.chars().count() }));
    assert_eq!(events.last(), Some(&SessionEvent::Completed { total: text.chars().count() }));
}

#[test]
fn pause_directive_waits_between_characters() {
    let emitter = RecordingEmitter::default();
    let (controller, renderer) = controller(&emitter);

    controller.start("A{{PAUSE:2}}B", &config(6000.0)).unwrap();
    controller.wait();

    assert_eq!(emitter.text(), "AB");
    let times = emitter.times();
    let gap = times[1] - times[0];
    assert!(gap >= Duration::from_secs(2), "gap was {gap:?}");
    assert!(gap < Duration::from_secs(3), "gap was {gap:?}");

    assert!(renderer
        .events()
        .contains(&SessionEvent::DirectivePause { position: 1, secs: 2.0 }));
}

#[test]
fn time_scale_shrinks_directive_pauses() {
    let emitter = RecordingEmitter::default();
    let renderer = Arc::new(RecordingRenderer::default());
    let controller =
        TypingController::new(Box::new(emitter.clone()), renderer).with_time_scale(0.1);

    controller.start("A{{PAUSE:2}}B", &config(6000.0)).unwrap();
    controller.wait();

    let times = emitter.times();
    let gap = times[1] - times[0];
    assert!(gap >= Duration::from_millis(200), "gap was {gap:?}");
    assert!(gap < Duration::from_millis(1500), "gap was {gap:?}");
}

#[test]
fn pause_and_continue_resume_at_the_same_character() {
    let emitter = RecordingEmitter::default();
    let (controller, renderer) = controller(&emitter);
    let text = alphabet_text(120);

    // 20ms per character.
    controller.start(&text, &config(600.0)).unwrap();
    assert!(wait_until(Duration::from_secs(5), || emitter.len() >= 10));

    controller.pause().unwrap();
    assert_eq!(controller.state(), ControlState::Paused);

    std::thread::sleep(Duration::from_millis(150));
    let paused_at = controller.progress().position;
    assert_eq!(emitter.len(), paused_at);

    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(emitter.len(), paused_at, "nothing is typed while paused");

    controller.resume().unwrap();
    controller.wait();

    assert_eq!(emitter.text(), text);
    let events = renderer.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::Resumed { position } if *position == paused_at)));
}

#[test]
fn pausing_inside_a_directive_keeps_the_remaining_time() {
    let emitter = RecordingEmitter::default();
    let (controller, _renderer) = controller(&emitter);

    controller.start("A{{PAUSE:1}}B", &config(6000.0)).unwrap();
    assert!(wait_until(Duration::from_secs(2), || emitter.len() == 1));

    std::thread::sleep(Duration::from_millis(300));
    controller.pause().unwrap();
    std::thread::sleep(Duration::from_millis(500));
    assert_eq!(emitter.len(), 1);

    let resumed = Instant::now();
    controller.resume().unwrap();
    controller.wait();

    assert_eq!(emitter.text(), "AB");
    let after_resume = emitter.times()[1] - resumed;
    // Roughly 0.7s of the directive was left; it does not restart from 1s.
    assert!(after_resume >= Duration::from_millis(550), "{after_resume:?}");
    assert!(after_resume < Duration::from_millis(950), "{after_resume:?}");
}

#[test]
fn stop_is_prompt_even_during_a_long_directive() {
    let emitter = RecordingEmitter::default();
    let (controller, renderer) = controller(&emitter);

    controller.start("A{{PAUSE:30}}B", &config(6000.0)).unwrap();
    assert!(wait_until(Duration::from_secs(2), || emitter.len() == 1));

    let stopped = Instant::now();
    controller.stop().unwrap();
    controller.wait();
    assert!(stopped.elapsed() < Duration::from_millis(500));

    assert_eq!(emitter.text(), "A");
    assert_eq!(controller.state(), ControlState::Stopped);
    assert_eq!(controller.progress().position, 0);
    assert!(renderer
        .events()
        .contains(&SessionEvent::Stopped { position: 1 }));
}

#[test]
fn stop_then_start_begins_a_fresh_session() {
    let emitter = RecordingEmitter::default();
    let (controller, renderer) = controller(&emitter);

    controller.start(&alphabet_text(200), &config(600.0)).unwrap();
    assert!(wait_until(Duration::from_secs(5), || emitter.len() >= 5));
    controller.stop().unwrap();
    controller.wait();
    let first_run = emitter.len();

    controller.start("int x;", &config(6000.0)).unwrap();
    controller.wait();

    let typed = emitter.text();
    assert_eq!(typed.chars().count(), first_run + 6);
    assert!(typed.ends_with("int x;"));
    assert_eq!(controller.state(), ControlState::Idle);
    assert_eq!(controller.progress().position, 6);

    let started: Vec<_> = renderer
        .events()
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::Started { .. }))
        .collect();
    assert_eq!(
        started,
        vec![
            SessionEvent::Started { total: 200 },
            SessionEvent::Started { total: 6 }
        ]
    );
}

#[test]
fn commands_outside_their_states_are_rejected() {
    let emitter = RecordingEmitter::default();
    let (controller, renderer) = controller(&emitter);

    let err = controller.resume().unwrap_err();
    assert_eq!(
        err,
        ControlError::InvalidTransition {
            command: Command::Continue,
            state: ControlState::Idle,
        }
    );
    assert!(controller.pause().is_err());
    assert!(controller.stop().is_err());
    assert!(controller.boost().is_err());
    assert!(controller.command(Command::Start).is_err());
    assert_eq!(controller.state(), ControlState::Idle);

    let rejected = renderer
        .events()
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::Rejected(_)))
        .count();
    assert_eq!(rejected, 5);
}

#[test]
fn start_while_running_is_rejected() {
    let emitter = RecordingEmitter::default();
    let (controller, _renderer) = controller(&emitter);

    controller.start(&alphabet_text(100), &config(600.0)).unwrap();
    let err = controller.start("x", &config(600.0)).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ControlError>(),
        Some(&ControlError::InvalidTransition {
            command: Command::Start,
            state: ControlState::Running,
        })
    );

    controller.pause().unwrap();
    assert!(controller.start("x", &config(600.0)).is_err());
    controller.stop().unwrap();
}

#[test]
fn invalid_config_never_enters_running() {
    let emitter = RecordingEmitter::default();
    let (controller, renderer) = controller(&emitter);

    let cfg = TypingConfig {
        wpm_min: 300.0,
        wpm_max: 100.0,
        ..Default::default()
    };
    assert!(controller.start("abc", &cfg).is_err());

    let cfg = TypingConfig {
        language: "Cobol".to_string(),
        ..Default::default()
    };
    assert!(controller.start("abc", &cfg).is_err());

    assert_eq!(controller.state(), ControlState::Idle);
    assert!(renderer.events().is_empty());
    assert_eq!(emitter.len(), 0);
}

#[test]
fn emitter_failure_stops_the_session() {
    let emitter = RecordingEmitter::failing_on('X');
    let (controller, renderer) = controller(&emitter);

    controller.start("abXcd", &config(6000.0)).unwrap();
    controller.wait();

    assert_eq!(emitter.text(), "ab");
    assert_eq!(controller.state(), ControlState::Stopped);
    assert_eq!(controller.progress().position, 0);

    let failed = renderer.events().into_iter().find_map(|e| match e {
        SessionEvent::Failed { position, reason } => Some((position, reason)),
        _ => None,
    });
    let (position, reason) = failed.expect("failure should be reported");
    assert_eq!(position, 2);
    assert!(reason.contains("injection rejected"), "{reason}");

    // The session can be started again after a failure.
    controller.start("ab", &config(6000.0)).unwrap();
    controller.wait();
    assert_eq!(controller.state(), ControlState::Idle);
}

#[test]
fn boost_raises_the_wpm_range() {
    let emitter = RecordingEmitter::default();
    let (controller, renderer) = controller(&emitter);
    let cfg = TypingConfig {
        wpm_min: 400.0,
        wpm_max: 600.0,
        statement_pause_ms: 0,
        ..Default::default()
    };

    controller.start(&alphabet_text(100), &cfg).unwrap();
    controller.pause().unwrap();
    controller.command(Command::Boost).unwrap();
    controller.resume().unwrap();
    controller.command(Command::Stop).unwrap();
    controller.wait();

    assert!(renderer.events().contains(&SessionEvent::Boosted {
        wpm_min: 600.0,
        wpm_max: 900.0
    }));
}

#[test]
fn unrepresentable_speeds_are_rejected_before_typing() {
    let emitter = RecordingEmitter::default();
    let (controller, renderer) = controller(&emitter);

    assert!(controller.start("abc", &config(1e-20)).is_err());
    assert!(controller.start("abc", &config(1e300)).is_err());
    assert_eq!(controller.state(), ControlState::Idle);
    assert!(renderer.events().is_empty());

    controller.start("abc", &config(6000.0)).unwrap();
    controller.wait();
    assert_eq!(emitter.text(), "abc");
    assert_eq!(controller.state(), ControlState::Idle);
}

#[test]
fn boosting_at_the_top_speed_keeps_typing() {
    let emitter = RecordingEmitter::default();
    let (controller, _renderer) = controller(&emitter);
    let text = alphabet_text(40);

    controller.start(&text, &config(6000.0)).unwrap();
    controller.pause().unwrap();
    for _ in 0..200 {
        controller.boost().unwrap();
    }
    controller.resume().unwrap();
    controller.wait();

    assert_eq!(emitter.text(), text);
    assert_eq!(controller.state(), ControlState::Idle);
}

#[test]
fn oversized_directive_in_a_loaded_plan_is_refused() {
    let emitter = RecordingEmitter::default();
    let (controller, _renderer) = controller(&emitter);

    let mut plan = typist::planner::generate_plan("a{{PAUSE:1}}b", &config(6000.0)).unwrap();
    plan.directives[0].secs = 1e30;

    assert!(controller.start_plan(plan).is_err());
    assert_eq!(controller.state(), ControlState::Idle);
    assert_eq!(emitter.len(), 0);
}

#[test]
fn continue_does_not_retype_skipped_indentation() {
    let emitter = RecordingEmitter::default();
    let (controller, _renderer) = controller(&emitter);
    let cfg = TypingConfig {
        skip_leading_whitespace: true,
        ..config(600.0)
    };
    let text = "class A {\n        int x;\n        int y;\n        int z;\n}";

    controller.start(text, &cfg).unwrap();
    // Right after the first line break.
    assert!(wait_until(Duration::from_secs(5), || emitter.len() >= 10));
    controller.pause().unwrap();
    std::thread::sleep(Duration::from_millis(150));
    controller.resume().unwrap();
    controller.wait();

    assert_eq!(emitter.text(), "class A {\nint x;\nint y;\nint z;\n}");
}

#[test]
fn statement_pause_follows_a_terminator() {
    let emitter = RecordingEmitter::default();
    let (controller, _renderer) = controller(&emitter);
    let cfg = TypingConfig {
        statement_pause_ms: 400,
        ..config(6000.0)
    };

    controller.start("a;b", &cfg).unwrap();
    controller.wait();

    assert_eq!(emitter.text(), "a;b");
    let times = emitter.times();
    let before_terminator = times[1] - times[0];
    let after_terminator = times[2] - times[1];
    assert!(before_terminator < Duration::from_millis(300), "{before_terminator:?}");
    assert!(after_terminator >= Duration::from_millis(400), "{after_terminator:?}");
}
