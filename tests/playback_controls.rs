mod support;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use typist::controller::{ControlError, TypingController};
use typist::model::ControlState;
use typist::planner::TypingConfig;
use typist::playback::resume_after_countdown;

use support::{RecordingEmitter, RecordingRenderer};

fn config() -> TypingConfig {
    TypingConfig {
        wpm_min: 6000.0,
        wpm_max: 6000.0,
        statement_pause_ms: 0,
        ..Default::default()
    }
}

#[test]
fn continue_waits_for_the_countdown() {
    let emitter = RecordingEmitter::default();
    let controller = Arc::new(TypingController::new(
        Box::new(emitter.clone()),
        Arc::new(RecordingRenderer::default()),
    ));
    let text = "int x = 1;\nint y = 2;\nint z = x + y;\n";
    controller.start(text, &config()).unwrap();
    controller.pause().unwrap();
    let typed_before = emitter.len();

    let stop = Arc::new(AtomicBool::new(false));
    let worker = {
        let controller = Arc::clone(&controller);
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || resume_after_countdown(&controller, &stop, 1))
    };

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(controller.state(), ControlState::Paused);
    assert_eq!(emitter.len(), typed_before);

    assert!(worker.join().unwrap().is_ok());
    controller.wait();
    assert_eq!(emitter.text(), text);
    assert_eq!(controller.state(), ControlState::Idle);
}

#[test]
fn raised_stop_flag_skips_the_resume() {
    let emitter = RecordingEmitter::default();
    let controller = TypingController::new(
        Box::new(emitter.clone()),
        Arc::new(RecordingRenderer::default()),
    );
    controller.start("abcdef", &config()).unwrap();
    controller.pause().unwrap();

    let stop = AtomicBool::new(true);
    assert!(resume_after_countdown(&controller, &stop, 5).is_ok());
    assert_eq!(controller.state(), ControlState::Paused);
    controller.stop().unwrap();
    controller.wait();
}

#[test]
fn continue_outside_a_pause_is_rejected_at_once() {
    let emitter = RecordingEmitter::default();
    let controller = TypingController::new(
        Box::new(emitter.clone()),
        Arc::new(RecordingRenderer::default()),
    );
    let stop = AtomicBool::new(false);

    let err = resume_after_countdown(&controller, &stop, 5).unwrap_err();
    assert!(matches!(
        err,
        ControlError::InvalidTransition {
            state: ControlState::Idle,
            ..
        }
    ));
    assert_eq!(controller.state(), ControlState::Idle);
    assert_eq!(emitter.len(), 0);
}
