use std::io::Write;

use anyhow::{anyhow, Context, Result};

use crate::controller::KeyEmitter;
use crate::keyboard::{keystroke_for_output_char, KEY_LEFTSHIFT};

#[cfg(feature = "wayland")]
pub mod wayland;

#[cfg(feature = "x11")]
pub mod x11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyState {
    Pressed,
    Released,
}

// Modifiers released on open and on drop so an aborted run can't leave one held.
// A modifier the user is physically holding may look released to the target app until tapped.
pub(crate) const COMMON_MODIFIER_KEYCODES: [u32; 6] = [
    crate::keyboard::KEY_LEFTSHIFT,
    crate::keyboard::KEY_RIGHTSHIFT,
    crate::keyboard::KEY_LEFTCTRL,
    crate::keyboard::KEY_RIGHTCTRL,
    crate::keyboard::KEY_LEFTALT,
    crate::keyboard::KEY_RIGHTALT,
];

/// Press/release sequence (evdev keycodes) that types `c` on a US layout.
///
/// Returns an empty sequence for `'\r'`, which is dropped in favour of the
/// following `'\n'`. Characters the layout can't produce are an error.
pub(crate) fn key_sequence(c: char) -> Result<Vec<(u32, KeyState)>> {
    if c == '\r' {
        return Ok(Vec::new());
    }
    let stroke = keystroke_for_output_char(c)
        .ok_or_else(|| anyhow!("no US-QWERTY keystroke for {c:?}"))?;

    let mut seq = Vec::with_capacity(4);
    if stroke.shift {
        seq.push((KEY_LEFTSHIFT, KeyState::Pressed));
    }
    seq.push((stroke.keycode, KeyState::Pressed));
    seq.push((stroke.keycode, KeyState::Released));
    if stroke.shift {
        seq.push((KEY_LEFTSHIFT, KeyState::Released));
    }
    Ok(seq)
}

/// Writes typed characters to any `Write` sink; used by `--backend stdout`.
pub struct WriterEmitter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> WriterEmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> KeyEmitter for WriterEmitter<W> {
    fn emit(&mut self, c: char) -> Result<()> {
        if c == '\r' {
            return Ok(());
        }
        write!(self.out, "{c}").context("failed to write typed character")?;
        self.out.flush().context("failed to flush typed output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{KEY_A, KEY_LEFTBRACE};

    #[test]
    fn common_modifier_list_contains_expected_keys() {
        assert!(COMMON_MODIFIER_KEYCODES.contains(&crate::keyboard::KEY_LEFTSHIFT));
        assert!(COMMON_MODIFIER_KEYCODES.contains(&crate::keyboard::KEY_RIGHTCTRL));
        assert!(COMMON_MODIFIER_KEYCODES.contains(&crate::keyboard::KEY_RIGHTALT));
    }

    #[test]
    fn shifted_chars_wrap_in_shift() {
        assert_eq!(
            key_sequence('{').unwrap(),
            vec![
                (KEY_LEFTSHIFT, KeyState::Pressed),
                (KEY_LEFTBRACE, KeyState::Pressed),
                (KEY_LEFTBRACE, KeyState::Released),
                (KEY_LEFTSHIFT, KeyState::Released),
            ]
        );
        assert_eq!(
            key_sequence('a').unwrap(),
            vec![(KEY_A, KeyState::Pressed), (KEY_A, KeyState::Released)]
        );
        assert!(key_sequence('\r').unwrap().is_empty());
        assert!(key_sequence('é').is_err());
    }

    #[test]
    fn writer_emitter_skips_carriage_returns() {
        let mut emitter = WriterEmitter::new(Vec::new());
        for c in "a\r\nb".chars() {
            emitter.emit(c).unwrap();
        }
        assert_eq!(emitter.into_inner(), b"a\nb");
    }
}
