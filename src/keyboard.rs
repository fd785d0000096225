#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_1: u32 = 2;
pub const KEY_0: u32 = 11;
pub const KEY_MINUS: u32 = 12;
pub const KEY_EQUAL: u32 = 13;
pub const KEY_TAB: u32 = 15;
pub const KEY_Q: u32 = 16;
pub const KEY_LEFTBRACE: u32 = 26;
pub const KEY_RIGHTBRACE: u32 = 27;
pub const KEY_ENTER: u32 = 28;
pub const KEY_LEFTCTRL: u32 = 29;
pub const KEY_A: u32 = 30;
pub const KEY_SEMICOLON: u32 = 39;
pub const KEY_APOSTROPHE: u32 = 40;
pub const KEY_GRAVE: u32 = 41;
pub const KEY_LEFTSHIFT: u32 = 42;
pub const KEY_BACKSLASH: u32 = 43;
pub const KEY_Z: u32 = 44;
pub const KEY_COMMA: u32 = 51;
pub const KEY_DOT: u32 = 52;
pub const KEY_SLASH: u32 = 53;
pub const KEY_RIGHTSHIFT: u32 = 54;
pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;
pub const KEY_RIGHTCTRL: u32 = 97;
pub const KEY_RIGHTALT: u32 = 100;

// Letter rows in evdev order; each row's keycodes are consecutive.
const ROWS: [(&str, u32); 3] = [("qwertyuiop", KEY_Q), ("asdfghjkl", KEY_A), ("zxcvbnm", KEY_Z)];

// (unshifted, shifted, keycode) for the non-letter keys.
const SYMBOL_KEYS: [(char, char, u32); 21] = [
    ('1', '!', KEY_1),
    ('2', '@', KEY_1 + 1),
    ('3', '#', KEY_1 + 2),
    ('4', '$', KEY_1 + 3),
    ('5', '%', KEY_1 + 4),
    ('6', '^', KEY_1 + 5),
    ('7', '&', KEY_1 + 6),
    ('8', '*', KEY_1 + 7),
    ('9', '(', KEY_1 + 8),
    ('0', ')', KEY_0),
    ('-', '_', KEY_MINUS),
    ('=', '+', KEY_EQUAL),
    ('[', '{', KEY_LEFTBRACE),
    (']', '}', KEY_RIGHTBRACE),
    (';', ':', KEY_SEMICOLON),
    ('\'', '"', KEY_APOSTROPHE),
    ('`', '~', KEY_GRAVE),
    ('\\', '|', KEY_BACKSLASH),
    (',', '<', KEY_COMMA),
    ('.', '>', KEY_DOT),
    ('/', '?', KEY_SLASH),
];

/// US-QWERTY keystroke for a character, or `None` if the layout cannot type it.
pub fn char_to_keystroke(c: char) -> Option<KeyStroke> {
    match c {
        ' ' => return Some(unshifted(KEY_SPACE)),
        '\n' => return Some(unshifted(KEY_ENTER)),
        '\t' => return Some(unshifted(KEY_TAB)),
        _ => {}
    }

    if c.is_ascii_alphabetic() {
        let lower = c.to_ascii_lowercase();
        for (row, first) in ROWS {
            if let Some(idx) = row.find(lower) {
                return Some(KeyStroke {
                    keycode: first + idx as u32,
                    shift: c.is_ascii_uppercase(),
                });
            }
        }
    }

    SYMBOL_KEYS.iter().find_map(|&(plain, shifted, keycode)| {
        if c == plain {
            Some(unshifted(keycode))
        } else if c == shifted {
            Some(KeyStroke {
                keycode,
                shift: true,
            })
        } else {
            None
        }
    })
}

fn unshifted(keycode: u32) -> KeyStroke {
    KeyStroke {
        keycode,
        shift: false,
    }
}

/// Normalize characters the emitters can type differently from how they are stored.
pub fn typed_char_for_output_char(c: char) -> Option<char> {
    match c {
        // Windows line endings: the '\n' that follows does the work.
        '\r' => None,
        c if c.is_ascii_graphic() || matches!(c, ' ' | '\n' | '\t') => Some(c),
        _ => None,
    }
}

pub fn keystroke_for_output_char(c: char) -> Option<KeyStroke> {
    typed_char_for_output_char(c).and_then(char_to_keystroke)
}

pub fn find_first_unsupported_char(text: &str) -> Option<(usize, char)> {
    text.char_indices()
        .find(|&(_idx, c)| c != '\r' && keystroke_for_output_char(c).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_follow_qwerty_rows() {
        assert_eq!(char_to_keystroke('q').unwrap().keycode, KEY_Q);
        assert_eq!(char_to_keystroke('p').unwrap().keycode, 25);
        assert_eq!(char_to_keystroke('l').unwrap().keycode, 38);
        assert_eq!(char_to_keystroke('m').unwrap().keycode, 50);
        assert_eq!(
            char_to_keystroke('Z'),
            Some(KeyStroke {
                keycode: KEY_Z,
                shift: true
            })
        );
    }

    #[test]
    fn code_symbols_are_typable() {
        for c in "{}()[]<>;:\"'`~!@#$%^&*-_=+\\|,./?\t\n ".chars() {
            assert!(keystroke_for_output_char(c).is_some(), "{c:?}");
        }
        assert_eq!(char_to_keystroke('{').unwrap().keycode, KEY_LEFTBRACE);
        assert!(char_to_keystroke('{').unwrap().shift);
        assert_eq!(char_to_keystroke('(').unwrap().keycode, 10);
    }

    #[test]
    fn reports_first_unsupported_char() {
        assert_eq!(find_first_unsupported_char("ab\r\ncd"), None);
        assert_eq!(find_first_unsupported_char("naïve"), Some((2, 'ï')));
    }
}
