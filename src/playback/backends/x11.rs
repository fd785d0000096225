use anyhow::{anyhow, Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::ConnectionExt as _;
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::protocol::{xproto, xtest};
use x11rb::rust_connection::RustConnection;

use super::{key_sequence, KeyState, COMMON_MODIFIER_KEYCODES};
use crate::controller::KeyEmitter;
use crate::keyboard::{KEY_1, KEY_A, KEY_APOSTROPHE, KEY_LEFTBRACE, KEY_MINUS, KEY_SEMICOLON};

// X11 special focus value: the focused window follows the pointer.
const POINTER_ROOT: xproto::Window = 1;

/// Types characters through the XTEST extension.
pub struct X11Emitter {
    conn: RustConnection,
    root: xproto::Window,
}

impl X11Emitter {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11")?;
        query_xtest(&conn)?;
        validate_us_keymap(&conn)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| anyhow!("invalid X11 screen index"))?;

        let focus = conn
            .get_input_focus()
            .context("failed to request input focus")?
            .reply()
            .context("failed to read input focus reply")?;
        if focus.focus == x11rb::NONE {
            return Err(anyhow!(
                "no X11 input focus detected; click into the target editor before starting"
            ));
        }
        if focus.focus == POINTER_ROOT {
            return Err(anyhow!(
                "X11 input focus is set to PointerRoot; click into the target editor window to give it explicit focus before starting"
            ));
        }

        let emitter = Self { conn, root };
        // X11 has no per-client modifier state; start from a neutral one.
        emitter.release_modifiers();
        Ok(emitter)
    }

    fn key(&self, evdev_keycode: u32, state: KeyState) -> Result<()> {
        let type_ = match state {
            KeyState::Pressed => xproto::KEY_PRESS_EVENT,
            KeyState::Released => xproto::KEY_RELEASE_EVENT,
        };
        let keycode = evdev_to_x11_keycode(evdev_keycode)?;
        self.conn
            .xtest_fake_input(type_, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
            .context("failed to send XTEST fake input")?;
        Ok(())
    }

    fn release_modifiers(&self) {
        for keycode in COMMON_MODIFIER_KEYCODES {
            let _ = self.key(keycode, KeyState::Released);
        }
        let _ = self.conn.flush();
    }
}

impl KeyEmitter for X11Emitter {
    fn emit(&mut self, c: char) -> Result<()> {
        for (keycode, state) in key_sequence(c)? {
            if let Err(e) = self.key(keycode, state) {
                self.release_modifiers();
                return Err(e);
            }
        }
        self.conn
            .flush()
            .context("failed to flush X11 connection")?;
        Ok(())
    }
}

impl Drop for X11Emitter {
    fn drop(&mut self) {
        self.release_modifiers();
    }
}

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Result<u8> {
    // On Linux Xorg setups X11 keycodes are evdev + 8.
    let x11 = evdev_keycode
        .checked_add(8)
        .ok_or_else(|| anyhow!("evdev keycode overflow"))?;
    u8::try_from(x11).map_err(|_| anyhow!("evdev keycode {evdev_keycode} out of range for X11"))
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .context("failed to query X11 extension info")?;
    if ext.is_none() {
        return Err(anyhow!(
            "X11 backend requires the XTEST extension (not present on this X server)"
        ));
    }
    Ok(())
}

fn validate_us_keymap(conn: &impl Connection) -> Result<()> {
    // (evdev, unshifted, shifted); Latin-1 keysyms equal their char codes.
    let checks = [
        (KEY_A, 'a', 'A'),
        (KEY_1, '1', '!'),
        (KEY_MINUS, '-', '_'),
        (KEY_SEMICOLON, ';', ':'),
        (KEY_APOSTROPHE, '\'', '"'),
        (KEY_LEFTBRACE, '[', '{'),
    ];

    for (evdev, unshifted, shifted) in checks {
        let keycode = evdev_to_x11_keycode(evdev)?;
        let reply = conn
            .get_keyboard_mapping(keycode, 1)
            .context("failed to request keyboard mapping")?
            .reply()
            .context("failed to read keyboard mapping")?;

        let got0 = reply.keysyms.first().copied().unwrap_or(x11rb::NO_SYMBOL);
        let got1 = reply.keysyms.get(1).copied().unwrap_or(x11rb::NO_SYMBOL);

        if got0 == x11rb::NO_SYMBOL || got1 == x11rb::NO_SYMBOL {
            return Err(anyhow!(
                "X11 backend could not validate the X server keymap (keycode {keycode} returned NoSymbol). This backend assumes X11 keycodes are evdev+8 and requires a US keymap."
            ));
        }
        if got0 != unshifted as u32 || got1 != shifted as u32 {
            return Err(anyhow!(
                "X11 backend requires a US keyboard layout, but the X server keymap does not match (keycode {keycode}: got {got0:#x}/{got1:#x}). Try `setxkbmap us`."
            ));
        }
    }

    Ok(())
}
