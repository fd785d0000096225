use std::collections::HashMap;
use std::io::Write;
use std::os::fd::{AsFd, FromRawFd, IntoRawFd, OwnedFd};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use memfd::MemfdOptions;
use wayland_client::globals::{registry_queue_init, GlobalListContents};
use wayland_client::protocol::{wl_registry, wl_seat};
use wayland_client::{Connection, Dispatch, EventQueue, Proxy, QueueHandle};

use self::protocol::zwp_virtual_keyboard_manager_v1::ZwpVirtualKeyboardManagerV1;
use self::protocol::zwp_virtual_keyboard_v1::ZwpVirtualKeyboardV1;
use super::{key_sequence, KeyState, COMMON_MODIFIER_KEYCODES};
use crate::controller::KeyEmitter;
use crate::keyboard::KEY_LEFTSHIFT;
use crate::keymap::{us_qwerty_keymap, KeymapInfo};

#[allow(non_upper_case_globals, clippy::all)]
mod protocol {
    use wayland_client;
    use wayland_client::protocol::*;

    pub mod __interfaces {
        use wayland_client::protocol::__interfaces::*;
        wayland_scanner::generate_interfaces!("protocol/virtual-keyboard-unstable-v1.xml");
    }

    use self::__interfaces::*;

    wayland_scanner::generate_client_code!("protocol/virtual-keyboard-unstable-v1.xml");
}

#[derive(Debug, Clone)]
struct SeatData {
    global_name: u32,
}

#[derive(Debug, Default)]
struct State {
    seat_names_by_global: HashMap<u32, String>,
}

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for State {
    fn event(
        _state: &mut Self,
        _proxy: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_seat::WlSeat, SeatData> for State {
    fn event(
        state: &mut Self,
        _proxy: &wl_seat::WlSeat,
        event: wl_seat::Event,
        data: &SeatData,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Name { name } = event {
            state.seat_names_by_global.insert(data.global_name, name);
        }
    }
}

impl Dispatch<ZwpVirtualKeyboardManagerV1, ()> for State {
    fn event(
        _state: &mut Self,
        _proxy: &ZwpVirtualKeyboardManagerV1,
        _event: <ZwpVirtualKeyboardManagerV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ZwpVirtualKeyboardV1, ()> for State {
    fn event(
        _state: &mut Self,
        _proxy: &ZwpVirtualKeyboardV1,
        _event: <ZwpVirtualKeyboardV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

fn make_keymap_fd(keymap: &str) -> Result<(OwnedFd, u32)> {
    let memfd = MemfdOptions::default()
        .allow_sealing(true)
        .create("typist-xkb-keymap")
        .context("failed to create memfd for keymap")?;

    let mut file = memfd.as_file();
    file.write_all(keymap.as_bytes())?;
    file.write_all(&[0])?;

    let size = (keymap.len() + 1)
        .try_into()
        .map_err(|_| anyhow!("keymap too large"))?;

    let raw_fd = memfd.into_file().into_raw_fd();
    // SAFETY: `raw_fd` was just released by the memfd file and is owned by nobody else.
    let owned_fd = unsafe { OwnedFd::from_raw_fd(raw_fd) };

    Ok((owned_fd, size))
}

fn bind_seat(
    globals: &wayland_client::globals::GlobalList,
    event_queue: &mut EventQueue<State>,
    state: &mut State,
    seat_name: Option<&str>,
) -> Result<wl_seat::WlSeat> {
    let qh = event_queue.handle();
    let seat_globals: Vec<_> = globals
        .contents()
        .clone_list()
        .into_iter()
        .filter(|g| g.interface == wl_seat::WlSeat::interface().name)
        .collect();

    let bind = |g: &wayland_client::globals::Global| -> wl_seat::WlSeat {
        globals.registry().bind(
            g.name,
            g.version.min(7),
            &qh,
            SeatData {
                global_name: g.name,
            },
        )
    };

    let Some(requested) = seat_name else {
        let first = seat_globals
            .first()
            .ok_or_else(|| anyhow!("wl_seat not available (no seats advertised)"))?;
        return Ok(bind(first));
    };

    let seats: Vec<_> = seat_globals.iter().map(|g| (g.name, bind(g))).collect();
    event_queue
        .roundtrip(state)
        .context("Wayland roundtrip (seat discovery) failed")?;

    if let Some(seat) = seats.iter().find_map(|(global_name, seat)| {
        state
            .seat_names_by_global
            .get(global_name)
            .filter(|n| n.as_str() == requested)
            .map(|_| seat.clone())
    }) {
        return Ok(seat);
    }

    let mut names: Vec<_> = state.seat_names_by_global.values().cloned().collect();
    names.sort();
    names.dedup();
    if names.is_empty() {
        return Err(anyhow!(
            "requested seat {requested:?}, but compositor did not advertise any wl_seat.name values (requires wl_seat v2+)"
        ));
    }
    Err(anyhow!(
        "requested seat {requested:?} not found; available seats: {}",
        names.join(", ")
    ))
}

/// Types characters through a `zwp_virtual_keyboard_v1` bound to one seat.
pub struct WaylandEmitter {
    conn: Connection,
    keyboard: ZwpVirtualKeyboardV1,
    shift_mask: u32,
    start: Instant,
    _event_queue: EventQueue<State>,
    _keymap_fd: OwnedFd,
}

impl WaylandEmitter {
    pub fn connect(seat_name: Option<&str>) -> Result<Self> {
        let conn = Connection::connect_to_env().context("failed to connect to Wayland")?;
        let (globals, mut event_queue) =
            registry_queue_init(&conn).context("failed to init Wayland registry")?;
        let qh = event_queue.handle();
        let mut state = State::default();

        let manager: ZwpVirtualKeyboardManagerV1 = globals
            .bind(&qh, 1..=1, ())
            .context("zwp_virtual_keyboard_manager_v1 not available (is sway/wlroots exposing it?)")?;

        let seat = bind_seat(&globals, &mut event_queue, &mut state, seat_name)?;
        let keyboard = manager.create_virtual_keyboard(&seat, &qh, ());
        event_queue
            .roundtrip(&mut state)
            .context("Wayland roundtrip failed")?;

        let KeymapInfo {
            keymap_format,
            keymap,
            shift_mask,
            ..
        } = us_qwerty_keymap()?;
        let (keymap_fd, keymap_size) = make_keymap_fd(&keymap)?;
        keyboard.keymap(keymap_format, keymap_fd.as_fd(), keymap_size);
        conn.flush().context("Wayland flush failed")?;

        log::debug!("wayland virtual keyboard ready (seat {seat_name:?})");

        Ok(Self {
            conn,
            keyboard,
            shift_mask,
            start: Instant::now(),
            _event_queue: event_queue,
            _keymap_fd: keymap_fd,
        })
    }

    fn time_ms(&self) -> u32 {
        self.start.elapsed().as_millis().try_into().unwrap_or(u32::MAX)
    }

    fn reset_modifiers(&self) {
        self.keyboard.modifiers(0, 0, 0, 0);
        let t = self.time_ms();
        for keycode in COMMON_MODIFIER_KEYCODES {
            self.keyboard.key(t, keycode, 0);
        }
        let _ = self.conn.flush();
    }
}

impl KeyEmitter for WaylandEmitter {
    fn emit(&mut self, c: char) -> Result<()> {
        for (keycode, state) in key_sequence(c)? {
            let pressed = state == KeyState::Pressed;
            self.keyboard.key(self.time_ms(), keycode, u32::from(pressed));
            if keycode == KEY_LEFTSHIFT {
                let depressed = if pressed { self.shift_mask } else { 0 };
                self.keyboard.modifiers(depressed, 0, 0, 0);
            }
        }
        if let Err(e) = self.conn.flush() {
            self.reset_modifiers();
            return Err(anyhow!("Wayland flush failed while typing {c:?}: {e}"));
        }
        Ok(())
    }
}

impl Drop for WaylandEmitter {
    fn drop(&mut self) {
        self.reset_modifiers();
        self.keyboard.destroy();
        let _ = self.conn.flush();
    }
}
