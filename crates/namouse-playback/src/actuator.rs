//! Device actuation seam.
//!
//! The executor drives the pointer and keyboard only through `Actuator`.
//! `SystemActuator` talks to the OS (`SendInput` on Windows, an erroring stub
//! elsewhere); `MockActuator` records every action with a timestamp so timing
//! can be asserted on a paused tokio clock.

use std::sync::{Mutex, MutexGuard};

use tokio::time::Instant;

use namouse_core::error::{NamouseError, Result};
use namouse_core::types::{MouseButton, ResolvedKey, ScreenSize};

/// Synchronous device operations. Each call is a single, short OS request.
pub trait Actuator: Send + Sync {
    /// Move the pointer to absolute device coordinates.
    fn set_position(&self, x: i32, y: i32) -> Result<()>;

    /// Current pointer position.
    fn position(&self) -> Result<(i32, i32)>;

    fn button(&self, button: MouseButton, pressed: bool) -> Result<()>;

    /// Scroll by whole notches. Positive `dy` scrolls up, positive `dx` right.
    fn scroll(&self, dx: i32, dy: i32) -> Result<()>;

    fn key(&self, key: ResolvedKey, pressed: bool) -> Result<()>;

    fn screen_size(&self) -> Result<ScreenSize>;
}

// =============================================================================
// Mock actuator
// =============================================================================

/// A device action as seen by `MockActuator`.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetPosition { x: i32, y: i32 },
    Button { button: MouseButton, pressed: bool },
    Scroll { dx: i32, dy: i32 },
    Key { key: ResolvedKey, pressed: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAction {
    pub at: Instant,
    pub action: Action,
}

#[derive(Debug)]
struct MockState {
    position: (i32, i32),
    screen: ScreenSize,
    actions: Vec<RecordedAction>,
    ignored_moves: usize,
    fail_buttons: bool,
}

/// In-memory actuator that logs every action.
#[derive(Debug)]
pub struct MockActuator {
    state: Mutex<MockState>,
}

impl Default for MockActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockActuator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                position: (0, 0),
                screen: ScreenSize {
                    width: 1920,
                    height: 1080,
                },
                actions: Vec::new(),
                ignored_moves: 0,
                fail_buttons: false,
            }),
        }
    }

    /// The next `count` position changes are logged but do not move the
    /// pointer, like a shell surface that snaps the cursor back.
    pub fn with_ignored_moves(self, count: usize) -> Self {
        self.lock().ignored_moves = count;
        self
    }

    /// Every button action fails with an `Actuation` error.
    pub fn with_failing_buttons(self) -> Self {
        self.lock().fail_buttons = true;
        self
    }

    pub fn actions(&self) -> Vec<RecordedAction> {
        self.lock().actions.clone()
    }

    /// Only the actions, without timestamps.
    pub fn action_log(&self) -> Vec<Action> {
        self.lock()
            .actions
            .iter()
            .map(|recorded| recorded.action.clone())
            .collect()
    }

    pub fn current_position(&self) -> (i32, i32) {
        self.lock().position
    }

    pub fn clear(&self) {
        self.lock().actions.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // The state stays consistent even if a test thread panicked mid-call.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(state: &mut MockState, action: Action) {
        state.actions.push(RecordedAction {
            at: Instant::now(),
            action,
        });
    }
}

impl Actuator for MockActuator {
    fn set_position(&self, x: i32, y: i32) -> Result<()> {
        let mut state = self.lock();
        Self::record(&mut state, Action::SetPosition { x, y });
        if state.ignored_moves > 0 {
            state.ignored_moves -= 1;
        } else {
            state.position = (x, y);
        }
        Ok(())
    }

    fn position(&self) -> Result<(i32, i32)> {
        Ok(self.lock().position)
    }

    fn button(&self, button: MouseButton, pressed: bool) -> Result<()> {
        let mut state = self.lock();
        if state.fail_buttons {
            return Err(NamouseError::Actuation(format!(
                "{} button {} rejected",
                button,
                if pressed { "press" } else { "release" }
            )));
        }
        Self::record(&mut state, Action::Button { button, pressed });
        Ok(())
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<()> {
        Self::record(&mut self.lock(), Action::Scroll { dx, dy });
        Ok(())
    }

    fn key(&self, key: ResolvedKey, pressed: bool) -> Result<()> {
        Self::record(&mut self.lock(), Action::Key { key, pressed });
        Ok(())
    }

    fn screen_size(&self) -> Result<ScreenSize> {
        Ok(self.lock().screen)
    }
}

// =============================================================================
// System actuator
// =============================================================================

/// Actuator backed by the operating system input APIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemActuator;

impl SystemActuator {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "windows")]
mod system {
    use windows_sys::Win32::Foundation::POINT;
    use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYEVENTF_EXTENDEDKEY,
        KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, MOUSEEVENTF_HWHEEL, MOUSEEVENTF_LEFTDOWN,
        MOUSEEVENTF_LEFTUP, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_WHEEL,
        MOUSEINPUT,
    };
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        GetCursorPos, GetSystemMetrics, SetCursorPos, SM_CXSCREEN, SM_CYSCREEN,
    };

    use namouse_core::error::{NamouseError, Result};
    use namouse_core::types::{MouseButton, ResolvedKey, ScreenSize};

    use super::{Actuator, SystemActuator};
    use crate::keymap::{is_extended, virtual_key, WHEEL_DELTA};

    fn mouse_input(flags: u32, data: i32) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: 0,
                    dy: 0,
                    mouseData: data as u32,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn key_input(vk: u16, scan: u16, flags: u32) -> INPUT {
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: vk,
                    wScan: scan,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn send(inputs: &[INPUT]) -> Result<()> {
        if inputs.is_empty() {
            return Ok(());
        }
        let sent = unsafe {
            SendInput(
                inputs.len() as u32,
                inputs.as_ptr(),
                std::mem::size_of::<INPUT>() as i32,
            )
        };
        if sent as usize != inputs.len() {
            return Err(NamouseError::Actuation(format!(
                "SendInput only sent {} of {} events",
                sent,
                inputs.len()
            )));
        }
        Ok(())
    }

    impl Actuator for SystemActuator {
        fn set_position(&self, x: i32, y: i32) -> Result<()> {
            if unsafe { SetCursorPos(x, y) } == 0 {
                return Err(NamouseError::Actuation(format!(
                    "SetCursorPos({}, {}) failed",
                    x, y
                )));
            }
            Ok(())
        }

        fn position(&self) -> Result<(i32, i32)> {
            let mut point = POINT { x: 0, y: 0 };
            if unsafe { GetCursorPos(&mut point) } == 0 {
                return Err(NamouseError::Actuation("GetCursorPos failed".into()));
            }
            Ok((point.x, point.y))
        }

        fn button(&self, button: MouseButton, pressed: bool) -> Result<()> {
            let flags = match (button, pressed) {
                (MouseButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
                (MouseButton::Left, false) => MOUSEEVENTF_LEFTUP,
                (MouseButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
                (MouseButton::Right, false) => MOUSEEVENTF_RIGHTUP,
            };
            send(&[mouse_input(flags, 0)])
        }

        fn scroll(&self, dx: i32, dy: i32) -> Result<()> {
            let mut inputs = Vec::with_capacity(2);
            if dy != 0 {
                inputs.push(mouse_input(MOUSEEVENTF_WHEEL, dy * WHEEL_DELTA));
            }
            if dx != 0 {
                inputs.push(mouse_input(MOUSEEVENTF_HWHEEL, dx * WHEEL_DELTA));
            }
            send(&inputs)
        }

        fn key(&self, key: ResolvedKey, pressed: bool) -> Result<()> {
            let up = if pressed { 0 } else { KEYEVENTF_KEYUP };
            match key {
                ResolvedKey::Char(c) => {
                    let mut units = [0u16; 2];
                    let inputs: Vec<INPUT> = c
                        .encode_utf16(&mut units)
                        .iter()
                        .map(|unit| key_input(0, *unit, KEYEVENTF_UNICODE | up))
                        .collect();
                    send(&inputs)
                }
                ResolvedKey::Named(named) => {
                    let vk = virtual_key(named).ok_or_else(|| {
                        NamouseError::Actuation(format!("no virtual key for {}", named.name()))
                    })?;
                    let extended = if is_extended(named) {
                        KEYEVENTF_EXTENDEDKEY
                    } else {
                        0
                    };
                    send(&[key_input(vk, 0, extended | up)])
                }
            }
        }

        fn screen_size(&self) -> Result<ScreenSize> {
            let (width, height) =
                unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
            Ok(ScreenSize { width, height })
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn unavailable() -> NamouseError {
    NamouseError::Actuation("Input actuation is only available on Windows".into())
}

#[cfg(not(target_os = "windows"))]
impl Actuator for SystemActuator {
    fn set_position(&self, _x: i32, _y: i32) -> Result<()> {
        Err(unavailable())
    }

    fn position(&self) -> Result<(i32, i32)> {
        Err(unavailable())
    }

    fn button(&self, _button: MouseButton, _pressed: bool) -> Result<()> {
        Err(unavailable())
    }

    fn scroll(&self, _dx: i32, _dy: i32) -> Result<()> {
        Err(unavailable())
    }

    fn key(&self, _key: ResolvedKey, _pressed: bool) -> Result<()> {
        Err(unavailable())
    }

    fn screen_size(&self) -> Result<ScreenSize> {
        tracing::warn!("SystemActuator: screen metrics not available on this platform");
        Err(unavailable())
    }
}
