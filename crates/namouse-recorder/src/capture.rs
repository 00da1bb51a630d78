//! Input capture seam.
//!
//! A capture implementation forwards raw pointer and keyboard input, stamped
//! with the instant it was observed, into an `InputSink`. The session actor
//! owns the receiving end, so every input source is serialized through one
//! owner.
//!
//! On Windows, `SystemCapture` uses `rdev` to listen to global input. On other
//! platforms it is a stub that refuses to start.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;

use namouse_core::error::{NamouseError, Result};
use namouse_core::types::{Key, MouseButton};

/// Raw input as reported by a platform listener.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    Move {
        x: i32,
        y: i32,
    },
    Click {
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    },
    Scroll {
        x: i32,
        y: i32,
        dx: i32,
        dy: i32,
    },
    Key {
        key: Key,
        pressed: bool,
    },
}

/// A raw input together with the instant it was observed.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedInput {
    pub at: Instant,
    pub input: RawInput,
}

impl CapturedInput {
    pub fn now(input: RawInput) -> Self {
        Self {
            at: Instant::now(),
            input,
        }
    }
}

/// Channel into which capture implementations push input.
pub type InputSink = mpsc::UnboundedSender<CapturedInput>;

/// A source of global input.
pub trait InputCapture: Send {
    /// Start delivering input into `sink`. Calling `start` while already
    /// running replaces the sink.
    fn start(&mut self, sink: InputSink) -> Result<()>;

    /// Stop delivering input.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

// =============================================================================
// Mock capture
// =============================================================================

#[derive(Debug, Default)]
struct MockCaptureState {
    sink: Option<InputSink>,
    fail_with: Option<String>,
}

/// In-process capture for tests and headless use.
///
/// Clones share state: keep one clone to `emit` input while the session owns
/// the other.
#[derive(Debug, Clone, Default)]
pub struct MockCapture {
    state: Arc<Mutex<MockCaptureState>>,
}

impl MockCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capture whose `start` always fails with `reason`.
    pub fn failing(reason: &str) -> Self {
        let capture = Self::default();
        if let Ok(mut state) = capture.state.lock() {
            state.fail_with = Some(reason.to_string());
        }
        capture
    }

    /// Deliver `input` stamped with the current instant. Returns `false` if
    /// the capture is not running.
    pub fn emit(&self, input: RawInput) -> bool {
        self.emit_at(Instant::now(), input)
    }

    /// Deliver `input` stamped with `at`.
    pub fn emit_at(&self, at: Instant, input: RawInput) -> bool {
        let Ok(state) = self.state.lock() else {
            return false;
        };
        match &state.sink {
            Some(sink) => sink.send(CapturedInput { at, input }).is_ok(),
            None => false,
        }
    }
}

impl InputCapture for MockCapture {
    fn start(&mut self, sink: InputSink) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| NamouseError::Capture(format!("Capture mutex poisoned: {}", e)))?;
        if let Some(reason) = &state.fail_with {
            return Err(NamouseError::Capture(reason.clone()));
        }
        state.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.sink = None;
        }
    }

    fn is_running(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.sink.is_some())
            .unwrap_or(false)
    }
}

// =============================================================================
// System capture
// =============================================================================

/// Global input listener backed by the operating system.
pub struct SystemCapture {
    #[cfg(target_os = "windows")]
    shared: Arc<Mutex<Option<InputSink>>>,
    #[cfg(target_os = "windows")]
    listener: Option<std::thread::JoinHandle<()>>,
}

impl SystemCapture {
    #[cfg(target_os = "windows")]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(None)),
            listener: None,
        }
    }

    #[cfg(not(target_os = "windows"))]
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for SystemCapture {
    fn default() -> Self {
        Self::new()
    }
}

/// Names key events the way script files do: the typed character for
/// printable keys, a symbolic name otherwise.
///
/// Listeners only report typed text on presses, so the name chosen for a
/// press is remembered per physical key `K` and reused for its release.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
#[derive(Debug)]
pub(crate) struct KeyNames<K> {
    held: Vec<(K, String)>,
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
impl<K: PartialEq> KeyNames<K> {
    pub(crate) fn new() -> Self {
        Self { held: Vec::new() }
    }

    /// `typed` is the text the press produced, `fallback` the key's fixed name.
    pub(crate) fn press(
        &mut self,
        code: K,
        typed: Option<&str>,
        fallback: Option<&str>,
    ) -> Option<Key> {
        // Auto-repeat keeps the name of the first press.
        if let Some((_, name)) = self.held.iter().find(|(held, _)| *held == code) {
            return Some(Key::from_name(name));
        }
        let name = typed_char(typed).or_else(|| fallback.map(str::to_string))?;
        let key = Key::from_name(&name);
        self.held.push((code, name));
        Some(key)
    }

    pub(crate) fn release(&mut self, code: &K, fallback: Option<&str>) -> Option<Key> {
        match self.held.iter().position(|(held, _)| held == code) {
            Some(index) => Some(Key::from_name(&self.held.swap_remove(index).1)),
            None => fallback.map(Key::from_name),
        }
    }
}

/// A single printable, non-whitespace character.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn typed_char(typed: Option<&str>) -> Option<String> {
    let mut chars = typed?.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() && !c.is_whitespace() => Some(c.to_string()),
        _ => None,
    }
}

#[cfg(target_os = "windows")]
impl InputCapture for SystemCapture {
    fn start(&mut self, sink: InputSink) -> Result<()> {
        use std::time::Duration;

        {
            let mut shared = self
                .shared
                .lock()
                .map_err(|e| NamouseError::Capture(format!("Capture mutex poisoned: {}", e)))?;
            *shared = Some(sink);
        }

        // rdev cannot unhook a listener, so a single listener thread lives for
        // the rest of the process and forwarding is toggled through `shared`.
        if self.listener.is_none() {
            let (ready_tx, ready_rx) = std::sync::mpsc::channel::<String>();
            let shared = Arc::clone(&self.shared);
            let handle = std::thread::Builder::new()
                .name("namouse-capture".into())
                .spawn(move || {
                    let mut listener = system::Listener::new(shared);
                    if let Err(e) = rdev::listen(move |event| listener.handle(event)) {
                        let _ = ready_tx.send(format!("{:?}", e));
                    }
                })?;

            // A hook failure is reported almost immediately; silence means the
            // listener is up.
            if let Ok(reason) = ready_rx.recv_timeout(Duration::from_millis(250)) {
                if let Ok(mut shared) = self.shared.lock() {
                    *shared = None;
                }
                return Err(NamouseError::Capture(format!(
                    "Failed to start input listener: {}",
                    reason
                )));
            }
            self.listener = Some(handle);
            tracing::info!("Global input listener started");
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            *shared = None;
        }
    }

    fn is_running(&self) -> bool {
        self.listener.is_some()
            && self
                .shared
                .lock()
                .map(|shared| shared.is_some())
                .unwrap_or(false)
    }
}

#[cfg(not(target_os = "windows"))]
impl InputCapture for SystemCapture {
    fn start(&mut self, _sink: InputSink) -> Result<()> {
        tracing::warn!("SystemCapture: global input capture not available on this platform");
        Err(NamouseError::Capture(
            "Global input capture is only available on Windows".into(),
        ))
    }

    fn stop(&mut self) {}

    fn is_running(&self) -> bool {
        false
    }
}

#[cfg(target_os = "windows")]
mod system {
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use namouse_core::types::MouseButton;

    use super::{CapturedInput, InputSink, KeyNames, RawInput};

    /// Translates rdev events into `RawInput`.
    ///
    /// rdev reports button and wheel events without a position, so the last
    /// pointer position is tracked here.
    pub(super) struct Listener {
        shared: Arc<Mutex<Option<InputSink>>>,
        keys: KeyNames<rdev::Key>,
        x: i32,
        y: i32,
    }

    impl Listener {
        pub(super) fn new(shared: Arc<Mutex<Option<InputSink>>>) -> Self {
            Self {
                shared,
                keys: KeyNames::new(),
                x: 0,
                y: 0,
            }
        }

        pub(super) fn handle(&mut self, event: rdev::Event) {
            let at = Instant::now();
            let input = match event.event_type {
                rdev::EventType::MouseMove { x, y } => {
                    self.x = x as i32;
                    self.y = y as i32;
                    RawInput::Move {
                        x: self.x,
                        y: self.y,
                    }
                }
                rdev::EventType::ButtonPress(button) => RawInput::Click {
                    x: self.x,
                    y: self.y,
                    button: map_button(button),
                    pressed: true,
                },
                rdev::EventType::ButtonRelease(button) => RawInput::Click {
                    x: self.x,
                    y: self.y,
                    button: map_button(button),
                    pressed: false,
                },
                rdev::EventType::Wheel { delta_x, delta_y } => RawInput::Scroll {
                    x: self.x,
                    y: self.y,
                    dx: delta_x as i32,
                    dy: delta_y as i32,
                },
                rdev::EventType::KeyPress(key) => {
                    match self.keys.press(key, event.name.as_deref(), key_name(key)) {
                        Some(key) => RawInput::Key { key, pressed: true },
                        None => return,
                    }
                }
                rdev::EventType::KeyRelease(key) => match self.keys.release(&key, key_name(key)) {
                    Some(key) => RawInput::Key {
                        key,
                        pressed: false,
                    },
                    None => return,
                },
            };

            if let Ok(shared) = self.shared.lock() {
                if let Some(sink) = shared.as_ref() {
                    let _ = sink.send(CapturedInput { at, input });
                }
            }
        }
    }

    fn map_button(button: rdev::Button) -> MouseButton {
        match button {
            rdev::Button::Left => MouseButton::Left,
            _ => MouseButton::Right,
        }
    }

    /// Fixed name of a key: its unshifted character, or a symbolic name.
    fn key_name(key: rdev::Key) -> Option<&'static str> {
        use rdev::Key as K;

        let name = match key {
            K::Alt => "alt_l",
            K::AltGr => "alt_gr",
            K::Backspace => "backspace",
            K::CapsLock => "caps_lock",
            K::ControlLeft => "ctrl_l",
            K::ControlRight => "ctrl_r",
            K::Delete => "delete",
            K::DownArrow => "down",
            K::End => "end",
            K::Escape => "esc",
            K::F1 => "f1",
            K::F2 => "f2",
            K::F3 => "f3",
            K::F4 => "f4",
            K::F5 => "f5",
            K::F6 => "f6",
            K::F7 => "f7",
            K::F8 => "f8",
            K::F9 => "f9",
            K::F10 => "f10",
            K::F11 => "f11",
            K::F12 => "f12",
            K::Home => "home",
            K::Insert => "insert",
            K::LeftArrow => "left",
            K::MetaLeft => "cmd",
            K::MetaRight => "cmd_r",
            K::NumLock => "num_lock",
            K::PageDown => "page_down",
            K::PageUp => "page_up",
            K::Pause => "pause",
            K::PrintScreen => "print_screen",
            K::Return => "enter",
            K::RightArrow => "right",
            K::ScrollLock => "scroll_lock",
            K::ShiftLeft => "shift",
            K::ShiftRight => "shift_r",
            K::Space => "space",
            K::Tab => "tab",
            K::UpArrow => "up",
            K::KeyA => "a",
            K::KeyB => "b",
            K::KeyC => "c",
            K::KeyD => "d",
            K::KeyE => "e",
            K::KeyF => "f",
            K::KeyG => "g",
            K::KeyH => "h",
            K::KeyI => "i",
            K::KeyJ => "j",
            K::KeyK => "k",
            K::KeyL => "l",
            K::KeyM => "m",
            K::KeyN => "n",
            K::KeyO => "o",
            K::KeyP => "p",
            K::KeyQ => "q",
            K::KeyR => "r",
            K::KeyS => "s",
            K::KeyT => "t",
            K::KeyU => "u",
            K::KeyV => "v",
            K::KeyW => "w",
            K::KeyX => "x",
            K::KeyY => "y",
            K::KeyZ => "z",
            K::Num0 | K::Kp0 => "0",
            K::Num1 | K::Kp1 => "1",
            K::Num2 | K::Kp2 => "2",
            K::Num3 | K::Kp3 => "3",
            K::Num4 | K::Kp4 => "4",
            K::Num5 | K::Kp5 => "5",
            K::Num6 | K::Kp6 => "6",
            K::Num7 | K::Kp7 => "7",
            K::Num8 | K::Kp8 => "8",
            K::Num9 | K::Kp9 => "9",
            K::BackQuote => "`",
            K::Minus | K::KpMinus => "-",
            K::Equal => "=",
            K::LeftBracket => "[",
            K::RightBracket => "]",
            K::BackSlash | K::IntlBackslash => "\\",
            K::SemiColon => ";",
            K::Quote => "'",
            K::Comma => ",",
            K::Dot => ".",
            K::Slash | K::KpDivide => "/",
            K::KpPlus => "+",
            K::KpMultiply => "*",
            K::KpReturn => "enter",
            K::KpDelete => "delete",
            _ => return None,
        };
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_capture_delivers_after_start() {
        let mut capture = MockCapture::new();
        let handle = capture.clone();
        assert!(!handle.emit(RawInput::Move { x: 1, y: 2 }));

        let (tx, mut rx) = mpsc::unbounded_channel();
        capture.start(tx).unwrap();
        assert!(capture.is_running());
        assert!(handle.emit(RawInput::Move { x: 1, y: 2 }));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.input, RawInput::Move { x: 1, y: 2 });
    }

    #[test]
    fn test_mock_capture_stop() {
        let mut capture = MockCapture::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        capture.start(tx).unwrap();
        capture.stop();
        assert!(!capture.is_running());
        assert!(!capture.emit(RawInput::Move { x: 0, y: 0 }));
    }

    #[test]
    fn test_mock_capture_failing() {
        let mut capture = MockCapture::failing("no hook");
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = capture.start(tx).unwrap_err();
        assert!(matches!(err, NamouseError::Capture(_)));
        assert!(err.to_string().contains("no hook"));
        assert!(!capture.is_running());
    }

    #[test]
    fn test_emit_at_preserves_instant() {
        let mut capture = MockCapture::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        capture.start(tx).unwrap();

        let at = Instant::now();
        capture.emit_at(
            at,
            RawInput::Key {
                key: Key::Char('a'),
                pressed: true,
            },
        );
        assert_eq!(rx.try_recv().unwrap().at, at);
    }

    #[test]
    fn test_release_reuses_typed_name() {
        let mut names = KeyNames::new();
        assert_eq!(names.press(65u32, Some("A"), Some("a")), Some(Key::Char('A')));
        // Releases carry no typed text.
        assert_eq!(names.release(&65, Some("a")), Some(Key::Char('A')));
        assert_eq!(names.release(&65, Some("a")), Some(Key::Char('a')));
    }

    #[test]
    fn test_control_text_falls_back_to_key_name() {
        let mut names = KeyNames::new();
        // Ctrl+C reports the ETX control character as its text.
        assert_eq!(names.press(67u32, Some("\u{3}"), Some("c")), Some(Key::Char('c')));
        assert_eq!(names.release(&67, Some("c")), Some(Key::Char('c')));
    }

    #[test]
    fn test_symbolic_keys_pair_up() {
        let mut names = KeyNames::new();
        let press = names.press(1u32, None, Some("shift")).unwrap();
        let release = names.release(&1, Some("shift")).unwrap();
        assert_eq!(press, release);
        assert_eq!(press, Key::from_name("shift"));
    }

    #[test]
    fn test_unnamed_keys_are_skipped() {
        let mut names = KeyNames::<u32>::new();
        assert_eq!(names.press(9, None, None), None);
        assert_eq!(names.press(9, Some(" "), None), None);
        assert_eq!(names.release(&9, None), None);
    }

    #[test]
    fn test_auto_repeat_keeps_first_name() {
        let mut names = KeyNames::new();
        assert_eq!(names.press(50u32, Some("2"), Some("2")), Some(Key::Char('2')));
        // Shift pressed while the key is held changes the typed text.
        assert_eq!(names.press(50, Some("@"), Some("2")), Some(Key::Char('2')));
        assert_eq!(names.release(&50, Some("2")), Some(Key::Char('2')));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_system_capture_stub_refuses_to_start() {
        let mut capture = SystemCapture::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = capture.start(tx).unwrap_err();
        assert!(err.to_string().contains("only available on Windows"));
        assert!(!capture.is_running());
    }
}
