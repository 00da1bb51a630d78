//! Windows virtual-key codes for symbolic keys.
//!
//! Printable characters are sent as Unicode input and need no entry here.
//! The table is plain data so it builds and is tested on every platform.

use namouse_core::types::NamedKey;

/// One wheel notch, as `SendInput` expects it in `mouseData`.
pub const WHEEL_DELTA: i32 = 120;

pub const VK_BACK: u16 = 0x08;
pub const VK_TAB: u16 = 0x09;
pub const VK_RETURN: u16 = 0x0D;
pub const VK_SHIFT: u16 = 0x10;
pub const VK_CONTROL: u16 = 0x11;
pub const VK_MENU: u16 = 0x12;
pub const VK_PAUSE: u16 = 0x13;
pub const VK_CAPITAL: u16 = 0x14;
pub const VK_ESCAPE: u16 = 0x1B;
pub const VK_SPACE: u16 = 0x20;
pub const VK_PRIOR: u16 = 0x21;
pub const VK_NEXT: u16 = 0x22;
pub const VK_END: u16 = 0x23;
pub const VK_HOME: u16 = 0x24;
pub const VK_LEFT: u16 = 0x25;
pub const VK_UP: u16 = 0x26;
pub const VK_RIGHT: u16 = 0x27;
pub const VK_DOWN: u16 = 0x28;
pub const VK_SNAPSHOT: u16 = 0x2C;
pub const VK_INSERT: u16 = 0x2D;
pub const VK_DELETE: u16 = 0x2E;
pub const VK_LWIN: u16 = 0x5B;
pub const VK_RWIN: u16 = 0x5C;
pub const VK_APPS: u16 = 0x5D;
pub const VK_F1: u16 = 0x70;
pub const VK_NUMLOCK: u16 = 0x90;
pub const VK_SCROLL: u16 = 0x91;
pub const VK_LSHIFT: u16 = 0xA0;
pub const VK_RSHIFT: u16 = 0xA1;
pub const VK_LCONTROL: u16 = 0xA2;
pub const VK_RCONTROL: u16 = 0xA3;
pub const VK_LMENU: u16 = 0xA4;
pub const VK_RMENU: u16 = 0xA5;

/// Virtual-key code for a symbolic key.
///
/// Returns `None` only for function keys outside F1..=F24.
pub fn virtual_key(key: NamedKey) -> Option<u16> {
    let vk = match key {
        NamedKey::Alt => VK_MENU,
        NamedKey::AltLeft => VK_LMENU,
        NamedKey::AltRight | NamedKey::AltGr => VK_RMENU,
        NamedKey::Backspace => VK_BACK,
        NamedKey::CapsLock => VK_CAPITAL,
        NamedKey::Cmd | NamedKey::CmdLeft => VK_LWIN,
        NamedKey::CmdRight => VK_RWIN,
        NamedKey::Ctrl => VK_CONTROL,
        NamedKey::CtrlLeft => VK_LCONTROL,
        NamedKey::CtrlRight => VK_RCONTROL,
        NamedKey::Delete => VK_DELETE,
        NamedKey::Down => VK_DOWN,
        NamedKey::End => VK_END,
        NamedKey::Enter => VK_RETURN,
        NamedKey::Esc => VK_ESCAPE,
        NamedKey::F(n) if (1..=24).contains(&n) => VK_F1 + u16::from(n - 1),
        NamedKey::F(_) => return None,
        NamedKey::Home => VK_HOME,
        NamedKey::Insert => VK_INSERT,
        NamedKey::Left => VK_LEFT,
        NamedKey::Menu => VK_APPS,
        NamedKey::NumLock => VK_NUMLOCK,
        NamedKey::PageDown => VK_NEXT,
        NamedKey::PageUp => VK_PRIOR,
        NamedKey::Pause => VK_PAUSE,
        NamedKey::PrintScreen => VK_SNAPSHOT,
        NamedKey::Right => VK_RIGHT,
        NamedKey::ScrollLock => VK_SCROLL,
        NamedKey::Shift => VK_SHIFT,
        NamedKey::ShiftLeft => VK_LSHIFT,
        NamedKey::ShiftRight => VK_RSHIFT,
        NamedKey::Space => VK_SPACE,
        NamedKey::Tab => VK_TAB,
        NamedKey::Up => VK_UP,
    };
    Some(vk)
}

/// Keys that need `KEYEVENTF_EXTENDEDKEY` to reach the right physical key.
pub fn is_extended(key: NamedKey) -> bool {
    matches!(
        key,
        NamedKey::AltRight
            | NamedKey::AltGr
            | NamedKey::CtrlRight
            | NamedKey::Cmd
            | NamedKey::CmdLeft
            | NamedKey::CmdRight
            | NamedKey::Menu
            | NamedKey::Delete
            | NamedKey::Insert
            | NamedKey::Home
            | NamedKey::End
            | NamedKey::PageUp
            | NamedKey::PageDown
            | NamedKey::Left
            | NamedKey::Right
            | NamedKey::Up
            | NamedKey::Down
            | NamedKey::NumLock
            | NamedKey::PrintScreen
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_keys() {
        assert_eq!(virtual_key(NamedKey::F(1)), Some(0x70));
        assert_eq!(virtual_key(NamedKey::F(12)), Some(0x7B));
        assert_eq!(virtual_key(NamedKey::F(24)), Some(0x87));
        assert_eq!(virtual_key(NamedKey::F(0)), None);
        assert_eq!(virtual_key(NamedKey::F(25)), None);
    }

    #[test]
    fn test_common_keys() {
        assert_eq!(virtual_key(NamedKey::Enter), Some(0x0D));
        assert_eq!(virtual_key(NamedKey::Esc), Some(0x1B));
        assert_eq!(virtual_key(NamedKey::Space), Some(0x20));
        assert_eq!(virtual_key(NamedKey::PageDown), Some(0x22));
        assert_eq!(virtual_key(NamedKey::ShiftRight), Some(0xA1));
        assert_eq!(virtual_key(NamedKey::AltGr), Some(0xA5));
    }

    #[test]
    fn test_every_named_key_resolves_from_its_name() {
        for name in [
            "alt", "alt_l", "alt_r", "alt_gr", "backspace", "caps_lock", "cmd", "cmd_l",
            "cmd_r", "ctrl", "ctrl_l", "ctrl_r", "delete", "down", "end", "enter", "esc",
            "home", "insert", "left", "menu", "num_lock", "page_down", "page_up", "pause",
            "print_screen", "right", "scroll_lock", "shift", "shift_l", "shift_r", "space",
            "tab", "up", "f1", "f24",
        ] {
            let key = NamedKey::from_name(name).unwrap();
            assert!(virtual_key(key).is_some(), "no virtual key for {}", name);
        }
    }

    #[test]
    fn test_extended_keys() {
        assert!(is_extended(NamedKey::Left));
        assert!(is_extended(NamedKey::CtrlRight));
        assert!(!is_extended(NamedKey::CtrlLeft));
        assert!(!is_extended(NamedKey::Enter));
    }
}
