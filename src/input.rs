//! Pointer and keyboard input types.
//!
//! The host shell (native window or browser canvas) translates its raw
//! events into these types before feeding them to the tool handlers.

use crate::model::Point;

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    V,
    R,
    P,
    O,
    Y,
    Z,
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    Delete,
    Backspace,
    Escape,
}

impl KeyCode {
    /// Map a digit key to the 0-based label position it selects.
    /// Keys 1-9 address positions 0-8; key 0 addresses position 9.
    pub fn digit_position(&self) -> Option<usize> {
        match self {
            KeyCode::Key1 => Some(0),
            KeyCode::Key2 => Some(1),
            KeyCode::Key3 => Some(2),
            KeyCode::Key4 => Some(3),
            KeyCode::Key5 => Some(4),
            KeyCode::Key6 => Some(5),
            KeyCode::Key7 => Some(6),
            KeyCode::Key8 => Some(7),
            KeyCode::Key9 => Some(8),
            KeyCode::Key0 => Some(9),
            _ => None,
        }
    }
}

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer buttons the editor distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

/// A pointer event in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down {
        pos: Point,
        button: PointerButton,
        modifiers: Modifiers,
    },
    Moved {
        pos: Point,
    },
    Up {
        pos: Point,
    },
    /// Double click with the primary button.
    DoubleClick {
        pos: Point,
    },
}
