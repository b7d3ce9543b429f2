//! Keyboard bindings for tools and label selection.
//!
//! Bindings live in their own struct so a host application can remap
//! them; the defaults follow the editor's standard layout.

use crate::input::KeyCode;
use crate::tools::Tool;

/// Keybinding configuration for the editor.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    /// Hotkey for the Select tool
    pub tool_select: KeyCode,
    /// Hotkey for the Rectangle tool
    pub tool_rect: KeyCode,
    /// Hotkey for the Polygon tool
    pub tool_polygon: KeyCode,
    /// Hotkey for the Point tool
    pub tool_point: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            tool_select: KeyCode::V,
            tool_rect: KeyCode::R,
            tool_polygon: KeyCode::P,
            tool_point: KeyCode::O,
        }
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the tool that corresponds to a key press, if any.
    pub fn tool_for_key(&self, key: KeyCode) -> Option<Tool> {
        if key == self.tool_select {
            Some(Tool::Select)
        } else if key == self.tool_rect {
            Some(Tool::Rect)
        } else if key == self.tool_polygon {
            Some(Tool::Polygon)
        } else if key == self.tool_point {
            Some(Tool::Point)
        } else {
            None
        }
    }
}
