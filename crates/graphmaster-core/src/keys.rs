//! Keyboard mapping for the preview pane.

use kurbo::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::ViewerConfig;

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// What a key press asks the viewer to do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KeyAction {
    /// Pan by a screen-space delta.
    Pan(Vec2),
    /// Zoom about the viewport centre.
    Zoom(f64),
    /// Render the document and fit it to the view.
    RenderAndFit,
}

/// Map a key press in the preview pane to an action.
///
/// `key` uses DOM `KeyboardEvent.key` names. Arrow keys move the content
/// the opposite way, like scrolling a window over it.
pub fn preview_key_action(key: &str, config: &ViewerConfig) -> Option<KeyAction> {
    let step = config.pan_step;
    match key {
        "ArrowUp" => Some(KeyAction::Pan(Vec2::new(0.0, step))),
        "ArrowDown" => Some(KeyAction::Pan(Vec2::new(0.0, -step))),
        "ArrowLeft" => Some(KeyAction::Pan(Vec2::new(step, 0.0))),
        "ArrowRight" => Some(KeyAction::Pan(Vec2::new(-step, 0.0))),
        "+" | "=" => Some(KeyAction::Zoom(config.zoom_step)),
        "-" | "_" => Some(KeyAction::Zoom(1.0 / config.zoom_step)),
        _ => None,
    }
}

/// Map a key press anywhere in the window to an action.
pub fn global_key_action(key: &str, modifiers: Modifiers) -> Option<KeyAction> {
    if modifiers.command() && key == "Enter" {
        return Some(KeyAction::RenderAndFit);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_keys_pan() {
        let config = ViewerConfig::default();
        assert_eq!(
            preview_key_action("ArrowUp", &config),
            Some(KeyAction::Pan(Vec2::new(0.0, 50.0)))
        );
        assert_eq!(
            preview_key_action("ArrowRight", &config),
            Some(KeyAction::Pan(Vec2::new(-50.0, 0.0)))
        );
    }

    #[test]
    fn test_zoom_keys() {
        let config = ViewerConfig::default();
        assert_eq!(preview_key_action("=", &config), Some(KeyAction::Zoom(1.2)));
        match preview_key_action("_", &config) {
            Some(KeyAction::Zoom(f)) => assert!((f - 1.0 / 1.2).abs() < f64::EPSILON),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unmapped_key_passes_through() {
        assert_eq!(preview_key_action("a", &ViewerConfig::default()), None);
    }

    #[test]
    fn test_render_shortcut_needs_command() {
        assert_eq!(global_key_action("Enter", Modifiers::default()), None);
        let cmd = Modifiers {
            meta: true,
            ..Default::default()
        };
        assert_eq!(global_key_action("Enter", cmd), Some(KeyAction::RenderAndFit));
    }
}
