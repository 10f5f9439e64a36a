//! Keyboard bindings.

use winit::keyboard::KeyCode;

use crate::light::LightStep;

/// What a key press asks the viewer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Light(LightStep),
    NextPart,
    /// Zero-based palette slot
    Palette(usize),
    Frame,
    Quit,
}

/// Map a physical key to its action.
pub fn action_for_key(key: KeyCode) -> Option<KeyAction> {
    let action = match key {
        KeyCode::ArrowUp => KeyAction::Light(LightStep::Up),
        KeyCode::ArrowDown => KeyAction::Light(LightStep::Down),
        KeyCode::ArrowLeft => KeyAction::Light(LightStep::Left),
        KeyCode::ArrowRight => KeyAction::Light(LightStep::Right),
        KeyCode::Tab => KeyAction::NextPart,
        KeyCode::KeyF => KeyAction::Frame,
        KeyCode::Escape => KeyAction::Quit,
        KeyCode::Digit1 | KeyCode::Numpad1 => KeyAction::Palette(0),
        KeyCode::Digit2 | KeyCode::Numpad2 => KeyAction::Palette(1),
        KeyCode::Digit3 | KeyCode::Numpad3 => KeyAction::Palette(2),
        KeyCode::Digit4 | KeyCode::Numpad4 => KeyAction::Palette(3),
        KeyCode::Digit5 | KeyCode::Numpad5 => KeyAction::Palette(4),
        KeyCode::Digit6 | KeyCode::Numpad6 => KeyAction::Palette(5),
        KeyCode::Digit7 | KeyCode::Numpad7 => KeyAction::Palette(6),
        KeyCode::Digit8 | KeyCode::Numpad8 => KeyAction::Palette(7),
        KeyCode::Digit9 | KeyCode::Numpad9 => KeyAction::Palette(8),
        _ => return None,
    };
    Some(action)
}

/// Whether the action may fire again on key repeat.
pub fn repeats(action: KeyAction) -> bool {
    matches!(action, KeyAction::Light(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_steer_the_light() {
        assert_eq!(action_for_key(KeyCode::ArrowUp), Some(KeyAction::Light(LightStep::Up)));
        assert_eq!(action_for_key(KeyCode::ArrowRight), Some(KeyAction::Light(LightStep::Right)));
        assert!(repeats(KeyAction::Light(LightStep::Left)));
    }

    #[test]
    fn digits_pick_palette_slots() {
        assert_eq!(action_for_key(KeyCode::Digit1), Some(KeyAction::Palette(0)));
        assert_eq!(action_for_key(KeyCode::Numpad9), Some(KeyAction::Palette(8)));
        assert!(!repeats(KeyAction::Palette(0)));
    }

    #[test]
    fn unbound_keys_do_nothing() {
        assert_eq!(action_for_key(KeyCode::KeyQ), None);
        assert_eq!(action_for_key(KeyCode::Digit0), None);
    }
}
