//! Platform-agnostic keyboard shortcuts for the game controls

/// Action requested from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleRecording,
    SpeedUp,
    SpeedDown,
    MoreDrops,
    FewerDrops,
    /// Zero-based catalog index
    ToggleCategory(usize),
    ClearPlayfield,
}

/// Key mapping configuration
#[derive(Clone)]
pub struct KeyBindings {
    pub toggle_recording: String,
    pub speed_up: String,
    pub speed_down: String,
    pub more_drops: String,
    pub fewer_drops: String,
    pub clear: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            toggle_recording: "r".to_string(),
            speed_up: "ArrowUp".to_string(),
            speed_down: "ArrowDown".to_string(),
            more_drops: "ArrowRight".to_string(),
            fewer_drops: "ArrowLeft".to_string(),
            clear: "Escape".to_string(),
        }
    }
}

/// Maps DOM-style key names (`KeyboardEvent.key`) to commands
#[derive(Clone)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl Default for InputProcessor {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn command_for_key(&self, key: &str) -> Option<Command> {
        let b = &self.bindings;
        if key.eq_ignore_ascii_case(&b.toggle_recording) {
            Some(Command::ToggleRecording)
        } else if key == b.speed_up {
            Some(Command::SpeedUp)
        } else if key == b.speed_down {
            Some(Command::SpeedDown)
        } else if key == b.more_drops {
            Some(Command::MoreDrops)
        } else if key == b.fewer_drops {
            Some(Command::FewerDrops)
        } else if key == b.clear {
            Some(Command::ClearPlayfield)
        } else {
            category_from_key(key).map(Command::ToggleCategory)
        }
    }
}

/// Digit row: "1".."9" select categories 0..8, "0" selects 9
fn category_from_key(key: &str) -> Option<usize> {
    match key {
        "0" => Some(9),
        "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9" => key.parse::<usize>().ok().map(|d| d - 1),
        _ => None,
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use winit::keyboard::{Key, NamedKey};

    /// DOM key name for a winit logical key
    pub fn key_name(key: &Key) -> Option<String> {
        match key {
            Key::Character(c) => Some(c.to_string()),
            Key::Named(NamedKey::ArrowUp) => Some("ArrowUp".to_string()),
            Key::Named(NamedKey::ArrowDown) => Some("ArrowDown".to_string()),
            Key::Named(NamedKey::ArrowLeft) => Some("ArrowLeft".to_string()),
            Key::Named(NamedKey::ArrowRight) => Some("ArrowRight".to_string()),
            Key::Named(NamedKey::Escape) => Some("Escape".to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let input = InputProcessor::default();
        assert_eq!(input.command_for_key("r"), Some(Command::ToggleRecording));
        assert_eq!(input.command_for_key("R"), Some(Command::ToggleRecording));
        assert_eq!(input.command_for_key("ArrowUp"), Some(Command::SpeedUp));
        assert_eq!(input.command_for_key("ArrowLeft"), Some(Command::FewerDrops));
        assert_eq!(input.command_for_key("Escape"), Some(Command::ClearPlayfield));
        assert_eq!(input.command_for_key("x"), None);
    }

    #[test]
    fn test_digit_row() {
        let input = InputProcessor::default();
        assert_eq!(input.command_for_key("1"), Some(Command::ToggleCategory(0)));
        assert_eq!(input.command_for_key("9"), Some(Command::ToggleCategory(8)));
        assert_eq!(input.command_for_key("0"), Some(Command::ToggleCategory(9)));
        assert_eq!(input.command_for_key("-"), None);
    }
}
