//! Input events
//!
//! Button events are pushed by the input driver through
//! `AppManager::dispatch_input` and land in the foreground application's
//! inbox. Applications drain it with `AppContext::poll_input`.

/// Handheld buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Select,
    Menu,
}

/// A button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pressed(Button),
    Released(Button),
}

impl InputEvent {
    pub fn button(&self) -> Button {
        match self {
            InputEvent::Pressed(b) | InputEvent::Released(b) => *b,
        }
    }

    pub fn is_press(&self) -> bool {
        matches!(self, InputEvent::Pressed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_reports_its_button() {
        assert_eq!(InputEvent::Pressed(Button::A).button(), Button::A);
        assert!(!InputEvent::Released(Button::Menu).is_press());
    }
}
