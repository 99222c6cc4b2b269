//! Input events fed to the engine and events it reports back to the host.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Keyboard modifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub logo: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        logo: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    /// Modifiers that turn the wheel into rotation.
    pub fn rotates(&self) -> bool {
        self.ctrl || self.alt || self.shift
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Char(char),
}

/// Pointer, wheel and keyboard input in surface pixels (y down).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    MouseMove {
        x: f32,
        y: f32,
    },
    MouseDown {
        x: f32,
        y: f32,
        button: MouseButton,
    },
    MouseUp {
        x: f32,
        y: f32,
        button: MouseButton,
    },
    /// Pointer left the surface
    MouseLeave,
    Scroll {
        x: f32,
        y: f32,
        /// Vertical delta in pixels (positive = down)
        delta_y: f32,
        modifiers: Modifiers,
    },
    KeyDown {
        key: Key,
        modifiers: Modifiers,
    },
}

impl Event {
    pub fn coords(&self) -> Option<(f32, f32)> {
        match self {
            Event::MouseMove { x, y }
            | Event::MouseDown { x, y, .. }
            | Event::MouseUp { x, y, .. }
            | Event::Scroll { x, y, .. } => Some((*x, *y)),
            Event::MouseLeave | Event::KeyDown { .. } => None,
        }
    }
}

/// Hover information for the node under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub label: String,
    /// Pointer position in surface pixels
    pub x: f32,
    pub y: f32,
}

/// Events reported to the host, drained with `Viewer::take_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A layout computation started or finished. `modal` asks the host to
    /// block input while it runs.
    Loading { active: bool, modal: bool },
    /// Dismissible warning for the user.
    Notification { message: String, persistent: bool },
    /// Current zoom, for an external compass or cube indicator.
    ZoomChanged(f32),
    /// Tooltip to show, or `None` to hide it.
    Tooltip(Option<Tooltip>),
    /// Node selected by a click.
    Selected { node: usize, label: String },
    /// The renderer hit an unrecoverable error; show the message instead.
    Fatal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotating_modifiers() {
        assert!(!Modifiers::NONE.rotates());
        assert!(Modifiers::CTRL.rotates());
        let logo = Modifiers {
            logo: true,
            ..Modifiers::default()
        };
        assert!(!logo.rotates());
    }

    #[test]
    fn test_coords() {
        assert_eq!(Event::MouseMove { x: 1.0, y: 2.0 }.coords(), Some((1.0, 2.0)));
        assert_eq!(Event::MouseLeave.coords(), None);
    }
}
