use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const RIGHT: Self = Self(1);
    pub const MIDDLE: Self = Self(2);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Accepts `left`/`right`/`middle` and the one-based `MouseN` form.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("left") {
            return Some(Self::LEFT);
        }
        if name.eq_ignore_ascii_case("right") {
            return Some(Self::RIGHT);
        }
        if name.eq_ignore_ascii_case("middle") {
            return Some(Self::MIDDLE);
        }
        parse_mouse_button(name)
    }
}

fn parse_mouse_button(name: &str) -> Option<MouseButton> {
    if name.len() < 5 || !name.is_char_boundary(5) {
        return None;
    }
    if !name[..5].eq_ignore_ascii_case("mouse") {
        return None;
    }
    let suffix = &name[5..];
    if suffix.is_empty() {
        return Some(MouseButton::LEFT);
    }
    let index = suffix.parse::<u8>().ok()?;
    Some(MouseButton::new(index.saturating_sub(1)))
}

/// Pointer input accumulated over one frame.
///
/// This is the only thing the camera controller looks at.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputFrame {
    /// Cursor movement since the previous frame, in pixels.
    pub delta: Vec2,
    /// Scroll accumulated this frame.
    pub scroll: Vec2,
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

impl InputFrame {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        match button {
            MouseButton::LEFT => self.left = true,
            MouseButton::RIGHT => self.right = true,
            MouseButton::MIDDLE => self.middle = true,
            _ => {}
        }
        self
    }
}

/// Tracks raw pointer events between frames.
///
/// Feed it events as they arrive, read [`frame`](Self::frame) once per
/// update, then call [`end_frame`](Self::end_frame).
#[derive(Debug, Default)]
pub struct PointerTracker {
    buttons: HashSet<MouseButton>,
    current: Option<Vec2>,
    last: Option<Vec2>,
    scroll: Vec2,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn button_pressed(&mut self, button: MouseButton) {
        self.buttons.insert(button);
    }

    pub fn button_released(&mut self, button: MouseButton) {
        self.buttons.remove(&button);
    }

    pub fn cursor_moved(&mut self, position: Vec2) {
        if self.last.is_none() {
            self.last = Some(position);
        }
        self.current = Some(position);
    }

    pub fn scrolled(&mut self, delta: Vec2) {
        self.scroll += delta;
    }

    /// Drops all held buttons, e.g. on focus loss.
    pub fn release_all(&mut self) {
        self.buttons.clear();
    }

    pub fn position(&self) -> Option<Vec2> {
        self.current
    }

    pub fn is_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    pub fn frame(&self) -> InputFrame {
        let delta = match (self.current, self.last) {
            (Some(current), Some(last)) => current - last,
            _ => Vec2::ZERO,
        };
        InputFrame {
            delta,
            scroll: self.scroll,
            left: self.is_down(MouseButton::LEFT),
            right: self.is_down(MouseButton::RIGHT),
            middle: self.is_down(MouseButton::MIDDLE),
        }
    }

    /// Latches the cursor position and clears the scroll accumulator.
    pub fn end_frame(&mut self) {
        self.last = self.current;
        self.scroll = Vec2::ZERO;
    }
}
