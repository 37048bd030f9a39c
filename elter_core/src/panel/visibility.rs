//! Hover-driven expand/collapse of a panel.
//!
//! A panel shows its full body while the pointer is over it or while its
//! toggle button is pinned; otherwise only the launcher button is drawn.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HoverVisibility {
    pinned: bool,
    pointer_inside: bool,
    closed: bool,
}

impl HoverVisibility {
    /// A newly opened panel starts pinned open
    pub fn opened() -> Self {
        HoverVisibility {
            pinned: true,
            pointer_inside: false,
            closed: false,
        }
    }

    pub fn pointer_entered(&mut self) {
        self.pointer_inside = true;
    }

    pub fn pointer_left(&mut self) {
        self.pointer_inside = false;
    }

    pub fn set_pinned(&mut self, pinned: bool) {
        if !self.closed {
            self.pinned = pinned;
        }
    }

    pub fn toggle_pinned(&mut self) {
        self.set_pinned(!self.pinned);
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.pinned = false;
        self.pointer_inside = false;
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_expanded(&self) -> bool {
        !self.closed && (self.pinned || self.pointer_inside)
    }
}
