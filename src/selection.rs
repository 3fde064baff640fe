//! Two-corner rectangle selection state machine
//!
//! `Selection` is a plain `Copy` value. Every transition returns a new
//! selection, so a caller that keeps an older value never observes a change
//! underneath it. Drawing a preview is left to whoever watches the state.

use crate::types::{Point, Rectangle};

/// Progress of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionState {
    /// Neither corner picked
    Empty,
    /// First corner picked
    TopLeftSet,
    /// Both corners picked
    Complete,
}

/// The two picked corners of a target rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Selection {
    top_left: Point,
    bottom_right: Point,
}

impl Selection {
    /// A selection with both corners unset
    pub const EMPTY: Selection = Selection {
        top_left: Point::UNSET,
        bottom_right: Point::UNSET,
    };

    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Feed one picked pixel coordinate into the state machine
    ///
    /// - `Empty`: the point becomes the first corner.
    /// - `TopLeftSet`: the point becomes the second corner.
    /// - `Complete`: the selection starts over and the point is dropped.
    #[must_use]
    pub fn add_point(self, point: Point) -> Self {
        match self.state() {
            SelectionState::Empty => Self {
                top_left: point,
                bottom_right: Point::UNSET,
            },
            SelectionState::TopLeftSet => Self {
                top_left: self.top_left,
                bottom_right: point,
            },
            SelectionState::Complete => Self::EMPTY,
        }
    }

    /// Back to `Empty` from any state
    #[must_use]
    pub fn reset(self) -> Self {
        Self::EMPTY
    }

    #[must_use]
    pub fn is_top_left_set(&self) -> bool {
        self.top_left.is_set()
    }

    #[must_use]
    pub fn is_bottom_right_set(&self) -> bool {
        self.bottom_right.is_set()
    }

    /// Both corners differ from the sentinel in both coordinates
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_top_left_set() && self.is_bottom_right_set()
    }

    #[must_use]
    pub fn state(&self) -> SelectionState {
        if self.is_complete() {
            SelectionState::Complete
        } else if self.is_top_left_set() {
            SelectionState::TopLeftSet
        } else {
            SelectionState::Empty
        }
    }

    /// The raw corner pair, unset corners reported as the sentinel
    #[must_use]
    pub fn current_points(&self) -> (Point, Point) {
        (self.top_left, self.bottom_right)
    }

    /// Normalized rectangle once both corners are known
    #[must_use]
    pub fn rectangle(&self) -> Option<Rectangle> {
        self.is_complete()
            .then(|| Rectangle::from_points(self.top_left, self.bottom_right))
    }
}
