//! Interactive placement of the sheet corners.
//!
//! [`CornerPicker`] is the pointer-driven state machine behind a corner
//! picking surface, independent of any GUI toolkit. The host feeds it
//! pointer events in image pixel coordinates and reacts to the returned
//! [`PickerEvent`]s (for instance by enabling a "solve" action once
//! [`CornerPicker::can_solve`] holds).
//!
//! * Pressing on empty space starts a creation; the point is created at the
//!   release position if the pointer moved at most [`JITTER_THRESHOLD`]
//!   pixels (Manhattan distance) in between. No more than
//!   [`MAX_CONTROL_POINTS`] points are created.
//! * Pressing within [`CONTROL_POINT_RADIUS`] of a point starts dragging it;
//!   it follows move events and ends at the release position.

use crate::draw::{draw_contour, draw_disc, RED};
use crate::target::A4SheetOfPaper;
use image::{Rgb, RgbImage};
use nalgebra::Point2;

pub const MAX_CONTROL_POINTS: usize = 4;
pub const JITTER_THRESHOLD: i32 = 6;
pub const CONTROL_POINT_RADIUS: i32 = 8;

/// Stroke width of the contour overlay.
pub const CONTOUR_THICKNESS: u32 = 6;

const CONTROL_POINT_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const HOVERED_CONTROL_POINT_COLOR: Rgb<u8> = Rgb([0, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPoint {
    pub pos: Point2<i32>,
    pub radius: i32,
    pub under_mouse: bool,
}

impl ControlPoint {
    fn new(pos: Point2<i32>) -> Self {
        ControlPoint {
            pos,
            radius: CONTROL_POINT_RADIUS,
            under_mouse: false,
        }
    }

    fn contains(&self, pos: &Point2<i32>) -> bool {
        let offset = (self.pos - pos).cast::<f64>();
        offset.norm() <= self.radius as f64
    }
}

/// Notifications emitted by the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerEvent {
    ControlPointCreated,
    ControlPointsModified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
    Idle,
    Creating { press_pos: Point2<i32> },
    Dragging { index: usize },
}

#[derive(Debug, Clone)]
pub struct CornerPicker {
    control_points: Vec<ControlPoint>,
    state: PickerState,
}

impl Default for CornerPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl CornerPicker {
    /// An empty picker in the idle state.
    pub fn new() -> Self {
        CornerPicker {
            control_points: Vec::with_capacity(MAX_CONTROL_POINTS),
            state: PickerState::Idle,
        }
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    /// Control point positions in creation order.
    pub fn positions(&self) -> Vec<Point2<i32>> {
        self.control_points.iter().map(|cp| cp.pos).collect()
    }

    pub fn len(&self) -> usize {
        self.control_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.control_points.is_empty()
    }

    /// A contour needs at least three points.
    pub fn can_export_contour(&self) -> bool {
        self.control_points.len() > 2
    }

    /// Solving needs all four sheet corners.
    pub fn can_solve(&self) -> bool {
        self.control_points.len() == MAX_CONTROL_POINTS
    }

    /// The corners as an A4 sheet, once all four are placed.
    pub fn sheet(&self) -> Option<A4SheetOfPaper> {
        if !self.can_solve() {
            return None;
        }
        let points: Vec<Point2<f64>> = self
            .control_points
            .iter()
            .map(|cp| cp.pos.cast::<f64>())
            .collect();
        A4SheetOfPaper::from_points(&points).ok()
    }

    /// Handles a button press.
    ///
    /// A press within a control point's radius starts dragging that point.
    /// Otherwise, while fewer than [`MAX_CONTROL_POINTS`] exist, it starts a
    /// creation that completes on release. With all points placed, a press on
    /// empty space is ignored.
    ///
    /// # Arguments
    ///
    /// * `pos` - Pointer position in image pixels.
    pub fn pointer_down(&mut self, pos: Point2<i32>) {
        self.update_hover(&pos);

        if let Some(index) = self.control_points.iter().position(|cp| cp.under_mouse) {
            self.state = PickerState::Dragging { index };
        } else if self.control_points.len() < MAX_CONTROL_POINTS {
            self.state = PickerState::Creating { press_pos: pos };
        }
    }

    /// Handles a pointer move. Hover flags are only refreshed when idle and
    /// no button is held.
    pub fn pointer_move(&mut self, pos: Point2<i32>, button_pressed: bool) -> Vec<PickerEvent> {
        match self.state {
            PickerState::Creating { .. } => Vec::new(),
            PickerState::Dragging { index } => self.drag(index, pos),
            PickerState::Idle => {
                if !button_pressed {
                    self.update_hover(&pos);
                }
                Vec::new()
            }
        }
    }

    /// Handles a button release and returns to [`PickerState::Idle`].
    ///
    /// # Arguments
    ///
    /// * `pos` - Pointer position in image pixels.
    ///
    /// # Return Value
    ///
    /// [`PickerEvent::ControlPointCreated`] followed by
    /// [`PickerEvent::ControlPointsModified`] when a click created a point,
    /// [`PickerEvent::ControlPointsModified`] when a drag moved one, and
    /// nothing otherwise.
    pub fn pointer_up(&mut self, pos: Point2<i32>) -> Vec<PickerEvent> {
        let state = std::mem::replace(&mut self.state, PickerState::Idle);

        match state {
            PickerState::Creating { press_pos } => {
                let moved = pos - press_pos;
                if moved.x.abs() + moved.y.abs() <= JITTER_THRESHOLD {
                    self.control_points.push(ControlPoint::new(pos));
                    vec![
                        PickerEvent::ControlPointCreated,
                        PickerEvent::ControlPointsModified,
                    ]
                } else {
                    Vec::new()
                }
            }
            PickerState::Dragging { index } => self.drag(index, pos),
            PickerState::Idle => Vec::new(),
        }
    }

    /// Moves the control point at `index`, as if it had been dragged there.
    ///
    /// Out-of-range indices are ignored.
    pub fn set_control_point_position(
        &mut self,
        index: usize,
        pos: Point2<i32>,
    ) -> Vec<PickerEvent> {
        self.drag(index, pos)
    }

    /// Copies `background` and draws the contour through the control points on it.
    ///
    /// Control points are drawn as discs when `with_control_points` is set,
    /// hovered ones in a lighter color.
    pub fn render(&self, background: &RgbImage, with_control_points: bool) -> RgbImage {
        let mut image = background.clone();
        let points: Vec<Point2<f64>> = self
            .control_points
            .iter()
            .map(|cp| cp.pos.cast::<f64>())
            .collect();
        draw_contour(&mut image, &points, RED, CONTOUR_THICKNESS);

        if with_control_points {
            for cp in &self.control_points {
                let color = if cp.under_mouse {
                    HOVERED_CONTROL_POINT_COLOR
                } else {
                    CONTROL_POINT_COLOR
                };
                draw_disc(&mut image, &cp.pos.cast::<f64>(), cp.radius as f64, color);
            }
        }

        image
    }

    /// The background with the contour only, as exported to a file.
    pub fn picture_with_contour(&self, background: &RgbImage) -> RgbImage {
        self.render(background, false)
    }

    fn update_hover(&mut self, pos: &Point2<i32>) {
        for cp in &mut self.control_points {
            cp.under_mouse = cp.contains(pos);
        }
    }

    fn drag(&mut self, index: usize, pos: Point2<i32>) -> Vec<PickerEvent> {
        match self.control_points.get_mut(index) {
            Some(cp) if cp.pos != pos => {
                cp.pos = pos;
                vec![PickerEvent::ControlPointsModified]
            }
            _ => Vec::new(),
        }
    }
}
