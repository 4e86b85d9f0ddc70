//! Interactive column resizing.
//!
//! A resize gesture has two paths. While the pointer moves, the new width
//! goes into a visual overlay ([`ColumnLayout::preview_width`]) that the
//! renderer reads directly; column state and persistence are untouched.
//! Only on release is the final width committed, and only if it changed.

use std::time::Instant;

use tracing::{debug, trace};

use super::column::Column;
use super::timing::Throttle;

/// A committed width change produced by the end of a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthCommit {
    pub column: usize,
    pub width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DragGesture {
    column: usize,
    start_x: i64,
    start_width: u32,
    min_width: u32,
    max_width: u32,
    current_width: u32,
    last_x: i64,
}

impl DragGesture {
    fn width_at(&self, x: i64) -> u32 {
        let proposed = self.start_width as i64 + (x - self.start_x);
        proposed.clamp(self.min_width as i64, self.max_width as i64) as u32
    }
}

/// Resize state machine: `Idle` or `Dragging`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeState {
    #[default]
    Idle,
    Dragging {
        column: usize,
    },
}

/// Tracks the container width and the resize gesture in progress.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    container_width: u32,
    gesture: Option<DragGesture>,
    throttle: Throttle,
}

impl ColumnLayout {
    pub fn new(container_width: u32) -> Self {
        Self {
            container_width,
            gesture: None,
            throttle: Throttle::default(),
        }
    }

    /// Use a custom frame interval for drag updates.
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn container_width(&self) -> u32 {
        self.container_width
    }

    /// Update the measured container width (on viewport resize).
    pub fn set_container_width(&mut self, width: u32) {
        self.container_width = width;
    }

    pub fn state(&self) -> ResizeState {
        match self.gesture {
            Some(g) => ResizeState::Dragging { column: g.column },
            None => ResizeState::Idle,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// Largest width column `index` may take without the visible total
    /// exceeding the container. Never below the column's minimum. When the
    /// container is already overfull the current width is the cap, so the
    /// column can only shrink.
    pub fn max_width_for(&self, columns: &[Column], index: usize) -> u32 {
        let Some(column) = columns.get(index) else {
            return 0;
        };
        let others: u32 = columns
            .iter()
            .enumerate()
            .filter(|(i, c)| *i != index && c.visible)
            .map(|(_, c)| c.width)
            .sum();
        self.container_width
            .saturating_sub(others)
            .max(column.width)
            .max(column.min_width())
    }

    /// Clamp a proposed width for column `index` to `[min, max_width_for]`.
    pub fn clamp_width(&self, columns: &[Column], index: usize, proposed: u32) -> u32 {
        let min = columns.get(index).map(Column::min_width).unwrap_or(0);
        proposed.clamp(min, self.max_width_for(columns, index))
    }

    /// Idle → Dragging. Returns `false` if a gesture is already running or
    /// the column does not exist.
    pub fn begin_resize(&mut self, columns: &[Column], index: usize, x: i64) -> bool {
        if self.gesture.is_some() {
            return false;
        }
        let Some(column) = columns.get(index) else {
            return false;
        };
        let gesture = DragGesture {
            column: index,
            start_x: x,
            start_width: column.width,
            min_width: column.min_width(),
            max_width: self.max_width_for(columns, index),
            current_width: column.width,
            last_x: x,
        };
        debug!(column = column.id(), start_width = column.width, max = gesture.max_width, "Resize started");
        self.throttle.reset();
        self.gesture = Some(gesture);
        true
    }

    /// Pointer moved while dragging. Returns the new visual width when the
    /// frame throttle lets this move through, `None` otherwise.
    pub fn drag_to(&mut self, x: i64, now: Instant) -> Option<u32> {
        let gesture = self.gesture.as_mut()?;
        gesture.last_x = x;
        if !self.throttle.allow(now) {
            return None;
        }
        gesture.current_width = gesture.width_at(x);
        trace!(column = gesture.column, width = gesture.current_width, "Resize preview");
        Some(gesture.current_width)
    }

    /// Dragging → Idle. The last pointer position is applied even if its
    /// move event was throttled. Returns a commit only if the width changed.
    pub fn finish_resize(&mut self) -> Option<WidthCommit> {
        let gesture = self.gesture.take()?;
        let width = gesture.width_at(gesture.last_x);
        if width == gesture.start_width {
            debug!(column = gesture.column, "Resize ended without change");
            return None;
        }
        debug!(column = gesture.column, from = gesture.start_width, to = width, "Resize committed");
        Some(WidthCommit {
            column: gesture.column,
            width,
        })
    }

    /// Abandon the gesture and drop the overlay.
    pub fn cancel_resize(&mut self) {
        if let Some(gesture) = self.gesture.take() {
            debug!(column = gesture.column, "Resize cancelled");
        }
    }

    /// The overlay width for `index`, if it is being dragged.
    pub fn preview_width(&self, index: usize) -> Option<u32> {
        self.gesture
            .filter(|g| g.column == index)
            .map(|g| g.current_width)
    }

    /// Width to draw for `columns[index]`: the overlay if present, else state.
    pub fn effective_width(&self, columns: &[Column], index: usize) -> u32 {
        self.preview_width(index)
            .or_else(|| columns.get(index).map(|c| c.width))
            .unwrap_or(0)
    }

    /// Keyboard resize: `delta` units applied under the same clamp.
    /// Returns the new width if it differs from the current one.
    pub fn nudge(&self, columns: &[Column], index: usize, delta: i64) -> Option<u32> {
        let column = columns.get(index)?;
        let proposed = (column.width as i64 + delta).max(0) as u32;
        let width = self.clamp_width(columns, index, proposed);
        (width != column.width).then_some(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::column::{merge, total_visible_width, ColumnDescriptor, ColumnType};
    use std::time::Duration;

    fn columns() -> Vec<Column> {
        merge(
            &[
                ColumnDescriptor::new("ID", "Id", ColumnType::Number, 100),
                ColumnDescriptor::new("NOMBRE", "Nombre", ColumnType::String, 200),
                ColumnDescriptor::new("ESTADO", "Estado", ColumnType::String, 150).hidden(),
                ColumnDescriptor::new("EMAIL", "Email", ColumnType::String, 200),
            ],
            &[],
        )
    }

    #[test]
    fn test_max_width_ignores_hidden_columns() {
        let layout = ColumnLayout::new(1000);
        // others visible: 100 + 200
        assert_eq!(layout.max_width_for(&columns(), 1), 1000 - 300);
    }

    #[test]
    fn test_drag_updates_overlay_only() {
        let cols = columns();
        let mut layout = ColumnLayout::new(1000);
        let t0 = Instant::now();

        assert!(layout.begin_resize(&cols, 1, 500));
        assert_eq!(layout.state(), ResizeState::Dragging { column: 1 });
        assert_eq!(layout.drag_to(550, t0), Some(250));
        assert_eq!(layout.preview_width(1), Some(250));
        assert_eq!(layout.effective_width(&cols, 1), 250);
        // Column state is untouched during the drag
        assert_eq!(cols[1].width, 200);
        assert_eq!(layout.preview_width(0), None);
    }

    #[test]
    fn test_drag_clamps_to_minimum() {
        let cols = columns();
        let mut layout = ColumnLayout::new(1000);
        layout.begin_resize(&cols, 1, 500);
        assert_eq!(layout.drag_to(0, Instant::now()), Some(80));
    }

    #[test]
    fn test_drag_clamps_to_available_width() {
        let mut cols = columns();
        let mut layout = ColumnLayout::new(1000);
        layout.begin_resize(&cols, 1, 500);
        layout.drag_to(5000, Instant::now());
        let commit = layout.finish_resize().unwrap();
        assert_eq!(commit.width, 700);

        cols[commit.column].width = commit.width;
        assert!(total_visible_width(&cols) <= 1000);
    }

    #[test]
    fn test_moves_are_throttled() {
        let cols = columns();
        let mut layout = ColumnLayout::new(1000);
        let t0 = Instant::now();
        layout.begin_resize(&cols, 0, 100);

        assert_eq!(layout.drag_to(110, t0), Some(110));
        assert_eq!(layout.drag_to(120, t0 + Duration::from_millis(5)), None);
        assert_eq!(layout.preview_width(0), Some(110));
        assert_eq!(layout.drag_to(130, t0 + Duration::from_millis(20)), Some(130));
    }

    #[test]
    fn test_finish_applies_last_throttled_position() {
        let cols = columns();
        let mut layout = ColumnLayout::new(1000);
        let t0 = Instant::now();
        layout.begin_resize(&cols, 0, 100);
        layout.drag_to(110, t0);
        layout.drag_to(140, t0 + Duration::from_millis(1));

        let commit = layout.finish_resize().unwrap();
        assert_eq!(commit, WidthCommit { column: 0, width: 140 });
        assert!(!layout.is_dragging());
        assert_eq!(layout.preview_width(0), None);
    }

    #[test]
    fn test_finish_without_change_does_not_commit() {
        let cols = columns();
        let mut layout = ColumnLayout::new(1000);
        let t0 = Instant::now();
        layout.begin_resize(&cols, 3, 400);
        layout.drag_to(450, t0);
        layout.drag_to(400, t0 + Duration::from_millis(50));
        assert_eq!(layout.finish_resize(), None);
        assert_eq!(layout.state(), ResizeState::Idle);
    }

    #[test]
    fn test_cancel_drops_overlay() {
        let cols = columns();
        let mut layout = ColumnLayout::new(1000);
        layout.begin_resize(&cols, 1, 0);
        layout.drag_to(60, Instant::now());
        layout.cancel_resize();
        assert_eq!(layout.preview_width(1), None);
        assert_eq!(layout.finish_resize(), None);
    }

    #[test]
    fn test_second_begin_is_rejected() {
        let cols = columns();
        let mut layout = ColumnLayout::new(1000);
        assert!(layout.begin_resize(&cols, 0, 0));
        assert!(!layout.begin_resize(&cols, 1, 0));
        assert!(!ColumnLayout::new(1000).begin_resize(&cols, 9, 0));
    }

    #[test]
    fn test_overfull_container_only_allows_shrinking() {
        let cols = columns();
        let mut layout = ColumnLayout::new(250);
        // others = 300 > container, so the current width is the cap
        assert_eq!(layout.max_width_for(&cols, 1), 200);
        let t0 = Instant::now();
        layout.begin_resize(&cols, 1, 0);
        assert_eq!(layout.drag_to(10, t0), Some(200));
        assert_eq!(layout.drag_to(-50, t0 + Duration::from_millis(20)), Some(150));
    }

    #[test]
    fn test_nudge() {
        let cols = columns();
        let layout = ColumnLayout::new(1000);
        assert_eq!(layout.nudge(&cols, 0, 8), Some(108));
        assert_eq!(layout.nudge(&cols, 0, -50), Some(80));
        assert_eq!(layout.nudge(&cols, 1, 10_000), Some(700));

        let tight = ColumnLayout::new(500);
        // Already at max: no change
        assert_eq!(tight.nudge(&cols, 1, 8), None);
    }
}
