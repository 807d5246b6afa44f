use ratatui::layout::Rect;
use thiserror::Error;

use super::widget::{WidgetBase, WidgetId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error(
        "placement at ({row},{col}) spanning {row_span}x{col_span} exceeds the {rows}x{cols} grid"
    )]
    OutOfBounds {
        row: u16,
        col: u16,
        row_span: u16,
        col_span: u16,
        rows: u16,
        cols: u16,
    },
}

/// Rectangular span of grid cells, fixed at placement time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRegion {
    pub row: u16,
    pub col: u16,
    pub row_span: u16,
    pub col_span: u16,
}

/// Partitions a fixed rows x cols character grid into cell spans and hands
/// out widget bases with monotonically increasing ids.
///
/// Overlapping placements are not detected; the last-drawn widget wins in
/// the overlapped cells.
pub struct GridLayout {
    rows: u16,
    cols: u16,
    next_id: u32,
}

impl GridLayout {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            next_id: 0,
        }
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// Validate a cell span against the grid extents.
    pub fn region(
        &self,
        row: u16,
        col: u16,
        row_span: u16,
        col_span: u16,
    ) -> Result<GridRegion, LayoutError> {
        let fits = row_span >= 1
            && col_span >= 1
            && row < self.rows
            && col < self.cols
            && row + row_span <= self.rows
            && col + col_span <= self.cols;
        if !fits {
            return Err(LayoutError::OutOfBounds {
                row,
                col,
                row_span,
                col_span,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(GridRegion {
            row,
            col,
            row_span,
            col_span,
        })
    }

    /// Place a new widget base on the grid. Fails fast on out-of-bounds
    /// spans since that indicates a bug in UI composition, not user input.
    pub fn place(
        &mut self,
        title: &str,
        row: u16,
        col: u16,
        row_span: u16,
        col_span: u16,
        focusable: bool,
    ) -> Result<WidgetBase, LayoutError> {
        let region = self.region(row, col, row_span, col_span)?;
        let id = WidgetId(self.next_id);
        self.next_id += 1;
        Ok(WidgetBase::new(id, title, region, focusable))
    }

    /// Map a grid region onto a terminal rect so that adjacent spans tile
    /// the whole area without gaps.
    pub fn rect_for(&self, region: GridRegion, area: Rect) -> Rect {
        let x0 = area.x + area.width * region.col / self.cols;
        let x1 = area.x + area.width * (region.col + region.col_span) / self.cols;
        let y0 = area.y + area.height * region.row / self.rows;
        let y1 = area.y + area.height * (region.row + region.row_span) / self.rows;
        Rect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

/// Create a centered rectangle with fixed dimensions, clamped to the area.
pub fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w, h)
}
