//! Tile grid coordinate math.
//!
//! Pure functions mapping raster dimensions to a column/row grid and a
//! viewport (plus a tile margin) to a clipped, half-open range of cells.

use crate::view::Viewport;

// =============================================================================
// Tile Key
// =============================================================================

/// Grid coordinates of a tile.
///
/// Stable for the lifetime of a raster and tile size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Column (0-indexed from left)
    pub col: u32,

    /// Row (0-indexed from top)
    pub row: u32,
}

impl TileKey {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

// =============================================================================
// Cell Range
// =============================================================================

/// A half-open rectangle of grid cells: `[start_col, end_col) x [start_row, end_row)`.
///
/// Ranges built by [`visible_cells`] satisfy `start <= end` on both axes.
/// A range with `start > end` on either axis has no cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellRange {
    pub start_col: u32,
    pub end_col: u32,
    pub start_row: u32,
    pub end_row: u32,
}

impl CellRange {
    /// The range containing no cells.
    pub const EMPTY: CellRange = CellRange {
        start_col: 0,
        end_col: 0,
        start_row: 0,
        end_row: 0,
    };

    /// Whether `key` lies inside the range.
    pub fn contains(&self, key: TileKey) -> bool {
        key.col >= self.start_col
            && key.col < self.end_col
            && key.row >= self.start_row
            && key.row < self.end_row
    }

    pub fn cols(&self) -> u32 {
        self.end_col.saturating_sub(self.start_col)
    }

    pub fn rows(&self) -> u32 {
        self.end_row.saturating_sub(self.start_row)
    }

    /// Number of cells in the range.
    pub fn len(&self) -> usize {
        self.cols() as usize * self.rows() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate cells in row-major order.
    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        (self.start_row..self.end_row)
            .flat_map(move |row| (self.start_col..self.end_col).map(move |col| TileKey::new(col, row)))
    }
}

// =============================================================================
// Grid Functions
// =============================================================================

/// Number of tile columns and rows covering a `width x height` raster.
pub fn grid_size(width: u32, height: u32, tile_size: u32) -> (u32, u32) {
    if tile_size == 0 {
        return (0, 0);
    }
    (width.div_ceil(tile_size), height.div_ceil(tile_size))
}

/// Cells covering the viewport expanded by `buffer_tiles` tiles on every side,
/// clipped to a `cols x rows` grid.
///
/// Degenerate viewports (non-positive or non-finite scale) yield an empty range.
pub fn visible_cells(
    viewport: &Viewport,
    tile_size: u32,
    buffer_tiles: u32,
    cols: u32,
    rows: u32,
) -> CellRange {
    if tile_size == 0 || !(viewport.scale > 0.0) || !viewport.scale.is_finite() {
        return CellRange::EMPTY;
    }

    let tile = f64::from(tile_size);
    let buffer = tile * f64::from(buffer_tiles);

    let world_left = viewport.x / viewport.scale;
    let world_top = viewport.y / viewport.scale;
    let world_right = (viewport.x + viewport.width) / viewport.scale;
    let world_bottom = (viewport.y + viewport.height) / viewport.scale;

    let (start_col, end_col) = clip_axis(
        ((world_left - buffer) / tile).floor(),
        ((world_right + buffer) / tile).ceil(),
        cols,
    );
    let (start_row, end_row) = clip_axis(
        ((world_top - buffer) / tile).floor(),
        ((world_bottom + buffer) / tile).ceil(),
        rows,
    );

    CellRange {
        start_col,
        end_col,
        start_row,
        end_row,
    }
}

/// Clip a half-open float interval to `[0, limit)`, keeping `start <= end`.
fn clip_axis(start: f64, end: f64, limit: u32) -> (u32, u32) {
    if !start.is_finite() || !end.is_finite() {
        return (0, 0);
    }
    let limit_f = f64::from(limit);
    let start = start.clamp(0.0, limit_f) as u32;
    let end = end.clamp(0.0, limit_f) as u32;
    (start.min(end), end)
}

/// Cell containing the world-space top-left corner of the viewport.
///
/// Returns signed coordinates: the viewport may sit left of or above the raster.
pub fn origin_cell(viewport: &Viewport, tile_size: u32) -> (i64, i64) {
    if tile_size == 0 || !(viewport.scale > 0.0) {
        return (0, 0);
    }
    let tile = f64::from(tile_size);
    let col = (viewport.x / viewport.scale / tile).floor();
    let row = (viewport.y / viewport.scale / tile).floor();
    (saturating_i64(col), saturating_i64(row))
}

/// Chebyshev distance in tile units between `key` and `origin`.
pub fn grid_distance(key: TileKey, origin: (i64, i64)) -> u64 {
    let dc = i64::from(key.col).abs_diff(origin.0);
    let dr = i64::from(key.row).abs_diff(origin.1);
    dc.max(dr)
}

fn saturating_i64(value: f64) -> i64 {
    if value.is_nan() {
        0
    } else {
        value.clamp(i64::MIN as f64, i64::MAX as f64) as i64
    }
}

// =============================================================================
// Tests
// =============================================================================
