//! Tile grid, tile store and memory governor.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               TileEngine                │
//! └────────────────────┬────────────────────┘
//!                      │ visible_cells()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │                Tile Grid                │
//! │   (cols/rows, clipped cell ranges)      │
//! └────────────────────┬────────────────────┘
//!                      │ get_or_create() / load()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               TileStore                 │
//! │  (tile records, buffers, memory usage)  │
//! └────────────────────┬────────────────────┘
//!                      │ enforce()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            MemoryGovernor               │
//! │  (oldest-first, off-screen eviction)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileKey`]: value-typed `(col, row)` grid key
//! - [`CellRange`]: half-open rectangle of cells, always inside the grid
//! - [`TileStore`]: tile records with lazily materialized RGBA buffers
//! - [`MemoryGovernor`]: byte budget enforcement with an 80% low-water mark

mod governor;
mod grid;
mod store;

pub use governor::{EvictionReport, MemoryGovernor, MemoryStats, DEFAULT_MAX_MEMORY};
pub use grid::{grid_distance, grid_size, origin_cell, visible_cells, CellRange, TileKey};
pub use store::{LoadOutcome, Tile, TileStore};
