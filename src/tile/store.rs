//! Tile store and tile lifecycle.
//!
//! Tiles are created lazily the first time their cell becomes visible,
//! materialized by copying a raster sub-rectangle into an owned buffer, and
//! unloaded by the memory governor. An unloaded tile keeps its record (and
//! failure history) unless it has drifted far from the viewport.
//!
//! # Memory Accounting
//!
//! `memory_usage` always equals the sum of `width * height * BYTES_PER_PIXEL`
//! over loaded tiles. It changes only on a successful load, an unload, or a clear.

use std::collections::HashMap;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use tracing::trace;

use super::grid::{grid_distance, TileKey};
use crate::error::TileMaterializationError;
use crate::raster::{RasterSource, BYTES_PER_PIXEL};

// =============================================================================
// Tile
// =============================================================================

/// One edge-clipped tile of the raster.
#[derive(Debug, Clone)]
pub struct Tile {
    /// Grid coordinates
    pub key: TileKey,

    /// World-space left edge (`col * tile_size`)
    pub world_x: u32,

    /// World-space top edge (`row * tile_size`)
    pub world_y: u32,

    /// Width in pixels, clipped at the raster's right edge
    pub width: u32,

    /// Height in pixels, clipped at the raster's bottom edge
    pub height: u32,

    /// Last time the tile was materialized or left the visible range
    pub last_used: Instant,

    /// Render quality in effect when the tile was materialized
    pub quality: f64,

    buffer: Option<Bytes>,
    failed_attempts: u32,
    retry_after_frame: u64,
}

impl Tile {
    /// Whether pixels are currently materialized.
    pub fn is_loaded(&self) -> bool {
        self.buffer.is_some()
    }

    /// The RGBA8 pixels of a loaded tile.
    pub fn buffer(&self) -> Option<&Bytes> {
        self.buffer.as_ref()
    }

    /// Bytes this tile costs while loaded.
    pub fn byte_cost(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Consecutive failed materialization attempts.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    fn retry_due(&self, frame: u64) -> bool {
        frame >= self.retry_after_frame
    }
}

/// Result of asking the store to materialize a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Pixels were copied; the value is the byte cost added to memory usage
    Loaded(usize),

    /// The tile already had pixels
    AlreadyLoaded,

    /// A previous failure is still backing off; nothing was attempted
    BackingOff,
}

// =============================================================================
// Tile Store
// =============================================================================

/// Keyed collection of tiles with running memory accounting.
#[derive(Debug)]
pub struct TileStore {
    tiles: HashMap<TileKey, Tile>,
    tile_size: u32,
    memory_usage: usize,
    retry_backoff_frames: u32,
}

impl TileStore {
    /// Create an empty store for tiles of `tile_size` pixels.
    ///
    /// With `retry_backoff_frames == 0` a failed tile is retried on the next
    /// pass in which it is visible.
    pub fn new(tile_size: u32, retry_backoff_frames: u32) -> Self {
        Self {
            tiles: HashMap::new(),
            tile_size,
            memory_usage: 0,
            retry_backoff_frames,
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Current bytes held by loaded tiles.
    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    /// Number of tile records (loaded or not).
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of tiles holding pixels.
    pub fn loaded_count(&self) -> usize {
        self.tiles.values().filter(|t| t.is_loaded()).count()
    }

    pub fn get(&self, key: TileKey) -> Option<&Tile> {
        self.tiles.get(&key)
    }

    pub fn contains(&self, key: TileKey) -> bool {
        self.tiles.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Return the tile at `key`, creating its record if absent.
    ///
    /// The tile's extent is clipped to a `raster_width x raster_height` raster.
    pub fn get_or_create(
        &mut self,
        key: TileKey,
        raster_width: u32,
        raster_height: u32,
        now: Instant,
    ) -> &Tile {
        let tile_size = self.tile_size;
        self.tiles.entry(key).or_insert_with(|| {
            let world_x = key.col.saturating_mul(tile_size);
            let world_y = key.row.saturating_mul(tile_size);
            trace!(col = key.col, row = key.row, "Creating tile");
            Tile {
                key,
                world_x,
                world_y,
                width: tile_size.min(raster_width.saturating_sub(world_x)),
                height: tile_size.min(raster_height.saturating_sub(world_y)),
                last_used: now,
                quality: 1.0,
                buffer: None,
                failed_attempts: 0,
                retry_after_frame: 0,
            }
        })
    }

    /// Materialize the tile at `key` from `raster`.
    ///
    /// On failure the tile stays unloaded, memory usage is untouched, and the
    /// error is returned for the caller to log. `frame` is the current render
    /// pass number, used only when retry backoff is enabled.
    pub fn load(
        &mut self,
        key: TileKey,
        raster: &(impl RasterSource + ?Sized),
        now: Instant,
        frame: u64,
        quality: f64,
    ) -> Result<LoadOutcome, TileMaterializationError> {
        let backoff = u64::from(self.retry_backoff_frames);
        let Some(tile) = self.tiles.get_mut(&key) else {
            return Err(TileMaterializationError::UnknownTile {
                col: key.col,
                row: key.row,
            });
        };
        if tile.is_loaded() {
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        if !tile.retry_due(frame) {
            return Ok(LoadOutcome::BackingOff);
        }

        let cost = tile.byte_cost();
        let mut buffer = BytesMut::zeroed(cost);
        let copied = raster.copy_region(
            tile.world_x,
            tile.world_y,
            tile.width,
            tile.height,
            &mut buffer,
        );

        match copied {
            Ok(()) => {
                tile.buffer = Some(buffer.freeze());
                tile.last_used = now;
                tile.quality = quality;
                tile.failed_attempts = 0;
                tile.retry_after_frame = 0;
                self.memory_usage += cost;
                trace!(col = key.col, row = key.row, bytes = cost, "Loaded tile");
                Ok(LoadOutcome::Loaded(cost))
            }
            Err(err) => {
                tile.failed_attempts = tile.failed_attempts.saturating_add(1);
                if backoff > 0 {
                    let wait = backoff.saturating_mul(u64::from(tile.failed_attempts));
                    tile.retry_after_frame = frame.saturating_add(wait).saturating_add(1);
                }
                Err(err)
            }
        }
    }

    /// Mark a tile as used at `now`.
    pub fn touch(&mut self, key: TileKey, now: Instant) {
        if let Some(tile) = self.tiles.get_mut(&key) {
            tile.last_used = now;
        }
    }

    /// Free a tile's pixels.
    ///
    /// The record itself is deleted when the tile lies more than
    /// `max_distance` tiles from `origin`. Returns the bytes freed.
    pub fn unload(&mut self, key: TileKey, origin: (i64, i64), max_distance: u64) -> usize {
        let Some(tile) = self.tiles.get_mut(&key) else {
            return 0;
        };

        let mut freed = 0;
        if tile.buffer.take().is_some() {
            freed = tile.byte_cost();
            self.memory_usage = self.memory_usage.saturating_sub(freed);
        }

        if grid_distance(key, origin) > max_distance {
            self.tiles.remove(&key);
            trace!(col = key.col, row = key.row, bytes = freed, "Dropped tile record");
        } else {
            trace!(col = key.col, row = key.row, bytes = freed, "Unloaded tile");
        }

        freed
    }

    /// Drop every tile and reset memory usage.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.memory_usage = 0;
    }
}

// =============================================================================
// Tests
// =============================================================================
