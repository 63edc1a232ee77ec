use thiserror::Error;

/// Errors raised when a raster cannot be installed into the engine.
///
/// Decoding is the caller's job; these errors describe a decode step that
/// failed before the raster reached the engine, or a raster the engine refuses.
#[derive(Debug, Clone, Error)]
pub enum ImageLoadError {
    /// The source bytes could not be decoded into pixels
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// The source could not be read
    #[error("I/O error: {0}")]
    Io(String),

    /// The raster has no pixels along at least one axis
    #[error("Raster has no pixels: {width}x{height}")]
    EmptyRaster { width: u32, height: u32 },

    /// The engine was destroyed and accepts no further rasters
    #[error("Engine has been destroyed")]
    Destroyed,
}

impl From<image::ImageError> for ImageLoadError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(io) => ImageLoadError::Io(io.to_string()),
            other => ImageLoadError::Decode(other.to_string()),
        }
    }
}

/// Errors raised while copying a raster region into a tile buffer.
///
/// These never escape a render pass: the affected tile stays unloaded and is
/// retried the next time it is visible.
#[derive(Debug, Clone, Error)]
pub enum TileMaterializationError {
    /// The backing pixels (or the context used to rasterize them) are unavailable
    #[error("Raster source unavailable: {0}")]
    SourceUnavailable(String),

    /// The requested region does not lie inside the raster
    #[error(
        "Region {width}x{height} at ({x}, {y}) exceeds raster bounds {raster_width}x{raster_height}"
    )]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        raster_width: u32,
        raster_height: u32,
    },

    /// The destination buffer has the wrong length for the region
    #[error("Tile buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    /// No tile record exists for the key
    #[error("No tile record at column {col}, row {row}")]
    UnknownTile { col: u32, row: u32 },
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("tile_size must be greater than 0")]
    ZeroTileSize,

    #[error("max_memory must be greater than 0")]
    ZeroMemoryBudget,

    /// Quality bounds are not a positive, non-empty interval
    #[error("Invalid quality range: [{min}, {max}]")]
    InvalidQualityRange { min: f64, max: f64 },

    /// Scale bounds are not a positive, non-empty interval
    #[error("Invalid scale range: [{min}, {max}]")]
    InvalidScaleRange { min: f64, max: f64 },

    #[error("quality_smoothing must be in (0, 1], got {0}")]
    InvalidSmoothing(f64),

    #[error("quality_epsilon must be positive, got {0}")]
    InvalidEpsilon(f64),

    #[error("device_pixel_ratio must be positive, got {0}")]
    InvalidPixelRatio(f64),
}
