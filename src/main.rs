//! tileview - Pan and zoom through a large image one tile at a time.
//!
//! This binary loads an image, fits it to a virtual screen and plays back a
//! scripted session of zoom and pan steps, driving the engine's render passes
//! from a frame ticker.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tileview::{
    Cli, FrameFlag, ImageLoadError, ImageRaster, PixelSurface, RasterSource, TileEngine,
};

/// Upper bound on frames played for a single scripted step.
const MAX_FRAMES_PER_STEP: usize = 1_000;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = cli.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Session
// =============================================================================

async fn run(cli: Cli) -> Result<(), String> {
    let config = cli.engine_config();
    let pan_steps = cli.pan_steps()?;

    info!("Configuration:");
    info!("  Input: {}", cli.input.display());
    info!("  Viewport: {}x{} @{}x", cli.width, cli.height, cli.pixel_ratio);
    info!(
        "  Tiles: {}px, buffer {}, budget {}MB",
        config.tile_size,
        config.buffer_tiles,
        config.max_memory / (1024 * 1024)
    );

    let mut engine = TileEngine::new(config, FrameFlag::new())
        .map_err(|e| format!("Invalid engine configuration: {}", e))?;
    engine.resize(f64::from(cli.width), f64::from(cli.height));

    let device_width = (f64::from(cli.width) * cli.pixel_ratio).round() as u32;
    let device_height = (f64::from(cli.height) * cli.pixel_ratio).round() as u32;
    let mut surface = PixelSurface::new(device_width, device_height);

    let decoded = decode(cli.input.clone()).await;
    engine
        .load_decoded(decoded)
        .map_err(|e| format!("Failed to load {}: {}", cli.input.display(), e))?;

    let mut ticker = interval(Duration::from_millis(cli.frame_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    engine.fit();
    play(&mut engine, &mut surface, &mut ticker, "fit", MAX_FRAMES_PER_STEP).await;

    for scale in &cli.zoom {
        engine.zoom(*scale, None);
        let step = format!("zoom {}", scale);
        play(&mut engine, &mut surface, &mut ticker, &step, MAX_FRAMES_PER_STEP).await;
    }

    for (dx, dy) in pan_steps {
        engine.pan(dx, dy);
        let step = format!("pan {}:{}", dx, dy);
        play(&mut engine, &mut surface, &mut ticker, &step, MAX_FRAMES_PER_STEP).await;
    }

    if cli.stats_json {
        let report = serde_json::json!({
            "viewport": engine.viewport(),
            "memory": engine.memory_stats(),
            "overlay": engine.last_overlay(),
        });
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize stats: {}", e))?;
        println!("{}", json);
    }

    engine.destroy();

    if let Some(ref output) = cli.output {
        surface
            .into_image()
            .save(output)
            .map_err(|e| format!("Failed to write {}: {}", output.display(), e))?;
        info!("Wrote frame to {}", output.display());
    }

    Ok(())
}

/// Decode the input image on the blocking pool.
async fn decode(path: PathBuf) -> Result<Arc<dyn RasterSource>, ImageLoadError> {
    let started = Instant::now();
    let raster = tokio::task::spawn_blocking(move || ImageRaster::open(path))
        .await
        .map_err(|e| ImageLoadError::Io(e.to_string()))??;
    debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Decoded image"
    );
    Ok(Arc::new(raster))
}

/// Tick frames until the engine stops requesting them, or `max_frames` ran.
///
/// A request left over at the cap stays pending for the next step.
async fn play(
    engine: &mut TileEngine<FrameFlag>,
    surface: &mut PixelSurface,
    ticker: &mut Interval,
    step: &str,
    max_frames: usize,
) -> usize {
    let mut frames = 0;
    while frames < max_frames && engine.frames_mut().take() {
        ticker.tick().await;
        engine.render_frame(Instant::now(), surface);
        frames += 1;
    }

    let viewport = engine.viewport();
    let stats = engine.memory_stats();
    info!(
        "{}: {} frame(s), scale {:.3}, offset ({:.1}, {:.1}), {} tile(s) loaded, memory {:.1}MB ({:.1}%)",
        step,
        frames,
        viewport.scale,
        viewport.x,
        viewport.y,
        engine.loaded_tile_count(),
        stats.used as f64 / (1024.0 * 1024.0),
        stats.percentage
    );
    frames
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tileview=debug"
    } else {
        "tileview=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Tests
// =============================================================================
