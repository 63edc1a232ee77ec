//! Memory governor tests, against the store directly and through the engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tileview::tile::{CellRange, MemoryGovernor, TileKey, TileStore};
use tileview::{EngineConfig, FrameFlag, TileEngine};

use super::test_utils::{create_engine, run_until_idle, CountingRaster, RecordingSurface};

const TILE_BYTES: usize = 512 * 512 * 4;

/// Load `count` full 512x512 tiles in a single row, one millisecond apart.
fn loaded_row(count: u32) -> TileStore {
    let raster = CountingRaster::new(512 * count, 512);
    let mut store = TileStore::new(512, 0);
    let t0 = Instant::now();
    for col in 0..count {
        let key = TileKey::new(col, 0);
        let now = t0 + Duration::from_millis(u64::from(col));
        store.get_or_create(key, 512 * count, 512, now);
        store.load(key, &raster, now, 0, 1.0).unwrap();
    }
    store
}

#[test]
fn test_sixty_tiles_evicted_to_target() {
    let mut store = loaded_row(60);
    assert_eq!(store.memory_usage(), 60 * TILE_BYTES);

    let governor = MemoryGovernor::new(50_000_000);
    let report = governor.enforce(&mut store, &CellRange::EMPTY, (0, 0), u64::MAX);

    assert!(store.memory_usage() <= 40_000_000);
    assert!(store.memory_usage() + TILE_BYTES > 40_000_000);
    assert_eq!(report.remaining, store.memory_usage());
    assert_eq!(report.freed, report.evicted.len() * TILE_BYTES);

    // Oldest first: exactly the leading columns went
    let expected: Vec<_> = (0..report.evicted.len() as u32)
        .map(|col| TileKey::new(col, 0))
        .collect();
    assert_eq!(report.evicted, expected);
    assert_eq!(report.evicted.len(), 22);
}

#[test]
fn test_within_budget_nothing_evicted() {
    let mut store = loaded_row(10);
    let governor = MemoryGovernor::new(10 * TILE_BYTES);

    let report = governor.enforce(&mut store, &CellRange::EMPTY, (0, 0), 3);
    assert!(report.evicted.is_empty());
    assert_eq!(store.loaded_count(), 10);
}

#[test]
fn test_evicted_far_tiles_lose_records() {
    let mut store = loaded_row(10);
    let governor = MemoryGovernor::new(TILE_BYTES);
    let visible = CellRange {
        start_col: 9,
        end_col: 10,
        start_row: 0,
        end_row: 1,
    };

    governor.enforce(&mut store, &visible, (9, 0), 3);

    assert_eq!(store.loaded_count(), 1);
    // Columns 6..9 are within three tiles of the origin
    for col in 6..9 {
        assert!(store.contains(TileKey::new(col, 0)));
    }
    for col in 0..6 {
        assert!(!store.contains(TileKey::new(col, 0)));
    }
}

// =============================================================================
// Engine
// =============================================================================

fn check_budget_invariant(engine: &TileEngine<FrameFlag>) {
    let stats = engine.memory_stats();
    if stats.used <= stats.max {
        return;
    }
    let visible = engine.visible_range();
    for tile in engine.tiles().iter().filter(|t| t.is_loaded()) {
        assert!(
            visible.contains(tile.key),
            "off-screen tile {:?} kept while over budget",
            tile.key
        );
    }
}

#[test]
fn test_budget_holds_after_every_pass() {
    let config = EngineConfig {
        max_memory: 8 * TILE_BYTES,
        ..EngineConfig::default()
    };
    let mut engine = create_engine(config);
    let mut surface = RecordingSurface::default();
    engine.load_image(Arc::new(CountingRaster::new(8192, 8192))).unwrap();

    let moves: [(f64, f64, Option<f64>); 8] = [
        (0.0, 0.0, None),
        (900.0, 0.0, None),
        (0.0, 1500.0, None),
        (0.0, 0.0, Some(0.25)),
        (0.0, 0.0, Some(3.0)),
        (-4000.0, 2000.0, None),
        (5000.0, 5000.0, None),
        (0.0, 0.0, Some(1.0)),
    ];

    let mut now = Instant::now();
    for (dx, dy, scale) in moves {
        match scale {
            Some(scale) => engine.zoom(scale, None),
            None => engine.pan(dx, dy),
        }
        while engine.frames_mut().take() {
            engine.render_frame(now, &mut surface);
            now += Duration::from_millis(16);
            check_budget_invariant(&engine);
        }
    }
}

#[test]
fn test_tiles_leaving_view_are_evicted() {
    let config = EngineConfig {
        max_memory: 12 * TILE_BYTES,
        ..EngineConfig::default()
    };
    let mut engine = create_engine(config);
    let mut surface = RecordingSurface::default();
    engine.load_image(Arc::new(CountingRaster::new(8192, 8192))).unwrap();
    run_until_idle(&mut engine, &mut surface);
    assert_eq!(engine.loaded_tile_count(), 9);

    // Shift two columns right: columns 3-4 load, column 0 leaves the range
    engine.set_viewport(1024.0, 0.0, 1.0);
    run_until_idle(&mut engine, &mut surface);
    assert_eq!(engine.loaded_tile_count(), 12);
    assert_eq!(engine.memory_stats().used, engine.memory_stats().max);
    for row in 0..3 {
        assert!(!engine.tiles().get(TileKey::new(0, row)).unwrap().is_loaded());
        assert!(engine.tiles().get(TileKey::new(1, row)).unwrap().is_loaded());
    }

    engine.set_viewport(2048.0, 0.0, 1.0);
    run_until_idle(&mut engine, &mut surface);

    let stats = engine.memory_stats();
    assert!(stats.used <= stats.max);
    for row in 0..3 {
        assert!(!engine.tiles().get(TileKey::new(1, row)).unwrap().is_loaded());
    }
}

#[test]
fn test_record_kept_near_viewport() {
    let config = EngineConfig {
        max_memory: TILE_BYTES,
        ..EngineConfig::default()
    };
    let mut engine = create_engine(config);
    let mut surface = RecordingSurface::default();
    engine.load_image(Arc::new(CountingRaster::new(8192, 8192))).unwrap();
    run_until_idle(&mut engine, &mut surface);

    engine.set_viewport(1536.0, 0.0, 1.0);
    run_until_idle(&mut engine, &mut surface);

    // Origin cell is (3, 0); column 0 is exactly three tiles away
    let tile = engine.tiles().get(TileKey::new(0, 0)).unwrap();
    assert!(!tile.is_loaded());

    // Column 3 was loaded; evicted eleven tiles away, its record goes too
    engine.set_viewport(6000.0, 6000.0, 1.0);
    run_until_idle(&mut engine, &mut surface);
    assert!(!engine.tiles().contains(TileKey::new(3, 0)));
}

#[test]
fn test_memory_stats_is_read_only() {
    let mut engine = create_engine(EngineConfig::default());
    let mut surface = RecordingSurface::default();
    engine.load_image(Arc::new(CountingRaster::new(1024, 1024))).unwrap();
    run_until_idle(&mut engine, &mut surface);

    let requested = engine.frames().requested();
    let first = engine.memory_stats();
    let second = engine.memory_stats();

    assert_eq!(first, second);
    assert_eq!(first.used, 4 * TILE_BYTES);
    assert_eq!(first.max, 256 * 1024 * 1024);
    assert_eq!(first.percentage, 1.5625);
    assert_eq!(engine.frames().requested(), requested);
}

#[test]
fn test_eviction_from_far_off_viewport() {
    let config = EngineConfig {
        max_memory: TILE_BYTES,
        ..EngineConfig::default()
    };
    let mut engine = create_engine(config);
    let mut surface = RecordingSurface::default();
    engine.load_image(Arc::new(CountingRaster::new(8192, 8192))).unwrap();
    run_until_idle(&mut engine, &mut surface);
    assert!(engine.loaded_tile_count() > 0);

    // Origin cell saturates far outside the grid
    engine.set_viewport(-1e20, 0.0, 0.001);
    run_until_idle(&mut engine, &mut surface);

    assert!(engine.visible_range().is_empty());
    assert_eq!(engine.loaded_tile_count(), 0);
    assert_eq!(engine.memory_stats().used, 0);
    assert!(!engine.tiles().contains(TileKey::new(0, 0)));
}
