//! Pan, zoom and fit through the engine.

use std::sync::Arc;

use tileview::{EngineConfig, RenderState};

use super::test_utils::{assert_close, create_engine, run_until_idle, CountingRaster, RecordingSurface};

#[test]
fn test_pan_stays_in_bounds() {
    let mut engine = create_engine(EngineConfig::default());
    engine.load_image(Arc::new(CountingRaster::new(3000, 2000))).unwrap();

    let deltas = [-1e9, -5000.0, -1.0, 0.0, 0.5, 250.0, 4000.0, 1e9];
    for scale in [0.2, 1.0, 2.5] {
        engine.set_viewport(0.0, 0.0, scale);
        let max_x = (3000.0 * scale - 800.0_f64).max(0.0);
        let max_y = (2000.0 * scale - 600.0_f64).max(0.0);

        for &dx in &deltas {
            for &dy in &deltas {
                engine.pan(dx, dy);
                let vp = engine.viewport();
                assert!(vp.x >= 0.0 && vp.x <= max_x, "x {} outside [0, {}]", vp.x, max_x);
                assert!(vp.y >= 0.0 && vp.y <= max_y, "y {} outside [0, {}]", vp.y, max_y);
                assert_eq!(vp.scale, scale);
            }
        }
    }
}

#[test]
fn test_pan_accumulates() {
    let mut engine = create_engine(EngineConfig::default());
    engine.load_image(Arc::new(CountingRaster::new(4096, 4096))).unwrap();

    engine.pan(100.0, 50.0);
    engine.pan(25.0, -10.0);
    let vp = engine.viewport();
    assert_eq!((vp.x, vp.y), (125.0, 40.0));
}

#[test]
fn test_zoom_keeps_point_under_cursor() {
    let mut engine = create_engine(EngineConfig::default());
    engine.load_image(Arc::new(CountingRaster::new(20_000, 20_000))).unwrap();
    engine.set_viewport(5000.0, 4000.0, 1.0);

    let anchors = [(0.0, 0.0), (400.0, 300.0), (123.0, 456.0), (799.0, 1.0)];
    for scale in [0.5, 1.7, 3.0, 0.9] {
        for &(cx, cy) in &anchors {
            let before = engine.viewport().screen_to_world(cx, cy);
            engine.zoom(scale, Some((cx, cy)));
            let after = engine.viewport().screen_to_world(cx, cy);

            assert_eq!(engine.viewport().scale, scale);
            assert_close(before.0, after.0);
            assert_close(before.1, after.1);
        }
    }
}

#[test]
fn test_zoom_defaults_to_screen_centre() {
    let mut engine = create_engine(EngineConfig::default());
    engine.load_image(Arc::new(CountingRaster::new(20_000, 20_000))).unwrap();
    engine.set_viewport(2000.0, 2000.0, 1.0);

    let centre = engine.viewport().screen_to_world(400.0, 300.0);
    engine.zoom(2.0, None);
    let after = engine.viewport().screen_to_world(400.0, 300.0);

    assert_close(centre.0, after.0);
    assert_close(centre.1, after.1);
}

#[test]
fn test_zoom_result_is_clamped() {
    let mut engine = create_engine(EngineConfig::default());
    engine.load_image(Arc::new(CountingRaster::new(4096, 4096))).unwrap();

    // Zooming in around the top-left corner would scroll negative
    engine.set_viewport(0.0, 0.0, 1.0);
    engine.zoom(2.0, Some((-300.0, -300.0)));
    let vp = engine.viewport();
    assert_eq!((vp.x, vp.y), (0.0, 0.0));

    // Zooming out far enough to show the whole raster pins the offset to 0
    engine.set_viewport(3000.0, 3000.0, 1.0);
    engine.zoom(0.1, Some((400.0, 300.0)));
    let vp = engine.viewport();
    assert_eq!((vp.x, vp.y, vp.scale), (0.0, 0.0, 0.1));
}

#[test]
fn test_fit_centres_wide_raster() {
    let mut engine = create_engine(EngineConfig::default());
    engine.load_image(Arc::new(CountingRaster::new(4000, 1000))).unwrap();
    engine.fit();

    let vp = engine.viewport();
    assert_eq!(vp.scale, 0.2);
    assert_eq!(vp.x, 0.0);
    // 200px of raster on a 600px screen: 200px margins
    assert_eq!(vp.y, -200.0);

    let top_left = vp.screen_to_world(0.0, 200.0);
    assert_close(top_left.0, 0.0);
    assert_close(top_left.1, 0.0);
}

#[test]
fn test_fit_centres_tall_raster() {
    let mut engine = create_engine(EngineConfig::default());
    engine.load_image(Arc::new(CountingRaster::new(1200, 2400))).unwrap();
    engine.fit();

    let vp = engine.viewport();
    assert_eq!(vp.scale, 0.25);
    assert_eq!(vp.y, 0.0);
    assert_eq!(vp.x, -250.0);
}

#[test]
fn test_fit_twice_schedules_once() {
    let mut engine = create_engine(EngineConfig::default());
    let mut surface = RecordingSurface::default();
    engine.load_image(Arc::new(CountingRaster::new(4000, 1000))).unwrap();
    run_until_idle(&mut engine, &mut surface);

    let requested = engine.frames().requested();
    engine.fit();
    engine.fit();
    assert_eq!(engine.frames().requested(), requested + 1);

    // Settled at the fitted viewport: fitting again changes nothing
    run_until_idle(&mut engine, &mut surface);
    let settled = engine.frames().requested();
    engine.fit();
    assert_eq!(engine.frames().requested(), settled);
    assert_eq!(engine.render_state(), RenderState::Idle);
}

#[test]
fn test_resize_then_fit() {
    let mut engine = create_engine(EngineConfig::default());
    engine.load_image(Arc::new(CountingRaster::new(1000, 1000))).unwrap();

    engine.resize(500.0, 250.0);
    engine.fit();

    let vp = engine.viewport();
    assert_eq!((vp.width, vp.height), (500.0, 250.0));
    assert_eq!(vp.scale, 0.25);
    assert_eq!(vp.x, -125.0);
    assert_eq!(vp.y, 0.0);
}
