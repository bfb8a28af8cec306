// ============================================================================
// STROKE PIPELINE — the fixed per-sample sequence over the field store.
// ============================================================================

pub mod diffusion;
pub mod edges;
pub mod fields;
pub mod pigment;
pub mod render;
pub mod steps;

use crate::engine::WatercolorEngine;
use crate::params::DiffusionMode;

/// Run the whole update pipeline for one brush sample, in fixed order:
/// distribute → scratch fields → diffuse → convolve → commit → continuation
/// memory → step tracking → edges.  Called exactly once per queued sample,
/// in queue order; never reentrant (the drain tick holds the in-flight flag).
///
/// Out-of-canvas samples degrade to empty regions and fall through every
/// stage without touching a pixel.
pub fn apply_stroke(engine: &mut WatercolorEngine, center_x: i32, center_y: i32, radius: i32) {
    engine.begin_update(center_x, center_y, radius);

    pigment::distribute_pigment(engine);

    fields::collect_committed_points(engine);
    fields::compute_distance_field(engine);
    fields::compute_gradient_field(engine);

    match engine.params.diffusion_mode {
        DiffusionMode::Directional => diffusion::apply_directional_diffusion(engine),
        DiffusionMode::Ring => diffusion::apply_ring_diffusion(engine),
    }
    diffusion::apply_convolution(engine);

    pigment::commit_pigment(engine);
    pigment::refresh_continuation_memory(engine);

    steps::advance(engine, center_x, center_y);
    edges::recompute_edges(engine);

    engine.stroke_active = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelSurface;
    use crate::engine::{STEP_SETTLED, WatercolorEngine};

    fn drain_all(engine: &mut WatercolorEngine, surface: &mut PixelSurface) {
        while engine.process_pending_points(surface) > 0 {}
    }

    #[test]
    fn press_deposits_pigment_and_wetness() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.seed_rng(42);
        let mut surface = PixelSurface::new(100, 100);
        engine.set_size(10);
        engine.on_press(50, 50);
        drain_all(&mut engine, &mut surface);

        let center = engine.index(50, 50);
        assert!(engine.committed.committed[center]);
        assert!(engine.committed.opacity[center] > 0.0);
        assert_eq!(engine.wet[center], engine.params.wet_center_value);

        // Beyond the wet radius nothing was touched.
        let wet_reach = 10.0 * engine.params.wet_radius_factor;
        for y in 0..100 {
            for x in 0..100 {
                let dx = (x - 50) as f32;
                let dy = (y - 50) as f32;
                if (dx * dx + dy * dy).sqrt() <= wet_reach + 1.0 {
                    continue;
                }
                let i = engine.index(x, y);
                assert!(!engine.committed.committed[i], "pigment at ({}, {})", x, y);
                assert_eq!(engine.wet[i], 0.0, "wetness at ({}, {})", x, y);
                assert!(!engine.primitive.has_primitive[i]);
            }
        }
    }

    #[test]
    fn stroke_outside_canvas_is_a_noop() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.seed_rng(1);
        apply_stroke(&mut engine, 300, 300, 10);

        assert!(engine.committed.committed.iter().all(|&c| !c));
        assert!(engine.wet.iter().all(|&w| w == 0.0));
        assert!(engine.first_edge.iter().all(|&v| v == 0.0));
        assert!(engine.second_edge.iter().all(|&v| v == 0.0));
        assert!(engine.third_persistent.iter().all(|&v| v == 0.0));
        assert!(engine.primitive.has_primitive.iter().all(|&p| !p));
        assert!(engine.step.iter().all(|&s| s == STEP_SETTLED));
    }

    #[test]
    fn overlapping_presses_mix_subtractively() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.seed_rng(9);
        let mut surface = PixelSurface::new(100, 100);
        engine.set_size(8);

        engine.set_color([220, 220, 40]); // yellow
        engine.on_press(50, 50);
        drain_all(&mut engine, &mut surface);
        engine.on_release();
        drain_all(&mut engine, &mut surface);

        engine.set_color([40, 60, 200]); // blue
        engine.on_press(50, 50);
        drain_all(&mut engine, &mut surface);
        engine.on_release();
        drain_all(&mut engine, &mut surface);

        let c = engine.committed.color[engine.index(50, 50)];
        // Subtractive mixing pulls yellow + blue toward green: green ends up
        // the strongest channel, unlike the greyish linear average.
        assert!(c[1] >= c[0] && c[1] >= c[2], "not on the pigment curve: {:?}", c);
    }

    #[test]
    fn release_clears_primitive_and_settles_steps() {
        let mut engine = WatercolorEngine::new(120, 120);
        engine.seed_rng(4);
        let mut surface = PixelSurface::new(120, 120);
        engine.set_size(6);

        engine.on_press(30, 60);
        for x in 31..=80 {
            engine.on_drag(x, 60);
        }
        drain_all(&mut engine, &mut surface);
        engine.on_release();
        drain_all(&mut engine, &mut surface);

        assert!(engine.is_idle());
        for (i, &has) in engine.primitive.has_primitive.iter().enumerate() {
            assert!(!has, "primitive survives at index {}", i);
        }
        for &s in engine.step.iter() {
            assert!(s == 0 || s == STEP_SETTLED);
        }
        // The stroke trail itself is settled.
        assert_eq!(engine.step[engine.index(40, 60)], STEP_SETTLED);
        assert!(!engine.has_drag_direction);
    }

    #[test]
    fn opacity_and_edge_bounds_hold_across_arbitrary_strokes() {
        let mut engine = WatercolorEngine::new(160, 120);
        engine.seed_rng(77);
        let mut surface = PixelSurface::new(160, 120);
        engine.set_size(9);

        let colors = [[200, 40, 40], [40, 160, 60], [30, 40, 180], [240, 200, 30]];
        for (k, color) in colors.iter().enumerate() {
            engine.set_color(*color);
            let base = 20 + (k as i32) * 12;
            engine.on_press(base, 40);
            for t in 1..40 {
                engine.on_drag(base + t, 40 + (t % 7));
            }
            drain_all(&mut engine, &mut surface);
            engine.on_release();
            drain_all(&mut engine, &mut surface);
        }

        let p = &engine.params;
        for i in 0..engine.committed.opacity.len() {
            let o = engine.committed.opacity[i];
            assert!((0.0..=1.0).contains(&o), "opacity {} at {}", o, i);
            assert!(
                (0.0..=p.first_layer_cap).contains(&engine.first_edge[i]),
                "first edge out of range at {}",
                i
            );
            assert!(
                (0.0..=p.second_layer_cap).contains(&engine.second_edge[i]),
                "second edge out of range at {}",
                i
            );
            assert!(
                (0.0..=p.third_cap).contains(&engine.third_persistent[i]),
                "third edge out of range at {}",
                i
            );
            assert!((0.0..=p.max_wet).contains(&engine.wet[i]));
        }
    }

    #[test]
    fn ring_mode_runs_the_full_pipeline() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.seed_rng(13);
        engine.params.diffusion_mode = DiffusionMode::Ring;
        let mut surface = PixelSurface::new(100, 100);
        engine.set_size(8);
        engine.on_press(50, 50);
        for x in 51..=70 {
            engine.on_drag(x, 50);
        }
        drain_all(&mut engine, &mut surface);
        engine.on_release();
        drain_all(&mut engine, &mut surface);

        assert!(engine.committed.committed[engine.index(50, 50)]);
        assert!(engine.committed.opacity.iter().all(|&o| (0.0..=1.0).contains(&o)));
    }

    #[test]
    fn continuation_memory_keeps_drag_from_flattening() {
        let mut engine = WatercolorEngine::new(200, 100);
        engine.seed_rng(21);
        let mut surface = PixelSurface::new(200, 100);
        engine.set_size(6);
        engine.set_color([180, 40, 40]);

        engine.on_press(20, 50);
        for x in 21..=120 {
            engine.on_drag(x, 50);
        }
        drain_all(&mut engine, &mut surface);
        engine.on_release();
        drain_all(&mut engine, &mut surface);

        // The whole trail is painted, not just the endpoints.
        assert!(engine.committed.committed[engine.index(60, 50)]);
        assert!(engine.committed.committed[engine.index(100, 50)]);
    }

    #[test]
    fn clear_canvas_restores_blank_state() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.seed_rng(2);
        let mut surface = PixelSurface::new(100, 100);
        engine.on_press(50, 50);
        drain_all(&mut engine, &mut surface);
        engine.on_release();
        drain_all(&mut engine, &mut surface);

        engine.clear_canvas(&mut surface);
        assert!(engine.committed.committed.iter().all(|&c| !c));
        assert!(engine.wet.iter().all(|&w| w == 0.0));
        assert!(surface.pixels().iter().all(|&b| b == 255));
    }
}
