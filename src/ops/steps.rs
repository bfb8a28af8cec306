// ============================================================================
// STEP TRACKING — a time-delayed trail of brush positions separating
// "freshly wet" from "settled" cells, the gate for ring diffusion.
// ============================================================================

use crate::engine::{STEP_SETTLED, WatercolorEngine};

/// Stroke start: the whole field is re-armed.  This is the only operation
/// allowed to overwrite settled cells.
pub fn begin_stroke(engine: &mut WatercolorEngine) {
    engine.step.fill(0);
    engine.step_count = 0;
    engine.coordinate_history.clear();
}

/// Per-sample update: bump the step counter and push the sample onto the
/// history.  Once the history exceeds its capacity (one brush-radius worth of
/// travel, scaled), the oldest — delayed — point falls out and its
/// neighborhood is stamped.  The lag is what models capillary wetting
/// trailing behind a moving brush.
pub fn advance(engine: &mut WatercolorEngine, x: i32, y: i32) {
    engine.step_count += 1;
    engine.coordinate_history.push_back((x, y));

    let capacity =
        ((engine.brush_radius as f32 * engine.params.history_depth_factor) as usize).max(1);
    while engine.coordinate_history.len() > capacity {
        if let Some((ox, oy)) = engine.coordinate_history.pop_front() {
            stamp_step(engine, ox, oy);
        }
    }
}

/// Stroke release: flush what's left of the history, then sweep every cell
/// the stroke visited to the settled sentinel.
pub fn finish_stroke(engine: &mut WatercolorEngine) {
    while let Some((ox, oy)) = engine.coordinate_history.pop_front() {
        stamp_step(engine, ox, oy);
    }
    for cell in engine.step.iter_mut() {
        if *cell != 0 && *cell != STEP_SETTLED {
            *cell = STEP_SETTLED;
        }
    }
    engine.step_count = 0;
}

/// Mark the neighborhood of a delayed point with the current step number and
/// top up its wetness.  Settled cells are never overwritten.
fn stamp_step(engine: &mut WatercolorEngine, x: i32, y: i32) {
    let radius = engine.brush_radius as f32 * engine.params.step_wet_radius_factor;
    let region = engine.region(x as f32, y as f32, radius);
    let radius_sq = radius * radius;
    let wet_add = engine.params.step_wet_value;
    let max_wet = engine.params.max_wet;

    for sy in region.top..=region.bottom {
        for sx in region.left..=region.right {
            let dx = (sx - x) as f32;
            let dy = (sy - y) as f32;
            if dx * dx + dy * dy > radius_sq {
                continue;
            }
            let i = engine.index(sx, sy);
            if engine.step[i] == STEP_SETTLED {
                continue;
            }
            engine.step[i] = engine.step_count;
            engine.wet[i] = (engine.wet[i] + wet_add).min(max_wet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag_points(n: usize) -> Vec<(i32, i32)> {
        (0..n).map(|i| (20 + i as i32, 40)).collect()
    }

    #[test]
    fn stamping_is_delayed_by_history_depth() {
        let mut engine = WatercolorEngine::new(200, 100);
        engine.brush_radius = 5;
        begin_stroke(&mut engine);

        let capacity = (5.0 * engine.params.history_depth_factor) as usize;
        // Up to capacity samples: nothing stamped yet.
        for &(x, y) in drag_points(capacity).iter() {
            advance(&mut engine, x, y);
        }
        assert!(engine.step.iter().all(|&s| s == 0));

        // One more sample pushes the oldest point out of the history and
        // stamps it — at the *oldest* position, not the newest.
        advance(&mut engine, 20 + capacity as i32, 40);
        let at_oldest = engine.index(20, 40);
        let at_newest = engine.index(20 + capacity as i32, 40);
        assert_eq!(engine.step[at_oldest], engine.step_count);
        assert_eq!(engine.step[at_newest], 0);
    }

    #[test]
    fn release_sweeps_visited_cells_to_settled() {
        let mut engine = WatercolorEngine::new(200, 100);
        engine.brush_radius = 5;
        begin_stroke(&mut engine);
        for &(x, y) in drag_points(30).iter() {
            advance(&mut engine, x, y);
        }
        finish_stroke(&mut engine);

        for &s in engine.step.iter() {
            assert!(s == 0 || s == STEP_SETTLED);
        }
        // The trail itself is settled.
        assert_eq!(engine.step[engine.index(25, 40)], STEP_SETTLED);
        // Far away: untouched.
        assert_eq!(engine.step[engine.index(150, 90)], 0);
    }

    #[test]
    fn settled_cells_survive_stamping() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.brush_radius = 5;
        begin_stroke(&mut engine);
        let i = engine.index(22, 40);
        engine.step[i] = STEP_SETTLED;

        for &(x, y) in drag_points(40).iter() {
            advance(&mut engine, x, y);
        }
        assert_eq!(engine.step[i], STEP_SETTLED);
    }

    #[test]
    fn begin_stroke_rearms_settled_cells() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.step.fill(STEP_SETTLED);
        begin_stroke(&mut engine);
        assert!(engine.step.iter().all(|&s| s == 0));
        assert_eq!(engine.step_count, 0);
    }

    #[test]
    fn stamping_tops_up_wetness() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.brush_radius = 4;
        begin_stroke(&mut engine);
        let capacity = (4.0 * engine.params.history_depth_factor) as usize;
        for i in 0..=capacity {
            advance(&mut engine, 30 + i as i32, 30);
        }
        assert!(engine.wet[engine.index(30, 30)] > 0.0);
    }
}
