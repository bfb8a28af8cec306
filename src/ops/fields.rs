// ============================================================================
// SCRATCH FIELDS — distance and direction toward existing pigment, rebuilt
// from scratch for every stroke-point update.
// ============================================================================

use crate::engine::WatercolorEngine;

/// Euclidean distance between two pixel coordinates.
#[inline]
pub fn distance_between(x1: i32, y1: i32, x2: i32, y2: i32) -> f32 {
    let dx = (x1 - x2) as f32;
    let dy = (y1 - y2) as f32;
    (dx * dx + dy * dy).sqrt()
}

/// Seed the distance scratch: committed pixels in the search range are
/// distance 0 from themselves and become candidate diffusion targets;
/// everything else is reset to the "no target" sentinel.
pub fn collect_committed_points(engine: &mut WatercolorEngine) {
    let search_radius = engine.brush_radius as f32 * engine.params.update_radius_factor;
    let region = engine.region(
        engine.brush_center_x as f32,
        engine.brush_center_y as f32,
        search_radius,
    );

    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let i = engine.index(x, y);
            if engine.committed.committed[i] {
                engine.distance[i] = 0.0;
                engine.closest_x[i] = x;
                engine.closest_y[i] = y;
                engine.committed_points.push((x, y));
            } else {
                engine.distance[i] = f32::INFINITY;
                engine.closest_x[i] = -1;
                engine.closest_y[i] = -1;
            }
        }
    }
}

/// For every pending pixel, pick a committed target to diffuse toward.
///
/// Eligibility biases diffusion outward: a candidate must sit farther from
/// the brush center than the pending pixel itself, and within
/// `radius × (update_radius_factor − 1)` of the pixel.  Among the eligible
/// candidates one is chosen at random — the nearest-eligible filter, not
/// nearest euclidean.
pub fn compute_distance_field(engine: &mut WatercolorEngine) {
    if engine.committed_points.is_empty() {
        return;
    }

    let region = engine.region(
        engine.brush_center_x as f32,
        engine.brush_center_y as f32,
        engine.brush_radius as f32,
    );
    let max_reach = engine.brush_radius as f32 * (engine.params.update_radius_factor - 1.0);

    // Candidate distances to the brush center, computed once.
    let candidates: Vec<(i32, i32, f32)> = engine
        .committed_points
        .iter()
        .map(|&(x, y)| {
            (
                x,
                y,
                distance_between(x, y, engine.brush_center_x, engine.brush_center_y),
            )
        })
        .collect();

    let mut eligible: Vec<(i32, i32)> = Vec::new();
    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let i = engine.index(x, y);
            if !engine.pending.pending[i] {
                continue;
            }

            let pixel_dist_to_center =
                distance_between(x, y, engine.brush_center_x, engine.brush_center_y);

            eligible.clear();
            for &(cx, cy, dist_to_center) in &candidates {
                if dist_to_center <= pixel_dist_to_center {
                    continue;
                }
                // Manhattan prefilter before the exact distance.
                if ((x - cx).abs() + (y - cy).abs()) as f32 > max_reach {
                    continue;
                }
                if distance_between(x, y, cx, cy) <= max_reach {
                    eligible.push((cx, cy));
                }
            }

            if eligible.is_empty() {
                engine.distance[i] = f32::INFINITY;
                engine.closest_x[i] = -1;
                engine.closest_y[i] = -1;
                continue;
            }

            let pick = engine.next_index(eligible.len());
            let (tx, ty) = eligible[pick];
            engine.distance[i] = distance_between(x, y, tx, ty);
            engine.closest_x[i] = tx;
            engine.closest_y[i] = ty;
        }
    }
}

/// Normalized direction from each pending pixel toward its chosen target.
/// Coincident pixels get a random direction; pixels without a target get 0.
pub fn compute_gradient_field(engine: &mut WatercolorEngine) {
    let region = engine.region(
        engine.brush_center_x as f32,
        engine.brush_center_y as f32,
        engine.brush_radius as f32,
    );

    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let i = engine.index(x, y);
            if !engine.pending.pending[i] {
                continue;
            }

            let tx = engine.closest_x[i];
            let ty = engine.closest_y[i];
            if tx == -1 {
                engine.gradient_x[i] = 0.0;
                engine.gradient_y[i] = 0.0;
                continue;
            }

            let dist = engine.distance[i];
            if dist > 0.0 {
                engine.gradient_x[i] = (tx - x) as f32 / dist;
                engine.gradient_y[i] = (ty - y) as f32 / dist;
            } else {
                let angle = engine.next_f32() * std::f32::consts::TAU;
                engine.gradient_x[i] = angle.cos();
                engine.gradient_y[i] = angle.sin();
            }
        }
    }
}
