// ============================================================================
// MULTI-LAYER EDGE ENGINE — the dark watercolor rim.
//
// Three cooperating scalar fields produce the effect:
//   first   — global, slow, resistance-limited accumulation; persists.
//   second  — brush-local, fully recomputed every update.
//   third   — a relocatable working grid diffusing drag-shaped halos into a
//             full-canvas persistent buffer.
// ============================================================================

use crate::engine::{Region, WatercolorEngine};

const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

// 3×3 center-weighted blur kernel for the persistent third layer.
const BLUR_KERNEL: [[f32; 3]; 3] = [
    [0.075, 0.124, 0.075],
    [0.124, 0.204, 0.124],
    [0.075, 0.124, 0.075],
];

/// Saturating-growth modifier: how hard it is to push `value` further toward
/// `cap`.  Strictly decreasing over `[0, cap)`, exactly 0 at the cap.
#[inline]
pub fn accumulation_resistance(value: f32, cap: f32) -> f32 {
    if cap <= 0.0 || value >= cap {
        return 0.0;
    }
    let headroom = 1.0 - value / cap;
    headroom * headroom
}

/// Recompute every edge layer for the active brush region.  Runs after
/// diffusion/commit, once per stroke-point update.
pub fn recompute_edges(engine: &mut WatercolorEngine) {
    let radius = engine.brush_radius as f32;
    if radius <= 0.0 {
        return;
    }
    let detect = engine.region(
        engine.brush_center_x as f32,
        engine.brush_center_y as f32,
        radius * engine.params.edge_detection_radius_factor,
    );
    if detect.is_empty() {
        return;
    }

    // Relocate the first layer's halo before recomputing, so edges follow the
    // brush instead of leaving stale rings behind.
    preclear_layers(engine);

    let (gradient, max_gradient) = wetness_gradient(engine, &detect);
    if max_gradient <= 0.0 {
        // Flat wetness: no edges here at all.
        zero_local_edges(engine, &detect);
        return;
    }

    let inv_max = 1.0 / max_gradient;
    update_first_and_second_layers(engine, &detect, &gradient, inv_max);
    update_third_layer(engine, &detect);
}

/// Sobel gradient magnitude of the wetness field, restricted to pixels that
/// carry pigment.  Pixels without a full in-region 3×3 neighborhood stay 0.
/// High local wetness penalizes the magnitude — standing water runs off less.
fn wetness_gradient(engine: &WatercolorEngine, detect: &Region) -> (Vec<f32>, f32) {
    let rw = (detect.right - detect.left + 1) as usize;
    let rh = (detect.bottom - detect.top + 1) as usize;
    let mut gradient = vec![0.0f32; rw * rh];
    let mut max_gradient = 0.0f32;

    let wet_penalty_threshold = engine.params.wet_penalty_threshold;
    let wet_penalty = engine.params.wet_penalty_factor;

    for y in (detect.top + 1)..detect.bottom {
        for x in (detect.left + 1)..detect.right {
            let i = engine.index(x, y);
            if !engine.committed.committed[i] && !engine.pending.pending[i] {
                continue;
            }

            let mut gx = 0.0;
            let mut gy = 0.0;
            for ky in -1i32..=1 {
                for kx in -1i32..=1 {
                    let w = engine.wet[engine.index(x + kx, y + ky)];
                    gx += w * SOBEL_X[(ky + 1) as usize][(kx + 1) as usize];
                    gy += w * SOBEL_Y[(ky + 1) as usize][(kx + 1) as usize];
                }
            }

            let mut magnitude = (gx * gx + gy * gy).sqrt();
            if engine.wet[i] > wet_penalty_threshold {
                magnitude *= wet_penalty;
            }

            let li = (y - detect.top) as usize * rw + (x - detect.left) as usize;
            gradient[li] = magnitude;
            max_gradient = max_gradient.max(magnitude);
        }
    }

    (gradient, max_gradient)
}

/// Attenuate the first layer around the brush (strongest at the center) and
/// wipe the second layer over a slightly larger neighborhood.
fn preclear_layers(engine: &mut WatercolorEngine) {
    let radius = engine.brush_radius as f32;
    let cx = engine.brush_center_x;
    let cy = engine.brush_center_y;

    let cover_radius = radius * engine.params.cover_radius_factor;
    let strength = engine.params.first_clear_strength;
    let cover = engine.region(cx as f32, cy as f32, cover_radius);
    for y in cover.top..=cover.bottom {
        for x in cover.left..=cover.right {
            let dx = (x - cx) as f32;
            let dy = (y - cy) as f32;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist > cover_radius {
                continue;
            }
            let i = engine.index(x, y);
            engine.first_edge[i] *= 1.0 - strength * (1.0 - dist / cover_radius);
        }
    }

    let clear_radius = radius * engine.params.second_clear_radius_factor;
    let clear = engine.region(cx as f32, cy as f32, clear_radius);
    let clear_radius_sq = clear_radius * clear_radius;
    for y in clear.top..=clear.bottom {
        for x in clear.left..=clear.right {
            let dx = (x - cx) as f32;
            let dy = (y - cy) as f32;
            if dx * dx + dy * dy <= clear_radius_sq {
                let i = engine.index(x, y);
                engine.second_edge[i] = 0.0;
            }
        }
    }
}

fn zero_local_edges(engine: &mut WatercolorEngine, detect: &Region) {
    for y in detect.top..=detect.bottom {
        for x in detect.left..=detect.right {
            let i = engine.index(x, y);
            engine.second_edge[i] = 0.0;
            engine.pending.edge_intensity[i] = 0.0;
        }
    }
}

fn update_first_and_second_layers(
    engine: &mut WatercolorEngine,
    detect: &Region,
    gradient: &[f32],
    inv_max: f32,
) {
    let rw = (detect.right - detect.left + 1) as usize;
    let radius = engine.brush_radius as f32;
    let assign_radius = radius * engine.params.second_assign_radius_factor;
    let assign_radius_sq = assign_radius * assign_radius;

    let first_threshold = engine.params.first_layer_threshold;
    let first_power = engine.params.first_layer_power;
    let first_scale = engine.params.first_layer_scale;
    let first_cap = engine.params.first_layer_cap;
    let second_threshold = engine.params.second_layer_threshold;
    let second_power = engine.params.second_layer_power;
    let second_scale = engine.params.second_layer_scale;
    let second_cap = engine.params.second_layer_cap;

    for y in (detect.top + 1)..detect.bottom {
        for x in (detect.left + 1)..detect.right {
            let i = engine.index(x, y);
            if !engine.committed.committed[i] && !engine.pending.pending[i] {
                continue;
            }
            let li = (y - detect.top) as usize * rw + (x - detect.left) as usize;
            let g = gradient[li] * inv_max;

            // First layer: slow, self-limiting accumulation.  The closer a
            // cell sits to its cap, the less a pass can add.
            if g > first_threshold {
                let gain = g.powf(first_power)
                    * first_scale
                    * accumulation_resistance(engine.first_edge[i], first_cap);
                engine.first_edge[i] = (engine.first_edge[i] + gain).min(first_cap);
            }

            // Second layer: assigned outright, brush-local only.
            let dx = (x - engine.brush_center_x) as f32;
            let dy = (y - engine.brush_center_y) as f32;
            if dx * dx + dy * dy <= assign_radius_sq && g > second_threshold {
                engine.second_edge[i] = (g.powf(second_power) * second_scale).min(second_cap);
                engine.pending.edge_intensity[i] = engine.second_edge[i];
            }
        }
    }
}

/// The third layer: inject at trigger points, decay and diffuse in the
/// relocatable temp grid, then fold back into the persistent canvas layer.
fn update_third_layer(engine: &mut WatercolorEngine, detect: &Region) {
    let radius = engine.brush_radius as f32;
    let cx = engine.brush_center_x;
    let cy = engine.brush_center_y;
    let eps = engine.params.opacity_epsilon;

    // Trigger points: fresh local edges, plus strong fresh pigment.
    let mut triggers: Vec<(i32, i32)> = Vec::new();
    for y in detect.top..=detect.bottom {
        for x in detect.left..=detect.right {
            let i = engine.index(x, y);
            if engine.second_edge[i] > 0.0
                || (engine.pending.pending[i]
                    && engine.pending.opacity[i] > engine.params.third_trigger_opacity)
            {
                triggers.push((x, y));
            }
        }
    }

    let half = (radius * engine.params.third_temp_radius_factor).ceil() as i32;
    engine.third_temp.ensure(cx, cy, half);
    let side = engine.third_temp.side();
    let half_f = half as f32;

    // Copy-in: refresh the temp grid from the persistent layer.
    for ly in 0..side {
        for lx in 0..side {
            let x = cx - half + lx;
            let y = cy - half + ly;
            let li = (ly * side + lx) as usize;
            engine.third_temp.data[li] = if engine.in_bounds(x, y) {
                engine.third_persistent[engine.index(x, y)]
            } else {
                0.0
            };
        }
    }

    // Radially-varying decay: slow near the center, fastest at mid-radius,
    // slow again at the rim, so the halo keeps a visible front without a
    // hard boundary.  Quadratic through the three tuned samples.
    let d0 = engine.params.third_decay_center;
    let d1 = engine.params.third_decay_mid;
    let d2 = engine.params.third_decay_rim;
    let c = 2.0 * d2 + 2.0 * d0 - 4.0 * d1;
    let b = d2 - d0 - c;
    for ly in 0..side {
        for lx in 0..side {
            let dx = (lx - half) as f32;
            let dy = (ly - half) as f32;
            let d = ((dx * dx + dy * dy).sqrt() / half_f).min(1.0);
            let decay = d0 + b * d + c * d * d;
            engine.third_temp.data[(ly * side + lx) as usize] *= decay;
        }
    }

    // Inject at trigger points, saturating at the cap.
    let injection = engine.params.third_injection;
    let cap = engine.params.third_cap;
    for &(tx, ty) in &triggers {
        if let Some(li) = engine.third_temp.local_index(tx, ty) {
            engine.third_temp.data[li] = (engine.third_temp.data[li] + injection).min(cap);
        }
    }

    diffuse_third_temp(engine);

    // Mix-back: mostly replace the persistent layer inside the footprint.
    let mix = engine.params.third_mix_ratio;
    for ly in 0..side {
        for lx in 0..side {
            let dx = (lx - half) as f32;
            let dy = (ly - half) as f32;
            if (dx * dx + dy * dy).sqrt() > half_f {
                continue;
            }
            let x = cx - half + lx;
            let y = cy - half + ly;
            if !engine.in_bounds(x, y) {
                continue;
            }
            let i = engine.index(x, y);
            let temp = engine.third_temp.data[(ly * side + lx) as usize];
            let mixed = engine.third_persistent[i] * (1.0 - mix) + temp * mix;
            engine.third_persistent[i] = if mixed < eps { 0.0 } else { mixed.min(cap) };
        }
    }

    smooth_third_persistent(engine, detect);
}

/// 8-neighbor diffusion over the temp grid.  With a known drag direction the
/// halo is pushed forward, barely backward and moderately sideways; the
/// source loses a little more the farther it sits from the grid center.
fn diffuse_third_temp(engine: &mut WatercolorEngine) {
    let side = engine.third_temp.side();
    let half = engine.third_temp.half;
    let half_f = half as f32;
    let rate = engine.params.third_diffusion_rate;
    let retention_loss = engine.params.third_retention_loss;
    let cap = engine.params.third_cap;

    let (dir_x, dir_y) = engine.drag_direction;
    let has_direction = engine.has_drag_direction;
    let forward = engine.params.third_forward_weight;
    let backward = engine.params.third_backward_weight;
    let sideways = engine.params.third_side_weight;

    const NEIGHBORS: [(i32, i32); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    let mut next = vec![0.0f32; engine.third_temp.data.len()];
    for ly in 0..side {
        for lx in 0..side {
            let li = (ly * side + lx) as usize;
            let value = engine.third_temp.data[li];
            if value <= 0.0 {
                continue;
            }

            let dx = (lx - half) as f32;
            let dy = (ly - half) as f32;
            let center_ratio = ((dx * dx + dy * dy).sqrt() / half_f).min(1.0);
            let retained = value * (1.0 - rate) * (1.0 - retention_loss * center_ratio);
            next[li] += retained;

            let moved = value * rate;
            let mut weights = [0.0f32; 8];
            let mut weight_sum = 0.0;
            for (k, &(nx, ny)) in NEIGHBORS.iter().enumerate() {
                if lx + nx < 0 || lx + nx >= side || ly + ny < 0 || ly + ny >= side {
                    continue;
                }
                let w = if has_direction {
                    let len = ((nx * nx + ny * ny) as f32).sqrt();
                    let dot = (nx as f32 * dir_x + ny as f32 * dir_y) / len;
                    if dot > 0.3 {
                        forward
                    } else if dot < -0.3 {
                        backward
                    } else {
                        sideways
                    }
                } else {
                    1.0
                };
                weights[k] = w;
                weight_sum += w;
            }
            if weight_sum <= 0.0 {
                continue;
            }
            for (k, &(nx, ny)) in NEIGHBORS.iter().enumerate() {
                if weights[k] == 0.0 {
                    continue;
                }
                let ni = ((ly + ny) * side + lx + nx) as usize;
                next[ni] += moved * weights[k] / weight_sum;
            }
        }
    }

    for v in next.iter_mut() {
        *v = v.min(cap);
    }
    engine.third_temp.data = next;
}

/// Center-weighted 3×3 blur of the persistent layer, in-region only.
/// Prevents the mix-back from leaving high-frequency speckle.
fn smooth_third_persistent(engine: &mut WatercolorEngine, detect: &Region) {
    let eps = engine.params.opacity_epsilon;
    let rw = (detect.right - detect.left + 1) as usize;
    let rh = (detect.bottom - detect.top + 1) as usize;
    let mut smoothed = vec![0.0f32; rw * rh];

    for y in detect.top..=detect.bottom {
        for x in detect.left..=detect.right {
            let i = engine.index(x, y);
            let li = (y - detect.top) as usize * rw + (x - detect.left) as usize;
            if engine.third_persistent[i] <= eps {
                smoothed[li] = engine.third_persistent[i];
                continue;
            }
            let mut sum = 0.0;
            let mut weight_sum = 0.0;
            for ky in -1i32..=1 {
                for kx in -1i32..=1 {
                    let nx = x + kx;
                    let ny = y + ky;
                    if !engine.in_bounds(nx, ny) {
                        continue;
                    }
                    let w = BLUR_KERNEL[(ky + 1) as usize][(kx + 1) as usize];
                    sum += engine.third_persistent[engine.index(nx, ny)] * w;
                    weight_sum += w;
                }
            }
            smoothed[li] = if weight_sum > 0.0 {
                sum / weight_sum
            } else {
                engine.third_persistent[i]
            };
        }
    }

    for y in detect.top..=detect.bottom {
        for x in detect.left..=detect.right {
            let i = engine.index(x, y);
            let li = (y - detect.top) as usize * rw + (x - detect.left) as usize;
            engine.third_persistent[i] = smoothed[li];
        }
    }
}

/// Press-time partial clear of the persistent third layer, strongest at the
/// press position, so a new stroke doesn't inherit a stale halo.
pub fn clear_third_layer_at(engine: &mut WatercolorEngine, cx: i32, cy: i32, radius: i32) {
    let rf = radius as f32;
    if rf <= 0.0 {
        return;
    }
    let strength = engine.params.third_press_clear;
    let region = engine.region(cx as f32, cy as f32, rf);
    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let dx = (x - cx) as f32;
            let dy = (y - cy) as f32;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist > rf {
                continue;
            }
            let i = engine.index(x, y);
            engine.third_persistent[i] *= 1.0 - strength * (1.0 - dist / rf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::WatercolorEngine;
    use crate::ops::pigment;

    #[test]
    fn resistance_is_strictly_decreasing() {
        let cap = 1.0;
        let mut prev = accumulation_resistance(0.0, cap);
        assert_eq!(prev, 1.0);
        for k in 1..100 {
            let v = k as f32 / 100.0;
            let r = accumulation_resistance(v, cap);
            assert!(r < prev, "not decreasing at v={}", v);
            prev = r;
        }
        assert_eq!(accumulation_resistance(1.0, cap), 0.0);
        assert_eq!(accumulation_resistance(1.5, cap), 0.0);
    }

    #[test]
    fn resistance_handles_degenerate_cap() {
        assert_eq!(accumulation_resistance(0.0, 0.0), 0.0);
    }

    fn wetted_engine() -> WatercolorEngine {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.seed_rng(1);
        engine.begin_update(50, 50, 10);
        pigment::distribute_pigment(&mut engine);
        pigment::commit_pigment(&mut engine);
        engine
    }

    #[test]
    fn edges_form_at_the_wet_rim() {
        let mut engine = wetted_engine();
        recompute_edges(&mut engine);

        // Somewhere in the footprint the second layer fired.
        let any_second = engine.second_edge.iter().any(|&v| v > 0.0);
        assert!(any_second);
        // The flat wet plateau at the very center carries no gradient.
        assert_eq!(engine.second_edge[engine.index(50, 50)], 0.0);
    }

    #[test]
    fn edge_layers_respect_caps() {
        let mut engine = wetted_engine();
        for _ in 0..50 {
            recompute_edges(&mut engine);
        }
        let p = &engine.params;
        assert!(
            engine
                .first_edge
                .iter()
                .all(|&v| (0.0..=p.first_layer_cap).contains(&v))
        );
        assert!(
            engine
                .second_edge
                .iter()
                .all(|&v| (0.0..=p.second_layer_cap).contains(&v))
        );
        assert!(
            engine
                .third_persistent
                .iter()
                .all(|&v| (0.0..=p.third_cap).contains(&v))
        );
    }

    #[test]
    fn first_layer_growth_slows_near_cap() {
        let mut engine = wetted_engine();
        recompute_edges(&mut engine);
        let i = engine
            .first_edge
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let after_one = engine.first_edge[i];
        assert!(after_one > 0.0);

        let mut last = after_one;
        let mut gains = Vec::new();
        for _ in 0..6 {
            recompute_edges(&mut engine);
            gains.push(engine.first_edge[i] - last);
            last = engine.first_edge[i];
        }
        // Preclear attenuation aside, growth never explodes past the cap and
        // later passes add less than the first did.
        assert!(last <= engine.params.first_layer_cap);
        assert!(gains.last().unwrap() < &after_one);
    }

    #[test]
    fn flat_wetness_produces_no_edges() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.begin_update(50, 50, 10);
        // Pigment without any wetness variation.
        for y in 40..=60 {
            for x in 40..=60 {
                let i = engine.index(x, y);
                engine.committed.committed[i] = true;
                engine.committed.opacity[i] = 0.5;
            }
        }
        for w in engine.wet.iter_mut() {
            *w = 0.5;
        }
        recompute_edges(&mut engine);
        assert!(engine.second_edge.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn third_layer_follows_triggers() {
        let mut engine = wetted_engine();
        recompute_edges(&mut engine);
        let any_third = engine.third_persistent.iter().any(|&v| v > 0.0);
        assert!(any_third);
    }

    #[test]
    fn press_clear_attenuates_strongest_at_center() {
        let mut engine = WatercolorEngine::new(100, 100);
        let center = engine.index(50, 50);
        let rim = engine.index(58, 50);
        engine.third_persistent[center] = 0.8;
        engine.third_persistent[rim] = 0.8;
        clear_third_layer_at(&mut engine, 50, 50, 10);
        assert!(engine.third_persistent[center] < engine.third_persistent[rim]);
        assert!(engine.third_persistent[rim] < 0.8);
    }
}
