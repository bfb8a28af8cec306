// ============================================================================
// PIGMENT DIFFUSION — directional multi-point spread toward existing pigment,
// the step-gated ring variant, and the post-diffusion convolution.
//
// Both strategies write into the engine's scratch pending buffer and copy
// back only the pixels they actually touched, so in-flight state within the
// same update is never clobbered.
// ============================================================================

use crate::engine::{STEP_SETTLED, WatercolorEngine};

/// Copy the current pending state of the brush region into the scratch
/// buffer, so sources and targets accumulate against a consistent snapshot.
fn snapshot_pending(engine: &mut WatercolorEngine, radius: f32) {
    engine.diffusion_scratch.clear();
    let region = engine.region(
        engine.brush_center_x as f32,
        engine.brush_center_y as f32,
        radius,
    );
    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let i = engine.index(x, y);
            if engine.pending.pending[i] {
                engine
                    .diffusion_scratch
                    .mark(i, engine.pending.color[i], engine.pending.opacity[i]);
                engine.diffusion_scratch.edge_intensity[i] = engine.pending.edge_intensity[i];
            }
        }
    }
}

/// Fold the scratch buffer back into the live pending field.
fn commit_scratch(engine: &mut WatercolorEngine) {
    let touched: Vec<u32> = engine.diffusion_scratch.touched().to_vec();
    for i in touched {
        let i = i as usize;
        engine.pending.mark(
            i,
            engine.diffusion_scratch.color[i],
            engine.diffusion_scratch.opacity[i],
        );
        engine.pending.edge_intensity[i] = engine.diffusion_scratch.edge_intensity[i];
    }
}

/// Directional multi-point diffusion.
///
/// Every pending pixel with a recorded target spreads part of its
/// concentration along the target direction as a fan of jittered sub-points.
/// Sub-point shares are normalized so the emitted mass equals the debited
/// mass; sub-points that land off-canvas (or overshoot away from the brush
/// center near the rim) refund their share to the source.
pub fn apply_directional_diffusion(engine: &mut WatercolorEngine) {
    let radius = engine.brush_radius as f32;
    if radius <= 0.0 {
        return;
    }
    snapshot_pending(engine, radius);

    let region = engine.region(
        engine.brush_center_x as f32,
        engine.brush_center_y as f32,
        radius,
    );
    let eps = engine.params.opacity_epsilon;
    let max_distance_factor = engine.params.diffusion_distance_factor;
    let angle_jitter = engine.params.diffusion_angle_jitter;
    let fresh_power = engine.params.fresh_falloff_power;

    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let i = engine.index(x, y);
            if !engine.pending.pending[i] || engine.closest_x[i] == -1 {
                continue;
            }
            if engine.gradient_x[i] == 0.0 && engine.gradient_y[i] == 0.0 {
                continue;
            }
            let dist_to_target = engine.distance[i];
            if dist_to_target.is_infinite() {
                continue;
            }

            let concentration = engine.pending.opacity[i];
            if concentration < eps {
                continue;
            }

            let dist_to_center = engine.dist_to_brush_center(x, y);
            let center_ratio = (dist_to_center / radius).min(1.0);
            let target_x = engine.closest_x[i];
            let target_y = engine.closest_y[i];
            let base_angle = ((target_y - y) as f32).atan2((target_x - x) as f32);

            let max_theoretical = (dist_to_target * 0.8).min(radius * max_distance_factor);
            if max_theoretical <= 0.0 {
                continue;
            }
            let distance_ratio = (dist_to_target / max_theoretical).min(1.0);
            // Already-committed pigment travels freely; fresh pigment is held
            // back the closer it already sits to its target.
            let inverse_distance_factor = if engine.committed.committed[i] {
                1.0
            } else {
                (1.0 - distance_ratio).powf(fresh_power)
            };
            let max_allowed = max_theoretical * inverse_distance_factor;
            if max_allowed < 1.0 {
                continue;
            }

            let num_points = (2.0 + 3.0 * center_ratio.powf(1.5)).round().max(2.0) as usize;
            let base_strength = 0.3 + 0.5 * inverse_distance_factor;
            let total_amount = concentration * base_strength * (0.7 + 0.3 * center_ratio);

            // Mild per-point falloff, normalized so the shares sum to the total.
            let weights: Vec<f32> = (0..num_points)
                .map(|k| 1.0 - (k as f32 / num_points as f32) * 0.3)
                .collect();
            let weight_sum: f32 = weights.iter().sum();

            let source_color = engine.pending.color[i];
            let mut emitted = 0.0;
            for &w in &weights {
                let angle = base_angle + engine.next_range(-1.0, 1.0) * angle_jitter;
                let spread = max_allowed * engine.next_range(0.7, 1.0);
                let px = (x as f32 + angle.cos() * spread).round() as i32;
                let py = (y as f32 + angle.sin() * spread).round() as i32;
                if !engine.in_bounds(px, py) {
                    continue;
                }
                // Near the rim, drop sub-points that overshoot outward.
                let sub_dist_to_center = engine.dist_to_brush_center(px, py);
                if sub_dist_to_center > dist_to_center * 1.5 && center_ratio > 0.7 {
                    continue;
                }

                let amount = total_amount * w / weight_sum;
                engine
                    .diffusion_scratch
                    .accumulate(engine.index(px, py), source_color, amount);
                emitted += amount;
            }

            engine.diffusion_scratch.mark(
                i,
                source_color,
                (concentration - emitted).max(0.0),
            );
        }
    }

    commit_scratch(engine);
}

/// Ring-area diffusion: the step-tracked variant.
///
/// Sources are restricted to the outer annulus of the footprint and gated by
/// step age — only cells the stroke passed long enough ago (or that have
/// fully settled) bleed outward again.
pub fn apply_ring_diffusion(engine: &mut WatercolorEngine) {
    let radius = engine.brush_radius as f32;
    if radius <= 0.0 {
        return;
    }
    let inner = radius * engine.params.ring_inner_factor;
    let outer = radius * engine.params.ring_outer_factor;
    if outer <= inner {
        return;
    }
    snapshot_pending(engine, outer);

    let region = engine.region(
        engine.brush_center_x as f32,
        engine.brush_center_y as f32,
        outer,
    );
    let eps = engine.params.opacity_epsilon;
    let age_threshold = (radius * engine.params.step_threshold_factor) as i32;
    let sub_points = engine.params.ring_sub_points.max(1);
    let retained = engine.params.ring_retained_fraction;
    let angle_jitter = engine.params.diffusion_angle_jitter * 4.0;
    let band = (outer - inner).max(1.0);
    let midline = (inner + outer) / 2.0;
    let half_band = (outer - inner) / 2.0;

    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let i = engine.index(x, y);
            if !engine.pending.pending[i] {
                continue;
            }
            let dist = engine.dist_to_brush_center(x, y);
            if dist < inner || dist > outer {
                continue;
            }

            let age = engine.step[i];
            if age == 0 {
                continue;
            }
            let eligible =
                age == STEP_SETTLED || (engine.step_count - age).abs() > age_threshold;
            if !eligible {
                continue;
            }

            let concentration = engine.pending.opacity[i];
            if concentration < eps {
                continue;
            }

            // Triangular profile: full strength on the midline, zero at the
            // annulus edges.
            let strength = 1.0 - ((dist - midline).abs() / half_band).min(1.0);
            if strength <= 0.0 {
                continue;
            }

            let total_amount = concentration * (1.0 - retained) * strength;
            let per_point = total_amount / sub_points as f32;
            let base_angle =
                ((y - engine.brush_center_y) as f32).atan2((x - engine.brush_center_x) as f32);
            let source_color = engine.pending.color[i];

            for _ in 0..sub_points {
                let angle = base_angle + engine.next_range(-1.0, 1.0) * angle_jitter;
                let spread = band * engine.next_range(0.5, 1.5);
                let px = (x as f32 + angle.cos() * spread).round() as i32;
                let py = (y as f32 + angle.sin() * spread).round() as i32;
                if !engine.in_bounds(px, py) {
                    continue;
                }
                engine
                    .diffusion_scratch
                    .accumulate(engine.index(px, py), source_color, per_point);
            }

            engine
                .diffusion_scratch
                .mark(i, source_color, concentration * retained);
        }
    }

    commit_scratch(engine);
}

/// 3×3 center-weighted convolution over the pending field.  Softens the
/// point-cloud texture the diffusion passes leave behind before commit.
pub fn apply_convolution(engine: &mut WatercolorEngine) {
    let radius = engine.brush_radius as f32 * 1.5;
    // Gather results first, write after: each pixel's neighborhood must be
    // sampled against the pre-convolution state.
    let region = engine.region(
        engine.brush_center_x as f32,
        engine.brush_center_y as f32,
        radius,
    );

    let mut results: Vec<(usize, [u8; 3], f32, f32)> = Vec::new();
    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let i = engine.index(x, y);
            if !engine.pending.pending[i] {
                continue;
            }

            let mut sum_color = [0.0f32; 3];
            let mut sum_opacity = 0.0;
            let mut sum_edge = 0.0;
            let mut max_edge = 0.0f32;
            let mut count = 0.0;

            for ky in -1..=1 {
                for kx in -1..=1 {
                    let nx = x + kx;
                    let ny = y + ky;
                    if !engine.in_bounds(nx, ny) {
                        continue;
                    }
                    let ni = engine.index(nx, ny);
                    if !engine.pending.pending[ni] {
                        continue;
                    }
                    let weight = if kx == 0 && ky == 0 { 2.0 } else { 1.0 };
                    let c = engine.pending.color[ni];
                    for ch in 0..3 {
                        sum_color[ch] += c[ch] as f32 * weight;
                    }
                    sum_opacity += engine.pending.opacity[ni] * weight;
                    let e = engine.pending.edge_intensity[ni];
                    sum_edge += e * weight;
                    max_edge = max_edge.max(e);
                    count += weight;
                }
            }

            if count > 0.0 {
                let color = [
                    (sum_color[0] / count).round().clamp(0.0, 255.0) as u8,
                    (sum_color[1] / count).round().clamp(0.0, 255.0) as u8,
                    (sum_color[2] / count).round().clamp(0.0, 255.0) as u8,
                ];
                let opacity = (sum_opacity / count).min(1.0);
                // High-intensity neighborhoods keep more of their peak.
                let edge = if max_edge > 0.4 {
                    (sum_edge / count) * 0.6 + max_edge * 0.4
                } else {
                    (sum_edge / count) * 0.8 + max_edge * 0.2
                };
                results.push((i, color, opacity, edge));
            }
        }
    }

    for (i, color, opacity, edge) in results {
        engine.pending.mark(i, color, opacity);
        engine.pending.edge_intensity[i] = edge;
    }
}
