// ============================================================================
// PIGMENT APPLICATION — wetting, pending distribution, commit, and the
// continuation memory that keeps a drag from flattening to one tone.
// ============================================================================

use crate::color::{hsl_to_rgb, mix_pigment, rgb_to_hsl};
use crate::engine::{PigmentCell, WatercolorEngine};

/// Deposit the current brush sample: raise wetness over the wet footprint,
/// populate the pending field (brush color at stroke start, continuation
/// memory mid-drag) and stamp the primitive layer with the pure brush color.
pub fn distribute_pigment(engine: &mut WatercolorEngine) {
    let cx = engine.brush_center_x;
    let cy = engine.brush_center_y;
    let radius = engine.brush_radius;
    if radius <= 0 {
        return;
    }
    engine.ensure_brush_memory(radius);

    let rf = radius as f32;
    let wet_radius = rf * engine.params.wet_radius_factor;
    let inner_wet_radius = rf * engine.params.wet_inner_radius_factor;
    let region = engine.region(cx as f32, cy as f32, wet_radius);

    let radius_sq = rf * rf;
    let wet_radius_sq = wet_radius * wet_radius;
    let inner_wet_sq = inner_wet_radius * inner_wet_radius;
    let wet_center = engine.params.wet_center_value;
    let max_wet = engine.params.max_wet;
    let opacity = engine.brush.opacity * engine.params.stroke_opacity_factor;
    let side = 2 * radius + 1;

    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let dx = (x - cx) as f32;
            let dy = (y - cy) as f32;
            let dist_sq = dx * dx + dy * dy;
            let i = engine.index(x, y);

            // Wetness: plateau inside the inner radius, linear falloff to the
            // wet rim, saturating add.
            if dist_sq <= wet_radius_sq {
                let mut wet_value = wet_center;
                if dist_sq > inner_wet_sq {
                    let t = (dist_sq.sqrt() - inner_wet_radius) / (wet_radius - inner_wet_radius);
                    wet_value = wet_center * (1.0 - t);
                }
                engine.wet[i] = (engine.wet[i] + wet_value).min(max_wet);
            }

            if dist_sq > radius_sq {
                continue;
            }

            // Brush-local offset into the continuation memory; the footprint
            // is a subset of the (2r+1)² grid by construction.
            let bx = x - (cx - radius);
            let by = y - (cy - radius);
            let bi = (by * side + bx) as usize;

            let color = if engine.stroke_active && bi < engine.last_brush_pigment.len() {
                engine.last_brush_pigment[bi].color
            } else {
                engine.brush.color
            };

            engine.pending.mark(i, color, opacity);
            // Seed the convolution with the previous update's local edge.
            engine.pending.edge_intensity[i] = engine.second_edge[i];

            engine
                .primitive
                .mark(i, engine.brush.color, engine.brush.opacity);
        }
    }
}

/// Fold the pending field into committed pigment: subtractive blend with an
/// opacity-weighted mix ratio on top of existing paint, outright replacement
/// on bare paper.
pub fn commit_pigment(engine: &mut WatercolorEngine) {
    let eps = engine.params.opacity_epsilon;
    let gain = engine.params.commit_opacity_gain;
    let touched: Vec<u32> = engine.pending.touched().to_vec();

    for i in touched {
        let i = i as usize;
        if !engine.pending.pending[i] {
            continue;
        }
        let new_opacity = engine.pending.opacity[i];
        if new_opacity < eps {
            continue;
        }
        let new_color = engine.pending.color[i];

        if engine.committed.committed[i] && engine.committed.opacity[i] >= eps {
            let old_opacity = engine.committed.opacity[i];
            let ratio = (new_opacity / (new_opacity + old_opacity)).min(1.0);
            engine.committed.color[i] = mix_pigment(engine.committed.color[i], new_color, ratio);
            engine.committed.opacity[i] = (old_opacity + new_opacity * gain).min(1.0);
        } else {
            engine.committed.committed[i] = true;
            engine.committed.color[i] = new_color;
            engine.committed.opacity[i] = new_opacity.min(1.0);
        }
    }
}

/// Refresh the continuation memory from the paint now under the brush.
///
/// Outside the inner circle each cell picks up the committed field color with
/// a small admixture of the footprint's average (pigment carried along the
/// stroke); inside it, hue and saturation follow the field but lightness is
/// protected so repeated passes don't grind the stroke to black.
pub fn refresh_continuation_memory(engine: &mut WatercolorEngine) {
    let cx = engine.brush_center_x;
    let cy = engine.brush_center_y;
    let radius = engine.brush_radius;
    if radius <= 0 {
        return;
    }
    let rf = radius as f32;
    let region = engine.region(cx as f32, cy as f32, rf);
    let side = 2 * radius + 1;
    let retention = engine.params.retention_ratio;
    let protection = engine.params.lightness_protection_ratio;
    let min_lightness_fraction = engine.params.min_lightness_fraction;

    // Average committed color inside the footprint.
    let mut sum = [0.0f32; 3];
    let mut count = 0u32;
    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let dx = (x - cx) as f32;
            let dy = (y - cy) as f32;
            if dx * dx + dy * dy > rf * rf {
                continue;
            }
            let i = engine.index(x, y);
            if engine.committed.committed[i] {
                let c = engine.committed.color[i];
                for ch in 0..3 {
                    sum[ch] += c[ch] as f32;
                }
                count += 1;
            }
        }
    }
    let average: [u8; 3] = if count > 0 {
        [
            (sum[0] / count as f32).round() as u8,
            (sum[1] / count as f32).round() as u8,
            (sum[2] / count as f32).round() as u8,
        ]
    } else {
        [255, 255, 255]
    };

    let brush_hsl = rgb_to_hsl(
        engine.brush.color[0],
        engine.brush.color[1],
        engine.brush.color[2],
    );

    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let dx = (x - cx) as f32;
            let dy = (y - cy) as f32;
            let dist = (dx * dx + dy * dy).sqrt();
            let i = engine.index(x, y);
            let bx = x - (cx - radius);
            let by = y - (cy - radius);
            let bi = (by * side + bx) as usize;
            if bi >= engine.last_brush_pigment.len() {
                continue;
            }

            if dist >= rf {
                // Rim and corners: field color plus a trace of the average.
                let field = if engine.committed.committed[i] {
                    engine.committed.color[i]
                } else {
                    [255, 255, 255]
                };
                let mut mixed = [0u8; 3];
                for ch in 0..3 {
                    mixed[ch] = (field[ch] as f32 * (1.0 - retention)
                        + average[ch] as f32 * retention)
                        .round() as u8;
                }
                engine.last_brush_pigment[bi] = PigmentCell {
                    color: mixed,
                    opacity: if engine.committed.committed[i] {
                        engine.committed.opacity[i]
                    } else {
                        1.0
                    },
                };
            } else {
                // Inner circle: keep the mixed hue, protect the lightness.
                let field = if engine.committed.committed[i] {
                    engine.committed.color[i]
                } else {
                    engine.brush.color
                };
                let field_hsl = rgb_to_hsl(field[0], field[1], field[2]);
                let protected = field_hsl.l * (1.0 - protection) + brush_hsl.l * protection;
                let final_l = protected.max(brush_hsl.l * min_lightness_fraction);
                engine.last_brush_pigment[bi] = PigmentCell {
                    color: hsl_to_rgb(field_hsl.h, field_hsl.s, final_l),
                    opacity: 1.0,
                };
            }
        }
    }
}

/// Stroke-end merge: fold the uncontaminated brush color into committed
/// pigment at the same weight the renderer previews it, then drop the layer.
/// The committed field lands exactly where the preview already was, so the
/// release causes no visible pop.
pub fn merge_primitive_layer(engine: &mut WatercolorEngine) {
    let weight = engine.params.primitive_render_weight;
    let touched: Vec<u32> = engine.primitive.touched().to_vec();
    for i in touched {
        let i = i as usize;
        if !engine.primitive.has_primitive[i] || !engine.committed.committed[i] {
            continue;
        }
        let t = weight * engine.primitive.opacity[i];
        engine.committed.color[i] =
            mix_pigment(engine.committed.color[i], engine.primitive.color[i], t);
    }
    engine.primitive.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::WatercolorEngine;

    #[test]
    fn distribute_wets_with_radial_profile() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.begin_update(50, 50, 10);
        distribute_pigment(&mut engine);

        let center = engine.index(50, 50);
        assert_eq!(engine.wet[center], engine.params.wet_center_value);
        // Plateau edge still gets the full value.
        let plateau = engine.index(50 + 7, 50);
        assert_eq!(engine.wet[plateau], engine.params.wet_center_value);
        // Between plateau and rim: reduced but nonzero.
        let falloff = engine.index(50 + 9, 50);
        assert!(engine.wet[falloff] > 0.0);
        assert!(engine.wet[falloff] < engine.params.wet_center_value);
        // Outside the wet radius: dry.
        let outside = engine.index(50 + 12, 50);
        assert_eq!(engine.wet[outside], 0.0);
    }

    #[test]
    fn wetness_saturates_at_max() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.begin_update(50, 50, 10);
        for _ in 0..10 {
            distribute_pigment(&mut engine);
        }
        let center = engine.index(50, 50);
        assert!(engine.wet[center] <= engine.params.max_wet);
    }

    #[test]
    fn commit_replaces_on_bare_paper() {
        let mut engine = WatercolorEngine::new(64, 64);
        engine.begin_update(32, 32, 4);
        let i = engine.index(32, 32);
        engine.pending.mark(i, [120, 30, 30], 0.4);
        commit_pigment(&mut engine);
        assert!(engine.committed.committed[i]);
        assert_eq!(engine.committed.color[i], [120, 30, 30]);
        assert!((engine.committed.opacity[i] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn commit_blends_subtractively_over_paint() {
        let mut engine = WatercolorEngine::new(64, 64);
        engine.begin_update(32, 32, 4);
        let i = engine.index(32, 32);
        engine.committed.committed[i] = true;
        engine.committed.color[i] = [220, 220, 40]; // yellow
        engine.committed.opacity[i] = 0.4;
        engine.pending.mark(i, [40, 60, 200], 0.4); // blue
        commit_pigment(&mut engine);

        let c = engine.committed.color[i];
        let expected = mix_pigment([220, 220, 40], [40, 60, 200], 0.5);
        assert_eq!(c, expected);
        // Not the plain RGB average.
        assert_ne!(c, [130, 140, 120]);
        assert!((engine.committed.opacity[i] - (0.4 + 0.4 * 0.8)).abs() < 1e-6);
    }

    #[test]
    fn commit_skips_trace_opacity() {
        let mut engine = WatercolorEngine::new(64, 64);
        engine.begin_update(32, 32, 4);
        let i = engine.index(32, 32);
        engine.pending.mark(i, [0, 0, 0], 0.001);
        commit_pigment(&mut engine);
        assert!(!engine.committed.committed[i]);
    }

    #[test]
    fn merge_primitive_clears_the_layer() {
        let mut engine = WatercolorEngine::new(64, 64);
        let i = engine.index(10, 10);
        engine.committed.committed[i] = true;
        engine.committed.color[i] = [200, 200, 200];
        engine.committed.opacity[i] = 0.5;
        engine.primitive.mark(i, [50, 50, 150], 1.0);
        merge_primitive_layer(&mut engine);
        assert!(!engine.primitive.has_primitive[i]);
        // Pulled toward the primitive color.
        assert!(engine.committed.color[i][2] < 200);
    }
}
