// ============================================================================
// RENDERER COMPOSITOR — committed pigment + edge darkening → raster surface.
// ============================================================================

use crate::canvas::PixelSurface;
use crate::color::{hsl_to_rgb, mix_pigment, rgb_to_hsl};
use crate::engine::WatercolorEngine;

/// Composite the active brush region into the surface.  Runs after every
/// processed sample; touches only R,G,B of pixels that carry pigment.
pub fn render_region(engine: &mut WatercolorEngine, surface: &mut PixelSurface) {
    let radius = engine.brush_radius as f32 * engine.params.update_radius_factor;
    if radius <= 0.0 {
        return;
    }
    smooth_committed_pigment(engine);

    let region = engine.region(
        engine.brush_center_x as f32,
        engine.brush_center_y as f32,
        radius,
    );
    let p = &engine.params;

    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let i = engine.index(x, y);
            if !engine.committed.committed[i] {
                continue;
            }

            let mut color = engine.committed.color[i];

            // A whisper of the uncontaminated brush color keeps the live
            // stroke from looking muddier than it will after release.
            if engine.primitive.has_primitive[i] {
                color = mix_pigment(
                    color,
                    engine.primitive.color[i],
                    p.primitive_render_weight * engine.primitive.opacity[i],
                );
            }

            let edge = engine.first_edge[i] * p.first_render_weight
                + engine.second_edge[i] * p.second_render_weight
                + engine.third_persistent[i] * p.third_render_weight;

            if edge > p.edge_render_threshold {
                let hsl = rgb_to_hsl(color[0], color[1], color[2]);
                // The darkening shrinks as the underlying lightness rises,
                // protecting highlights from crushing to black.
                let reduction = edge * (p.edge_darken_base - p.edge_darken_scale * hsl.l.sqrt());
                let new_l = (hsl.l - reduction).max(p.min_render_lightness);
                color = hsl_to_rgb(hsl.h, hsl.s, new_l);
            }

            surface.put_rgb(x, y, color);
        }
    }
}

/// Distance-weighted blend of each pigment-bearing pixel with its immediate
/// neighbors.  Removes the aliasing the point-cloud diffusion leaves behind.
/// Operates on a prefiltered list of in-range pigmented pixels only.
fn smooth_committed_pigment(engine: &mut WatercolorEngine) {
    let region = engine.region(
        engine.brush_center_x as f32,
        engine.brush_center_y as f32,
        engine.brush_radius as f32 * engine.params.update_radius_factor,
    );
    let eps = engine.params.opacity_epsilon;

    let mut targets: Vec<(i32, i32)> = Vec::new();
    for y in region.top..=region.bottom {
        for x in region.left..=region.right {
            let i = engine.index(x, y);
            if engine.committed.committed[i] && engine.committed.opacity[i] >= eps {
                targets.push((x, y));
            }
        }
    }

    let mut smoothed: Vec<[u8; 3]> = Vec::with_capacity(targets.len());
    for &(x, y) in &targets {
        let mut sum = [0.0f32; 3];
        let mut weight_sum = 0.0;
        for ky in -1i32..=1 {
            for kx in -1i32..=1 {
                let nx = x + kx;
                let ny = y + ky;
                if !engine.in_bounds(nx, ny) {
                    continue;
                }
                let ni = engine.index(nx, ny);
                if !engine.committed.committed[ni] {
                    continue;
                }
                // Center dominates; diagonals count by inverse distance.
                let w = if kx == 0 && ky == 0 {
                    2.0
                } else {
                    1.0 / ((kx * kx + ky * ky) as f32).sqrt()
                };
                let c = engine.committed.color[ni];
                for ch in 0..3 {
                    sum[ch] += c[ch] as f32 * w;
                }
                weight_sum += w;
            }
        }
        smoothed.push([
            (sum[0] / weight_sum).round().clamp(0.0, 255.0) as u8,
            (sum[1] / weight_sum).round().clamp(0.0, 255.0) as u8,
            (sum[2] / weight_sum).round().clamp(0.0, 255.0) as u8,
        ]);
    }

    for (k, &(x, y)) in targets.iter().enumerate() {
        let i = engine.index(x, y);
        engine.committed.color[i] = smoothed[k];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelSurface;
    use crate::engine::WatercolorEngine;

    #[test]
    fn render_skips_bare_paper() {
        let mut engine = WatercolorEngine::new(64, 64);
        let mut surface = PixelSurface::new(64, 64);
        engine.begin_update(32, 32, 8);
        render_region(&mut engine, &mut surface);
        assert!(surface.pixels().iter().all(|&b| b == 255));
    }

    #[test]
    fn render_writes_committed_pigment() {
        let mut engine = WatercolorEngine::new(64, 64);
        let mut surface = PixelSurface::new(64, 64);
        engine.begin_update(32, 32, 8);
        let i = engine.index(32, 32);
        engine.committed.committed[i] = true;
        engine.committed.color[i] = [120, 40, 40];
        engine.committed.opacity[i] = 0.5;
        render_region(&mut engine, &mut surface);
        let px = surface.get_rgb(32, 32).unwrap();
        assert_ne!(px, [255, 255, 255]);
    }

    #[test]
    fn edge_effect_darkens_pixels() {
        let mut engine = WatercolorEngine::new(64, 64);
        let mut plain = PixelSurface::new(64, 64);
        let mut edged = PixelSurface::new(64, 64);
        engine.begin_update(32, 32, 8);

        for x in 30..=34 {
            let i = engine.index(x, 32);
            engine.committed.committed[i] = true;
            engine.committed.color[i] = [150, 90, 90];
            engine.committed.opacity[i] = 0.6;
        }
        render_region(&mut engine, &mut plain);

        let i = engine.index(32, 32);
        engine.second_edge[i] = 0.8;
        render_region(&mut engine, &mut edged);

        let luma = |p: [u8; 3]| p[0] as f32 * 0.299 + p[1] as f32 * 0.587 + p[2] as f32 * 0.114;
        assert!(luma(edged.get_rgb(32, 32).unwrap()) < luma(plain.get_rgb(32, 32).unwrap()));
        // Neighbor without edge intensity unchanged between the two renders.
        assert_eq!(edged.get_rgb(30, 32), plain.get_rgb(30, 32));
    }

    #[test]
    fn darkening_never_goes_below_the_lightness_floor() {
        let mut engine = WatercolorEngine::new(64, 64);
        let mut surface = PixelSurface::new(64, 64);
        engine.begin_update(32, 32, 8);
        let i = engine.index(32, 32);
        engine.committed.committed[i] = true;
        engine.committed.color[i] = [70, 70, 70];
        engine.committed.opacity[i] = 1.0;
        engine.second_edge[i] = 1.0;
        engine.first_edge[i] = 1.0;
        engine.third_persistent[i] = 1.0;
        render_region(&mut engine, &mut surface);

        let px = surface.get_rgb(32, 32).unwrap();
        let hsl = crate::color::rgb_to_hsl(px[0], px[1], px[2]);
        assert!(hsl.l >= engine.params.min_render_lightness - 0.01);
    }

    #[test]
    fn smoothing_pulls_outliers_toward_neighbors() {
        let mut engine = WatercolorEngine::new(64, 64);
        engine.begin_update(32, 32, 8);
        for y in 31..=33 {
            for x in 31..=33 {
                let i = engine.index(x, y);
                engine.committed.committed[i] = true;
                engine.committed.color[i] = if (x, y) == (32, 32) {
                    [0, 0, 0]
                } else {
                    [200, 200, 200]
                };
                engine.committed.opacity[i] = 0.5;
            }
        }
        smooth_committed_pigment(&mut engine);
        let c = engine.committed.color[engine.index(32, 32)];
        assert!(c[0] > 0, "outlier not blended: {:?}", c);
    }
}
