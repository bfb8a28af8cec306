// ============================================================================
// COLOR MATH — RGB↔HSL conversion and the subtractive pigment blend.
// ============================================================================

/// Hue/saturation/lightness triple, all components in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

/// Convert an 8-bit RGB color to HSL (all components 0..=1).
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> Hsl {
    let rn = r as f32 / 255.0;
    let gn = g as f32 / 255.0;
    let bn = b as f32 / 255.0;

    let max = rn.max(gn).max(bn);
    let min = rn.min(gn).min(bn);
    let delta = max - min;

    let l = (max + min) / 2.0;
    if delta == 0.0 {
        // Grey: no hue, no saturation.
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let s = if l > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    let h = if max == rn {
        ((gn - bn) / delta + if gn < bn { 6.0 } else { 0.0 }) / 6.0
    } else if max == gn {
        ((bn - rn) / delta + 2.0) / 6.0
    } else {
        ((rn - gn) / delta + 4.0) / 6.0
    };

    Hsl {
        h: h.clamp(0.0, 1.0),
        s: s.clamp(0.0, 1.0),
        l: l.clamp(0.0, 1.0),
    }
}

/// Convert HSL (components 0..=1) back to 8-bit RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 3] {
    let h = h.clamp(0.0, 1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        let v = (l * 255.0).round() as u8;
        return [v, v, v];
    }

    fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    [
        (r * 255.0).round().clamp(0.0, 255.0) as u8,
        (g * 255.0).round().clamp(0.0, 255.0) as u8,
        (b * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}

/// Subtractive pigment blend of two RGB colors.
///
/// Single-constant Kubelka–Munk approximation: each channel's reflectance is
/// mapped to its absorption/scattering ratio `K/S = (1-r)²/(2r)`, the ratios
/// are mixed linearly, and the mix is mapped back to reflectance.  Mixing in
/// K/S space is what makes pigments combine the way paint does — the result
/// is darker than a plain RGB lerp and e.g. blue + yellow leans green.
pub fn mix_pigment(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let mut out = [0u8; 3];
    for c in 0..3 {
        let ra = reflectance(a[c]);
        let rb = reflectance(b[c]);
        let ks = ks_ratio(ra) * (1.0 - t) + ks_ratio(rb) * t;
        out[c] = (from_reflectance(invert_ks(ks)) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out
}

// Channel value → linear reflectance, kept off exact 0/1 so K/S stays finite.
fn reflectance(v: u8) -> f32 {
    let srgb = v as f32 / 255.0;
    let linear = if srgb <= 0.04045 {
        srgb / 12.92
    } else {
        ((srgb + 0.055) / 1.055).powf(2.4)
    };
    linear.clamp(0.001, 0.999)
}

fn from_reflectance(linear: f32) -> f32 {
    if linear <= 0.003_130_8 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

fn ks_ratio(r: f32) -> f32 {
    (1.0 - r) * (1.0 - r) / (2.0 * r)
}

// Inverse of ks_ratio: R = 1 + K/S − sqrt((K/S)² + 2·K/S).
fn invert_ks(ks: f32) -> f32 {
    (1.0 + ks - (ks * ks + 2.0 * ks).sqrt()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(rgb: [u8; 3]) -> [u8; 3] {
        let hsl = rgb_to_hsl(rgb[0], rgb[1], rgb[2]);
        hsl_to_rgb(hsl.h, hsl.s, hsl.l)
    }

    #[test]
    fn hsl_roundtrip_is_close() {
        for rgb in [
            [0, 0, 0],
            [255, 255, 255],
            [128, 128, 128],
            [200, 40, 40],
            [30, 180, 90],
            [10, 20, 250],
        ] {
            let back = roundtrip(rgb);
            for c in 0..3 {
                assert!(
                    (back[c] as i32 - rgb[c] as i32).abs() <= 2,
                    "{:?} -> {:?}",
                    rgb,
                    back
                );
            }
        }
    }

    #[test]
    fn grey_has_no_saturation() {
        let hsl = rgb_to_hsl(80, 80, 80);
        assert_eq!(hsl.s, 0.0);
        assert_eq!(hsl.h, 0.0);
    }

    #[test]
    fn lightness_ordering() {
        assert!(rgb_to_hsl(20, 20, 20).l < rgb_to_hsl(200, 200, 200).l);
    }

    #[test]
    fn mix_endpoints() {
        let a = [200, 30, 30];
        let b = [30, 30, 200];
        assert_eq!(mix_pigment(a, b, 0.0), a);
        assert_eq!(mix_pigment(a, b, 1.0), b);
    }

    #[test]
    fn mix_is_subtractive_not_lerp() {
        // A 50/50 pigment mix is darker than the linear RGB average.
        let a = [220, 220, 40];
        let b = [40, 60, 200];
        let mixed = mix_pigment(a, b, 0.5);
        for c in 0..3 {
            let avg = (a[c] as u16 + b[c] as u16) / 2;
            assert!(
                mixed[c] as u16 <= avg + 4,
                "channel {} brighter than lerp: {} vs {}",
                c,
                mixed[c],
                avg
            );
        }
        let luma = |p: [u8; 3]| p[0] as f32 * 0.299 + p[1] as f32 * 0.587 + p[2] as f32 * 0.114;
        assert!(luma(mixed) < (luma(a) + luma(b)) / 2.0);
    }

    #[test]
    fn mix_with_white_keeps_hue() {
        let blue = [40, 60, 200];
        let washed = mix_pigment([255, 255, 255], blue, 0.5);
        // Blue channel still dominates.
        assert!(washed[2] > washed[0] && washed[2] > washed[1]);
    }
}
