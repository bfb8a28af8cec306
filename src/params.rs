// ============================================================================
// TUNING PARAMETERS — every perceptually-tuned constant of the simulation,
// named and overridable.  Defaults are the canonical values.
// ============================================================================

/// Which diffusion strategy the stroke pipeline runs per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffusionMode {
    /// Multi-point diffusion along the direction toward existing pigment.
    Directional,
    /// Annulus-restricted diffusion gated by step age (the step-tracked variant).
    Ring,
}

/// All tunable constants of the watercolor simulation.
///
/// The engine reads every threshold, cap, decay curve and mix ratio through
/// this struct, so any of them can be overridden at construction without
/// touching the passes themselves.
#[derive(Debug, Clone)]
pub struct WatercolorParams {
    // -- Region / search ----------------------------------------------------
    /// Multiple of the brush radius searched for existing pigment and
    /// re-rendered after each sample.
    pub update_radius_factor: f32,
    /// Multiple of the brush radius covered by edge detection.
    pub edge_detection_radius_factor: f32,

    // -- Wet area -----------------------------------------------------------
    /// Outer wet radius as a multiple of the brush radius.
    pub wet_radius_factor: f32,
    /// Inner radius (full wetness plateau) as a multiple of the brush radius.
    pub wet_inner_radius_factor: f32,
    /// Saturation ceiling of the wetness field.
    pub max_wet: f32,
    /// Wetness added at the plateau by one brush application.
    pub wet_center_value: f32,
    /// Wetness added by a delayed step-tracking stamp.
    pub step_wet_value: f32,

    // -- Pigment application ------------------------------------------------
    /// Global factor applied to the brush opacity when depositing pigment.
    pub stroke_opacity_factor: f32,
    /// Fraction of the new opacity added on top of existing pigment at commit.
    pub commit_opacity_gain: f32,
    /// Share of the brush-footprint average color folded into the
    /// continuation memory outside the inner circle.
    pub retention_ratio: f32,
    /// Share of the brush lightness blended into the continuation memory
    /// inside the inner circle.
    pub lightness_protection_ratio: f32,
    /// Continuation-memory lightness never drops below this fraction of the
    /// brush lightness.
    pub min_lightness_fraction: f32,
    /// Opacities below this are treated as "no pigment" by every pass.
    pub opacity_epsilon: f32,

    // -- Directional diffusion ----------------------------------------------
    pub diffusion_mode: DiffusionMode,
    /// Maximum spread distance as a multiple of the brush radius.
    pub diffusion_distance_factor: f32,
    /// Angular jitter applied to each diffusion sub-point, radians.
    pub diffusion_angle_jitter: f32,
    /// Exponent shrinking the spread of not-yet-committed pigment.
    pub fresh_falloff_power: f32,

    // -- Ring diffusion -----------------------------------------------------
    /// Annulus inner bound as a multiple of the brush radius.
    pub ring_inner_factor: f32,
    /// Annulus outer bound as a multiple of the brush radius.
    pub ring_outer_factor: f32,
    /// Sub-points emitted per ring source.
    pub ring_sub_points: usize,
    /// Fraction of the source opacity retained after a ring pass.
    pub ring_retained_fraction: f32,
    /// Step-age difference (as a multiple of the radius) below which a cell
    /// is still "freshly wet" and ineligible for ring diffusion.
    pub step_threshold_factor: f32,

    // -- Step tracking ------------------------------------------------------
    /// Coordinate-history capacity as a multiple of the brush radius.
    pub history_depth_factor: f32,
    /// Stamped neighborhood radius as a multiple of the brush radius.
    pub step_wet_radius_factor: f32,

    // -- Edge engine --------------------------------------------------------
    /// Wetness above this penalizes the gradient (drying reduces runoff).
    pub wet_penalty_threshold: f32,
    /// Gradient multiplier applied where the wetness penalty triggers.
    pub wet_penalty_factor: f32,
    /// First-layer attenuation neighborhood as a multiple of the radius.
    pub cover_radius_factor: f32,
    /// First-layer attenuation strength at the brush center.
    pub first_clear_strength: f32,
    /// Second-layer full-clear neighborhood as a multiple of the radius.
    pub second_clear_radius_factor: f32,
    /// Normalized gradient below this leaves the first layer untouched.
    pub first_layer_threshold: f32,
    pub first_layer_power: f32,
    pub first_layer_scale: f32,
    pub first_layer_cap: f32,
    /// Normalized gradient below this leaves the second layer untouched.
    pub second_layer_threshold: f32,
    pub second_layer_power: f32,
    pub second_layer_scale: f32,
    pub second_layer_cap: f32,
    /// Second-layer assignment neighborhood as a multiple of the radius.
    pub second_assign_radius_factor: f32,

    // -- Third layer --------------------------------------------------------
    /// Temp-grid half-size as a multiple of the brush radius.
    pub third_temp_radius_factor: f32,
    /// Intensity injected at each trigger point.
    pub third_injection: f32,
    pub third_cap: f32,
    /// Temp-into-persistent mix ratio (mostly replace).
    pub third_mix_ratio: f32,
    /// Pending opacity above this also counts as a trigger point.
    pub third_trigger_opacity: f32,
    /// Radial decay per update: near the center, at mid-radius, at the rim.
    /// Deliberately non-monotonic to keep a visible front.
    pub third_decay_center: f32,
    pub third_decay_mid: f32,
    pub third_decay_rim: f32,
    /// Neighbor weights for the direction-dependent diffusion pass.
    pub third_forward_weight: f32,
    pub third_backward_weight: f32,
    pub third_side_weight: f32,
    /// Share of a temp cell moved to its neighbors per pass.
    pub third_diffusion_rate: f32,
    /// Extra source loss at the temp rim (scaled by center distance).
    pub third_retention_loss: f32,
    /// Persistent-layer attenuation at the press position (center strength).
    pub third_press_clear: f32,

    // -- Renderer -----------------------------------------------------------
    pub first_render_weight: f32,
    pub second_render_weight: f32,
    pub third_render_weight: f32,
    /// Combined edge effect below this renders the pigment color unchanged.
    pub edge_render_threshold: f32,
    /// Base lightness reduction per unit of edge effect…
    pub edge_darken_base: f32,
    /// …less this much times √lightness (highlights darken less).
    pub edge_darken_scale: f32,
    /// Lightness floor protecting dark pigment from crushing to black.
    pub min_render_lightness: f32,
    /// Contribution of the primitive (uncontaminated) layer at render time.
    pub primitive_render_weight: f32,

    // -- Queue / input ------------------------------------------------------
    /// Pending-point queue bound; oldest points are dropped beyond it.
    pub max_queue_size: usize,
    /// Samples drained per host frame tick.
    pub max_points_per_frame: usize,
    /// Weighted drag-direction magnitude below this is treated as jitter.
    pub drag_direction_noise_threshold: f32,
}

impl Default for WatercolorParams {
    fn default() -> Self {
        Self {
            update_radius_factor: 1.6,
            edge_detection_radius_factor: 1.3,

            wet_radius_factor: 1.0,
            wet_inner_radius_factor: 0.8,
            max_wet: 1.0,
            wet_center_value: 0.25,
            step_wet_value: 0.08,

            stroke_opacity_factor: 0.5,
            commit_opacity_gain: 0.8,
            retention_ratio: 0.03,
            lightness_protection_ratio: 0.1,
            min_lightness_fraction: 0.8,
            opacity_epsilon: 0.01,

            diffusion_mode: DiffusionMode::Directional,
            diffusion_distance_factor: 0.6,
            diffusion_angle_jitter: 3.0_f32.to_radians(),
            fresh_falloff_power: 1.5,

            ring_inner_factor: 0.9,
            ring_outer_factor: 1.0,
            ring_sub_points: 8,
            ring_retained_fraction: 0.7,
            step_threshold_factor: 3.0,

            history_depth_factor: 4.0,
            step_wet_radius_factor: 1.4,

            wet_penalty_threshold: 0.7,
            wet_penalty_factor: 0.4,
            cover_radius_factor: 0.9,
            first_clear_strength: 0.5,
            second_clear_radius_factor: 1.1,
            first_layer_threshold: 0.05,
            first_layer_power: 0.8,
            first_layer_scale: 0.12,
            first_layer_cap: 1.0,
            second_layer_threshold: 0.12,
            second_layer_power: 0.65,
            second_layer_scale: 0.85,
            second_layer_cap: 1.0,
            second_assign_radius_factor: 1.0,

            third_temp_radius_factor: 1.2,
            third_injection: 0.35,
            third_cap: 1.0,
            third_mix_ratio: 0.97,
            third_trigger_opacity: 0.25,
            third_decay_center: 0.995,
            third_decay_mid: 0.96,
            third_decay_rim: 0.99,
            third_forward_weight: 1.6,
            third_backward_weight: 0.25,
            third_side_weight: 0.8,
            third_diffusion_rate: 0.18,
            third_retention_loss: 0.15,
            third_press_clear: 0.85,

            first_render_weight: 0.25,
            second_render_weight: 0.75,
            third_render_weight: 0.5,
            edge_render_threshold: 0.01,
            edge_darken_base: 0.4,
            edge_darken_scale: 0.3,
            min_render_lightness: 0.2,
            primitive_render_weight: 0.1,

            max_queue_size: 200,
            max_points_per_frame: 20,
            drag_direction_noise_threshold: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let p = WatercolorParams::default();
        assert!(p.wet_inner_radius_factor < p.wet_radius_factor);
        assert!(p.ring_inner_factor < p.ring_outer_factor);
        assert!(p.first_layer_threshold < p.second_layer_threshold);
        assert!((0.0..=1.0).contains(&p.third_mix_ratio));
        assert!(p.max_points_per_frame <= p.max_queue_size);
    }

    #[test]
    fn decay_curve_is_non_monotonic() {
        // The mid-radius decay must be the fastest of the three samples.
        let p = WatercolorParams::default();
        assert!(p.third_decay_mid < p.third_decay_center);
        assert!(p.third_decay_mid < p.third_decay_rim);
    }
}
