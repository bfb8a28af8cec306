// ============================================================================
// ENGINE STATE — the field store and everything the stroke pipeline mutates.
// ============================================================================

use std::collections::VecDeque;

use crate::canvas::PixelSurface;
use crate::ops;
use crate::params::WatercolorParams;
use crate::{log_info, log_warn};

/// StepField value marking a cell as fully settled (dried).
pub const STEP_SETTLED: i32 = 999;

/// Axis-aligned bounding box of a circular brush footprint, clamped to the
/// canvas.  Bounds are inclusive; a footprint entirely off-canvas produces an
/// empty region (`right < left` or `bottom < top`), which every loop over it
/// simply skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl Region {
    pub fn is_empty(&self) -> bool {
        self.right < self.left || self.bottom < self.top
    }
}

/// Brush state; externally mutated, read-only to the simulation.
#[derive(Debug, Clone)]
pub struct Brush {
    pub color: [u8; 3],
    pub opacity: f32,
    pub radius: i32,
}

/// One color/opacity record (continuation memory cell, primitive cell).
#[derive(Debug, Clone, Copy)]
pub struct PigmentCell {
    pub color: [u8; 3],
    pub opacity: f32,
}

impl PigmentCell {
    fn white() -> Self {
        Self {
            color: [255, 255, 255],
            opacity: 1.0,
        }
    }
}

// ----------------------------------------------------------------------------
// Struct-of-arrays fields
// ----------------------------------------------------------------------------

/// Settled paint.  Once a pixel commits it stays committed until canvas clear.
pub struct CommittedPigment {
    pub committed: Vec<bool>,
    pub color: Vec<[u8; 3]>,
    pub opacity: Vec<f32>,
}

impl CommittedPigment {
    fn new(size: usize) -> Self {
        Self {
            committed: vec![false; size],
            color: vec![[255, 255, 255]; size],
            opacity: vec![0.0; size],
        }
    }

    fn reset(&mut self) {
        self.committed.fill(false);
        self.color.fill([255, 255, 255]);
        self.opacity.fill(0.0);
    }
}

/// Per-update pigment scratch.  Tracks which pixels it touched so clearing is
/// proportional to the active footprint, not the canvas.
pub struct PendingField {
    pub pending: Vec<bool>,
    pub color: Vec<[u8; 3]>,
    pub opacity: Vec<f32>,
    pub edge_intensity: Vec<f32>,
    touched: Vec<u32>,
}

impl PendingField {
    fn new(size: usize) -> Self {
        Self {
            pending: vec![false; size],
            color: vec![[255, 255, 255]; size],
            opacity: vec![0.0; size],
            edge_intensity: vec![0.0; size],
            touched: Vec::new(),
        }
    }

    /// Set a pixel outright (brush application, diffusion source copy-in).
    #[inline]
    pub fn mark(&mut self, i: usize, color: [u8; 3], opacity: f32) {
        if !self.pending[i] {
            self.pending[i] = true;
            self.touched.push(i as u32);
        }
        self.color[i] = color;
        self.opacity[i] = opacity;
    }

    /// Deposit diffused pigment: first arrival sets the pixel, later arrivals
    /// blend by opacity weight and saturate the opacity.
    #[inline]
    pub fn accumulate(&mut self, i: usize, color: [u8; 3], amount: f32) {
        if !self.pending[i] {
            self.pending[i] = true;
            self.touched.push(i as u32);
            self.color[i] = color;
            self.opacity[i] = amount;
            self.edge_intensity[i] = 0.0;
            return;
        }
        let cur = self.opacity[i];
        let total = cur + amount;
        if total > 0.0 {
            let c = self.color[i];
            let mut blended = [0u8; 3];
            for ch in 0..3 {
                blended[ch] = ((c[ch] as f32 * cur + color[ch] as f32 * amount) / total)
                    .round()
                    .clamp(0.0, 255.0) as u8;
            }
            self.color[i] = blended;
        }
        self.opacity[i] = total.min(1.0);
    }

    pub fn touched(&self) -> &[u32] {
        &self.touched
    }

    /// Reset only the pixels that were touched since the last clear.
    pub fn clear(&mut self) {
        for &i in &self.touched {
            let i = i as usize;
            self.pending[i] = false;
            self.color[i] = [255, 255, 255];
            self.opacity[i] = 0.0;
            self.edge_intensity[i] = 0.0;
        }
        self.touched.clear();
    }

    fn reset_full(&mut self) {
        self.pending.fill(false);
        self.color.fill([255, 255, 255]);
        self.opacity.fill(0.0);
        self.edge_intensity.fill(0.0);
        self.touched.clear();
    }
}

/// The uncontaminated brush color, merged into committed pigment only at
/// stroke release and read by the renderer at a small weight.  Never consulted
/// by diffusion or edge math.
pub struct PrimitiveLayer {
    pub has_primitive: Vec<bool>,
    pub color: Vec<[u8; 3]>,
    pub opacity: Vec<f32>,
    touched: Vec<u32>,
}

impl PrimitiveLayer {
    fn new(size: usize) -> Self {
        Self {
            has_primitive: vec![false; size],
            color: vec![[255, 255, 255]; size],
            opacity: vec![0.0; size],
            touched: Vec::new(),
        }
    }

    #[inline]
    pub fn mark(&mut self, i: usize, color: [u8; 3], opacity: f32) {
        if !self.has_primitive[i] {
            self.has_primitive[i] = true;
            self.touched.push(i as u32);
        }
        self.color[i] = color;
        self.opacity[i] = opacity;
    }

    pub fn touched(&self) -> &[u32] {
        &self.touched
    }

    pub fn clear(&mut self) {
        for &i in &self.touched {
            let i = i as usize;
            self.has_primitive[i] = false;
            self.color[i] = [255, 255, 255];
            self.opacity[i] = 0.0;
        }
        self.touched.clear();
    }
}

/// Relocatable working grid of the third edge layer: a `(2·half+1)²` square
/// recentered on the brush every update, reallocated only on size change.
pub struct ThirdLayerTemp {
    pub data: Vec<f32>,
    pub half: i32,
    pub center_x: i32,
    pub center_y: i32,
}

impl ThirdLayerTemp {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            half: 0,
            center_x: 0,
            center_y: 0,
        }
    }

    pub fn side(&self) -> i32 {
        2 * self.half + 1
    }

    /// Local index of a canvas coordinate, or None when outside the grid.
    #[inline]
    pub fn local_index(&self, x: i32, y: i32) -> Option<usize> {
        let lx = x - (self.center_x - self.half);
        let ly = y - (self.center_y - self.half);
        if lx < 0 || ly < 0 || lx >= self.side() || ly >= self.side() {
            return None;
        }
        Some((ly * self.side() + lx) as usize)
    }

    /// Reallocate when the brush radius changed, recenter always.
    pub fn ensure(&mut self, center_x: i32, center_y: i32, half: i32) {
        let side = 2 * half + 1;
        let len = (side * side) as usize;
        if self.data.len() != len {
            self.data = vec![0.0; len];
            self.half = half;
        }
        self.center_x = center_x;
        self.center_y = center_y;
    }
}

// ----------------------------------------------------------------------------
// Deterministic PRNG — wrapping-multiply LCG, seeded per engine.
// ----------------------------------------------------------------------------

struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as f32 / (u32::MAX >> 1) as f32
    }
}

// ----------------------------------------------------------------------------
// The engine
// ----------------------------------------------------------------------------

/// The whole simulation context: every per-pixel field, the brush, the
/// pending-point queue and the per-stroke bookkeeping.  Passed by reference to
/// every pipeline pass — there is no global state.
pub struct WatercolorEngine {
    pub width: i32,
    pub height: i32,
    pub params: WatercolorParams,
    pub brush: Brush,

    // Persistent fields
    pub committed: CommittedPigment,
    pub primitive: PrimitiveLayer,
    pub wet: Vec<f32>,
    pub step: Vec<i32>,
    pub first_edge: Vec<f32>,
    pub second_edge: Vec<f32>,
    pub third_persistent: Vec<f32>,
    pub third_temp: ThirdLayerTemp,

    // Per-update scratch
    pub pending: PendingField,
    pub diffusion_scratch: PendingField,
    pub distance: Vec<f32>,
    pub closest_x: Vec<i32>,
    pub closest_y: Vec<i32>,
    pub gradient_x: Vec<f32>,
    pub gradient_y: Vec<f32>,
    pub committed_points: Vec<(i32, i32)>,

    // Continuation memory: last applied pigment per brush offset, (2r+1)².
    pub last_brush_pigment: Vec<PigmentCell>,

    // Current sample
    pub brush_center_x: i32,
    pub brush_center_y: i32,
    pub brush_radius: i32,

    // Stroke state
    pub stroke_active: bool,
    pointer_down: bool,
    prev_pointer: Option<(i32, i32)>,
    last_processed: Option<(i32, i32)>,

    // Step tracking
    pub step_count: i32,
    pub coordinate_history: VecDeque<(i32, i32)>,

    // Drag direction
    pub drag_direction: (f32, f32),
    pub has_drag_direction: bool,
    direction_history: VecDeque<(f32, f32)>,

    // Pending-point queue
    pending_points: VecDeque<(i32, i32)>,
    draining: bool,
    settle_pending: bool,

    rng: Lcg,
}

const DIRECTION_WEIGHTS: [f32; 4] = [0.4, 0.3, 0.2, 0.1];

impl WatercolorEngine {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_params(width, height, WatercolorParams::default())
    }

    pub fn with_params(width: u32, height: u32, params: WatercolorParams) -> Self {
        let size = (width * height) as usize;
        let brush = Brush {
            color: [111, 111, 111],
            opacity: 1.0,
            radius: 10,
        };
        let mut engine = Self {
            width: width as i32,
            height: height as i32,
            params,
            committed: CommittedPigment::new(size),
            primitive: PrimitiveLayer::new(size),
            wet: vec![0.0; size],
            // A fresh canvas is dry paper: everything starts settled.
            step: vec![STEP_SETTLED; size],
            first_edge: vec![0.0; size],
            second_edge: vec![0.0; size],
            third_persistent: vec![0.0; size],
            third_temp: ThirdLayerTemp::new(),
            pending: PendingField::new(size),
            diffusion_scratch: PendingField::new(size),
            distance: vec![f32::INFINITY; size],
            closest_x: vec![-1; size],
            closest_y: vec![-1; size],
            gradient_x: vec![0.0; size],
            gradient_y: vec![0.0; size],
            committed_points: Vec::new(),
            last_brush_pigment: Vec::new(),
            brush_center_x: 0,
            brush_center_y: 0,
            brush_radius: 0,
            stroke_active: false,
            pointer_down: false,
            prev_pointer: None,
            last_processed: None,
            step_count: 0,
            coordinate_history: VecDeque::new(),
            drag_direction: (0.0, 0.0),
            has_drag_direction: false,
            direction_history: VecDeque::new(),
            pending_points: VecDeque::new(),
            draining: false,
            settle_pending: false,
            rng: Lcg(0x5DEECE66D),
            brush,
        };
        engine.refill_brush_memory();
        engine
    }

    /// Reseed the jitter PRNG (headless runs, reproducible tests).
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = Lcg(seed ^ 0x9E3779B97F4A7C15);
    }

    #[inline]
    pub fn index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// Bounding box of a circular footprint, clamped to the canvas.
    pub fn region(&self, center_x: f32, center_y: f32, radius: f32) -> Region {
        Region {
            left: ((center_x - radius).floor() as i32).max(0),
            right: ((center_x + radius).ceil() as i32).min(self.width - 1),
            top: ((center_y - radius).floor() as i32).max(0),
            bottom: ((center_y + radius).ceil() as i32).min(self.height - 1),
        }
    }

    // -- Brush setters ------------------------------------------------------

    pub fn set_color(&mut self, color: [u8; 3]) {
        self.brush.color = color;
        if !self.pointer_down {
            self.refill_brush_memory();
        }
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.brush.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn set_size(&mut self, radius: i32) {
        self.brush.radius = radius.max(1);
        if !self.pointer_down {
            self.refill_brush_memory();
        }
    }

    fn brush_cell_count(radius: i32) -> usize {
        let side = 2 * radius + 1;
        (side * side) as usize
    }

    /// Fill the continuation memory with the plain brush pigment.
    pub(crate) fn refill_brush_memory(&mut self) {
        let cell = PigmentCell {
            color: self.brush.color,
            opacity: self.brush.opacity,
        };
        self.last_brush_pigment = vec![cell; Self::brush_cell_count(self.brush.radius)];
    }

    /// Grow (never shrink mid-stroke) the continuation memory for `radius`.
    pub(crate) fn ensure_brush_memory(&mut self, radius: i32) {
        let needed = Self::brush_cell_count(radius);
        if self.last_brush_pigment.len() < needed {
            let cell = PigmentCell {
                color: self.brush.color,
                opacity: self.brush.opacity,
            };
            self.last_brush_pigment = vec![cell; needed];
        }
    }

    // -- Canvas lifecycle ---------------------------------------------------

    /// Wipe every field back to dry white paper.
    pub fn clear_canvas(&mut self, surface: &mut PixelSurface) {
        self.committed.reset();
        self.primitive.clear();
        self.pending.reset_full();
        self.diffusion_scratch.reset_full();
        self.wet.fill(0.0);
        self.step.fill(STEP_SETTLED);
        self.first_edge.fill(0.0);
        self.second_edge.fill(0.0);
        self.third_persistent.fill(0.0);
        self.third_temp.data.fill(0.0);
        self.distance.fill(f32::INFINITY);
        self.closest_x.fill(-1);
        self.closest_y.fill(-1);
        self.gradient_x.fill(0.0);
        self.gradient_y.fill(0.0);
        self.committed_points.clear();
        self.pending_points.clear();
        self.coordinate_history.clear();
        self.step_count = 0;
        self.stroke_active = false;
        self.pointer_down = false;
        self.settle_pending = false;
        self.prev_pointer = None;
        self.last_processed = None;
        self.reset_drag_direction();
        self.refill_brush_memory();
        surface.clear();
        log_info!("canvas cleared");
    }

    /// Reallocate every field for new canvas dimensions.
    pub fn resize_canvas(&mut self, width: u32, height: u32, surface: &mut PixelSurface) {
        let params = self.params.clone();
        let brush = self.brush.clone();
        *self = Self::with_params(width, height, params);
        self.brush = brush;
        self.refill_brush_memory();
        surface.resize(width, height);
        log_info!("canvas resized to {}x{}", width, height);
    }

    // -- Per-update bookkeeping ---------------------------------------------

    /// Start a stroke-point update: position the brush and empty the scratch.
    pub(crate) fn begin_update(&mut self, center_x: i32, center_y: i32, radius: i32) {
        self.brush_center_x = center_x;
        self.brush_center_y = center_y;
        self.brush_radius = radius;
        self.pending.clear();
        self.diffusion_scratch.clear();
        self.committed_points.clear();
    }

    #[inline]
    pub(crate) fn dist_to_brush_center(&self, x: i32, y: i32) -> f32 {
        let dx = (x - self.brush_center_x) as f32;
        let dy = (y - self.brush_center_y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    // -- Host input adapter -------------------------------------------------

    /// Pointer pressed at integer canvas coordinates.
    pub fn on_press(&mut self, x: i32, y: i32) {
        if !self.in_bounds(x, y) {
            return;
        }
        let radius = self.brush.radius;
        ops::steps::begin_stroke(self);
        ops::edges::clear_third_layer_at(self, x, y, radius);
        self.pointer_down = true;
        self.settle_pending = false;
        self.prev_pointer = Some((x, y));
        self.last_processed = None;
        self.enqueue_point(x, y);
    }

    /// Pointer moved while pressed.  Rasterizes the motion so fast drags
    /// don't skip footprints.
    pub fn on_drag(&mut self, x: i32, y: i32) {
        if !self.pointer_down {
            return;
        }
        let Some((px, py)) = self.prev_pointer else {
            return;
        };
        if (px, py) == (x, y) {
            return;
        }
        // Skip the first point: it was already queued by the previous sample.
        for &(lx, ly) in Self::line_points(px, py, x, y).iter().skip(1) {
            self.enqueue_point(lx, ly);
        }
        self.prev_pointer = Some((x, y));
    }

    /// Pointer released.  Cleanup runs once the queue drains (§ drain tick).
    pub fn on_release(&mut self) {
        if !self.pointer_down {
            return;
        }
        self.pointer_down = false;
        self.settle_pending = true;
    }

    /// Drop all queued samples: the cancellation primitive.
    pub fn cancel_pending(&mut self) {
        self.pending_points.clear();
        self.draining = false;
    }

    pub fn pending_len(&self) -> usize {
        self.pending_points.len()
    }

    pub fn queued_points(&self) -> impl Iterator<Item = &(i32, i32)> {
        self.pending_points.iter()
    }

    /// Queue empty and no deferred cleanup outstanding.
    pub fn is_idle(&self) -> bool {
        self.pending_points.is_empty() && !self.settle_pending
    }

    fn enqueue_point(&mut self, x: i32, y: i32) {
        if self.pending_points.len() >= self.params.max_queue_size {
            log_warn!("pending point queue full, dropping oldest");
            while self.pending_points.len() >= self.params.max_queue_size {
                self.pending_points.pop_front();
            }
        }
        self.pending_points.push_back((x, y));
    }

    /// All integer points of the segment, endpoints included (Bresenham).
    pub fn line_points(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
        let mut points = Vec::new();
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;
        let (mut x, mut y) = (x0, y0);
        loop {
            points.push((x, y));
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
        points
    }

    // -- Drain tick -----------------------------------------------------------

    /// Process up to `max_points_per_frame` queued samples, rendering after
    /// each.  Reentrancy-guarded; returns the number of samples processed.
    /// When the queue empties and a release is latched, the stroke-end cleanup
    /// (primitive merge, settle sweep, drag-direction reset) runs here.
    pub fn process_pending_points(&mut self, surface: &mut PixelSurface) -> usize {
        if self.draining {
            return 0;
        }
        self.draining = true;
        let _t = crate::logger::time_scope("drain", 12.0);

        let mut processed = 0;
        while processed < self.params.max_points_per_frame {
            let Some((x, y)) = self.pending_points.pop_front() else {
                break;
            };
            let radius = self.brush.radius;
            ops::apply_stroke(self, x, y, radius);
            self.update_drag_direction(x, y);
            ops::render::render_region(self, surface);
            processed += 1;
        }

        if self.pending_points.is_empty() && self.settle_pending {
            self.finish_stroke(surface);
        }
        self.draining = false;
        processed
    }

    /// Release cleanup, run by the drain tick once the queue is empty.
    fn finish_stroke(&mut self, surface: &mut PixelSurface) {
        ops::pigment::merge_primitive_layer(self);
        ops::steps::finish_stroke(self);
        self.reset_drag_direction();
        self.third_temp.data.fill(0.0);
        self.stroke_active = false;
        self.settle_pending = false;
        self.last_processed = None;
        ops::render::render_region(self, surface);
    }

    // -- Drag direction -------------------------------------------------------

    /// Fold one processed sample into the weighted direction history and adopt
    /// the averaged direction once it clears the noise threshold.
    pub(crate) fn update_drag_direction(&mut self, x: i32, y: i32) {
        if let Some((px, py)) = self.last_processed {
            let dx = (x - px) as f32;
            let dy = (y - py) as f32;
            let magnitude = (dx * dx + dy * dy).sqrt();
            if magnitude > 0.0 {
                self.direction_history
                    .push_back((dx / magnitude, dy / magnitude));
                while self.direction_history.len() > DIRECTION_WEIGHTS.len() {
                    self.direction_history.pop_front();
                }

                let mut wx = 0.0;
                let mut wy = 0.0;
                let mut total = 0.0;
                for (i, &(hx, hy)) in self.direction_history.iter().rev().enumerate() {
                    let w = DIRECTION_WEIGHTS.get(i).copied().unwrap_or(0.1);
                    wx += hx * w;
                    wy += hy * w;
                    total += w;
                }
                if total > 0.0 {
                    wx /= total;
                    wy /= total;
                }
                let avg_magnitude = (wx * wx + wy * wy).sqrt();
                if avg_magnitude > self.params.drag_direction_noise_threshold {
                    self.drag_direction = (wx, wy);
                    self.has_drag_direction = true;
                }
            }
        }
        self.last_processed = Some((x, y));
    }

    fn reset_drag_direction(&mut self) {
        self.drag_direction = (0.0, 0.0);
        self.has_drag_direction = false;
        self.direction_history.clear();
    }

    // -- Jitter PRNG ----------------------------------------------------------

    /// Uniform in `[0, 1)`.
    #[inline]
    pub(crate) fn next_f32(&mut self) -> f32 {
        self.rng.next_f32()
    }

    /// Uniform in `[lo, hi)`.
    #[inline]
    pub(crate) fn next_range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.rng.next_f32()
    }

    /// Uniform index in `0..len`.
    #[inline]
    pub(crate) fn next_index(&mut self, len: usize) -> usize {
        ((self.rng.next_f32() * len as f32) as usize).min(len.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_clamps_to_canvas() {
        let engine = WatercolorEngine::new(100, 80);
        let r = engine.region(5.0, 5.0, 10.0);
        assert_eq!(r.left, 0);
        assert_eq!(r.top, 0);
        assert_eq!(r.right, 15);
        assert_eq!(r.bottom, 15);

        let r = engine.region(95.0, 75.0, 10.0);
        assert_eq!(r.right, 99);
        assert_eq!(r.bottom, 79);
    }

    #[test]
    fn region_fully_outside_is_empty() {
        let engine = WatercolorEngine::new(100, 80);
        assert!(engine.region(200.0, 40.0, 10.0).is_empty());
        assert!(engine.region(50.0, -50.0, 10.0).is_empty());
    }

    #[test]
    fn line_points_are_gapless() {
        let points = WatercolorEngine::line_points(10, 10, 10, 30);
        assert_eq!(points.len(), 21);
        assert_eq!(points[0], (10, 10));
        assert_eq!(points[20], (10, 30));
        for pair in points.windows(2) {
            let (dx, dy) = (pair[1].0 - pair[0].0, pair[1].1 - pair[0].1);
            assert!(dx.abs() <= 1 && dy.abs() <= 1);
        }
    }

    #[test]
    fn drag_rasterizes_intermediate_points() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.on_press(10, 10);
        // Consume the press sample so only the drag's points remain.
        let mut surface = PixelSurface::new(100, 100);
        engine.process_pending_points(&mut surface);
        engine.on_drag(10, 30);
        let queued: Vec<_> = engine.queued_points().copied().collect();
        assert_eq!(queued.len(), 20);
        for (i, &(x, y)) in queued.iter().enumerate() {
            assert_eq!((x, y), (10, 11 + i as i32));
        }
    }

    #[test]
    fn queue_is_bounded() {
        let mut engine = WatercolorEngine::new(400, 400);
        engine.on_press(0, 0);
        for i in 0..260 {
            engine.on_drag(i % 399, (i * 7) % 399);
        }
        assert!(engine.pending_len() <= engine.params.max_queue_size);
    }

    #[test]
    fn press_off_canvas_is_ignored() {
        let mut engine = WatercolorEngine::new(100, 100);
        engine.on_press(150, 50);
        assert_eq!(engine.pending_len(), 0);
        assert!(engine.is_idle());
    }

    #[test]
    fn pending_field_clear_is_exact() {
        let mut f = PendingField::new(16);
        f.mark(3, [10, 10, 10], 0.5);
        f.accumulate(3, [20, 20, 20], 0.25);
        f.accumulate(7, [30, 30, 30], 0.1);
        assert_eq!(f.touched().len(), 2);
        f.clear();
        assert!(!f.pending[3] && !f.pending[7]);
        assert_eq!(f.opacity[3], 0.0);
        assert!(f.touched().is_empty());
    }

    #[test]
    fn accumulate_saturates_opacity() {
        let mut f = PendingField::new(4);
        f.accumulate(0, [0, 0, 0], 0.8);
        f.accumulate(0, [0, 0, 0], 0.8);
        assert!(f.opacity[0] <= 1.0);
    }

    #[test]
    fn third_temp_local_index() {
        let mut t = ThirdLayerTemp::new();
        t.ensure(50, 50, 12);
        assert_eq!(t.side(), 25);
        assert_eq!(t.local_index(50, 50), Some((12 * 25 + 12) as usize));
        assert_eq!(t.local_index(50 - 13, 50), None);
        let len_before = t.data.len();
        t.ensure(60, 60, 12);
        assert_eq!(t.data.len(), len_before);
        assert_eq!(t.center_x, 60);
    }
}
