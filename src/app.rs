// ============================================================================
// GUI SHELL — egui host: pointer capture, per-frame queue drain, texture
// display and brush controls.  Everything simulation-side lives in the lib.
// ============================================================================

use eframe::egui;

use aquarelle::{DiffusionMode, PixelSurface, WatercolorEngine};

const CANVAS_WIDTH: u32 = 900;
const CANVAS_HEIGHT: u32 = 600;

pub struct AquarelleApp {
    engine: WatercolorEngine,
    surface: PixelSurface,
    texture: Option<egui::TextureHandle>,

    brush_color: [u8; 3],
    brush_opacity: f32,
    brush_size: i32,
    ring_mode: bool,
}

impl AquarelleApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let mut engine = WatercolorEngine::new(CANVAS_WIDTH, CANVAS_HEIGHT);
        let brush_color = [60, 80, 160];
        engine.set_color(brush_color);
        engine.set_opacity(0.9);
        engine.set_size(12);
        Self {
            engine,
            surface: PixelSurface::new(CANVAS_WIDTH, CANVAS_HEIGHT),
            texture: None,
            brush_color,
            brush_opacity: 0.9,
            brush_size: 12,
            ring_mode: false,
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Brush");
        ui.add_space(4.0);

        if ui.color_edit_button_srgb(&mut self.brush_color).changed() {
            self.engine.set_color(self.brush_color);
        }
        if ui
            .add(egui::Slider::new(&mut self.brush_size, 2..=40).text("size"))
            .changed()
        {
            self.engine.set_size(self.brush_size);
        }
        if ui
            .add(egui::Slider::new(&mut self.brush_opacity, 0.05..=1.0).text("opacity"))
            .changed()
        {
            self.engine.set_opacity(self.brush_opacity);
        }

        ui.add_space(8.0);
        if ui.checkbox(&mut self.ring_mode, "ring diffusion").changed() {
            self.engine.params.diffusion_mode = if self.ring_mode {
                DiffusionMode::Ring
            } else {
                DiffusionMode::Directional
            };
        }

        ui.add_space(8.0);
        if ui.button("Clear canvas").clicked() {
            self.engine.clear_canvas(&mut self.surface);
        }

        if self.engine.pending_len() > 0 {
            ui.add_space(8.0);
            ui.label(format!("{} queued samples", self.engine.pending_len()));
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let size = egui::vec2(self.surface.width() as f32, self.surface.height() as f32);
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());

        // Pointer → engine.  Coordinates are canvas-local integers; the
        // engine clips anything out of range itself.
        if let Some(pos) = response.interact_pointer_pos() {
            let x = (pos.x - rect.min.x).round() as i32;
            let y = (pos.y - rect.min.y).round() as i32;
            if response.drag_started() {
                self.engine.on_press(x, y);
            } else if response.dragged() {
                self.engine.on_drag(x, y);
            }
        }
        if response.drag_released() {
            self.engine.on_release();
        }

        let image = egui::ColorImage::from_rgba_unmultiplied(
            [self.surface.width() as usize, self.surface.height() as usize],
            self.surface.pixels(),
        );
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.texture =
                    Some(ui.ctx()
                        .load_texture("canvas", image, egui::TextureOptions::NEAREST));
            }
        }
        if let Some(texture) = &self.texture {
            ui.painter().image(
                texture.id(),
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }
    }
}

impl eframe::App for AquarelleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // One drain tick per frame; keep repainting while work is queued so
        // long drags finish even after the pointer stops moving.
        self.engine.process_pending_points(&mut self.surface);
        if !self.engine.is_idle() {
            ctx.request_repaint();
        }

        egui::SidePanel::left("brush_panel")
            .resizable(false)
            .default_width(180.0)
            .show(ctx, |ui| self.controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none().show(ui, |ui| self.canvas(ui));
        });
    }
}
