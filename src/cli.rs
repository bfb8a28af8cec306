// ============================================================================
// HEADLESS MODE — scripted strokes on an off-screen surface, PNG out.
// Exists so the engine can be exercised end-to-end without a window.
// ============================================================================

use std::process::ExitCode;

use clap::Parser;

use aquarelle::{DiffusionMode, PixelSurface, WatercolorEngine, log_err, log_info};

#[derive(Parser, Debug)]
#[command(name = "aquarelle", about = "Wet-on-wet watercolor brush engine")]
pub struct CliArgs {
    /// Render the demo strokes headless and write a PNG here.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Canvas width in pixels.
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Seed for the diffusion jitter.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Use ring (step-gated) diffusion instead of directional.
    #[arg(long, default_value_t = false)]
    pub ring: bool,
}

impl CliArgs {
    /// Headless mode is selected by the presence of `--output`.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--output" || a == "-o")
    }
}

/// Run the headless demo: three overlapping strokes, drain, encode.
pub fn run(args: CliArgs) -> ExitCode {
    let mut engine = WatercolorEngine::new(args.width, args.height);
    engine.seed_rng(args.seed);
    if args.ring {
        engine.params.diffusion_mode = DiffusionMode::Ring;
    }
    let mut surface = PixelSurface::new(args.width, args.height);

    let w = args.width as i32;
    let h = args.height as i32;
    let strokes: [([u8; 3], Vec<(i32, i32)>); 3] = [
        (
            [190, 60, 50],
            (0..w / 2).map(|t| (w / 4 + t, h / 3 + (t / 6) % 14)).collect(),
        ),
        (
            [40, 90, 170],
            (0..h / 2).map(|t| (w / 3 + t / 4, h / 4 + t)).collect(),
        ),
        (
            [210, 180, 40],
            (0..w / 2).map(|t| (w / 4 + t, 2 * h / 3 - t / 3)).collect(),
        ),
    ];

    engine.set_size(14);
    engine.set_opacity(0.9);
    for (color, points) in strokes {
        engine.set_color(color);
        let mut iter = points.into_iter();
        let Some((sx, sy)) = iter.next() else {
            continue;
        };
        engine.on_press(sx, sy);
        for (x, y) in iter {
            engine.on_drag(x, y);
        }
        engine.on_release();
        // Drive the drain tick until the stroke (and its release cleanup)
        // has fully run — the headless stand-in for the frame callback.
        while !engine.is_idle() {
            engine.process_pending_points(&mut surface);
        }
    }

    let Some(path) = args.output else {
        log_err!("headless mode requires --output");
        return ExitCode::FAILURE;
    };
    match surface.save_image(&path) {
        Ok(()) => {
            log_info!("wrote {}", path);
            println!("wrote {}", path);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_err!("failed to write {}: {}", path, e);
            eprintln!("failed to write {}: {}", path, e);
            ExitCode::FAILURE
        }
    }
}
