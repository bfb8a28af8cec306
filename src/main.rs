#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod cli;

use std::process::ExitCode;

use aquarelle::{log_err, logger};
use eframe::egui;

fn main() -> ExitCode {
    logger::init();

    // -- Headless mode ------------------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        return cli::run(args);
    }

    // -- GUI mode -----------------------------------------------------------
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1120.0, 640.0])
            .with_title("aquarelle"),
        ..Default::default()
    };

    match eframe::run_native(
        "aquarelle",
        options,
        Box::new(|cc| Box::new(app::AquarelleApp::new(cc))),
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_err!("eframe failed: {}", e);
            eprintln!("aquarelle: {}", e);
            ExitCode::FAILURE
        }
    }
}
