//! Dirigo control panel entry point.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod settings;
mod ui;
mod viewer;

use app::DirigoApp;
use dirigo_sim::SimEngine;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let engine = SimEngine::default();
    let opts = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Dirigo")
            .with_inner_size([1280.0, 820.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Dirigo",
        opts,
        Box::new(move |cc| {
            let app = DirigoApp::new(&cc.egui_ctx, Box::new(engine), settings::settings_path());
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("control panel failed: {e}"))
}
