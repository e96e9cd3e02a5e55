//! Central panel: status line and live viewer.

use eframe::egui;

use super::theme::{form_label, stat_value};
use crate::app::DirigoApp;

impl DirigoApp {
    pub(crate) fn render_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(stat_value(&self.status));
                ui.separator();
                ui.label(form_label(&format!("zoom {}x", self.viewer.zoom.factor())));
                ui.separator();
                ui.label(form_label(&format!("frames {}", self.viewer.frames_shown())));
                if let Some(logged) = self.session.as_ref().and_then(|s| s.frames_logged()) {
                    ui.separator();
                    ui.label(form_label(&format!("logged {logged}")));
                }
            });
            ui.separator();
            self.viewer.show(ui);
        });
    }
}
