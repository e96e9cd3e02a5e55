//! Right sidebar: detectors, channel display, logging and theme.

use eframe::egui;
use rfd::FileDialog;

use dirigo_core::logger::DEFAULT_BASENAME;
use dirigo_core::{ColorVector, FrameAverage, FramesPerFile, Gamma};

use super::theme::{form_label, section_header};
use super::widgets::{labeled, ENTRY_WIDTH};
use crate::app::DirigoApp;

impl DirigoApp {
    pub(crate) fn render_display_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("display")
            .resizable(false)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if !self.detectors.is_empty() {
                        self.render_detectors(ui);
                        ui.separator();
                    }
                    self.render_channels(ui);
                    ui.separator();
                    self.render_display_settings(ui);
                    ui.separator();
                    self.render_logger(ui);
                    ui.separator();
                    let mut dark_mode = self.dark_mode;
                    if ui.checkbox(&mut dark_mode, "Dark mode").changed() {
                        let ctx = ui.ctx().clone();
                        self.set_dark_mode(&ctx, dark_mode);
                    }
                });
            });
    }

    fn render_detectors(&self, ui: &mut egui::Ui) {
        ui.label(section_header("Detectors"));
        ui.horizontal_wrapped(|ui| {
            for detector in &self.detectors {
                let mut enabled = detector.enabled();
                let label = format!("Detector {}", detector.index() + 1);
                if ui.checkbox(&mut enabled, label).changed() {
                    detector.set_enabled(enabled);
                }
            }
        });
    }

    fn render_channels(&mut self, ui: &mut egui::Ui) {
        ui.label(section_header("Channels"));
        let range = self.hardware.data_range;
        egui::Grid::new("channels").num_columns(3).show(ui, |ui| {
            for (control, entries) in self.channels.iter_mut().zip(&mut self.channel_entries) {
                let available = control.is_available();
                let settings = control.settings();

                let mut enabled = settings.enabled;
                let label = format!("Ch {}", control.index() + 1);
                if ui
                    .add_enabled(available, egui::Checkbox::new(&mut enabled, label))
                    .changed()
                {
                    control.set_enabled(enabled);
                }

                let mut color = settings.color;
                ui.add_enabled_ui(available, |ui| {
                    egui::ComboBox::from_id_salt(("channel_color", control.index()))
                        .width(ENTRY_WIDTH)
                        .selected_text(color.name())
                        .show_ui(ui, |ui| {
                            for option in ColorVector::ALL {
                                ui.selectable_value(&mut color, option, option.name());
                            }
                        });
                });
                if color != settings.color {
                    control.set_color(color);
                }

                ui.vertical(|ui| {
                    ui.horizontal(|ui| {
                        let mut min = control.settings().display_min;
                        let slider = egui::Slider::new(&mut min, range.min..=range.max)
                            .show_value(false);
                        if ui.add_enabled(available, slider).changed() {
                            control.set_min(min, range);
                        }
                        entries.min.show(ui, min.to_string(), available, |raw| {
                            control.set_min_text(raw, range)
                        });
                    });
                    ui.horizontal(|ui| {
                        let mut max = control.settings().display_max;
                        let slider = egui::Slider::new(&mut max, range.min..=range.max)
                            .show_value(false);
                        if ui.add_enabled(available, slider).changed() {
                            control.set_max(max, range);
                        }
                        entries.max.show(ui, max.to_string(), available, |raw| {
                            control.set_max_text(raw, range)
                        });
                    });
                });
                ui.end_row();
            }
        });
    }

    fn render_display_settings(&mut self, ui: &mut egui::Ui) {
        ui.label(section_header("Display"));
        egui::Grid::new("display_settings").num_columns(2).show(ui, |ui| {
            let current = self.gamma.to_string();
            if let Some(gamma) = labeled(ui, "Gamma:", &mut self.gamma_entry, current, true, |raw| {
                raw.parse::<Gamma>()
            }) {
                self.set_gamma(gamma);
            }

            let current = self.frames_averaged.to_string();
            if let Some(frames) = labeled(
                ui,
                "Frames averaged:",
                &mut self.frames_averaged_entry,
                current,
                true,
                str::parse::<FrameAverage>,
            ) {
                self.set_frames_averaged(frames);
            }
        });
    }

    fn render_logger(&mut self, ui: &mut egui::Ui) {
        ui.label(section_header("Logging"));
        let editable = !self.capture.is_running();

        ui.horizontal(|ui| {
            ui.label(form_label("Save to:"));
            if ui.add_enabled(editable, egui::Button::new("Browse")).clicked() {
                if let Some(dir) = FileDialog::new()
                    .set_directory(&self.logger.save_path)
                    .pick_folder()
                {
                    log::info!("save path set to {}", dir.display());
                    self.logger.save_path = dir;
                }
            }
        });
        ui.label(self.logger.save_path.display().to_string());

        egui::Grid::new("logger").num_columns(2).show(ui, |ui| {
            ui.label(form_label("Basename:"));
            ui.add_enabled(
                editable,
                egui::TextEdit::singleline(&mut self.logger.basename)
                    .hint_text(DEFAULT_BASENAME)
                    .desired_width(ENTRY_WIDTH),
            );
            ui.end_row();

            let current = self.logger.frames_per_file.to_string();
            if let Some(frames) = labeled(
                ui,
                "Frames/file:",
                &mut self.frames_per_file_entry,
                current,
                editable,
                str::parse::<FramesPerFile>,
            ) {
                self.logger.frames_per_file = frames;
            }
        });
        ui.add_enabled(
            editable,
            egui::Checkbox::new(&mut self.logger.save_raw, "Save raw frames"),
        );
    }
}
