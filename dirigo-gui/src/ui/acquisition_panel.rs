//! Left sidebar: what to acquire and how to move the sample.

use eframe::egui;

use dirigo_core::timing::{frame_rate, line_rate};
use dirigo_core::{CaptureMode, FrameField, JogDirection, ScanDirection, StackField};

use super::theme::{capture_button, form_label, section_header, stat_value};
use super::widgets::form_row;
use crate::app::DirigoApp;

const JOG_BUTTON: [f32; 2] = [32.0, 28.0];

impl DirigoApp {
    pub(crate) fn render_acquisition_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("acquisition")
            .resizable(false)
            .default_width(290.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_capture_buttons(ui);
                    ui.separator();
                    self.render_frame_spec(ui);
                    if self.hardware.has_z_scanner {
                        ui.separator();
                        self.render_stack_spec(ui);
                    }
                    ui.separator();
                    self.render_timing(ui);
                    if self.jog.has_stage() || self.jog.has_z() {
                        ui.separator();
                        self.render_stage(ui);
                    }
                });
            });
    }

    fn render_capture_buttons(&mut self, ui: &mut egui::Ui) {
        let mut pressed = None;
        ui.horizontal(|ui| {
            for mode in CaptureMode::ALL {
                if mode == CaptureMode::Stack && !self.hardware.has_z_scanner {
                    continue;
                }
                let running = self.capture.running_mode() == Some(mode);
                let button = capture_button(self.capture.label(mode), running);
                if ui.add_enabled(self.capture.is_enabled(mode), button).clicked() {
                    pressed = Some(mode);
                }
            }
        });
        if let Some(mode) = pressed {
            let ctx = ui.ctx().clone();
            self.toggle_capture(&ctx, mode);
        }
    }

    fn render_frame_spec(&mut self, ui: &mut egui::Ui) {
        ui.label(section_header("Frame"));
        let editable = !self.capture.is_running();
        let has_pixel_time = self.frame_form.model().pixel_time().is_some();

        egui::Grid::new("frame_spec").num_columns(2).show(ui, |ui| {
            ui.label(form_label("Scan:"));
            let mut direction = self.frame_form.model().direction;
            ui.add_enabled_ui(editable, |ui| {
                egui::ComboBox::from_id_salt("scan_direction")
                    .selected_text(direction.to_string())
                    .show_ui(ui, |ui| {
                        for option in ScanDirection::ALL {
                            ui.selectable_value(&mut direction, option, option.to_string());
                        }
                    });
            });
            ui.end_row();
            if direction != self.frame_form.model().direction {
                self.frame_form.update(|m| m.direction = direction);
            }

            for field in FrameField::ALL {
                if field == FrameField::PixelTime && !has_pixel_time {
                    continue;
                }
                form_row(
                    ui,
                    field.label(),
                    &mut self.frame_form,
                    &mut self.frame_entries,
                    field,
                    editable,
                );
            }
        });

        let mut square_frame = self.frame_form.model().square_frame;
        let mut square_pixel = self.frame_form.model().square_pixel;
        ui.horizontal(|ui| {
            ui.add_enabled(editable, egui::Checkbox::new(&mut square_frame, "Square frame"));
            ui.add_enabled(editable, egui::Checkbox::new(&mut square_pixel, "Square pixel"));
        });
        if square_frame != self.frame_form.model().square_frame
            || square_pixel != self.frame_form.model().square_pixel
        {
            self.frame_form.update(|m| {
                m.square_frame = square_frame;
                m.square_pixel = square_pixel;
            });
        }
    }

    fn render_stack_spec(&mut self, ui: &mut egui::Ui) {
        ui.label(section_header("Stack"));
        let editable = !self.capture.is_running();
        egui::Grid::new("stack_spec").num_columns(2).show(ui, |ui| {
            for field in StackField::ALL {
                form_row(
                    ui,
                    field.label(),
                    &mut self.stack_form,
                    &mut self.stack_entries,
                    field,
                    editable,
                );
            }
        });
    }

    fn render_timing(&self, ui: &mut egui::Ui) {
        ui.label(section_header("Timing"));
        let spec = self.frame_form.model().generate_spec();
        let scanner = self.hardware.fast_scanner_frequency;
        egui::Grid::new("timing").num_columns(2).show(ui, |ui| {
            ui.label(form_label("Line rate:"));
            ui.label(stat_value(&line_rate(&spec, scanner).to_string()));
            ui.end_row();
            ui.label(form_label("Frame rate:"));
            ui.label(stat_value(&frame_rate(&spec, scanner).to_string()));
            ui.end_row();
        });
    }

    fn render_stage(&mut self, ui: &mut egui::Ui) {
        ui.label(section_header("Stage"));
        ui.horizontal(|ui| {
            if self.jog.has_stage() {
                egui::Grid::new("jog_xy").show(ui, |ui| {
                    ui.label("");
                    self.jog_button(ui, JogDirection::PlusY);
                    ui.label("");
                    ui.end_row();
                    self.jog_button(ui, JogDirection::MinusX);
                    ui.label("XY");
                    self.jog_button(ui, JogDirection::PlusX);
                    ui.end_row();
                    ui.label("");
                    self.jog_button(ui, JogDirection::MinusY);
                    ui.end_row();
                });
            }
            if self.jog.has_z() {
                ui.vertical(|ui| {
                    self.jog_button(ui, JogDirection::PlusZ);
                    ui.label("Z");
                    self.jog_button(ui, JogDirection::MinusZ);
                });
            }
        });

        egui::Grid::new("stage_position").num_columns(2).show(ui, |ui| {
            if let Some(stage) = self.engine.stage() {
                ui.label(form_label("X:"));
                ui.label(stat_value(&stage.x.position().to_string()));
                ui.end_row();
                ui.label(form_label("Y:"));
                ui.label(stat_value(&stage.y.position().to_string()));
                ui.end_row();
            }
            if let Some(z) = self.engine.z_scanner() {
                ui.label(form_label("Z:"));
                ui.label(stat_value(&z.position().to_string()));
                ui.end_row();
            }
        });
        if self.jog.active().is_some() {
            ui.ctx().request_repaint();
        }
    }

    /// Press-and-hold button: moves while held, stops on release.
    fn jog_button(&mut self, ui: &mut egui::Ui, direction: JogDirection) {
        let response = ui.add_sized(JOG_BUTTON, egui::Button::new(direction.arrow()));
        let held = response.is_pointer_button_down_on();
        let active = self.jog.active() == Some(direction);
        let result = if held && !active {
            self.jog.press(direction)
        } else if !held && active {
            self.jog.release()
        } else {
            Ok(())
        };
        if let Err(e) = result {
            log::error!("jog {direction:?} failed: {e}");
            self.status = format!("Error: {e}");
        }
    }
}
