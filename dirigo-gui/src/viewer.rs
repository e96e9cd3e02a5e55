//! Live image viewer fed by the display worker.

use std::sync::mpsc::{Receiver, TryRecvError};

use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};

use dirigo_core::{RgbFrame, ViewerMessage};

/// Zoom factors cycled with Ctrl+= and Ctrl+-.
pub const ZOOM_LEVELS: [f32; 6] = [0.25, 0.5, 1.0, 2.0, 3.0, 4.0];
const DEFAULT_ZOOM: usize = 2;

/// Zoom position within [`ZOOM_LEVELS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zoom(usize);

impl Default for Zoom {
    fn default() -> Self {
        Self(DEFAULT_ZOOM)
    }
}

impl Zoom {
    pub fn factor(self) -> f32 {
        ZOOM_LEVELS[self.0]
    }

    /// Next level up; stays at the largest.
    #[must_use]
    pub fn zoom_in(self) -> Self {
        Self((self.0 + 1).min(ZOOM_LEVELS.len() - 1))
    }

    /// Next level down; stays at the smallest.
    #[must_use]
    pub fn zoom_out(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

fn color_image(frame: &RgbFrame) -> ColorImage {
    ColorImage::from_rgb([frame.width as usize, frame.height as usize], &frame.pixels)
}

/// Drains the viewer inbox and keeps the newest frame on a texture.
#[derive(Default)]
pub struct Viewer {
    inbox: Option<Receiver<ViewerMessage>>,
    texture: Option<TextureHandle>,
    shape: (u32, u32),
    pub zoom: Zoom,
    frames_shown: u64,
}

impl Viewer {
    /// Starts following a new acquisition of `shape` pixels.
    pub fn attach(
        &mut self,
        ctx: &egui::Context,
        inbox: Receiver<ViewerMessage>,
        shape: (u32, u32),
    ) {
        self.inbox = Some(inbox);
        self.frames_shown = 0;
        if self.shape != shape || self.texture.is_none() {
            self.shape = shape;
            let blank = color_image(&RgbFrame::black(shape.0, shape.1));
            self.texture = Some(ctx.load_texture("viewer", blank, TextureOptions::NEAREST));
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.inbox.is_some()
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    /// Takes every pending message and uploads the newest frame.
    pub fn poll(&mut self, ctx: &egui::Context) {
        let Some(inbox) = &self.inbox else {
            return;
        };
        let mut latest = None;
        let mut finished = false;
        loop {
            match inbox.try_recv() {
                Ok(ViewerMessage::Frame(frame)) => latest = Some(frame),
                Ok(ViewerMessage::EndOfStream) | Err(TryRecvError::Disconnected) => {
                    finished = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        if let Some(frame) = latest {
            self.shape = (frame.width, frame.height);
            let image = color_image(&frame);
            match &mut self.texture {
                Some(texture) => texture.set(image, TextureOptions::NEAREST),
                None => {
                    self.texture =
                        Some(ctx.load_texture("viewer", image, TextureOptions::NEAREST));
                }
            }
            self.frames_shown += 1;
        }
        if finished {
            log::debug!("viewer stream ended after {} frame(s)", self.frames_shown);
            self.inbox = None;
        }
    }

    /// Current image scaled by the zoom factor.
    pub fn show(&self, ui: &mut egui::Ui) {
        let Some(texture) = &self.texture else {
            ui.centered_and_justified(|ui| ui.label("No Data"));
            return;
        };
        #[allow(clippy::cast_precision_loss)]
        let size = egui::vec2(self.shape.0 as f32, self.shape.1 as f32) * self.zoom.factor();
        egui::ScrollArea::both().show(ui, |ui| {
            ui.add(egui::Image::new((texture.id(), size)));
        });
    }
}
