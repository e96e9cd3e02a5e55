//! Main application state and acquisition control.
//!
//! `DirigoApp` owns the panel models, the engine and the running
//! [`AcquisitionSession`], if any.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;

use dirigo_core::display::{link_channels, unlink_channels};
use dirigo_core::session::POLL_INTERVAL;
use dirigo_core::{
    AcquisitionSession, CaptureAction, CaptureControl, CaptureMode, ChannelControl, ColorVector,
    Detector, EditForm, Engine, FrameAverage, FrameField, FrameSpecModel, Gamma, HardwareInfo,
    JogController, LoggerSettings, SessionOptions, StackField, StackSpecModel,
};

use crate::settings::PanelSettings;
use crate::ui::theme;
use crate::ui::widgets::{EntryMap, ValueEntry};
use crate::viewer::Viewer;

/// Viewer refresh while frames are streaming.
const REPAINT_INTERVAL: Duration = Duration::from_millis(16);

/// Colours given to channels on first start.
const DEFAULT_COLORS: [ColorVector; 4] = [
    ColorVector::Green,
    ColorVector::Magenta,
    ColorVector::Cyan,
    ColorVector::Yellow,
];

/// Entries of one display channel.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChannelEntries {
    pub min: ValueEntry,
    pub max: ValueEntry,
}

/// Main application state.
pub struct DirigoApp {
    pub(crate) engine: Box<dyn Engine>,
    pub(crate) hardware: HardwareInfo,

    pub(crate) capture: CaptureControl,
    pub(crate) frame_form: EditForm<FrameSpecModel>,
    pub(crate) frame_entries: EntryMap<FrameField>,
    pub(crate) stack_form: EditForm<StackSpecModel>,
    pub(crate) stack_entries: EntryMap<StackField>,
    pub(crate) jog: JogController,

    pub(crate) detectors: Vec<Arc<dyn Detector>>,
    pub(crate) channels: Vec<ChannelControl>,
    pub(crate) channel_entries: Vec<ChannelEntries>,
    pub(crate) gamma: Gamma,
    pub(crate) gamma_entry: ValueEntry,
    pub(crate) frames_averaged: FrameAverage,
    pub(crate) frames_averaged_entry: ValueEntry,
    pub(crate) logger: LoggerSettings,
    pub(crate) frames_per_file_entry: ValueEntry,
    pub(crate) dark_mode: bool,

    pub(crate) session: Option<AcquisitionSession>,
    last_poll: Instant,
    pub(crate) viewer: Viewer,
    pub(crate) status: String,

    settings_path: Option<PathBuf>,
    closing: bool,
}

impl DirigoApp {
    /// Builds the panel for `engine` and restores saved preferences.
    pub fn new(
        ctx: &egui::Context,
        engine: Box<dyn Engine>,
        settings_path: Option<PathBuf>,
    ) -> Self {
        let hardware = engine.hardware();
        let settings = settings_path
            .as_deref()
            .map(PanelSettings::load)
            .unwrap_or_default();

        let mut channels: Vec<ChannelControl> = (0..hardware.channel_count())
            .map(|i| {
                let mut control = ChannelControl::new(i, hardware.data_range);
                control.set_color(DEFAULT_COLORS[i % DEFAULT_COLORS.len()]);
                control
            })
            .collect();
        for (control, saved) in channels.iter_mut().zip(&settings.channels) {
            control.restore(*saved, hardware.data_range);
        }
        // Greys out channels the digitizer has disabled.
        link_channels(&mut channels, &hardware.channels, &[]);

        theme::apply(ctx, settings.dark_mode);
        ctx.options_mut(|o| o.zoom_with_keyboard = false);

        Self {
            jog: JogController::new(engine.stage(), engine.z_scanner()),
            detectors: engine.detectors(),
            channel_entries: vec![ChannelEntries::default(); channels.len()],
            channels,
            capture: CaptureControl::default(),
            frame_form: EditForm::new(FrameSpecModel::default()),
            frame_entries: EntryMap::default(),
            stack_form: EditForm::new(StackSpecModel::default()),
            stack_entries: EntryMap::default(),
            gamma: settings.gamma,
            gamma_entry: ValueEntry::default(),
            frames_averaged: FrameAverage::default(),
            frames_averaged_entry: ValueEntry::default(),
            logger: LoggerSettings::default(),
            frames_per_file_entry: ValueEntry::default(),
            dark_mode: settings.dark_mode,
            session: None,
            last_poll: Instant::now(),
            viewer: Viewer::default(),
            status: "Ready".to_string(),
            hardware,
            engine,
            settings_path,
            closing: false,
        }
    }

    /// Handles a capture button press.
    pub(crate) fn toggle_capture(&mut self, ctx: &egui::Context, mode: CaptureMode) {
        match self.capture.toggle(mode) {
            CaptureAction::Start(mode) => self.start_acquisition(ctx, mode),
            CaptureAction::Stop => self.stop_acquisition(),
            CaptureAction::Ignored => {}
        }
    }

    fn start_acquisition(&mut self, ctx: &egui::Context, mode: CaptureMode) {
        let frame = self.frame_form.model().generate_spec();
        let request = mode.request(frame, self.stack_form.model());
        let options = SessionOptions {
            logger: mode.logs_frames().then(|| self.logger.clone()),
            frames_averaged: self.frames_averaged,
            gamma: self.gamma,
        };
        match AcquisitionSession::start(self.engine.as_ref(), request, options) {
            Ok(mut session) => {
                link_channels(
                    &mut self.channels,
                    &self.hardware.channels,
                    session.display_channels(),
                );
                if let Some(inbox) = session.take_viewer() {
                    self.viewer.attach(ctx, inbox, self.frame_form.model().shape());
                }
                self.status = format!("{} running", mode.idle_label().to_lowercase());
                self.session = Some(session);
                self.last_poll = Instant::now();
            }
            Err(e) => {
                log::error!("cannot start {mode:?}: {e}");
                self.status = format!("Error: {e}");
                self.capture.stopped();
            }
        }
    }

    /// Stops and joins the running session and resets the capture buttons.
    pub(crate) fn stop_acquisition(&mut self) {
        if let Some(mut session) = self.session.take() {
            let result = session.stop();
            self.status = match (result, session.frames_logged()) {
                (Err(e), _) => {
                    log::error!("acquisition stopped with error: {e}");
                    format!("Error: {e}")
                }
                (Ok(()), Some(n)) => format!("Stopped, {n} frame(s) logged"),
                (Ok(()), None) => "Stopped".to_string(),
            };
        }
        unlink_channels(&mut self.channels);
        self.capture.stopped();
    }

    /// Ends the session once its acquisition thread has finished.
    fn poll_session(&mut self) {
        if self.session.is_none() || self.last_poll.elapsed() < POLL_INTERVAL {
            return;
        }
        self.last_poll = Instant::now();
        if self.session.as_ref().is_some_and(|s| !s.is_alive()) {
            log::info!("acquisition finished");
            self.stop_acquisition();
        }
    }

    pub(crate) fn set_gamma(&mut self, gamma: Gamma) {
        self.gamma = gamma;
        if let Some(session) = &self.session {
            session.set_gamma(gamma);
        }
    }

    pub(crate) fn set_frames_averaged(&mut self, frames: FrameAverage) {
        self.frames_averaged = frames;
        if let Some(session) = &self.session {
            session.set_frames_averaged(frames);
        }
    }

    pub(crate) fn set_dark_mode(&mut self, ctx: &egui::Context, dark_mode: bool) {
        self.dark_mode = dark_mode;
        theme::apply(ctx, dark_mode);
    }

    fn settings(&self) -> PanelSettings {
        PanelSettings {
            dark_mode: self.dark_mode,
            channels: self.channels.iter().map(ChannelControl::settings).collect(),
            gamma: self.gamma,
        }
    }

    /// Stops any acquisition and saves preferences; runs once.
    fn shutdown(&mut self) {
        if self.closing {
            return;
        }
        self.closing = true;
        if self.session.is_some() {
            log::info!("window closed during acquisition, stopping");
            self.stop_acquisition();
        }
        if let Some(path) = &self.settings_path {
            if let Err(e) = self.settings().save(path) {
                log::warn!("settings not saved: {e:#}");
            }
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let (zoom_in, zoom_out) = ctx.input_mut(|i| {
            let zoom_in = i.consume_key(egui::Modifiers::COMMAND, egui::Key::Equals)
                || i.consume_key(egui::Modifiers::COMMAND, egui::Key::Plus);
            let zoom_out = i.consume_key(egui::Modifiers::COMMAND, egui::Key::Minus);
            (zoom_in, zoom_out)
        });
        if zoom_in {
            self.viewer.zoom = self.viewer.zoom.zoom_in();
        }
        if zoom_out {
            self.viewer.zoom = self.viewer.zoom.zoom_out();
        }
    }
}

impl eframe::App for DirigoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            self.shutdown();
        }
        self.handle_shortcuts(ctx);
        self.viewer.poll(ctx);
        self.poll_session();

        self.render_acquisition_panel(ctx);
        self.render_display_panel(ctx);
        self.render_central_panel(ctx);

        if self.session.is_some() || self.viewer.is_streaming() {
            ctx.request_repaint_after(REPAINT_INTERVAL);
        }
    }
}

impl Drop for DirigoApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}
