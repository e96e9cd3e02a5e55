//! One running acquisition: the worker chain from digitizer to viewer.

use std::sync::mpsc::Receiver;
use std::time::Duration;

use crate::acquisition::AcquisitionRequest;
use crate::display::{DisplayChannelHandle, FrameAverage, Gamma};
use crate::engine::{Acquisition, Display, Engine, Logger, Processor, ViewerMessage, Worker};
use crate::error::{Error, Result};
use crate::logger::LoggerSettings;

/// Interval at which the panel checks whether the acquisition ended.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Settings applied when a session starts.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Frames are logged when set.
    pub logger: Option<LoggerSettings>,
    pub frames_averaged: FrameAverage,
    pub gamma: Gamma,
}

/// Acquisition, processor, display and optional logger wired together.
pub struct AcquisitionSession {
    acquisition: Box<dyn Acquisition>,
    processor: Box<dyn Processor>,
    display: Box<dyn Display>,
    logger: Option<Box<dyn Logger>>,
    viewer: Option<Receiver<ViewerMessage>>,
    stopped: bool,
}

impl AcquisitionSession {
    /// Builds the worker chain and starts it.
    ///
    /// Downstream workers start first so that no frame is published before
    /// its consumers run; the acquisition starts last.
    ///
    /// # Errors
    /// Fails if the engine cannot build a worker or a thread cannot start.
    /// Workers already started are stopped before returning.
    pub fn start(
        engine: &dyn Engine,
        request: AcquisitionRequest,
        options: SessionOptions,
    ) -> Result<Self> {
        log::info!("starting {} acquisition", request.kind_name());
        let acquisition = engine.make_acquisition(request)?;
        let processor = engine.make_processor(acquisition.subscribe())?;
        let display = engine.make_display(processor.subscribe())?;
        let logger = match options.logger {
            Some(settings) => {
                let inbox = if settings.save_raw {
                    acquisition.subscribe()
                } else {
                    processor.subscribe()
                };
                Some(engine.make_logger(inbox, settings)?)
            }
            None => None,
        };
        let viewer = display.subscribe_viewer();

        processor.set_frames_averaged(options.frames_averaged);
        display.set_gamma(options.gamma);

        let mut session = Self {
            acquisition,
            processor,
            display,
            logger,
            viewer: Some(viewer),
            stopped: false,
        };
        if let Err(e) = session.start_workers() {
            log::error!("acquisition failed to start: {e}");
            let _ = session.stop();
            return Err(e);
        }
        Ok(session)
    }

    fn start_workers(&mut self) -> Result<()> {
        if let Some(logger) = &mut self.logger {
            logger.start()?;
        }
        self.display.start()?;
        self.processor.start()?;
        self.acquisition.start()
    }

    /// Whether the acquisition thread is still producing frames.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.stopped && self.acquisition.is_alive()
    }

    /// Hands the viewer inbox to the caller; `None` after the first call.
    pub fn take_viewer(&mut self) -> Option<Receiver<ViewerMessage>> {
        self.viewer.take()
    }

    #[must_use]
    pub fn request(&self) -> &AcquisitionRequest {
        self.acquisition.request()
    }

    /// Live display channels, one per enabled digitizer channel.
    #[must_use]
    pub fn display_channels(&self) -> &[DisplayChannelHandle] {
        self.display.channels()
    }

    pub fn set_gamma(&self, gamma: Gamma) {
        self.display.set_gamma(gamma);
    }

    pub fn set_frames_averaged(&self, frames: FrameAverage) {
        self.processor.set_frames_averaged(frames);
    }

    /// Frames written so far, if logging.
    #[must_use]
    pub fn frames_logged(&self) -> Option<u64> {
        self.logger.as_ref().map(|l| l.frames_written())
    }

    /// Stops and joins every worker. Calling it again is a no-op.
    ///
    /// Workers are stopped one at a time from upstream to downstream, each
    /// only after its producer has exited, so frames already in flight reach
    /// the display and the logger.
    ///
    /// # Errors
    /// Returns the first worker error; every worker is joined regardless.
    pub fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        let mut first_error = None;
        shut_down(self.acquisition.as_mut(), &mut first_error);
        shut_down(self.processor.as_mut(), &mut first_error);
        shut_down(self.display.as_mut(), &mut first_error);
        if let Some(logger) = self.logger.as_mut() {
            shut_down(logger.as_mut(), &mut first_error);
        }
        log::info!("acquisition stopped");
        first_error.map_or(Ok(()), Err)
    }
}

fn shut_down<W: Worker + ?Sized>(worker: &mut W, first_error: &mut Option<Error>) {
    worker.stop();
    if let Err(e) = worker.join() {
        log::error!("worker {} failed: {e}", worker.name());
        first_error.get_or_insert(e);
    }
}

impl Drop for AcquisitionSession {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("acquisition ended with error: {e}");
        }
    }
}
