//! Display worker: colour-maps processed frames for the viewer.

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, PoisonError};

use dirigo_core::display::render_rgb;
use dirigo_core::{
    ChannelDisplay, Display, DisplayChannelHandle, FrameRef, Gamma, Publisher, ViewerMessage,
    Worker, WorkerThread,
};

use crate::worker::consume;

/// Frames queued for the viewer; older frames are dropped when it lags.
pub const VIEWER_CAPACITY: usize = 2;

pub struct FrameDisplay {
    inbox: Option<Receiver<FrameRef>>,
    channels: Vec<DisplayChannelHandle>,
    gamma: Arc<Mutex<Gamma>>,
    viewer: Arc<Publisher<ViewerMessage>>,
    thread: WorkerThread,
}

impl FrameDisplay {
    #[must_use]
    pub fn new(inbox: Receiver<FrameRef>, channels: Vec<DisplayChannelHandle>) -> Self {
        Self {
            inbox: Some(inbox),
            channels,
            gamma: Arc::new(Mutex::new(Gamma::default())),
            viewer: Arc::new(Publisher::new(VIEWER_CAPACITY)),
            thread: WorkerThread::new("display-frame"),
        }
    }
}

impl Worker for FrameDisplay {
    fn name(&self) -> &str {
        self.thread.name()
    }

    fn start(&mut self) -> dirigo_core::Result<()> {
        let inbox = self
            .inbox
            .take()
            .ok_or_else(|| dirigo_core::Error::Engine("display already started".into()))?;
        let channels = self.channels.clone();
        let gamma = Arc::clone(&self.gamma);
        let viewer = Arc::clone(&self.viewer);
        self.thread.spawn(move |signal| {
            let handled = consume(&inbox, &signal, |frame| {
                let settings: Vec<ChannelDisplay> =
                    channels.iter().map(DisplayChannelHandle::get).collect();
                let g = *gamma.lock().unwrap_or_else(PoisonError::into_inner);
                let rgb = render_rgb(&frame, &settings, g);
                viewer.publish_lossy(&ViewerMessage::Frame(rgb));
                Ok(())
            });
            viewer.publish_lossy(&ViewerMessage::EndOfStream);
            viewer.close();
            log::debug!("display rendered {} frame(s)", handled?);
            Ok(())
        })
    }

    fn stop(&self) {
        self.thread.request_stop();
    }

    fn join(&mut self) -> dirigo_core::Result<()> {
        let result = self.thread.join();
        self.viewer.close();
        result
    }

    fn is_alive(&self) -> bool {
        self.thread.is_alive()
    }
}

impl Display for FrameDisplay {
    fn channels(&self) -> &[DisplayChannelHandle] {
        &self.channels
    }

    fn gamma(&self) -> Gamma {
        *self.gamma.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_gamma(&self, gamma: Gamma) {
        log::debug!("display gamma {gamma}");
        *self.gamma.lock().unwrap_or_else(PoisonError::into_inner) = gamma;
    }

    fn subscribe_viewer(&self) -> Receiver<ViewerMessage> {
        self.viewer.subscribe()
    }
}
