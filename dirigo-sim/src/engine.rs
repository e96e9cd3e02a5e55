//! [`Engine`] implementation over the simulated instrument.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use dirigo_core::engine::DEFAULT_QUEUE_CAPACITY;
use dirigo_core::{
    Acquisition, AcquisitionRequest, ChannelDisplay, Detector, Display, DisplayChannelHandle,
    Engine, Error, FrameRef, HardwareInfo, LinearAxis, Logger, LoggerSettings, Processor, Result,
    XyStage,
};

use crate::acquisition::SimAcquisition;
use crate::display::FrameDisplay;
use crate::hardware::{SimConfig, SimHardware};
use crate::logger::TiffLogger;
use crate::processor::RollingAverageProcessor;

/// Simulated microscope backend.
#[derive(Debug, Clone)]
pub struct SimEngine {
    hardware: Arc<SimHardware>,
    queue_capacity: usize,
}

impl SimEngine {
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        log::info!(
            "simulated instrument: {} channel(s), {} detector(s), stage={}, z={}",
            config.channels.len(),
            config.detectors,
            config.has_stage,
            config.has_z_scanner
        );
        Self {
            hardware: Arc::new(SimHardware::new(config)),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Sets the per-subscriber frame queue depth.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.hardware.config
    }
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Engine for SimEngine {
    fn hardware(&self) -> HardwareInfo {
        let config = &self.hardware.config;
        HardwareInfo {
            channels: config.channels.clone(),
            detector_count: self.hardware.detectors.len(),
            has_stage: self.hardware.x.is_some() && self.hardware.y.is_some(),
            has_z_scanner: self.hardware.z.is_some(),
            fast_scanner_frequency: config.fast_scanner_frequency,
            data_range: config.data_range,
        }
    }

    fn detectors(&self) -> Vec<Arc<dyn Detector>> {
        self.hardware
            .detectors
            .iter()
            .map(|d| Arc::clone(d) as Arc<dyn Detector>)
            .collect()
    }

    fn stage(&self) -> Option<XyStage> {
        match (&self.hardware.x, &self.hardware.y) {
            (Some(x), Some(y)) => Some(XyStage {
                x: Arc::clone(x) as Arc<dyn LinearAxis>,
                y: Arc::clone(y) as Arc<dyn LinearAxis>,
            }),
            _ => None,
        }
    }

    fn z_scanner(&self) -> Option<Arc<dyn LinearAxis>> {
        self.hardware
            .z
            .as_ref()
            .map(|z| Arc::clone(z) as Arc<dyn LinearAxis>)
    }

    fn make_acquisition(&self, request: AcquisitionRequest) -> Result<Box<dyn Acquisition>> {
        if matches!(request, AcquisitionRequest::Stack(_)) && self.hardware.z.is_none() {
            return Err(Error::HardwareUnavailable("z scanner"));
        }
        if !self.hardware.config.channels.iter().any(|c| *c) {
            return Err(Error::Engine("no digitizer channel is enabled".into()));
        }
        Ok(Box::new(SimAcquisition::new(
            request,
            Arc::clone(&self.hardware),
            self.queue_capacity,
        )))
    }

    fn make_processor(&self, inbox: Receiver<FrameRef>) -> Result<Box<dyn Processor>> {
        Ok(Box::new(RollingAverageProcessor::new(
            inbox,
            self.hardware.config.data_range,
            self.queue_capacity,
        )))
    }

    fn make_display(&self, inbox: Receiver<FrameRef>) -> Result<Box<dyn Display>> {
        let config = &self.hardware.config;
        let channels = config
            .channels
            .iter()
            .filter(|on| **on)
            .map(|_| DisplayChannelHandle::new(ChannelDisplay::full_range(config.data_range)))
            .collect();
        Ok(Box::new(FrameDisplay::new(inbox, channels)))
    }

    fn make_logger(
        &self,
        inbox: Receiver<FrameRef>,
        settings: LoggerSettings,
    ) -> Result<Box<dyn Logger>> {
        let logger = TiffLogger::new(inbox, settings).map_err(Error::from)?;
        Ok(Box::new(logger))
    }
}
