//! dirigo-sim: a simulated laser-scanning microscope behind the
//! [`dirigo_core::Engine`] interface.
//!
//! Frames of a synthetic bead specimen are produced at the rate the timing
//! model predicts, averaged, colour mapped and optionally written to TIFF.

mod acquisition;
mod display;
mod engine;
pub mod error;
mod hardware;
mod logger;
mod processor;
mod synth;
mod worker;

pub use acquisition::SimAcquisition;
pub use display::{FrameDisplay, VIEWER_CAPACITY};
pub use engine::SimEngine;
pub use error::{Error, Result};
pub use hardware::{SimAxis, SimConfig, SimDetector, SimHardware};
pub use logger::{TiffLogger, TiffSeries};
pub use processor::{RollingAverage, RollingAverageProcessor};
pub use synth::Specimen;
