//! dirigo-core: models and engine interface for a laser-scanning microscope
//! control panel.
//!
//! Panel models (stack, frame, display, logger settings) validate text edits
//! and build acquisition requests. The engine traits describe the worker
//! chain a backend provides, and [`AcquisitionSession`] runs it.
//!

pub mod acquisition;
pub mod display;
pub mod engine;
pub mod error;
pub mod form;
pub mod frame;
pub mod logger;
pub mod session;
pub mod stack;
pub mod stage;
pub mod timing;
pub mod units;

pub use acquisition::{
    AcquisitionRequest, BufferCount, CaptureAction, CaptureControl, CaptureMode,
    FrameAcquisitionSpec, StackAcquisitionSpec,
};
pub use display::{
    ChannelControl, ChannelDisplay, ColorVector, DataRange, DisplayChannelHandle, FrameAverage,
    Gamma,
};
pub use engine::{
    Acquisition, Detector, Display, Engine, FrameRef, HardwareInfo, Logger, Processor, Publisher,
    RawFrame, RgbFrame, StopSignal, ViewerMessage, Worker, WorkerThread,
};
pub use error::{Error, Result, ValidationError};
pub use form::{EditForm, FieldModel};
pub use frame::{FrameField, FrameSpecModel, ScanDirection};
pub use logger::{FramesPerFile, LoggerSettings};
pub use session::{AcquisitionSession, SessionOptions};
pub use stack::{StackField, StackSpecModel};
pub use stage::{JogController, JogDirection, LinearAxis, XyStage};
pub use units::{Frequency, Position, Time, Velocity};
