//! Acquisition requests handed to the engine, and the capture button state.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::stack::StackSpecModel;
use crate::units::{Position, Time};

/// Flyback periods requested for every raster acquisition.
pub const DEFAULT_FLYBACK_PERIODS: u32 = 32;

/// Number of buffers (frames) an acquisition produces before ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BufferCount {
    Finite(u32),
    /// Runs until stopped.
    Unlimited,
}

impl BufferCount {
    /// Whether `produced` buffers complete the acquisition.
    #[must_use]
    pub fn is_complete(self, produced: u64) -> bool {
        match self {
            BufferCount::Finite(n) => produced >= u64::from(n),
            BufferCount::Unlimited => false,
        }
    }
}

impl fmt::Display for BufferCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferCount::Finite(n) => write!(f, "{n}"),
            BufferCount::Unlimited => write!(f, "∞"),
        }
    }
}

/// Raster frame acquisition request.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameAcquisitionSpec {
    pub bidirectional_scanning: bool,
    pub line_width: Position,
    pub frame_height: Position,
    pub pixel_time: Option<Time>,
    pub pixel_width: Position,
    pub pixel_height: Position,
    pub fill_fraction: f64,
    pub buffers_per_acquisition: BufferCount,
    pub flyback_periods: u32,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_count(ratio: f64) -> u32 {
    if ratio.is_finite() && ratio >= 1.0 {
        ratio.round().min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

impl FrameAcquisitionSpec {
    /// `round(line_width / pixel_width)`.
    #[must_use]
    pub fn pixels_per_line(&self) -> u32 {
        round_to_count(self.line_width / self.pixel_width)
    }

    /// `round(frame_height / pixel_height)`.
    #[must_use]
    pub fn lines_per_frame(&self) -> u32 {
        round_to_count(self.frame_height / self.pixel_height)
    }
}

/// Z-stack acquisition request: one frame per plane.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StackAcquisitionSpec {
    pub frame: FrameAcquisitionSpec,
    pub lower_limit: Position,
    pub upper_limit: Position,
    pub depth_spacing: Position,
    /// Plane count as shown by the stack model.
    pub depths: u32,
}

impl StackAcquisitionSpec {
    /// Combines frame settings with a stack snapshot.
    #[must_use]
    pub fn new(frame: FrameAcquisitionSpec, stack: &StackSpecModel) -> Self {
        Self {
            frame,
            lower_limit: stack.lower(),
            upper_limit: stack.upper(),
            depth_spacing: stack.spacing(),
            depths: u32::try_from(stack.depths()).unwrap_or(0),
        }
    }

    /// Number of planes; zero for a degenerate range.
    #[must_use]
    pub fn depths(&self) -> u32 {
        self.depths
    }

    /// Position of plane `index`.
    #[must_use]
    pub fn depth(&self, index: u32) -> Position {
        self.lower_limit + self.depth_spacing * f64::from(index)
    }
}

/// What the engine is asked to acquire.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AcquisitionRequest {
    Frame(FrameAcquisitionSpec),
    Stack(StackAcquisitionSpec),
}

impl AcquisitionRequest {
    /// Frame settings shared by both request kinds.
    #[must_use]
    pub fn frame(&self) -> &FrameAcquisitionSpec {
        match self {
            AcquisitionRequest::Frame(spec) => spec,
            AcquisitionRequest::Stack(spec) => &spec.frame,
        }
    }

    /// Engine name of the acquisition kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            AcquisitionRequest::Frame(_) => "raster_frame",
            AcquisitionRequest::Stack(_) => "raster_stack",
        }
    }

    /// Buffers the request produces before it ends.
    #[must_use]
    pub fn buffers(&self) -> BufferCount {
        match self {
            AcquisitionRequest::Frame(spec) => spec.buffers_per_acquisition,
            AcquisitionRequest::Stack(spec) => BufferCount::Finite(spec.depths()),
        }
    }

    /// Total frames the request will produce, if bounded.
    #[must_use]
    pub fn total_frames(&self) -> Option<u64> {
        match self.buffers() {
            BufferCount::Finite(n) => Some(u64::from(n)),
            BufferCount::Unlimited => None,
        }
    }
}

/// The three capture buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Live view; frames are not logged and the acquisition never ends.
    Preview,
    /// Finite frame series, logged to disk.
    Series,
    /// Z-stack, logged to disk.
    Stack,
}

impl CaptureMode {
    pub const ALL: [CaptureMode; 3] = [CaptureMode::Preview, CaptureMode::Series, CaptureMode::Stack];

    /// Whether frames are sent to the logger.
    #[must_use]
    pub fn logs_frames(self) -> bool {
        !matches!(self, CaptureMode::Preview)
    }

    /// Button caption while idle.
    #[must_use]
    pub fn idle_label(self) -> &'static str {
        match self {
            CaptureMode::Preview => "PREVIEW",
            CaptureMode::Series => "SERIES",
            CaptureMode::Stack => "STACK",
        }
    }

    /// Button caption while running.
    #[must_use]
    pub fn running_label(self) -> &'static str {
        match self {
            CaptureMode::Preview => "STOP",
            CaptureMode::Series | CaptureMode::Stack => "ABORT",
        }
    }

    /// Request started by this button for the current panel settings.
    #[must_use]
    pub fn request(
        self,
        mut frame: FrameAcquisitionSpec,
        stack: &StackSpecModel,
    ) -> AcquisitionRequest {
        match self {
            CaptureMode::Preview => {
                frame.buffers_per_acquisition = BufferCount::Unlimited;
                AcquisitionRequest::Frame(frame)
            }
            CaptureMode::Series => AcquisitionRequest::Frame(frame),
            CaptureMode::Stack => {
                AcquisitionRequest::Stack(StackAcquisitionSpec::new(frame, stack))
            }
        }
    }
}

/// Result of pressing a capture button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureAction {
    Start(CaptureMode),
    Stop,
    /// The button is disabled while another mode runs.
    Ignored,
}

/// Mutual exclusion between the capture buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureControl {
    running: Option<CaptureMode>,
}

impl CaptureControl {
    /// Press the button for `mode`.
    ///
    /// An idle panel starts `mode`; pressing the running mode asks for a stop;
    /// pressing any other mode while one runs does nothing.
    pub fn toggle(&mut self, mode: CaptureMode) -> CaptureAction {
        match self.running {
            None => {
                self.running = Some(mode);
                CaptureAction::Start(mode)
            }
            Some(current) if current == mode => CaptureAction::Stop,
            Some(_) => CaptureAction::Ignored,
        }
    }

    /// Reset after the acquisition ended, whoever stopped it.
    pub fn stopped(&mut self) {
        self.running = None;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    #[must_use]
    pub fn running_mode(&self) -> Option<CaptureMode> {
        self.running
    }

    /// Whether the button for `mode` accepts presses.
    #[must_use]
    pub fn is_enabled(&self, mode: CaptureMode) -> bool {
        !matches!(self.running, Some(current) if current != mode)
    }

    /// Current caption of the button for `mode`.
    #[must_use]
    pub fn label(&self, mode: CaptureMode) -> &'static str {
        if self.running == Some(mode) {
            mode.running_label()
        } else {
            mode.idle_label()
        }
    }
}
