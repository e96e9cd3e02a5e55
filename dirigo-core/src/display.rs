//! Display settings: colour vectors, per-channel display ranges, gamma and
//! frame averaging, plus the colour mapping applied by display workers.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{RawFrame, RgbFrame};
use crate::error::ValidationError;

/// Colour a channel is painted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColorVector {
    Gray,
    Red,
    Green,
    #[default]
    Blue,
    Cyan,
    Magenta,
    Yellow,
}

impl ColorVector {
    pub const ALL: [ColorVector; 7] = [
        ColorVector::Gray,
        ColorVector::Red,
        ColorVector::Green,
        ColorVector::Blue,
        ColorVector::Cyan,
        ColorVector::Magenta,
        ColorVector::Yellow,
    ];

    /// RGB weights in `[0, 1]`.
    #[must_use]
    pub fn rgb(self) -> [f32; 3] {
        match self {
            ColorVector::Gray => [1.0, 1.0, 1.0],
            ColorVector::Red => [1.0, 0.0, 0.0],
            ColorVector::Green => [0.0, 1.0, 0.0],
            ColorVector::Blue => [0.0, 0.0, 1.0],
            ColorVector::Cyan => [0.0, 1.0, 1.0],
            ColorVector::Magenta => [1.0, 0.0, 1.0],
            ColorVector::Yellow => [1.0, 1.0, 0.0],
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ColorVector::Gray => "Gray",
            ColorVector::Red => "Red",
            ColorVector::Green => "Green",
            ColorVector::Blue => "Blue",
            ColorVector::Cyan => "Cyan",
            ColorVector::Magenta => "Magenta",
            ColorVector::Yellow => "Yellow",
        }
    }
}

impl fmt::Display for ColorVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorVector {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ValidationError::out_of_range("color vector", name, "unknown name"))
    }
}

/// Inclusive range of values a processor emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataRange {
    pub min: i32,
    pub max: i32,
}

impl Default for DataRange {
    /// Full unsigned 16-bit range.
    fn default() -> Self {
        Self {
            min: 0,
            max: i32::from(u16::MAX),
        }
    }
}

impl DataRange {
    #[must_use]
    pub fn clamp(self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }
}

/// Display settings of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelDisplay {
    pub enabled: bool,
    pub color: ColorVector,
    pub display_min: i32,
    pub display_max: i32,
}

impl ChannelDisplay {
    /// Enabled, blue, spanning the whole data range.
    #[must_use]
    pub fn full_range(range: DataRange) -> Self {
        Self {
            enabled: true,
            color: ColorVector::default(),
            display_min: range.min,
            display_max: range.max,
        }
    }

    /// Parses a min entry and clamps it into `range`.
    ///
    /// # Errors
    /// Rejects text that is not an integer; the previous value is kept.
    pub fn set_min_text(&mut self, raw: &str, range: DataRange) -> Result<i32, ValidationError> {
        self.display_min = parse_level(raw, range)?;
        Ok(self.display_min)
    }

    /// Parses a max entry and clamps it into `range`.
    ///
    /// # Errors
    /// Rejects text that is not an integer; the previous value is kept.
    pub fn set_max_text(&mut self, raw: &str, range: DataRange) -> Result<i32, ValidationError> {
        self.display_max = parse_level(raw, range)?;
        Ok(self.display_max)
    }

    /// Clamps both limits into `range`.
    #[must_use]
    pub fn clamped(self, range: DataRange) -> Self {
        Self {
            display_min: range.clamp(self.display_min),
            display_max: range.clamp(self.display_max),
            ..self
        }
    }
}

fn parse_level(raw: &str, range: DataRange) -> Result<i32, ValidationError> {
    let text = raw.trim();
    let value: i64 = text
        .parse()
        .map_err(|_| ValidationError::MalformedNumber(text.to_string()))?;
    let clamped = value.clamp(i64::from(range.min), i64::from(range.max));
    Ok(i32::try_from(clamped).unwrap_or(range.max))
}

/// Display transfer exponent, `0 < gamma <= 10`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(try_from = "f64", into = "f64"))]
pub struct Gamma(f64);

impl Gamma {
    pub const MAX: f64 = 10.0;

    /// # Errors
    /// Rejects values outside `(0, 10]`.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if value > 0.0 && value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(ValidationError::out_of_range("gamma", value, "must be in (0, 10]"))
        }
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Gamma {
    fn default() -> Self {
        Self(1.0)
    }
}

impl TryFrom<f64> for Gamma {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Gamma> for f64 {
    fn from(gamma: Gamma) -> Self {
        gamma.0
    }
}

impl FromStr for Gamma {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let value: f64 = text
            .parse()
            .map_err(|_| ValidationError::MalformedNumber(text.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for Gamma {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Rolling-average window length, `0 < n < 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(try_from = "u32", into = "u32"))]
pub struct FrameAverage(u32);

impl FrameAverage {
    pub const MAX_EXCLUSIVE: u32 = 100;

    /// # Errors
    /// Rejects values outside `1..100`.
    pub fn new(frames: u32) -> Result<Self, ValidationError> {
        if frames > 0 && frames < Self::MAX_EXCLUSIVE {
            Ok(Self(frames))
        } else {
            Err(ValidationError::out_of_range(
                "frames averaged",
                frames,
                "must be in 1..=99",
            ))
        }
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for FrameAverage {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u32> for FrameAverage {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FrameAverage> for u32 {
    fn from(frames: FrameAverage) -> Self {
        frames.0
    }
}

impl FromStr for FrameAverage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let value: i64 = text
            .parse()
            .map_err(|_| ValidationError::MalformedNumber(text.to_string()))?;
        u32::try_from(value)
            .map_err(|_| ValidationError::out_of_range("frames averaged", value, "must be in 1..=99"))
            .and_then(Self::new)
    }
}

impl fmt::Display for FrameAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live channel settings shared between a display worker and the panel.
#[derive(Debug, Clone)]
pub struct DisplayChannelHandle(Arc<Mutex<ChannelDisplay>>);

impl DisplayChannelHandle {
    #[must_use]
    pub fn new(settings: ChannelDisplay) -> Self {
        Self(Arc::new(Mutex::new(settings)))
    }

    #[must_use]
    pub fn get(&self) -> ChannelDisplay {
        *self.lock()
    }

    pub fn set(&self, settings: ChannelDisplay) {
        *self.lock() = settings;
    }

    pub fn update(&self, f: impl FnOnce(&mut ChannelDisplay)) {
        f(&mut self.lock());
    }

    fn lock(&self) -> MutexGuard<'_, ChannelDisplay> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Panel-side state of one channel, optionally linked to a display worker.
///
/// While detached, edits change only the panel's own copy. Attaching pushes
/// the panel's copy to the worker; edits then go to both.
#[derive(Debug, Clone)]
pub struct ChannelControl {
    index: usize,
    settings: ChannelDisplay,
    available: bool,
    handle: Option<DisplayChannelHandle>,
}

impl ChannelControl {
    #[must_use]
    pub fn new(index: usize, range: DataRange) -> Self {
        Self {
            index,
            settings: ChannelDisplay::full_range(range),
            available: true,
            handle: None,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn settings(&self) -> ChannelDisplay {
        self.settings
    }

    /// Whether the channel's widgets accept input.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// Links to a worker channel and pushes the panel state to it.
    pub fn attach(&mut self, handle: DisplayChannelHandle) {
        handle.set(self.settings);
        self.handle = Some(handle);
        self.available = true;
    }

    /// Unlinks from the worker, keeping the widgets usable.
    pub fn detach(&mut self) {
        self.handle = None;
    }

    /// Marks the channel as disabled on the digitizer: unchecked, greyed out
    /// and unlinked.
    pub fn disable(&mut self) {
        self.handle = None;
        self.available = false;
        self.settings.enabled = false;
    }

    /// Replaces the panel state, e.g. from restored preferences.
    pub fn restore(&mut self, settings: ChannelDisplay, range: DataRange) {
        self.apply(|s| *s = settings.clamped(range));
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.apply(|s| s.enabled = enabled);
    }

    pub fn set_color(&mut self, color: ColorVector) {
        self.apply(|s| s.color = color);
    }

    pub fn set_min(&mut self, value: i32, range: DataRange) {
        self.apply(|s| s.display_min = range.clamp(value));
    }

    pub fn set_max(&mut self, value: i32, range: DataRange) {
        self.apply(|s| s.display_max = range.clamp(value));
    }

    /// # Errors
    /// Rejects non-integer text; the previous value is kept.
    pub fn set_min_text(&mut self, raw: &str, range: DataRange) -> Result<i32, ValidationError> {
        let value = self.settings.set_min_text(raw, range)?;
        self.push();
        Ok(value)
    }

    /// # Errors
    /// Rejects non-integer text; the previous value is kept.
    pub fn set_max_text(&mut self, raw: &str, range: DataRange) -> Result<i32, ValidationError> {
        let value = self.settings.set_max_text(raw, range)?;
        self.push();
        Ok(value)
    }

    fn apply(&mut self, f: impl FnOnce(&mut ChannelDisplay)) {
        f(&mut self.settings);
        self.push();
    }

    fn push(&self) {
        if let Some(handle) = &self.handle {
            handle.set(self.settings);
        }
    }
}

/// Links channel panels to a display worker's channels.
///
/// The worker only has channels for enabled digitizer channels, so its index
/// skips disabled ones. Panels for disabled channels are disabled.
pub fn link_channels(
    controls: &mut [ChannelControl],
    digitizer_enabled: &[bool],
    handles: &[DisplayChannelHandle],
) {
    let mut handles = handles.iter();
    for (control, &enabled) in controls.iter_mut().zip(digitizer_enabled) {
        if enabled {
            match handles.next() {
                Some(handle) => control.attach(handle.clone()),
                None => control.detach(),
            }
        } else {
            control.disable();
        }
    }
}

/// Detaches every channel panel.
pub fn unlink_channels(controls: &mut [ChannelControl]) {
    for control in controls {
        control.detach();
    }
}

/// Per-channel lookup from raw level to colour contribution.
///
/// `v' = clamp((v - min) / (max - min), 0, 1)^gamma`. A channel whose max is
/// not above its min thresholds at min.
#[allow(clippy::cast_possible_truncation)]
fn transfer(value: u16, settings: &ChannelDisplay, gamma: f64) -> f32 {
    let min = f64::from(settings.display_min);
    let max = f64::from(settings.display_max);
    let v = f64::from(value);
    let normalised = if max > min {
        ((v - min) / (max - min)).clamp(0.0, 1.0)
    } else if v > min {
        1.0
    } else {
        0.0
    };
    normalised.powf(gamma) as f32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Renders the enabled channels of `frame` into an RGB image.
///
/// `channels` is matched to the frame's planes by position; extra settings
/// or extra planes are ignored.
#[must_use]
pub fn render_rgb(frame: &RawFrame, channels: &[ChannelDisplay], gamma: Gamma) -> RgbFrame {
    let width = frame.width as usize;
    let mut out = RgbFrame::black(frame.width, frame.height);
    let active: Vec<(&[u16], ChannelDisplay)> = frame
        .channels
        .iter()
        .zip(channels)
        .filter(|(_, s)| s.enabled)
        .map(|(plane, s)| (plane.as_slice(), *s))
        .collect();
    if active.is_empty() || width == 0 {
        return out;
    }

    let g = gamma.value();
    out.pixels
        .par_chunks_mut(width * 3)
        .enumerate()
        .for_each(|(row, line)| {
            for (x, rgb) in line.chunks_exact_mut(3).enumerate() {
                let i = row * width + x;
                let mut acc = [0.0_f32; 3];
                for (plane, settings) in &active {
                    let Some(&v) = plane.get(i) else { continue };
                    let t = transfer(v, settings, g);
                    let weights = settings.color.rgb();
                    for (a, w) in acc.iter_mut().zip(weights) {
                        *a += t * w;
                    }
                }
                for (dst, a) in rgb.iter_mut().zip(acc) {
                    *dst = to_u8(a);
                }
            }
        });
    out
}
