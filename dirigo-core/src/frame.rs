//! Frame settings: field of view, sampling and series length.
//!
//! Frame size and pixel size determine the array shape. With the square
//! constraints enabled, editing one axis mirrors the value onto the other.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::acquisition::{BufferCount, FrameAcquisitionSpec, DEFAULT_FLYBACK_PERIODS};
use crate::error::ValidationError;
use crate::form::FieldModel;
use crate::units::{Position, Time};

/// Fast-axis scan direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScanDirection {
    #[default]
    Bidirectional,
    Unidirectional,
}

impl ScanDirection {
    pub const ALL: [ScanDirection; 2] = [ScanDirection::Bidirectional, ScanDirection::Unidirectional];

    #[must_use]
    pub fn is_bidirectional(self) -> bool {
        self == ScanDirection::Bidirectional
    }
}

impl fmt::Display for ScanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanDirection::Bidirectional => write!(f, "Bidirectional"),
            ScanDirection::Unidirectional => write!(f, "Unidirectional"),
        }
    }
}

/// Editable fields of a [`FrameSpecModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameField {
    FrameWidth,
    FrameHeight,
    ShapeWidth,
    ShapeHeight,
    PixelWidth,
    PixelHeight,
    PixelTime,
    FillFraction,
    FramesPerSeries,
}

impl FrameField {
    /// Fields in panel order.
    pub const ALL: [FrameField; 9] = [
        FrameField::FrameWidth,
        FrameField::FrameHeight,
        FrameField::ShapeWidth,
        FrameField::ShapeHeight,
        FrameField::PixelWidth,
        FrameField::PixelHeight,
        FrameField::PixelTime,
        FrameField::FillFraction,
        FrameField::FramesPerSeries,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FrameField::FrameWidth => "Frame width:",
            FrameField::FrameHeight => "Frame height:",
            FrameField::ShapeWidth => "Shape width:",
            FrameField::ShapeHeight => "Shape height:",
            FrameField::PixelWidth => "Pixel width:",
            FrameField::PixelHeight => "Pixel height:",
            FrameField::PixelTime => "Pixel time:",
            FrameField::FillFraction => "Fill fraction:",
            FrameField::FramesPerSeries => "Frames/series:",
        }
    }
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().trim_end_matches(':'))
    }
}

/// Field of view and sampling for raster frame acquisitions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameSpecModel {
    pub direction: ScanDirection,
    frame_width: Position,
    frame_height: Position,
    pixel_width: Position,
    pixel_height: Position,
    /// Dwell time per pixel; `None` for resonant (line-clocked) scanning.
    pixel_time: Option<Time>,
    fill_fraction: f64,
    frames_per_series: u32,
    pub square_frame: bool,
    pub square_pixel: bool,
    shape: (u32, u32),
}

impl Default for FrameSpecModel {
    fn default() -> Self {
        let mut model = Self {
            direction: ScanDirection::Bidirectional,
            frame_width: Position::from_micrometers(400.0),
            frame_height: Position::from_micrometers(400.0),
            pixel_width: Position::from_micrometers(2.0),
            pixel_height: Position::from_micrometers(2.0),
            pixel_time: None,
            fill_fraction: 0.8,
            frames_per_series: 16,
            square_frame: true,
            square_pixel: true,
            shape: (1, 1),
        };
        model.recompute_shape();
        model
    }
}

fn positive(field: &'static str, value: Position) -> Result<Position, ValidationError> {
    if value.base() > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::out_of_range(field, value, "must be > 0"))
    }
}

fn parse_count(field: &'static str, raw: &str) -> Result<u32, ValidationError> {
    let text = raw.trim();
    let value: i64 = text
        .parse()
        .map_err(|_| ValidationError::MalformedNumber(text.to_string()))?;
    u32::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| ValidationError::out_of_range(field, value, "must be an integer >= 1"))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_ratio(numerator: Position, denominator: Position) -> u32 {
    let ratio = (numerator / denominator).round();
    if ratio >= 1.0 {
        ratio.min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

impl FrameSpecModel {
    /// Model for a point-scanned (dwell-time) system.
    #[must_use]
    pub fn with_pixel_time(pixel_time: Time) -> Self {
        Self {
            pixel_time: Some(pixel_time),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn frame_width(&self) -> Position {
        self.frame_width
    }

    #[must_use]
    pub fn frame_height(&self) -> Position {
        self.frame_height
    }

    #[must_use]
    pub fn pixel_width(&self) -> Position {
        self.pixel_width
    }

    #[must_use]
    pub fn pixel_height(&self) -> Position {
        self.pixel_height
    }

    #[must_use]
    pub fn pixel_time(&self) -> Option<Time> {
        self.pixel_time
    }

    #[must_use]
    pub fn fill_fraction(&self) -> f64 {
        self.fill_fraction
    }

    #[must_use]
    pub fn frames_per_series(&self) -> u32 {
        self.frames_per_series
    }

    /// Array shape as `(width, height)` in pixels.
    #[must_use]
    pub fn shape(&self) -> (u32, u32) {
        self.shape
    }

    /// `shape = round(frame / pixel)` per axis, at least one pixel.
    pub fn recompute_shape(&mut self) {
        self.shape = (
            round_ratio(self.frame_width, self.pixel_width),
            round_ratio(self.frame_height, self.pixel_height),
        );
    }

    fn store_frame_width(&mut self, value: Position) {
        self.frame_width = value;
        if self.square_frame {
            self.frame_height = value;
        }
        self.recompute_shape();
    }

    fn store_frame_height(&mut self, value: Position) {
        self.frame_height = value;
        if self.square_frame {
            self.frame_width = value;
        }
        self.recompute_shape();
    }

    fn store_pixel_width(&mut self, value: Position) {
        self.pixel_width = value;
        if self.square_pixel {
            self.pixel_height = value;
        }
        self.recompute_shape();
    }

    fn store_pixel_height(&mut self, value: Position) {
        self.pixel_height = value;
        if self.square_pixel {
            self.pixel_width = value;
        }
        self.recompute_shape();
    }

    /// Builds the acquisition request for the current settings.
    #[must_use]
    pub fn generate_spec(&self) -> FrameAcquisitionSpec {
        FrameAcquisitionSpec {
            bidirectional_scanning: self.direction.is_bidirectional(),
            line_width: self.frame_width,
            frame_height: self.frame_height,
            pixel_time: self.pixel_time,
            pixel_width: self.pixel_width,
            pixel_height: self.pixel_height,
            fill_fraction: self.fill_fraction,
            buffers_per_acquisition: BufferCount::Finite(self.frames_per_series),
            flyback_periods: DEFAULT_FLYBACK_PERIODS,
        }
    }
}

impl FieldModel for FrameSpecModel {
    type Field = FrameField;

    fn apply_edit(&mut self, field: FrameField, raw: &str) -> Result<(), ValidationError> {
        match field {
            FrameField::FrameWidth => {
                let value = positive("frame width", Position::parse(raw)?)?;
                self.store_frame_width(value);
            }
            FrameField::FrameHeight => {
                let value = positive("frame height", Position::parse(raw)?)?;
                self.store_frame_height(value);
            }
            FrameField::PixelWidth => {
                let value = positive("pixel width", Position::parse(raw)?)?;
                self.store_pixel_width(value);
            }
            FrameField::PixelHeight => {
                let value = positive("pixel height", Position::parse(raw)?)?;
                self.store_pixel_height(value);
            }
            FrameField::ShapeWidth => {
                let width = parse_count("shape width", raw)?;
                self.store_pixel_width(self.frame_width / f64::from(width));
            }
            FrameField::ShapeHeight => {
                let height = parse_count("shape height", raw)?;
                self.store_pixel_height(self.frame_height / f64::from(height));
            }
            FrameField::PixelTime => {
                let value = Time::parse(raw)?;
                if value.base() <= 0.0 {
                    return Err(ValidationError::out_of_range(
                        "pixel time",
                        value,
                        "must be > 0",
                    ));
                }
                self.pixel_time = Some(value);
            }
            FrameField::FillFraction => {
                let text = raw.trim();
                let value: f64 = text
                    .parse()
                    .map_err(|_| ValidationError::MalformedNumber(text.to_string()))?;
                if !(value > 0.0 && value <= 1.0) {
                    return Err(ValidationError::out_of_range(
                        "fill fraction",
                        value,
                        "must be in (0, 1]",
                    ));
                }
                self.fill_fraction = value;
            }
            FrameField::FramesPerSeries => {
                self.frames_per_series = parse_count("frames per series", raw)?;
            }
        }
        Ok(())
    }

    fn field_text(&self, field: FrameField) -> String {
        match field {
            FrameField::FrameWidth => self.frame_width.to_string(),
            FrameField::FrameHeight => self.frame_height.to_string(),
            FrameField::ShapeWidth => self.shape.0.to_string(),
            FrameField::ShapeHeight => self.shape.1.to_string(),
            FrameField::PixelWidth => self.pixel_width.to_string(),
            FrameField::PixelHeight => self.pixel_height.to_string(),
            FrameField::PixelTime => self.pixel_time.map(|t| t.to_string()).unwrap_or_default(),
            FrameField::FillFraction => self.fill_fraction.to_string(),
            FrameField::FramesPerSeries => self.frames_per_series.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_shape() {
        let model = FrameSpecModel::default();
        assert_eq!(model.shape(), (200, 200));
    }

    #[test]
    fn test_square_frame_mirrors_width() {
        let mut model = FrameSpecModel::default();
        model.apply_edit(FrameField::FrameWidth, "300 um").unwrap();
        assert_eq!(model.frame_height(), model.frame_width());
        assert_eq!(model.shape(), (150, 150));
    }

    #[test]
    fn test_non_square_frame() {
        let mut model = FrameSpecModel::default();
        model.square_frame = false;
        model.apply_edit(FrameField::FrameHeight, "100 um").unwrap();
        assert_relative_eq!(model.frame_width().micrometers(), 400.0, epsilon = 1e-9);
        assert_eq!(model.shape(), (200, 50));
    }

    #[test]
    fn test_shape_edit_sets_pixel_size() {
        let mut model = FrameSpecModel::default();
        model.apply_edit(FrameField::ShapeWidth, "400").unwrap();
        assert_relative_eq!(model.pixel_width().micrometers(), 1.0, epsilon = 1e-9);
        // Square pixels carry the new size to the other axis.
        assert_relative_eq!(model.pixel_height().micrometers(), 1.0, epsilon = 1e-9);
        assert_eq!(model.shape(), (400, 400));
    }

    #[test]
    fn test_rejects_out_of_domain() {
        let mut model = FrameSpecModel::default();
        assert!(model.apply_edit(FrameField::ShapeWidth, "0").is_err());
        assert!(model.apply_edit(FrameField::PixelWidth, "-1 um").is_err());
        assert!(model.apply_edit(FrameField::FillFraction, "1.5").is_err());
        assert!(model.apply_edit(FrameField::FillFraction, "0").is_err());
        assert!(model.apply_edit(FrameField::FramesPerSeries, "-2").is_err());
        assert!(model.apply_edit(FrameField::PixelTime, "0 us").is_err());
        assert_eq!(model, FrameSpecModel::default());
    }

    #[test]
    fn test_generate_spec() {
        let model = FrameSpecModel::with_pixel_time(Time::from_micros(1.0));
        let spec = model.generate_spec();
        assert!(spec.bidirectional_scanning);
        assert_eq!(spec.pixels_per_line(), 200);
        assert_eq!(spec.lines_per_frame(), 200);
        assert_eq!(spec.buffers_per_acquisition, BufferCount::Finite(16));
        assert_eq!(spec.flyback_periods, DEFAULT_FLYBACK_PERIODS);
    }
}
