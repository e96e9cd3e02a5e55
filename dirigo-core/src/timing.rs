//! Line and frame rates implied by a frame acquisition request.

use crate::acquisition::FrameAcquisitionSpec;
use crate::units::{Frequency, Time};

/// Line period when the pixel clock paces the scan.
///
/// The fast axis spends `1 - fill_fraction` of every line outside the field of
/// view, so a line holds `round(pixels_per_line / fill_fraction)` pixel periods.
#[must_use]
pub fn line_period(spec: &FrameAcquisitionSpec, pixel_time: Time) -> Time {
    let periods = (f64::from(spec.pixels_per_line()) / spec.fill_fraction).round();
    pixel_time * periods
}

/// Lines acquired per second.
///
/// Point-scanned requests derive the rate from the pixel dwell time. Resonant
/// requests run at the fast scanner frequency, doubled when lines are
/// collected in both sweep directions.
#[must_use]
pub fn line_rate(spec: &FrameAcquisitionSpec, fast_scanner_frequency: Frequency) -> Frequency {
    match spec.pixel_time {
        Some(pixel_time) => Frequency::from_period(line_period(spec, pixel_time)),
        None if spec.bidirectional_scanning => fast_scanner_frequency * 2.0,
        None => fast_scanner_frequency,
    }
}

/// Frames acquired per second.
#[must_use]
pub fn frame_rate(spec: &FrameAcquisitionSpec, fast_scanner_frequency: Frequency) -> Frequency {
    line_rate(spec, fast_scanner_frequency) / f64::from(spec.lines_per_frame())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameSpecModel, ScanDirection};
    use approx::assert_relative_eq;

    const RESONANT: Frequency = Frequency::from_hz(7910.0);

    #[test]
    fn test_resonant_bidirectional_doubles_rate() {
        let spec = FrameSpecModel::default().generate_spec();
        assert_relative_eq!(line_rate(&spec, RESONANT).base(), 15820.0);
        assert_relative_eq!(frame_rate(&spec, RESONANT).base(), 79.1, epsilon = 1e-9);
    }

    #[test]
    fn test_resonant_unidirectional() {
        let mut model = FrameSpecModel::default();
        model.direction = ScanDirection::Unidirectional;
        let spec = model.generate_spec();
        assert_relative_eq!(line_rate(&spec, RESONANT).base(), 7910.0);
    }

    #[test]
    fn test_pixel_clocked_rate() {
        // 200 pixels at 0.8 fill gives 250 periods of 1 us per line.
        let spec = FrameSpecModel::with_pixel_time(Time::from_micros(1.0)).generate_spec();
        assert_relative_eq!(line_period(&spec, Time::from_micros(1.0)).base(), 250e-6, epsilon = 1e-15);
        assert_relative_eq!(line_rate(&spec, RESONANT).base(), 4000.0, epsilon = 1e-6);
        assert_relative_eq!(frame_rate(&spec, RESONANT).base(), 20.0, epsilon = 1e-9);
    }
}
