//! Unit-bearing scalar quantities.
//!
//! Values are stored in SI base units. Text parses as a number followed by an
//! optional space and a unit suffix (`"25 um"`, `"-200μm"`, `"1.5e3 Hz"`), and
//! formats with the SI prefix that keeps the magnitude in `[1, 1000)`.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Significant digits printed by `Display`.
const SIGNIFICANT_DIGITS: i32 = 6;

fn parse_quantity(
    text: &str,
    quantity: &'static str,
    units: &[(&str, f64)],
) -> Result<f64, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::MalformedNumber(String::new()));
    }

    // Longest numeric prefix wins so that `1e-6 m` keeps its exponent.
    let ends = text
        .char_indices()
        .map(|(i, _)| i)
        .skip(1)
        .chain(std::iter::once(text.len()));
    let mut ends: Vec<usize> = ends.collect();
    ends.reverse();

    for end in ends {
        let (number, unit) = text.split_at(end);
        let Ok(value) = number.trim_end().parse::<f64>() else {
            continue;
        };
        if !value.is_finite() {
            return Err(ValidationError::MalformedNumber(text.to_string()));
        }
        let unit = unit.trim();
        if unit.is_empty() {
            return Err(ValidationError::MissingUnit(text.to_string()));
        }
        return units
            .iter()
            .find(|(suffix, _)| *suffix == unit)
            .map(|(_, factor)| value * factor)
            .ok_or_else(|| ValidationError::UnknownUnit {
                quantity,
                unit: unit.to_string(),
            });
    }

    Err(ValidationError::MalformedNumber(text.to_string()))
}

/// Format `value` with at most six significant digits, trailing zeros trimmed.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn format_significant(value: f64) -> String {
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (SIGNIFICANT_DIGITS - 1 - magnitude).max(0) as usize;
    let text = format!("{value:.decimals$}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.');
        if trimmed == "-0" {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        text
    }
}

fn format_quantity(
    f: &mut fmt::Formatter<'_>,
    value: f64,
    units: &[(f64, &str)],
    base: &str,
) -> fmt::Result {
    if value == 0.0 {
        return write!(f, "0 {base}");
    }
    let magnitude = value.abs();
    let (factor, suffix) = units
        .iter()
        .find(|(factor, _)| magnitude >= factor * (1.0 - 1e-9))
        .or_else(|| units.last())
        .copied()
        .unwrap_or((1.0, base));
    write!(f, "{} {}", format_significant(value / factor), suffix)
}

macro_rules! quantity {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal, base = $base:literal,
        parse = [$(($psuffix:literal, $pfactor:expr)),+ $(,)?],
        display = [$(($dfactor:expr, $dsuffix:literal)),+ $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
        pub struct $name(f64);

        impl $name {
            const PARSE_UNITS: &'static [(&'static str, f64)] = &[$(($psuffix, $pfactor)),+];
            const DISPLAY_UNITS: &'static [(f64, &'static str)] = &[$(($dfactor, $dsuffix)),+];

            /// Creates a value from SI base units.
            #[must_use]
            pub const fn from_base(value: f64) -> Self {
                Self(value)
            }

            /// Returns the value in SI base units.
            #[must_use]
            pub const fn base(self) -> f64 {
                self.0
            }

            /// Absolute value.
            #[must_use]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// Parses text such as `"25 um"`.
            ///
            /// # Errors
            /// Returns a [`ValidationError`] for malformed numbers, missing or
            /// unknown units, and non-finite values.
            pub fn parse(text: &str) -> Result<Self, ValidationError> {
                parse_quantity(text, $label, Self::PARSE_UNITS).map(Self)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                format_quantity(f, self.0, Self::DISPLAY_UNITS, $base)
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;

            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Mul<$name> for f64 {
            type Output = $name;

            fn mul(self, rhs: $name) -> $name {
                $name(self * rhs.0)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;

            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }

        impl Div for $name {
            type Output = f64;

            fn div(self, rhs: Self) -> f64 {
                self.0 / rhs.0
            }
        }
    };
}

quantity!(
    /// Linear position or distance, stored in metres.
    Position, "position", base = "m",
    parse = [("m", 1.0), ("mm", 1e-3), ("um", 1e-6), ("μm", 1e-6), ("µm", 1e-6), ("nm", 1e-9)],
    display = [(1.0, "m"), (1e-3, "mm"), (1e-6, "μm"), (1e-9, "nm")]
);

quantity!(
    /// Duration, stored in seconds.
    Time, "time", base = "s",
    parse = [
        ("s", 1.0), ("ms", 1e-3), ("us", 1e-6), ("μs", 1e-6), ("µs", 1e-6),
        ("ns", 1e-9), ("ps", 1e-12),
    ],
    display = [(1.0, "s"), (1e-3, "ms"), (1e-6, "μs"), (1e-9, "ns"), (1e-12, "ps")]
);

quantity!(
    /// Frequency, stored in hertz.
    Frequency, "frequency", base = "Hz",
    parse = [("Hz", 1.0), ("kHz", 1e3), ("MHz", 1e6), ("GHz", 1e9)],
    display = [(1e9, "GHz"), (1e6, "MHz"), (1e3, "kHz"), (1.0, "Hz")]
);

quantity!(
    /// Linear velocity, stored in metres per second.
    Velocity, "velocity", base = "m/s",
    parse = [
        ("m/s", 1.0), ("mm/s", 1e-3), ("um/s", 1e-6), ("μm/s", 1e-6), ("µm/s", 1e-6),
        ("nm/s", 1e-9),
    ],
    display = [(1.0, "m/s"), (1e-3, "mm/s"), (1e-6, "μm/s"), (1e-9, "nm/s")]
);

impl Position {
    /// Creates a position from micrometres.
    #[must_use]
    pub fn from_micrometers(um: f64) -> Self {
        Self(um * 1e-6)
    }

    /// Creates a position from millimetres.
    #[must_use]
    pub fn from_millimeters(mm: f64) -> Self {
        Self(mm * 1e-3)
    }

    /// Value in micrometres.
    #[must_use]
    pub fn micrometers(self) -> f64 {
        self.0 * 1e6
    }
}

impl Time {
    /// Creates a duration from microseconds.
    #[must_use]
    pub fn from_micros(us: f64) -> Self {
        Self(us * 1e-6)
    }

    /// Converts to a [`std::time::Duration`], saturating at both ends.
    #[must_use]
    pub fn to_duration(self) -> std::time::Duration {
        std::time::Duration::try_from_secs_f64(self.0.max(0.0))
            .unwrap_or(std::time::Duration::MAX)
    }
}

impl Frequency {
    /// Creates a frequency from hertz.
    #[must_use]
    pub const fn from_hz(hz: f64) -> Self {
        Self(hz)
    }

    /// Frequency of a periodic event with the given period.
    #[must_use]
    pub fn from_period(period: Time) -> Self {
        Self(1.0 / period.base())
    }

    /// Period of one cycle.
    #[must_use]
    pub fn period(self) -> Time {
        Time::from_base(1.0 / self.0)
    }
}

impl Velocity {
    /// Creates a velocity from millimetres per second.
    #[must_use]
    pub fn from_mm_per_s(mm_s: f64) -> Self {
        Self(mm_s * 1e-3)
    }

    /// Distance covered in `dt`.
    #[must_use]
    pub fn distance(self, dt: Time) -> Position {
        Position::from_base(self.0 * dt.base())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_with_and_without_space() {
        assert_relative_eq!(Position::parse("25 um").unwrap().base(), 25e-6);
        assert_relative_eq!(Position::parse("25um").unwrap().base(), 25e-6);
        assert_relative_eq!(Position::parse("-200 μm").unwrap().base(), -200e-6);
        assert_relative_eq!(Position::parse("  1.5 mm ").unwrap().base(), 1.5e-3);
    }

    #[test]
    fn test_parse_exponent() {
        assert_relative_eq!(Position::parse("1e-6 m").unwrap().base(), 1e-6);
        assert_relative_eq!(Frequency::parse("1.5e3 Hz").unwrap().base(), 1500.0);
    }

    #[test]
    fn test_parse_micro_sign_variants() {
        let greek = Time::parse("2 μs").unwrap();
        let micro = Time::parse("2 µs").unwrap();
        let ascii = Time::parse("2 us").unwrap();
        assert_eq!(greek, micro);
        assert_eq!(greek, ascii);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            Position::parse(""),
            Err(ValidationError::MalformedNumber(_))
        ));
        assert!(matches!(
            Position::parse("abc"),
            Err(ValidationError::MalformedNumber(_))
        ));
        assert!(matches!(
            Position::parse("25"),
            Err(ValidationError::MissingUnit(_))
        ));
        assert!(matches!(
            Position::parse("25 Hz"),
            Err(ValidationError::UnknownUnit { .. })
        ));
        assert!(matches!(
            Position::parse("inf m"),
            Err(ValidationError::MalformedNumber(_))
        ));
    }

    #[test]
    fn test_display_picks_prefix() {
        assert_eq!(Position::from_micrometers(25.0).to_string(), "25 μm");
        assert_eq!(Position::from_micrometers(-200.0).to_string(), "-200 μm");
        assert_eq!(Position::from_millimeters(1.5).to_string(), "1.5 mm");
        assert_eq!(Frequency::from_hz(12_500.0).to_string(), "12.5 kHz");
        assert_eq!(Time::from_micros(0.5).to_string(), "500 ns");
        assert_eq!(Position::default().to_string(), "0 m");
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["25 μm", "12.5 kHz", "-3.2 mm", "750 ns"] {
            let shown = match text {
                t if t.ends_with("Hz") => Frequency::parse(t).unwrap().to_string(),
                t if t.ends_with('s') => Time::parse(t).unwrap().to_string(),
                t => Position::parse(t).unwrap().to_string(),
            };
            assert_eq!(shown, text);
        }
    }

    #[test]
    fn test_arithmetic() {
        let lower = Position::from_micrometers(-200.0);
        let upper = Position::from_micrometers(100.0);
        let range = upper - lower;
        assert_relative_eq!(range.micrometers(), 300.0, epsilon = 1e-9);
        assert_relative_eq!(range / Position::from_micrometers(25.0), 12.0, epsilon = 1e-12);
        assert_relative_eq!((range / 3.0).micrometers(), 100.0, epsilon = 1e-9);
        assert_eq!(-lower, Position::from_micrometers(200.0));
    }

    #[test]
    fn test_frequency_period() {
        let f = Frequency::from_period(Time::from_micros(100.0));
        assert_relative_eq!(f.base(), 10_000.0, epsilon = 1e-6);
        assert_relative_eq!(f.period().base(), 100e-6, epsilon = 1e-15);
    }

    #[test]
    fn test_velocity_distance() {
        let v = Velocity::from_mm_per_s(2.0);
        let d = v.distance(Time::from_base(0.5));
        assert_relative_eq!(d.base(), 1e-3, epsilon = 1e-15);
    }
}
