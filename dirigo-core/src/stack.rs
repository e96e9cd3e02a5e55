//! Z-stack plan: lower/upper bounds, plane spacing and depth count.
//!
//! Editing a bound or the spacing recomputes the depth count from the
//! (unchanged) spacing. Editing the depth count recomputes the spacing. The
//! spacing is therefore authoritative except for the one edit where the user
//! types a depth count, and alternating edits can drift through the floor in
//! [`StackSpecModel::recompute_depths`].

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::form::FieldModel;
use crate::units::Position;

/// Editable fields of a [`StackSpecModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackField {
    Lower,
    Upper,
    Spacing,
    Depths,
}

impl StackField {
    /// All fields in panel order.
    pub const ALL: [StackField; 4] = [
        StackField::Lower,
        StackField::Upper,
        StackField::Spacing,
        StackField::Depths,
    ];

    /// Short label shown next to the entry.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StackField::Lower => "Lower:",
            StackField::Upper => "Upper:",
            StackField::Spacing => "Spacing:",
            StackField::Depths => "Depths:",
        }
    }
}

impl fmt::Display for StackField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().trim_end_matches(':'))
    }
}

/// Bounds, spacing and plane count of a stack acquisition.
///
/// `upper >= lower` is not enforced. A zero range gives one plane and a
/// negative range gives a degenerate (zero or negative) depth count.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StackSpecModel {
    lower: Position,
    upper: Position,
    spacing: Position,
    depths: i64,
}

impl Default for StackSpecModel {
    fn default() -> Self {
        let mut model = Self {
            lower: Position::from_micrometers(-200.0),
            upper: Position::from_micrometers(100.0),
            spacing: Position::from_micrometers(25.0),
            depths: 1,
        };
        model.recompute_depths();
        model
    }
}

impl StackSpecModel {
    /// Builds a model and derives `depths` from the spacing.
    ///
    /// # Errors
    /// Returns [`ValidationError::OutOfRange`] if `spacing <= 0`.
    pub fn new(
        lower: Position,
        upper: Position,
        spacing: Position,
    ) -> Result<Self, ValidationError> {
        let mut model = Self {
            lower,
            upper,
            spacing: Position::default(),
            depths: 1,
        };
        model.set_spacing(spacing)?;
        model.recompute_depths();
        Ok(model)
    }

    #[must_use]
    pub fn lower(&self) -> Position {
        self.lower
    }

    #[must_use]
    pub fn upper(&self) -> Position {
        self.upper
    }

    #[must_use]
    pub fn spacing(&self) -> Position {
        self.spacing
    }

    #[must_use]
    pub fn depths(&self) -> i64 {
        self.depths
    }

    /// `upper - lower`.
    #[must_use]
    pub fn range(&self) -> Position {
        self.upper - self.lower
    }

    pub fn set_lower(&mut self, lower: Position) {
        self.lower = lower;
    }

    pub fn set_upper(&mut self, upper: Position) {
        self.upper = upper;
    }

    /// # Errors
    /// Rejects non-positive spacing.
    pub fn set_spacing(&mut self, spacing: Position) -> Result<(), ValidationError> {
        if spacing.base() > 0.0 {
            self.spacing = spacing;
            Ok(())
        } else {
            Err(ValidationError::out_of_range(
                "spacing",
                spacing,
                "must be > 0",
            ))
        }
    }

    /// # Errors
    /// Rejects depth counts below one.
    pub fn set_depths(&mut self, depths: i64) -> Result<(), ValidationError> {
        if depths >= 1 {
            self.depths = depths;
            Ok(())
        } else {
            Err(ValidationError::out_of_range(
                "depths",
                depths,
                "must be an integer >= 1",
            ))
        }
    }

    /// `depths = floor(range / spacing) + 1`, counting both endpoints.
    ///
    /// The float-to-int cast saturates, so an unbounded ratio pins the count
    /// at the integer limits instead of overflowing.
    #[allow(clippy::cast_possible_truncation)]
    pub fn recompute_depths(&mut self) {
        self.depths = ((self.range() / self.spacing).floor() as i64).saturating_add(1);
    }

    /// `spacing = range / (depths - 1)`; a single-plane stack keeps its spacing.
    ///
    /// # Errors
    /// Rejects a depth count that would need a zero or negative spacing,
    /// which happens when `upper <= lower`. The spacing is left unchanged.
    #[allow(clippy::cast_precision_loss)]
    pub fn recompute_spacing(&mut self) -> Result<(), ValidationError> {
        if self.depths <= 1 {
            return Ok(());
        }
        let spacing = self.range() / (self.depths - 1) as f64;
        if spacing.base() > 0.0 && spacing.base().is_finite() {
            self.spacing = spacing;
            Ok(())
        } else {
            Err(ValidationError::out_of_range(
                "depths",
                self.depths,
                "more than one plane needs upper > lower",
            ))
        }
    }

    /// Position of plane `index`, counting up from `lower`.
    #[must_use]
    pub fn depth(&self, index: u32) -> Position {
        self.lower + self.spacing * f64::from(index)
    }
}

impl FieldModel for StackSpecModel {
    type Field = StackField;

    fn apply_edit(&mut self, field: StackField, raw: &str) -> Result<(), ValidationError> {
        match field {
            StackField::Depths => {
                let text = raw.trim();
                let depths: i64 = text
                    .parse()
                    .map_err(|_| ValidationError::MalformedNumber(text.to_string()))?;
                self.set_depths(depths)?;
                self.recompute_spacing()?;
            }
            StackField::Lower => {
                self.set_lower(Position::parse(raw)?);
                self.recompute_depths();
            }
            StackField::Upper => {
                self.set_upper(Position::parse(raw)?);
                self.recompute_depths();
            }
            StackField::Spacing => {
                self.set_spacing(Position::parse(raw)?)?;
                self.recompute_depths();
            }
        }
        Ok(())
    }

    fn field_text(&self, field: StackField) -> String {
        match field {
            StackField::Lower => self.lower.to_string(),
            StackField::Upper => self.upper.to_string(),
            StackField::Spacing => self.spacing.to_string(),
            StackField::Depths => self.depths.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn um(v: f64) -> Position {
        Position::from_micrometers(v)
    }

    #[test]
    fn test_default_has_thirteen_depths() {
        let model = StackSpecModel::default();
        assert_eq!(model.depths(), 13);
        assert_relative_eq!(model.range().micrometers(), 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_recompute_depths_counts_both_endpoints() {
        let mut model = StackSpecModel::new(um(0.0), um(25.0), um(25.0)).unwrap();
        assert_eq!(model.depths(), 2);

        model.set_upper(um(0.0));
        model.recompute_depths();
        assert_eq!(model.depths(), 1);
    }

    #[test]
    fn test_recompute_depths_floors() {
        let model = StackSpecModel::new(um(0.0), um(110.0), um(25.0)).unwrap();
        assert_eq!(model.depths(), 5);
    }

    #[test]
    fn test_negative_range_is_degenerate() {
        let model = StackSpecModel::new(um(100.0), um(-200.0), um(25.0)).unwrap();
        assert_eq!(model.depths(), -11);
    }

    #[test]
    fn test_recompute_spacing_single_plane_keeps_spacing() {
        let mut model = StackSpecModel::default();
        model.set_depths(1).unwrap();
        model.recompute_spacing().unwrap();
        assert_eq!(model.spacing(), um(25.0));
    }

    #[test]
    fn test_recompute_spacing() {
        let mut model = StackSpecModel::default();
        model.set_depths(4).unwrap();
        model.recompute_spacing().unwrap();
        assert_relative_eq!(model.spacing().micrometers(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_recompute_spacing_rejects_empty_range() {
        let mut model = StackSpecModel::new(um(0.0), um(0.0), um(25.0)).unwrap();
        model.set_depths(5).unwrap();
        assert!(matches!(
            model.recompute_spacing(),
            Err(ValidationError::OutOfRange { field: "depths", .. })
        ));
        assert_eq!(model.spacing(), um(25.0));

        model.set_upper(um(-50.0));
        assert!(model.recompute_spacing().is_err());
        assert_eq!(model.spacing(), um(25.0));
    }

    #[test]
    fn test_recompute_depths_saturates() {
        let mut model = StackSpecModel::new(um(0.0), um(10.0), um(1.0)).unwrap();
        model.spacing = Position::from_base(f64::MIN_POSITIVE);
        model.set_upper(um(1e300));
        model.recompute_depths();
        assert_eq!(model.depths(), i64::MAX);
    }

    #[test]
    fn test_setters_reject_out_of_domain() {
        let mut model = StackSpecModel::default();
        assert!(model.set_spacing(um(0.0)).is_err());
        assert!(model.set_spacing(um(-1.0)).is_err());
        assert!(model.set_depths(0).is_err());
        assert!(model.set_depths(-3).is_err());
        assert_eq!(model, StackSpecModel::default());
    }

    #[test]
    fn test_new_rejects_zero_spacing() {
        assert!(StackSpecModel::new(um(0.0), um(10.0), um(0.0)).is_err());
    }

    #[test]
    fn test_depth_positions() {
        let model = StackSpecModel::default();
        assert_relative_eq!(model.depth(0).micrometers(), -200.0, epsilon = 1e-9);
        assert_relative_eq!(model.depth(12).micrometers(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_field_text() {
        let model = StackSpecModel::default();
        assert_eq!(model.field_text(StackField::Lower), "-200 μm");
        assert_eq!(model.field_text(StackField::Upper), "100 μm");
        assert_eq!(model.field_text(StackField::Spacing), "25 μm");
        assert_eq!(model.field_text(StackField::Depths), "13");
    }
}
