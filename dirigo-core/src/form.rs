//! Validated single-field editing for panel models.
//!
//! A panel model exposes its text fields through [`FieldModel`]. [`EditForm`]
//! owns the model, applies one edit at a time and remembers which fields hold
//! rejected input so the panel can flag them.

use std::fmt;

use crate::error::ValidationError;

/// A model whose fields are edited as text.
pub trait FieldModel: Clone {
    /// Identifies one editable field.
    type Field: Copy + Eq + fmt::Debug;

    /// Parse `raw`, store it into `field` and propagate to dependent fields.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] when `raw` does not parse or lies outside
    /// the field's domain. Implementations may leave `self` partially written
    /// on error; [`EditForm`] discards the candidate in that case.
    fn apply_edit(&mut self, field: Self::Field, raw: &str) -> Result<(), ValidationError>;

    /// Current display text of `field`.
    fn field_text(&self, field: Self::Field) -> String;
}

/// Owner of a [`FieldModel`] that applies edits atomically.
#[derive(Debug, Clone)]
pub struct EditForm<M: FieldModel> {
    model: M,
    invalid: Vec<M::Field>,
}

impl<M: FieldModel> EditForm<M> {
    /// Wraps a model with no fields flagged.
    pub fn new(model: M) -> Self {
        Self {
            model,
            invalid: Vec::new(),
        }
    }

    /// Applies one edit.
    ///
    /// On success the field's invalid flag is cleared. On failure the field is
    /// flagged and the model is left exactly as it was.
    ///
    /// # Errors
    /// Propagates the [`ValidationError`] that rejected the edit.
    pub fn edit(&mut self, field: M::Field, raw: &str) -> Result<(), ValidationError> {
        let mut candidate = self.model.clone();
        match candidate.apply_edit(field, raw) {
            Ok(()) => {
                self.model = candidate;
                self.invalid.retain(|f| *f != field);
                log::debug!("accepted {field:?} = {raw:?}");
                Ok(())
            }
            Err(e) => {
                if !self.invalid.contains(&field) {
                    self.invalid.push(field);
                }
                log::debug!("rejected {field:?} = {raw:?}: {e}");
                Err(e)
            }
        }
    }

    /// Whether the last edit of `field` was rejected.
    #[must_use]
    pub fn is_invalid(&self, field: M::Field) -> bool {
        self.invalid.contains(&field)
    }

    /// Display text of `field` as held by the model.
    #[must_use]
    pub fn text(&self, field: M::Field) -> String {
        self.model.field_text(field)
    }

    /// Borrow the model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Copy of the model for consumers that must not mutate it.
    #[must_use]
    pub fn snapshot(&self) -> M {
        self.model.clone()
    }

    /// Mutate non-text state (toggles, selectors) directly.
    pub fn update(&mut self, f: impl FnOnce(&mut M)) {
        f(&mut self.model);
    }
}

impl<M: FieldModel + Default> Default for EditForm<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Pair {
        a: i32,
        b: i32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum PairField {
        A,
        B,
    }

    impl FieldModel for Pair {
        type Field = PairField;

        // Writes `a` before validating, to prove the form discards partial writes.
        fn apply_edit(&mut self, field: PairField, raw: &str) -> Result<(), ValidationError> {
            let value: i32 = raw
                .parse()
                .map_err(|_| ValidationError::MalformedNumber(raw.to_string()))?;
            self.a = value;
            if field == PairField::B {
                if value < 0 {
                    return Err(ValidationError::out_of_range("b", value, "must be >= 0"));
                }
                self.b = value;
            }
            Ok(())
        }

        fn field_text(&self, field: PairField) -> String {
            match field {
                PairField::A => self.a.to_string(),
                PairField::B => self.b.to_string(),
            }
        }
    }

    #[test]
    fn test_failed_edit_leaves_model_untouched() {
        let mut form = EditForm::new(Pair { a: 1, b: 2 });
        assert!(form.edit(PairField::B, "-5").is_err());
        assert_eq!(*form.model(), Pair { a: 1, b: 2 });
        assert!(form.is_invalid(PairField::B));
        assert!(!form.is_invalid(PairField::A));
    }

    #[test]
    fn test_successful_edit_clears_flag() {
        let mut form = EditForm::new(Pair::default());
        assert!(form.edit(PairField::A, "x").is_err());
        assert!(form.is_invalid(PairField::A));
        form.edit(PairField::A, "7").unwrap();
        assert!(!form.is_invalid(PairField::A));
        assert_eq!(form.text(PairField::A), "7");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut form = EditForm::new(Pair::default());
        let snap = form.snapshot();
        form.edit(PairField::B, "3").unwrap();
        assert_eq!(snap.b, 0);
        assert_eq!(form.model().b, 3);
    }
}
