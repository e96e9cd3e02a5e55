//! Text entries that commit on Enter or focus loss.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use eframe::egui;

use dirigo_core::{EditForm, FieldModel};

use super::theme::{accent, form_label};

pub const ENTRY_WIDTH: f32 = 96.0;

/// Draft text of one entry.
///
/// While the entry has focus the typed text is kept as a draft. On commit the
/// draft is handed to the caller and dropped, so a rejected value shows the
/// previous text again.
#[derive(Debug, Clone, Default)]
pub struct TextEntry {
    draft: Option<String>,
}

impl TextEntry {
    /// Draws the entry showing `current` unless the user is typing.
    ///
    /// Returns the outcome of `commit` when the entry loses focus.
    pub fn show<T, E: Display>(
        &mut self,
        ui: &mut egui::Ui,
        current: String,
        enabled: bool,
        invalid: bool,
        commit: impl FnOnce(&str) -> Result<T, E>,
    ) -> Option<Result<T, E>> {
        let mut text = self.draft.take().unwrap_or(current);
        let mut edit = egui::TextEdit::singleline(&mut text).desired_width(ENTRY_WIDTH);
        if invalid {
            edit = edit.text_color(accent::RED);
        }
        let response = ui.add_enabled(enabled, edit);
        if response.lost_focus() {
            let result = commit(&text);
            if let Err(e) = &result {
                log::warn!("rejected {text:?}: {e}");
            }
            Some(result)
        } else {
            if response.has_focus() {
                self.draft = Some(text);
            }
            None
        }
    }
}

/// Entry for a value that is not part of an [`EditForm`].
#[derive(Debug, Clone, Default)]
pub struct ValueEntry {
    text: TextEntry,
    rejected: bool,
}

impl ValueEntry {
    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    fn record<T, E>(&mut self, result: Result<T, E>) -> Option<T> {
        self.rejected = result.is_err();
        result.ok()
    }

    pub fn show<T, E: Display>(
        &mut self,
        ui: &mut egui::Ui,
        current: String,
        enabled: bool,
        commit: impl FnOnce(&str) -> Result<T, E>,
    ) -> Option<T> {
        let rejected = self.rejected;
        self.text
            .show(ui, current, enabled, rejected, commit)
            .and_then(|result| self.record(result))
    }
}

/// Drafts of every field of a form.
#[derive(Debug, Clone)]
pub struct EntryMap<F>(HashMap<F, TextEntry>);

impl<F> Default for EntryMap<F> {
    fn default() -> Self {
        Self(HashMap::new())
    }
}

impl<F: Copy + Eq + Hash> EntryMap<F> {
    pub fn entry(&mut self, field: F) -> &mut TextEntry {
        self.0.entry(field).or_default()
    }
}

/// Label and standalone entry on one grid row.
pub fn labeled<T, E: Display>(
    ui: &mut egui::Ui,
    label: &str,
    entry: &mut ValueEntry,
    current: String,
    enabled: bool,
    commit: impl FnOnce(&str) -> Result<T, E>,
) -> Option<T> {
    ui.label(form_label(label));
    let value = entry.show(ui, current, enabled, commit);
    ui.end_row();
    value
}

/// Label and form field on one grid row; red while the form flags the field.
///
/// Returns whether an edit was accepted.
pub fn form_row<M>(
    ui: &mut egui::Ui,
    label: &str,
    form: &mut EditForm<M>,
    entries: &mut EntryMap<M::Field>,
    field: M::Field,
    enabled: bool,
) -> bool
where
    M: FieldModel,
    M::Field: Hash,
{
    ui.label(form_label(label));
    let current = form.text(field);
    let invalid = form.is_invalid(field);
    let outcome = entries
        .entry(field)
        .show(ui, current, enabled, invalid, |raw| form.edit(field, raw));
    ui.end_row();
    matches!(outcome, Some(Ok(())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirigo_core::{StackField, StackSpecModel};

    fn render(add_contents: impl FnOnce(&mut egui::Ui)) {
        let ctx = egui::Context::default();
        let mut add_contents = Some(add_contents);
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                if let Some(f) = add_contents.take() {
                    f(ui);
                }
            });
        });
    }

    #[test]
    fn test_value_entry_flags_rejected_text() {
        let mut entry = ValueEntry::default();
        assert_eq!(entry.record("12".parse::<u32>()), Some(12));
        assert!(!entry.is_rejected());
        assert_eq!(entry.record("twelve".parse::<u32>()), None);
        assert!(entry.is_rejected());
        assert_eq!(entry.record(" 3".trim().parse::<u32>()), Some(3));
        assert!(!entry.is_rejected());
    }

    #[test]
    fn test_form_row_reads_form_state_without_committing() {
        let mut form = EditForm::new(StackSpecModel::default());
        let mut entries = EntryMap::default();
        assert!(form.edit(StackField::Spacing, "-1 um").is_err());
        let before = form.snapshot();

        let mut accepted = true;
        render(|ui| {
            egui::Grid::new("stack").show(ui, |ui| {
                accepted = form_row(ui, "Spacing:", &mut form, &mut entries, StackField::Spacing, true);
            });
        });
        assert!(!accepted);
        assert!(form.is_invalid(StackField::Spacing));
        assert!(!form.is_invalid(StackField::Depths));
        assert_eq!(*form.model(), before);
    }
}
