use dirigo_core::{
    CaptureMode, EditForm, FieldModel, FrameSpecModel, Position, StackField, StackSpecModel,
    ValidationError,
};

fn um(v: f64) -> Position {
    Position::from_micrometers(v)
}

#[test]
fn test_depths_formula_over_grid() {
    for lower in [-500.0, -200.0, 0.0, 12.5] {
        for span in [1.0, 25.0, 99.0, 300.0, 1000.0] {
            for spacing in [0.5, 1.0, 7.0, 25.0, 100.0] {
                let model = StackSpecModel::new(um(lower), um(lower + span), um(spacing)).unwrap();
                let range = model.range() / model.spacing();
                #[allow(clippy::cast_possible_truncation)]
                let expected = range.floor() as i64 + 1;
                assert_eq!(model.depths(), expected, "lower={lower} span={span} spacing={spacing}");
                assert!(model.depths() >= 1);
            }
        }
    }
}

/// Recomputing the count from the derived spacing may lose a plane to
/// rounding; the acquisition itself keeps the edited count.
#[test]
fn test_depth_edit_then_recompute_drift() {
    for depths in 2..=40_i64 {
        let mut form = EditForm::new(StackSpecModel::default());
        form.edit(StackField::Depths, &depths.to_string()).unwrap();
        assert_eq!(form.model().depths(), depths);

        let mut model = form.snapshot();
        model.recompute_depths();
        // Rounding in range / spacing may land just below the integer.
        assert!(
            model.depths() == depths || model.depths() == depths - 1,
            "depths={depths} recomputed={}",
            model.depths()
        );
    }
}

#[test]
fn test_stack_request_matches_edited_depths() {
    let frame = FrameSpecModel::default().generate_spec();
    for depths in 2..=40_i64 {
        let mut form = EditForm::new(StackSpecModel::default());
        form.edit(StackField::Depths, &depths.to_string()).unwrap();
        let request = CaptureMode::Stack.request(frame.clone(), form.model());
        assert_eq!(
            request.total_frames(),
            Some(depths.unsigned_abs()),
            "depths={depths}"
        );
    }
}

#[test]
fn test_depths_over_empty_range_rejected() {
    let mut form = EditForm::new(StackSpecModel::default());
    form.edit(StackField::Upper, "-200 um").unwrap();
    assert_eq!(form.model().depths(), 1);
    let before = form.snapshot();

    assert!(matches!(
        form.edit(StackField::Depths, "5"),
        Err(ValidationError::OutOfRange { field: "depths", .. })
    ));
    assert_eq!(*form.model(), before);
    assert!(form.is_invalid(StackField::Depths));

    // The spacing survived, so moving the bound again is well defined.
    form.edit(StackField::Upper, "0 um").unwrap();
    assert_eq!(form.model().spacing(), um(25.0));
    assert_eq!(form.model().depths(), 9);

    form.edit(StackField::Depths, "1").unwrap();
    assert!(!form.is_invalid(StackField::Depths));
}

#[test]
fn test_depths_over_negative_range_rejected() {
    let mut form = EditForm::new(StackSpecModel::default());
    form.edit(StackField::Upper, "-300 um").unwrap();
    let before = form.snapshot();

    assert!(form.edit(StackField::Depths, "3").is_err());
    assert_eq!(*form.model(), before);
    assert!(form.model().spacing().base() > 0.0);

    form.edit(StackField::Lower, "-400 um").unwrap();
    assert_eq!(form.model().depths(), 5);
}

#[test]
fn test_edit_protocol_sequence() {
    let mut form = EditForm::new(StackSpecModel::default());
    assert_eq!(form.model().depths(), 13);

    form.edit(StackField::Upper, "0 um").unwrap();
    assert_eq!(form.model().depths(), 9);

    form.edit(StackField::Spacing, "50 um").unwrap();
    assert_eq!(form.model().depths(), 5);

    form.edit(StackField::Depths, "3").unwrap();
    assert_eq!(form.text(StackField::Spacing), "100 μm");

    form.edit(StackField::Lower, "-0.1 mm").unwrap();
    assert_eq!(form.text(StackField::Lower), "-100 μm");
    assert_eq!(form.model().depths(), 2);
}

#[test]
fn test_rejected_edits_leave_model_unchanged() {
    let mut form = EditForm::new(StackSpecModel::default());
    let before = form.snapshot();

    let cases = [
        (StackField::Depths, "0"),
        (StackField::Depths, "-4"),
        (StackField::Depths, "2.5"),
        (StackField::Spacing, "0 um"),
        (StackField::Spacing, "-3 um"),
        (StackField::Lower, "abc"),
        (StackField::Upper, "12"),
        (StackField::Upper, "12 parsecs"),
        (StackField::Spacing, ""),
    ];
    for (field, raw) in cases {
        assert!(form.edit(field, raw).is_err(), "{field} accepted {raw:?}");
        assert_eq!(*form.model(), before);
        assert!(form.is_invalid(field));
    }

    form.edit(StackField::Spacing, "10 um").unwrap();
    assert!(!form.is_invalid(StackField::Spacing));
    assert!(form.is_invalid(StackField::Depths));
}

#[test]
fn test_error_kinds() {
    let mut model = StackSpecModel::default();
    assert!(matches!(
        model.apply_edit(StackField::Upper, "12"),
        Err(ValidationError::MissingUnit(_))
    ));
    assert!(matches!(
        model.apply_edit(StackField::Upper, "12 ft"),
        Err(ValidationError::UnknownUnit { .. })
    ));
    assert!(matches!(
        model.apply_edit(StackField::Depths, "0"),
        Err(ValidationError::OutOfRange { field: "depths", .. })
    ));
}
