use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FxError::missing_context("x")
            .to_string()
            .contains("missing context:")
    );
    assert!(
        FxError::surface_size("x")
            .to_string()
            .contains("invalid surface size:")
    );
    assert!(
        FxError::readback("x")
            .to_string()
            .contains("readback unavailable:")
    );
    assert!(
        FxError::ordering("x")
            .to_string()
            .contains("ordering violation:")
    );
    assert!(
        FxError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FxError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_ordering_errors_are_flagged_as_programmer_errors() {
    assert!(FxError::ordering("advance").is_ordering_violation());
    assert!(!FxError::readback("lost").is_ordering_violation());
}
