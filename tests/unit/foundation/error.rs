use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::renderer_not_ready("x")
            .to_string()
            .contains("renderer not ready:")
    );
    assert!(
        ReelError::no_supported_codec("x")
            .to_string()
            .contains("no supported codec:")
    );
    assert!(
        ReelError::encode_failed("x")
            .to_string()
            .contains("encode failed:")
    );
    assert!(
        ReelError::record_failed("x")
            .to_string()
            .contains("record failed:")
    );
    assert!(
        ReelError::archive_failed("x")
            .to_string()
            .contains("archive failed:")
    );
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert_eq!(ReelError::Cancelled.to_string(), "export cancelled");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
