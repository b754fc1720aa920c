use super::stub::{Call, StubRenderer};
use super::*;

#[test]
fn tiers_are_ordered_by_fidelity() {
    assert!(Tier::FrameExact < Tier::Realtime);
    assert!(Tier::Realtime < Tier::StillArchive);
    assert_eq!(Tier::Realtime.to_string(), "realtime recording (B)");
}

#[test]
fn resolution_tag_names_uhd_4k() {
    assert_eq!(resolution_tag(Canvas::new(3840, 2160).unwrap()), "4k");
    assert_eq!(resolution_tag(Canvas::new(1920, 1080).unwrap()), "1080p");
}

#[test]
fn artifact_names_carry_stem_tag_and_extension() {
    let name = artifact_file_name("travel-route", "fallback", "webm");
    let ms = name
        .strip_prefix("travel-route-fallback-")
        .and_then(|rest| rest.strip_suffix(".webm"))
        .unwrap();
    assert!(ms.parse::<i64>().unwrap() > 0);
}

#[test]
fn warnings_chain_upstream_reasons() {
    let upstream = [TierFailure {
        tier: Tier::FrameExact,
        reason: "no supported codec: none".to_string(),
    }];
    assert_eq!(
        chain_warning("Degraded.".to_string(), &upstream),
        "Degraded. Tier A failed: no supported codec: none."
    );
    assert_eq!(chain_warning("Degraded.".to_string(), &[]), "Degraded.");
}

#[test]
fn render_frame_at_sets_progress_before_rendering() {
    let mut r = StubRenderer::new(Canvas::new(4, 4).unwrap());
    let cancel = CancellationToken::new();
    render_frame_at(&mut r, 1, 3, &cancel).unwrap();
    assert_eq!(r.calls, vec![Call::SetProgress(0.5), Call::Render]);
}

#[test]
fn render_frame_at_observes_cancellation() {
    let mut r = StubRenderer::new(Canvas::new(4, 4).unwrap());
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        render_frame_at(&mut r, 0, 3, &cancel),
        Err(ReelError::Cancelled)
    ));
    assert!(r.calls.is_empty());
}
