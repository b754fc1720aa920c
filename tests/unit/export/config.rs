use std::sync::Arc;

use super::*;
use crate::export::stub::CollectingEncoder;

#[test]
fn defaults_match_the_uhd_export() {
    let cfg = ExportConfig::default();
    assert_eq!((cfg.width, cfg.height, cfg.fps), (3840, 2160, 30));
    assert_eq!(cfg.keyframe_interval, 30);
    assert_eq!(cfg.backpressure_threshold, 8);
    assert_eq!(cfg.archive_stride, 5);
    assert_eq!(cfg.codecs[0].codec, VideoCodec::Vp9);
    assert_eq!(cfg.codecs[0].bitrate_bps, 16_000_000);
    assert!(!cfg.cascade.record_failure_falls_back);
    cfg.validate().unwrap();
}

#[test]
fn json_fills_missing_fields_with_defaults() {
    let cfg = ExportConfig::from_json(
        r#"{"width": 640, "height": 360, "start_tier": "still_archive",
            "cascade": {"record_failure_falls_back": true}}"#,
    )
    .unwrap();
    assert_eq!((cfg.width, cfg.height), (640, 360));
    assert_eq!(cfg.fps, 30);
    assert_eq!(cfg.start_tier, Some(Tier::StillArchive));
    assert!(cfg.cascade.record_failure_falls_back);
}

#[test]
fn json_rejects_unknown_fields() {
    assert!(matches!(
        ExportConfig::from_json(r#"{"widht": 640}"#),
        Err(ReelError::Validation(_))
    ));
}

#[test]
fn validation_rejects_unusable_values() {
    let bad = [
        ExportConfig {
            fps: 0,
            ..ExportConfig::default()
        },
        ExportConfig {
            width: 0,
            ..ExportConfig::default()
        },
        ExportConfig {
            width: 641,
            ..ExportConfig::default()
        },
        ExportConfig {
            archive_stride: 0,
            ..ExportConfig::default()
        },
        ExportConfig {
            file_stem: "../escape".to_string(),
            ..ExportConfig::default()
        },
    ];
    for cfg in bad {
        assert!(
            matches!(cfg.validate(), Err(ReelError::Validation(_))),
            "{cfg:?}"
        );
    }
}

#[test]
fn encode_failures_cascade_to_the_next_available_tier() {
    let policy = CascadePolicy::default();
    let archive_only = ExportHost::archive_only();
    let with_recorder = ExportHost::archive_only().with_recorder(Arc::new(
        crate::encode::ffmpeg::FfmpegHost::with_encoders(
            "ffmpeg",
            ["libvpx".to_string()].into_iter().collect(),
        ),
    ));

    let err = ReelError::no_supported_codec("none");
    assert_eq!(
        policy.next_tier(Tier::FrameExact, &err, &with_recorder),
        Some(Tier::Realtime)
    );
    assert_eq!(
        policy.next_tier(Tier::FrameExact, &err, &archive_only),
        Some(Tier::StillArchive)
    );
    assert_eq!(
        policy.next_tier(
            Tier::FrameExact,
            &ReelError::encode_failed("boom"),
            &with_recorder
        ),
        Some(Tier::Realtime)
    );
}

#[test]
fn other_errors_are_fatal() {
    let policy = CascadePolicy::default();
    let host = ExportHost::archive_only().with_encoder(Arc::new(CollectingEncoder::new(vec![])));
    for err in [
        ReelError::Cancelled,
        ReelError::renderer_not_ready("x"),
        ReelError::archive_failed("x"),
    ] {
        assert_eq!(policy.next_tier(Tier::FrameExact, &err, &host), None);
        assert_eq!(policy.next_tier(Tier::StillArchive, &err, &host), None);
    }
}

#[test]
fn record_failure_cascades_only_when_allowed() {
    let host = ExportHost::archive_only();
    let err = ReelError::record_failed("recorder died");
    assert_eq!(
        CascadePolicy::default().next_tier(Tier::Realtime, &err, &host),
        None
    );
    let lenient = CascadePolicy {
        record_failure_falls_back: true,
    };
    assert_eq!(
        lenient.next_tier(Tier::Realtime, &err, &host),
        Some(Tier::StillArchive)
    );
}
