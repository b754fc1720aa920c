use std::sync::Arc;

use super::*;
use crate::encode::session::VideoCodec;
use crate::export::stub::{Call, CollectingEncoder, StubRenderer};
use crate::foundation::core::Canvas;

fn small_config() -> ExportConfig {
    ExportConfig {
        width: 8,
        height: 4,
        ..ExportConfig::default()
    }
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let cfg = ExportConfig {
        fps: 0,
        ..ExportConfig::default()
    };
    assert!(matches!(
        Exporter::new(ExportHost::archive_only(), cfg),
        Err(ReelError::Validation(_))
    ));
}

#[test]
fn forced_start_tier_skips_better_tiers() {
    let host = ExportHost::archive_only()
        .with_encoder(Arc::new(CollectingEncoder::new(vec![VideoCodec::Vp9])));
    let auto = Exporter::new(host.clone(), small_config()).unwrap();
    assert_eq!(auto.first_tier(), Tier::FrameExact);

    let forced = Exporter::new(
        host,
        ExportConfig {
            start_tier: Some(Tier::StillArchive),
            ..small_config()
        },
    )
    .unwrap();
    assert_eq!(forced.first_tier(), Tier::StillArchive);
}

#[tokio::test]
async fn unsupported_codec_without_recorder_falls_to_the_archive() {
    let host =
        ExportHost::archive_only().with_encoder(Arc::new(CollectingEncoder::new(vec![])));
    let exporter = Exporter::new(host, small_config()).unwrap();
    let mut r = StubRenderer::new(Canvas::new(2, 2).unwrap());

    let result = exporter.export(&mut r, 2.0, |_| {}).await.unwrap();
    assert_eq!(result.tier, Tier::StillArchive);
    let warning = result.warning.unwrap();
    assert!(warning.contains("Tier A failed: no supported codec"));
    assert_eq!(r.count(&Call::Restore), 1);
    assert_eq!(r.size(), Canvas::new(2, 2).unwrap());
}
