use super::*;
use crate::route::geo::great_circle_arc;

fn small_renderer() -> GlobeRenderer {
    let opts = GlobeRendererOpts {
        display: Canvas {
            width: 48,
            height: 32,
        },
        ..GlobeRendererOpts::default()
    };
    let mut r = GlobeRenderer::new(opts).unwrap();
    let from = GeoPoint::new(55.75, 37.62).unwrap();
    let to = GeoPoint::new(48.85, 2.35).unwrap();
    r.set_route(&great_circle_arc(from, to, 800.0, 20));
    r
}

#[test]
fn canvas_before_first_render_is_not_ready() {
    let r = small_renderer();
    assert!(!r.is_initialized());
    assert!(matches!(r.canvas(), Err(ReelError::RendererNotReady(_))));
}

#[test]
fn render_produces_display_sized_opaque_frame() {
    let mut r = small_renderer();
    r.render_frame();
    let frame = r.canvas().unwrap();
    assert_eq!((frame.width, frame.height), (48, 32));
    frame.validate().unwrap();
    assert!(!frame.premultiplied);
    assert!(frame.data.chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn restore_without_resize_is_a_noop() {
    let mut r = small_renderer();
    let before = r.surface();
    r.restore_render_size();
    assert_eq!(r.surface(), before);
    assert!(!r.is_initialized());
}

#[test]
fn resize_then_restore_round_trips_surface_state() {
    let mut r = small_renderer();
    let before = r.surface();

    r.set_render_size(64, 36);
    assert!(r.surface().offscreen);
    assert_eq!(r.canvas().unwrap().size(), Canvas::new(64, 36).unwrap());

    // A second resize must not overwrite the original snapshot.
    r.set_render_size(80, 40);
    r.restore_render_size();
    assert_eq!(r.surface(), before);
    assert_eq!(r.canvas().unwrap().size(), Canvas::new(48, 32).unwrap());

    r.restore_render_size();
    assert_eq!(r.surface(), before);
}

#[test]
fn resolution_scale_multiplies_live_surface() {
    let opts = GlobeRendererOpts {
        display: Canvas {
            width: 10,
            height: 6,
        },
        resolution_scale: 2.0,
        ..GlobeRendererOpts::default()
    };
    let mut r = GlobeRenderer::new(opts).unwrap();
    r.render_frame();
    assert_eq!(r.canvas().unwrap().size(), Canvas::new(20, 12).unwrap());
}

#[test]
fn progress_changes_pixels_deterministically() {
    let mut r = small_renderer();
    r.set_render_size(96, 64);

    r.set_progress(Progress::START);
    r.render_frame();
    let start = r.canvas().unwrap().clone();

    r.set_progress(Progress::END);
    r.render_frame();
    let end = r.canvas().unwrap().clone();
    assert_ne!(start, end);

    r.set_progress(Progress::START);
    r.render_frame();
    assert_eq!(r.canvas().unwrap(), &start);
}

#[test]
fn invalid_opts_are_rejected() {
    let bad = GlobeRendererOpts {
        resolution_scale: 0.0,
        ..GlobeRendererOpts::default()
    };
    assert!(GlobeRenderer::new(bad).is_err());
}
