use kurbo::Point;

use crate::foundation::core::{Canvas, Progress};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::{Vec3, mul_div255_u16};
use crate::render::backend::{ExportRenderer, FrameRGBA};
use crate::route::geo::{GeoPoint, RoutePoint, WGS84_RADIUS_M};
use crate::route::sampler::{current_position, visible_len};

/// Appearance and display settings for [`GlobeRenderer`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GlobeRendererOpts {
    /// On-screen display size in logical pixels.
    pub display: Canvas,
    /// Display pixel density; the live surface is `display * resolution_scale`.
    pub resolution_scale: f64,
    pub background_rgba: [u8; 4],
    pub globe_rgba: [u8; 4],
    /// Full route polyline (straight alpha).
    pub route_rgba: [u8; 4],
    /// Travelled part of the route.
    pub travelled_rgba: [u8; 4],
    pub marker_rgba: [u8; 4],
    /// Route stroke width at a 1080 px tall surface; scales with surface height.
    pub line_width_px: f64,
}

impl Default for GlobeRendererOpts {
    fn default() -> Self {
        Self {
            display: Canvas {
                width: 1280,
                height: 720,
            },
            resolution_scale: 1.0,
            background_rgba: [8, 12, 24, 255],
            globe_rgba: [32, 72, 128, 255],
            route_rgba: [124, 161, 204, 90],
            travelled_rgba: [247, 244, 234, 255],
            marker_rgba: [122, 199, 12, 255],
            line_width_px: 2.0,
        }
    }
}

/// Size and placement of the renderer's output surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceState {
    /// Logical size.
    pub size: Canvas,
    /// Physical pixels per logical pixel.
    pub resolution_scale: f64,
    /// Whether the surface is parked off-screen for offline rendering.
    pub offscreen: bool,
}

impl SurfaceState {
    /// Physical pixel size of the surface.
    pub fn pixel_size(&self) -> Canvas {
        let scale = |v: u32| ((f64::from(v) * self.resolution_scale).round() as u32).max(1);
        Canvas {
            width: scale(self.size.width),
            height: scale(self.size.height),
        }
    }
}

/// Orthographic camera looking at the Earth's centre from direction `forward`.
#[derive(Clone, Copy, Debug)]
struct GlobeView {
    forward: Vec3,
    east: Vec3,
    north: Vec3,
}

impl GlobeView {
    fn looking_at(dir: Vec3) -> Self {
        let forward = dir.try_normalize().unwrap_or_else(Self::default_direction);
        let east = Vec3::UNIT_Z
            .cross(forward)
            .try_normalize()
            .unwrap_or(Vec3::new(0.0, 1.0, 0.0));
        let north = forward.cross(east);
        Self {
            forward,
            east,
            north,
        }
    }

    fn default_direction() -> Vec3 {
        let home = GeoPoint {
            lat: 22.0,
            lng: 10.0,
        };
        RoutePoint {
            point: home,
            height_km: 0.0,
        }
        .to_cartesian()
    }

    /// Centre the globe on the mean direction of the route.
    fn fit(route: &[Vec3]) -> Self {
        let sum = route.iter().fold(Vec3::ZERO, |acc, p| acc + *p);
        Self::looking_at(sum)
    }

    /// Unit-sphere screen coordinates, or `None` when occluded by the globe.
    fn project(&self, p: Vec3) -> Option<(f64, f64)> {
        let q = p * (1.0 / WGS84_RADIUS_M);
        let x = q.dot(self.east);
        let y = q.dot(self.north);
        let depth = q.dot(self.forward);
        if depth < 0.0 && x * x + y * y < 1.0 {
            return None;
        }
        Some((x, y))
    }
}

impl Default for GlobeView {
    fn default() -> Self {
        Self::looking_at(Self::default_direction())
    }
}

/// Software renderer for a globe with an animated flight route.
///
/// The surface is allocated by the first [`ExportRenderer::render_frame`]; until then the
/// renderer reports itself as not ready.
#[derive(Debug)]
pub struct GlobeRenderer {
    opts: GlobeRendererOpts,
    route: Vec<Vec3>,
    view: GlobeView,
    progress: Progress,
    surface: SurfaceState,
    snapshot: Option<SurfaceState>,
    frame: Option<FrameRGBA>,
}

impl GlobeRenderer {
    pub fn new(opts: GlobeRendererOpts) -> ReelResult<Self> {
        Canvas::new(opts.display.width, opts.display.height)?;
        if !opts.resolution_scale.is_finite() || opts.resolution_scale <= 0.0 {
            return Err(ReelError::validation(
                "resolution_scale must be finite and > 0",
            ));
        }
        if !opts.line_width_px.is_finite() || opts.line_width_px <= 0.0 {
            return Err(ReelError::validation(
                "line_width_px must be finite and > 0",
            ));
        }
        let surface = SurfaceState {
            size: opts.display,
            resolution_scale: opts.resolution_scale,
            offscreen: false,
        };
        Ok(Self {
            opts,
            route: Vec::new(),
            view: GlobeView::default(),
            progress: Progress::START,
            surface,
            snapshot: None,
            frame: None,
        })
    }

    /// Replace the displayed route and rewind to the start.
    pub fn set_route(&mut self, points: &[RoutePoint]) {
        self.route = points.iter().map(|p| p.to_cartesian()).collect();
        self.view = GlobeView::fit(&self.route);
        self.progress = Progress::START;
        tracing::debug!(points = points.len(), "route set");
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    #[cfg(test)]
    pub(crate) fn surface(&self) -> SurfaceState {
        self.surface
    }

    #[cfg(test)]
    pub(crate) fn is_initialized(&self) -> bool {
        self.frame.is_some()
    }

    fn stroke_width(&self, size: Canvas) -> f64 {
        self.opts.line_width_px * (f64::from(size.height) / 1080.0).max(0.5)
    }

    fn draw(&self) -> FrameRGBA {
        let size = self.surface.pixel_size();
        let mut raster = Raster::filled(size, self.opts.background_rgba);

        let center = Point::new(f64::from(size.width) / 2.0, f64::from(size.height) / 2.0);
        let radius = 0.34 * f64::from(size.min_side());
        raster.fill_globe(center, radius, self.opts.globe_rgba);

        let view = self.view;
        let to_screen = |v: Vec3| {
            view.project(v)
                .map(|(x, y)| Point::new(center.x + x * radius, center.y - y * radius))
        };
        let projected: Vec<Option<Point>> = self.route.iter().map(|v| to_screen(*v)).collect();

        let width = self.stroke_width(size);
        raster.stroke_polyline(&projected, width, self.opts.route_rgba);
        let travelled = visible_len(projected.len(), self.progress);
        raster.stroke_polyline(
            &projected[..travelled],
            width * 2.0,
            self.opts.travelled_rgba,
        );

        if let Some(pos) = current_position(&self.route, self.progress)
            && let Some(pt) = to_screen(pos)
        {
            raster.fill_disc(pt, width * 4.0, self.opts.marker_rgba);
        }

        raster.into_frame()
    }
}

impl ExportRenderer for GlobeRenderer {
    fn set_render_size(&mut self, width: u32, height: u32) {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.surface);
        }
        self.surface = SurfaceState {
            size: Canvas {
                width: width.max(1),
                height: height.max(1),
            },
            resolution_scale: 1.0,
            offscreen: true,
        };
        self.render_frame();
    }

    fn restore_render_size(&mut self) {
        let Some(previous) = self.snapshot.take() else {
            return;
        };
        self.surface = previous;
        self.render_frame();
    }

    fn set_progress(&mut self, progress: Progress) {
        self.progress = progress;
    }

    fn render_frame(&mut self) {
        self.frame = Some(self.draw());
    }

    fn canvas(&self) -> ReelResult<&FrameRGBA> {
        self.frame
            .as_ref()
            .ok_or_else(|| ReelError::renderer_not_ready("globe renderer has not rendered yet"))
    }
}

/// Opaque straight-alpha RGBA8 raster with simple alpha-blended primitives.
struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Raster {
    fn filled(size: Canvas, rgba: [u8; 4]) -> Self {
        let frame = FrameRGBA::solid(size, [rgba[0], rgba[1], rgba[2], 255]);
        Self {
            width: frame.width,
            height: frame.height,
            data: frame.data,
        }
    }

    fn blend(&mut self, x: i64, y: i64, rgba: [u8; 4]) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let dst = &mut self.data[idx..idx + 4];
        let a = u16::from(rgba[3]);
        if a == 255 {
            dst.copy_from_slice(&rgba);
            return;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let v = mul_div255_u16(u16::from(rgba[c]), a) + mul_div255_u16(u16::from(dst[c]), inv);
            dst[c] = v.min(255) as u8;
        }
        dst[3] = 255;
    }

    /// Pixel-centre bounding box of a circle, clipped to the raster.
    fn clip_box(&self, c: Point, r: f64) -> (i64, i64, i64, i64) {
        let x0 = ((c.x - r).floor() as i64).max(0);
        let y0 = ((c.y - r).floor() as i64).max(0);
        let x1 = ((c.x + r).ceil() as i64).min(i64::from(self.width) - 1);
        let y1 = ((c.y + r).ceil() as i64).min(i64::from(self.height) - 1);
        (x0, y0, x1, y1)
    }

    fn fill_globe(&mut self, c: Point, r: f64, rgba: [u8; 4]) {
        let (x0, y0, x1, y1) = self.clip_box(c, r);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = (x as f64 + 0.5 - c.x) / r;
                let dy = (y as f64 + 0.5 - c.y) / r;
                let r2 = dx * dx + dy * dy;
                if r2 > 1.0 {
                    continue;
                }
                let shade = 0.45 + 0.55 * (1.0 - r2).sqrt();
                let lit = |v: u8| (f64::from(v) * shade).round().clamp(0.0, 255.0) as u8;
                self.blend(x, y, [lit(rgba[0]), lit(rgba[1]), lit(rgba[2]), 255]);
            }
        }
    }

    fn fill_disc(&mut self, c: Point, r: f64, rgba: [u8; 4]) {
        let (x0, y0, x1, y1) = self.clip_box(c, r);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if (p - c).hypot2() <= r * r {
                    self.blend(x, y, rgba);
                }
            }
        }
    }

    fn stroke_segment(&mut self, a: Point, b: Point, width: f64, rgba: [u8; 4]) {
        let half = width / 2.0;
        let ab = b - a;
        let len2 = ab.hypot2();
        let lo = Point::new(a.x.min(b.x), a.y.min(b.y));
        let hi = Point::new(a.x.max(b.x), a.y.max(b.y));
        let x0 = ((lo.x - half).floor() as i64).max(0);
        let y0 = ((lo.y - half).floor() as i64).max(0);
        let x1 = ((hi.x + half).ceil() as i64).min(i64::from(self.width) - 1);
        let y1 = ((hi.y + half).ceil() as i64).min(i64::from(self.height) - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let t = if len2 > 0.0 {
                    ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                if (p - a.lerp(b, t)).hypot2() <= half * half {
                    self.blend(x, y, rgba);
                }
            }
        }
    }

    fn stroke_polyline(&mut self, points: &[Option<Point>], width: f64, rgba: [u8; 4]) {
        for pair in points.windows(2) {
            if let [Some(a), Some(b)] = pair {
                self.stroke_segment(*a, *b, width, rgba);
            }
        }
    }

    fn into_frame(self) -> FrameRGBA {
        FrameRGBA {
            width: self.width,
            height: self.height,
            data: self.data,
            premultiplied: false,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
