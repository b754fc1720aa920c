use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::Vec3;

/// WGS84 semi-major axis in metres.
pub const WGS84_RADIUS_M: f64 = 6_378_137.0;
const WGS84_E2: f64 = 6.694_379_990_14e-3;

/// Default number of arc steps; the arc has `steps + 1` points.
pub const DEFAULT_ARC_STEPS: usize = 200;
/// Default peak altitude of the flight arc.
pub const DEFAULT_ARC_HEIGHT_KM: f64 = 800.0;

/// Latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Create a validated point (`lat` in `[-90, 90]`, `lng` in `[-180, 180]`).
    pub fn new(lat: f64, lng: f64) -> ReelResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ReelError::validation(format!(
                "latitude {lat} is outside [-90, 90]"
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(ReelError::validation(format!(
                "longitude {lng} is outside [-180, 180]"
            )));
        }
        Ok(Self { lat, lng })
    }

    fn to_unit(self) -> Vec3 {
        let lat = self.lat.to_radians();
        let lng = self.lng.to_radians();
        Vec3::new(lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin())
    }

    fn from_unit(v: Vec3) -> Self {
        Self {
            lat: v.z.clamp(-1.0, 1.0).asin().to_degrees(),
            lng: v.y.atan2(v.x).to_degrees(),
        }
    }
}

/// One sample of a route: a position plus its altitude above the surface.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    #[serde(flatten)]
    pub point: GeoPoint,
    pub height_km: f64,
}

impl RoutePoint {
    pub fn new(lat: f64, lng: f64, height_km: f64) -> Self {
        Self {
            point: GeoPoint { lat, lng },
            height_km,
        }
    }

    /// Earth-centred, Earth-fixed position on the WGS84 ellipsoid, in metres.
    pub fn to_cartesian(self) -> Vec3 {
        let lat = self.point.lat.to_radians();
        let lng = self.point.lng.to_radians();
        let h = self.height_km * 1000.0;
        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = WGS84_RADIUS_M / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        Vec3::new(
            (n + h) * cos_lat * lng.cos(),
            (n + h) * cos_lat * lng.sin(),
            (n * (1.0 - WGS84_E2) + h) * sin_lat,
        )
    }
}

/// Great-circle arc from `from` to `to` with a `sin(pi * t)` altitude profile.
///
/// Returns `steps + 1` points; the first and last sit on the surface at the endpoints.
pub fn great_circle_arc(
    from: GeoPoint,
    to: GeoPoint,
    arc_height_km: f64,
    steps: usize,
) -> Vec<RoutePoint> {
    let steps = steps.max(1);
    let a = from.to_unit();
    let b = to.to_unit();
    let omega = a.dot(b).clamp(-1.0, 1.0).acos();
    let sin_omega = omega.sin();

    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let v = if sin_omega < 1e-6 {
                // Coincident or antipodal: slerp is undefined, fall back to a chord.
                a.lerp(b, t).try_normalize().unwrap_or(a)
            } else {
                let s0 = ((1.0 - t) * omega).sin() / sin_omega;
                let s1 = (t * omega).sin() / sin_omega;
                a * s0 + b * s1
            };
            let p = GeoPoint::from_unit(v);
            RoutePoint {
                point: p,
                height_km: (std::f64::consts::PI * t).sin() * arc_height_km,
            }
        })
        .collect()
}

/// User-facing animation settings with the clamps applied by the front-end.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSettings {
    pub duration_secs: f64,
    pub arc_height_km: f64,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            duration_secs: 8.0,
            arc_height_km: DEFAULT_ARC_HEIGHT_KM,
        }
    }
}

impl RouteSettings {
    /// Duration clamped to `[2, 90]` seconds; non-finite input falls back to 8.
    pub fn clamp_duration_secs(value: f64) -> f64 {
        if value.is_finite() {
            value.clamp(2.0, 90.0)
        } else {
            8.0
        }
    }

    /// Arc height clamped to `[50, 3000]` km; non-finite input falls back to 800.
    pub fn clamp_arc_height_km(value: f64) -> f64 {
        if value.is_finite() {
            value.clamp(50.0, 3000.0)
        } else {
            DEFAULT_ARC_HEIGHT_KM
        }
    }

    pub fn new(duration_secs: f64, arc_height_km: f64) -> Self {
        Self {
            duration_secs: Self::clamp_duration_secs(duration_secs),
            arc_height_km: Self::clamp_arc_height_km(arc_height_km),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/route/geo.rs"]
mod tests;
