//! Pose Geometry Engine
//!
//! Derives a predicted touch point from the three earliest contacts, read as
//! thumb (T), mid (M) and pinky (P):
//!
//! ```text
//!   outer circle   center M, radius outer_scale * |T - M|
//!   inner circle   radius ratio * R, center blended from M toward mid(M, P)
//!   marker ray     from M at angle k * angle(M -> T) - mark_deg
//!   marker         first forward hit of the ray on the inner circle, then
//!                  pushed out of two guard ellipses (around the inner center
//!                  and around M)
//! ```
//!
//! Geometry is evaluated in a pixel frame (`frame_width` x `frame_height`) so
//! that the guard semi-axes keep their on-screen meaning.

use super::normalize::{NormPoint, FULL_SCALE};
use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-12;

/// Tuning knobs for the pose model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Outer radius as a multiple of |T - M|
    pub outer_scale: f64,
    /// Inner radius as a fraction of the outer radius
    pub inner_ratio: f64,
    /// Exponent applied to the ratio when shifting the inner center toward P
    pub center_shift_gamma: f64,
    /// Slope applied to the M -> T angle
    pub mark_slope: f64,
    /// Intercept in screen-clockwise degrees
    pub mark_deg: f64,
    pub inner_guard_a: f64,
    pub inner_guard_b: f64,
    pub mid_guard_a: f64,
    pub mid_guard_b: f64,
    /// Pixel frame the geometry is evaluated in
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            outer_scale: 1.0,
            inner_ratio: 0.62,
            center_shift_gamma: 1.0,
            mark_slope: 1.0,
            mark_deg: -20.0,
            inner_guard_a: 160.0,
            inner_guard_b: 120.0,
            mid_guard_a: 200.0,
            mid_guard_b: 140.0,
            frame_width: 1920,
            frame_height: 1080,
        }
    }
}

impl PoseConfig {
    /// Map a normalized point into the pixel frame, rounding down.
    pub fn to_frame(&self, p: NormPoint) -> Point {
        let scale = |v: u16, dim: u32| {
            let span = dim.saturating_sub(1) as f64;
            (v as f64 / FULL_SCALE as f64 * span).floor()
        };
        Point::new(scale(p.x, self.frame_width), scale(p.y, self.frame_height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn scale(self, k: f64) -> Point {
        Point::new(self.x * k, self.y * k)
    }

    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        self.sub(other).length()
    }

    pub fn midpoint(self, other: Point) -> Point {
        self.add(other).scale(0.5)
    }

    /// Linear blend, `t = 0` is `self`
    pub fn lerp(self, other: Point, t: f64) -> Point {
        self.scale(1.0 - t).add(other.scale(t))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
}

impl Circle {
    pub fn center(&self) -> Point {
        Point::new(self.cx, self.cy)
    }
}

/// Axis-aligned ellipse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub center: Point,
    pub a: f64,
    pub b: f64,
}

impl Ellipse {
    pub fn new(center: Point, a: f64, b: f64) -> Self {
        Self {
            center,
            a: a.max(1.0),
            b: b.max(1.0),
        }
    }

    /// Implicit form value: negative inside, zero on the boundary
    pub fn level(&self, p: Point) -> f64 {
        let d = p.sub(self.center);
        (d.x / self.a).powi(2) + (d.y / self.b).powi(2) - 1.0
    }

    /// Ray parameters `(enter, exit)` where `origin + s * dir` crosses the
    /// boundary, if the ray's line meets the ellipse.
    fn crossings(&self, origin: Point, dir: Point) -> Option<(f64, f64)> {
        let w = origin.sub(self.center);
        let (a2, b2) = (self.a * self.a, self.b * self.b);
        let qa = dir.x * dir.x / a2 + dir.y * dir.y / b2;
        let qb = 2.0 * (w.x * dir.x / a2 + w.y * dir.y / b2);
        let qc = w.x * w.x / a2 + w.y * w.y / b2 - 1.0;
        solve_quadratic(qa, qb, qc)
    }

    /// Advance `s` along the ray to the exit boundary if it sits inside.
    fn push_out(&self, origin: Point, dir: Point, s: f64) -> f64 {
        match self.crossings(origin, dir) {
            Some((enter, exit)) if enter < s && s < exit => exit,
            _ => s,
        }
    }
}

/// Real roots of `a s^2 + b s + c`, ascending
fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    if a.abs() < EPSILON {
        return None;
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 || !disc.is_finite() {
        return None;
    }
    let root = disc.sqrt();
    let s1 = (-b - root) / (2.0 * a);
    let s2 = (-b + root) / (2.0 * a);
    Some((s1.min(s2), s1.max(s2)))
}

/// Derived geometry for one frame, in the pixel frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseGeometry {
    pub thumb: Point,
    pub mid: Point,
    pub pink: Point,
    pub outer: Circle,
    pub inner: Circle,
    /// Unit direction of the marker ray
    pub direction: Point,
    /// Distance from M to the marker along the ray
    pub distance: f64,
    pub marker: Point,
}

impl PoseGeometry {
    pub fn inner_guard(&self, cfg: &PoseConfig) -> Ellipse {
        Ellipse::new(self.inner.center(), cfg.inner_guard_a, cfg.inner_guard_b)
    }

    pub fn mid_guard(&self, cfg: &PoseConfig) -> Ellipse {
        Ellipse::new(self.mid, cfg.mid_guard_a, cfg.mid_guard_b)
    }
}

/// Compute the pose for one thumb/mid/pinky triple.
///
/// Total over finite inputs: coincident points collapse to the minimum radii
/// and a ray along the configured intercept.
pub fn compute_pose(thumb: Point, mid: Point, pink: Point, cfg: &PoseConfig) -> PoseGeometry {
    let outer_r = (thumb.distance(mid) * cfg.outer_scale.max(0.05)).max(2.0);
    let outer = Circle {
        cx: mid.x,
        cy: mid.y,
        r: outer_r,
    };

    let ratio = if cfg.inner_ratio.is_finite() {
        cfg.inner_ratio.clamp(0.05, 0.95)
    } else {
        0.62
    };
    let inner_r = (ratio * outer_r).max(1.0);
    let shift = ratio.clamp(0.0, 1.0).powf(cfg.center_shift_gamma.max(0.1));
    let inner_center = mid.lerp(mid.midpoint(pink), shift);
    let inner = Circle {
        cx: inner_center.x,
        cy: inner_center.y,
        r: inner_r,
    };

    let to_thumb = thumb.sub(mid);
    let theta = cfg.mark_slope * to_thumb.y.atan2(to_thumb.x) - cfg.mark_deg.to_radians();
    let dir = Point::new(theta.cos(), theta.sin());

    let circle = Ellipse {
        center: inner_center,
        a: inner_r,
        b: inner_r,
    };
    let mut distance = base_distance(&circle, mid, dir);

    let inner_guard = Ellipse::new(inner_center, cfg.inner_guard_a, cfg.inner_guard_b);
    let mid_guard = Ellipse::new(mid, cfg.mid_guard_a, cfg.mid_guard_b);
    distance = inner_guard.push_out(mid, dir, distance);
    distance = mid_guard.push_out(mid, dir, distance);

    // A push past one region can land inside another. Regions are convex and
    // each push clears one of them for good, so this settles in a few passes.
    let regions = [circle, inner_guard, mid_guard];
    for _ in 0..regions.len() {
        let settled = regions
            .iter()
            .fold(distance, |s, region| region.push_out(mid, dir, s));
        if settled == distance {
            break;
        }
        distance = settled;
    }

    PoseGeometry {
        thumb,
        mid,
        pink,
        outer,
        inner,
        direction: dir,
        distance,
        marker: mid.add(dir.scale(distance)),
    }
}

/// First forward hit of the ray on the inner circle.
///
/// A miss snaps to the circle point nearest the ray's closest approach and
/// keeps that point's distance from the origin.
fn base_distance(circle: &Ellipse, origin: Point, dir: Point) -> f64 {
    match circle.crossings(origin, dir) {
        Some((near, far)) => {
            if near >= 0.0 {
                near
            } else {
                far.max(0.0)
            }
        }
        None => {
            let w = origin.sub(circle.center);
            let closest = origin.add(dir.scale((-w.dot(dir)).max(0.0)));
            let out = closest.sub(circle.center);
            let len = out.length();
            if len < EPSILON {
                return 0.0;
            }
            let snapped = circle.center.add(out.scale(circle.a / len));
            snapped.distance(origin)
        }
    }
}

/// Per-frame pose state. Never carries geometry across a frame with fewer
/// than three contacts.
#[derive(Debug, Clone, Default)]
pub struct PoseModel {
    current: Option<PoseGeometry>,
}

impl PoseModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute from contacts ordered by start time.
    pub fn update(&mut self, ordered: &[NormPoint], cfg: &PoseConfig) -> Option<&PoseGeometry> {
        self.current = match ordered {
            [t, m, p, ..] => Some(compute_pose(
                cfg.to_frame(*t),
                cfg.to_frame(*m),
                cfg.to_frame(*p),
                cfg,
            )),
            _ => None,
        };
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&PoseGeometry> {
        self.current.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn assert_valid(g: &PoseGeometry, cfg: &PoseConfig) {
        assert!(g.marker.x.is_finite() && g.marker.y.is_finite());
        assert!(g.distance >= 0.0);
        assert!(
            g.inner.center().distance(g.marker) >= g.inner.r - 1e-6,
            "marker inside inner circle: {:?}",
            g
        );
        assert!(g.inner_guard(cfg).level(g.marker) >= -1e-6);
        assert!(g.mid_guard(cfg).level(g.marker) >= -1e-6);
    }

    #[test]
    fn test_outer_and_inner_circles() {
        let cfg = PoseConfig::default();
        let g = compute_pose(
            Point::new(400.0, 500.0),
            Point::new(700.0, 500.0),
            Point::new(1000.0, 500.0),
            &cfg,
        );
        assert!(approx(g.outer.r, 300.0));
        assert!(approx(g.outer.cx, 700.0));
        assert!(approx(g.inner.r, 0.62 * 300.0));
        // Linear shift: 62% of the way from M to mid(M, P) = 850
        assert!(approx(g.inner.cx, 700.0 + 0.62 * 150.0));
        assert!(approx(g.inner.cy, 500.0));
    }

    #[test]
    fn test_ratio_is_clamped() {
        let cfg = PoseConfig {
            inner_ratio: 3.0,
            ..PoseConfig::default()
        };
        let g = compute_pose(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(200.0, 0.0),
            &cfg,
        );
        assert!(approx(g.inner.r, 95.0));
    }

    #[test]
    fn test_gamma_zero_floor_shifts_center() {
        let cfg = PoseConfig {
            center_shift_gamma: 0.0,
            ..PoseConfig::default()
        };
        let g = compute_pose(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(300.0, 0.0),
            &cfg,
        );
        let shift = 0.62f64.powf(0.1);
        assert!(approx(g.inner.cx, 100.0 + shift * 100.0));
    }

    #[test]
    fn test_marker_hits_inner_circle_without_guards() {
        let cfg = PoseConfig {
            mark_deg: 0.0,
            inner_guard_a: 1.0,
            inner_guard_b: 1.0,
            mid_guard_a: 1.0,
            mid_guard_b: 1.0,
            ..PoseConfig::default()
        };
        // Thumb straight right of M, ray points right; inner circle centered
        // on M because P coincides with M
        let m = Point::new(500.0, 500.0);
        let g = compute_pose(Point::new(700.0, 500.0), m, m, &cfg);
        assert!(approx(g.direction.x, 1.0));
        assert!(approx(g.distance, 0.62 * 200.0));
        assert!(approx(g.marker.x, 500.0 + 124.0));
        assert!(approx(g.marker.y, 500.0));
    }

    #[test]
    fn test_intercept_rotates_screen_clockwise() {
        let cfg = PoseConfig {
            mark_deg: -90.0,
            ..PoseConfig::default()
        };
        let m = Point::new(500.0, 500.0);
        let g = compute_pose(Point::new(700.0, 500.0), m, m, &cfg);
        // theta = 0 - (-90deg): ray points down the screen
        assert!(approx(g.direction.x, 0.0));
        assert!(approx(g.direction.y, 1.0));
    }

    #[test]
    fn test_mid_guard_pushes_marker_out() {
        let cfg = PoseConfig {
            mark_deg: 0.0,
            inner_guard_a: 1.0,
            inner_guard_b: 1.0,
            ..PoseConfig::default()
        };
        let m = Point::new(500.0, 500.0);
        let g = compute_pose(Point::new(600.0, 500.0), m, m, &cfg);
        // Circle hit at 62 is inside the 200px mid guard along +x
        assert!(approx(g.distance, 200.0));
        assert_valid(&g, &cfg);
    }

    #[test]
    fn test_inner_guard_applies_before_mid_guard() {
        let cfg = PoseConfig {
            mark_deg: 0.0,
            inner_guard_a: 300.0,
            inner_guard_b: 100.0,
            ..PoseConfig::default()
        };
        let m = Point::new(500.0, 500.0);
        let g = compute_pose(Point::new(600.0, 500.0), m, m, &cfg);
        assert!(approx(g.distance, 300.0));
        assert_valid(&g, &cfg);
    }

    #[test]
    fn test_guards_never_pull_marker_back() {
        let cfg = PoseConfig {
            mark_deg: 0.0,
            ..PoseConfig::default()
        };
        let m = Point::new(500.0, 500.0);
        let g = compute_pose(Point::new(1500.0, 500.0), m, m, &cfg);
        // Circle hit at 620 is already beyond both guards
        assert!(approx(g.distance, 620.0));
    }

    #[test]
    fn test_ray_missing_circle_snaps_distance() {
        let cfg = PoseConfig {
            mark_deg: 90.0,
            inner_guard_a: 1.0,
            inner_guard_b: 1.0,
            mid_guard_a: 1.0,
            mid_guard_b: 1.0,
            ..PoseConfig::default()
        };
        // M outside the inner circle (P far away), ray points up the screen
        let m = Point::new(100.0, 500.0);
        let g = compute_pose(Point::new(110.0, 500.0), m, Point::new(1100.0, 500.0), &cfg);
        assert!(approx(g.direction.y, -1.0));
        let center = g.inner.center();
        let snapped = center.add(m.sub(center).scale(g.inner.r / m.distance(center)));
        assert!(approx(g.distance, snapped.distance(m)));
        assert_valid(&g, &cfg);
    }

    #[test]
    fn test_circle_behind_origin_collapses_to_mid_guard() {
        let cfg = PoseConfig {
            mark_deg: 180.0,
            inner_guard_a: 1.0,
            inner_guard_b: 1.0,
            mid_guard_a: 1.0,
            mid_guard_b: 1.0,
            ..PoseConfig::default()
        };
        // Inner circle lies to the right of M, ray points left
        let m = Point::new(100.0, 500.0);
        let g = compute_pose(Point::new(300.0, 500.0), m, Point::new(1500.0, 500.0), &cfg);
        assert!(approx(g.direction.x, -1.0));
        // Base distance 0, then the 1px mid guard
        assert!(approx(g.distance, 1.0));
    }

    #[test]
    fn test_totality_over_grid() {
        let cfg = PoseConfig::default();
        let coords = [0.0, 37.0, 480.0, 960.0, 1500.0, 1919.0];
        for &tx in &coords {
            for &ty in &[0.0, 300.0, 1079.0] {
                for &px in &coords {
                    for &py in &[0.0, 540.0, 1079.0] {
                        let t = Point::new(tx, ty);
                        let m = Point::new(960.0, 540.0);
                        let p = Point::new(px, py);
                        if t == m || p == m {
                            continue;
                        }
                        let g = compute_pose(t, m, p, &cfg);
                        assert_valid(&g, &cfg);
                    }
                }
            }
        }
    }

    #[test]
    fn test_coincident_points_do_not_panic() {
        let cfg = PoseConfig::default();
        let p = Point::new(10.0, 10.0);
        let g = compute_pose(p, p, p, &cfg);
        assert!(approx(g.outer.r, 2.0));
        assert!(g.marker.x.is_finite());
    }

    #[test]
    fn test_to_frame_rounds_down() {
        let cfg = PoseConfig::default();
        assert_eq!(cfg.to_frame(NormPoint::new(0, 0)), Point::new(0.0, 0.0));
        assert_eq!(
            cfg.to_frame(NormPoint::new(FULL_SCALE, FULL_SCALE)),
            Point::new(1919.0, 1079.0)
        );
        assert_eq!(cfg.to_frame(NormPoint::new(32768, 0)).x, 959.0);
    }

    #[test]
    fn test_model_hides_below_three_contacts() {
        let cfg = PoseConfig::default();
        let mut model = PoseModel::new();
        let pts = [
            NormPoint::new(10_000, 30_000),
            NormPoint::new(30_000, 30_000),
            NormPoint::new(50_000, 30_000),
        ];
        assert!(model.update(&pts, &cfg).is_some());
        assert!(model.is_visible());

        assert!(model.update(&pts[..2], &cfg).is_none());
        assert!(!model.is_visible());
        assert!(model.current().is_none());
    }

    #[test]
    fn test_model_uses_three_earliest() {
        let cfg = PoseConfig::default();
        let mut model = PoseModel::new();
        let pts = [
            NormPoint::new(10_000, 30_000),
            NormPoint::new(30_000, 30_000),
            NormPoint::new(50_000, 30_000),
            NormPoint::new(60_000, 60_000),
        ];
        let g = *model.update(&pts, &cfg).unwrap();
        assert_eq!(g.thumb, cfg.to_frame(pts[0]));
        assert_eq!(g.mid, cfg.to_frame(pts[1]));
        assert_eq!(g.pink, cfg.to_frame(pts[2]));
    }
}
