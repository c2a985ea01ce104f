//! Web-Mercator distance helpers.
//!
//! The routing graph stores points already projected to Web Mercator, so
//! distance is plain Euclidean distance scaled by a latitude-dependent
//! distortion factor rather than a haversine computation on lon/lat.

use geo::Point;

/// Earth radius used by the Web Mercator projection, in meters.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Euclidean distance between two already-projected Web Mercator points,
/// corrected for projection distortion at the midpoint latitude.
#[must_use]
pub fn web_merc_meter_dist(a: Point, b: Point) -> f64 {
    let dx = a.x() - b.x();
    let dy = a.y() - b.y();
    let planar = (dx * dx + dy * dy).sqrt();
    planar * web_merc_dist_factor(a)
}

/// Local distortion factor of the Web Mercator projection at `p`,
/// i.e. `1 / cos(latitude)` recovered from the projected `y` coordinate.
#[must_use]
pub fn web_merc_dist_factor(p: Point) -> f64 {
    let lat = (2.0 * (p.y() / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).cos();
    if lat.abs() < 1e-9 {
        1.0
    } else {
        1.0 / lat
    }
}

/// Axis-aligned bounding box padded by `meters` in every direction,
/// accounting for local projection distortion.
#[must_use]
pub fn padded_bbox(p: Point, meters: f64) -> (Point, Point) {
    let pad = meters * web_merc_dist_factor(p);
    (
        Point::new(p.x() - pad, p.y() - pad),
        Point::new(p.x() + pad, p.y() + pad),
    )
}

/// Angle in degrees at vertex `m` formed by rays `m->f` and `m->t`,
/// `0` for a straight-through path and `180` for a full U-turn.
#[must_use]
pub fn inner_angle(f: Point, m: Point, t: Point) -> f64 {
    let v1 = (f.x() - m.x(), f.y() - m.y());
    let v2 = (t.x() - m.x(), t.y() - m.y());
    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let mag = ((v1.0 * v1.0 + v1.1 * v1.1).sqrt()) * ((v2.0 * v2.0 + v2.1 * v2.1).sqrt());
    if mag < 1e-12 {
        return 0.0;
    }
    (dot / mag).clamp(-1.0, 1.0).acos().to_degrees()
}

/// `true` if the angle at `m` between `f` and `t` is smaller than `ang`
/// degrees, i.e. the turn is sharper than the given threshold.
#[must_use]
pub fn ang_smaller(f: Point, m: Point, t: Point, ang: f64) -> bool {
    inner_angle(f, m, t) < ang
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn distance_is_symmetric() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1000.0, 1000.0);
        assert_relative_eq!(web_merc_meter_dist(a, b), web_merc_meter_dist(b, a), epsilon = 1e-9);
    }

    #[test]
    fn straight_line_has_180_degree_angle() {
        let f = Point::new(-1.0, 0.0);
        let m = Point::new(0.0, 0.0);
        let t = Point::new(1.0, 0.0);
        assert_relative_eq!(inner_angle(f, m, t), 180.0, epsilon = 1e-6);
    }

    #[test]
    fn u_turn_has_zero_degree_angle() {
        let f = Point::new(-1.0, 0.0);
        let m = Point::new(0.0, 0.0);
        let t = Point::new(-1.0, 0.0);
        assert_relative_eq!(inner_angle(f, m, t), 0.0, epsilon = 1e-6);
    }
}
