//! Small planar/3D helpers shared by criteria and the seed estimator.

use std::f64::consts::PI;

/// Momentum conversion constant: `pt [GeV/c] = K · B-scale · R [cm]`.
pub const PT_PER_CM: f64 = 0.00029979;

/// Relative determinant below which three points are treated as collinear.
const COLLINEAR_EPS: f64 = 1e-12;

/// Circle in the transverse (x, y) plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleCircle {
    pub center: [f64; 2],
    pub radius: f64,
}

impl SimpleCircle {
    /// Unweighted circle through three points.
    ///
    /// Returns `None` when the points are (numerically) collinear or the
    /// resulting radius is not finite.
    pub fn through(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> Option<Self> {
        let d = 2.0 * (a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1]));
        let scale = [a, b, c]
            .iter()
            .map(|p| p[0] * p[0] + p[1] * p[1])
            .fold(1.0_f64, f64::max);
        if d.abs() <= COLLINEAR_EPS * scale {
            return None;
        }
        let a2 = a[0] * a[0] + a[1] * a[1];
        let b2 = b[0] * b[0] + b[1] * b[1];
        let c2 = c[0] * c[0] + c[1] * c[1];
        let ux = (a2 * (b[1] - c[1]) + b2 * (c[1] - a[1]) + c2 * (a[1] - b[1])) / d;
        let uy = (a2 * (c[0] - b[0]) + b2 * (a[0] - c[0]) + c2 * (b[0] - a[0])) / d;
        let radius = (a[0] - ux).hypot(a[1] - uy);
        if !radius.is_finite() {
            return None;
        }
        Some(Self {
            center: [ux, uy],
            radius,
        })
    }

    /// Unsigned distance of a point from the circle line.
    pub fn distance_to(&self, p: [f64; 2]) -> f64 {
        ((p[0] - self.center[0]).hypot(p[1] - self.center[1]) - self.radius).abs()
    }

    /// Angle (rad, in [0, π]) subtended at the center between two points.
    pub fn turning_angle(&self, p: [f64; 2], q: [f64; 2]) -> f64 {
        let u = [p[0] - self.center[0], p[1] - self.center[1]];
        let v = [q[0] - self.center[0], q[1] - self.center[1]];
        angle_between_2d(u, v)
    }
}

/// Difference `a − b` wrapped into [−π, π].
pub fn wrap_delta_phi(a: f64, b: f64) -> f64 {
    let mut d = (a - b) % (2.0 * PI);
    if d > PI {
        d -= 2.0 * PI;
    } else if d < -PI {
        d += 2.0 * PI;
    }
    d
}

/// Angle between two 2D vectors in [0, π]; `NaN` when either has zero length.
pub fn angle_between_2d(u: [f64; 2], v: [f64; 2]) -> f64 {
    let cross = u[0] * v[1] - u[1] * v[0];
    let dot = u[0] * v[0] + u[1] * v[1];
    if u[0].hypot(u[1]) == 0.0 || v[0].hypot(v[1]) == 0.0 {
        return f64::NAN;
    }
    cross.abs().atan2(dot)
}

/// Pseudorapidity of a polar angle.
pub fn eta_from_theta(theta: f64) -> f64 {
    -(0.5 * theta).tan().ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn circle_through_three_points_recovers_radius() {
        let r = 120.0;
        let pts: Vec<[f64; 2]> = [0.1_f64, 0.7, 1.9]
            .iter()
            .map(|t| [5.0 + r * t.cos(), -3.0 + r * t.sin()])
            .collect();
        let c = SimpleCircle::through(pts[0], pts[1], pts[2]).expect("circle");
        assert_relative_eq!(c.radius, r, epsilon = 1e-9);
        assert_relative_eq!(c.center[0], 5.0, epsilon = 1e-9);
        assert_relative_eq!(c.center[1], -3.0, epsilon = 1e-9);
        assert_relative_eq!(c.distance_to([5.0, -3.0]), r, epsilon = 1e-9);
    }

    #[test]
    fn collinear_points_have_no_circle() {
        assert!(SimpleCircle::through([0.0, 0.0], [1.0, 1.0], [2.0, 2.0]).is_none());
        assert!(SimpleCircle::through([1.0, 1.0], [1.0, 1.0], [3.0, 0.0]).is_none());
    }

    #[test]
    fn delta_phi_wraps_across_pi() {
        assert_relative_eq!(wrap_delta_phi(3.1, -3.1), 0.2 - 2.0 * PI + 6.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_delta_phi(-3.1, 3.1).abs(), 2.0 * PI - 6.2, epsilon = 1e-12);
        assert_relative_eq!(wrap_delta_phi(0.3, 0.1), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn angles_between_vectors() {
        assert_relative_eq!(angle_between_2d([1.0, 0.0], [0.0, 2.0]), PI / 2.0);
        assert!(angle_between_2d([0.0, 0.0], [1.0, 0.0]).is_nan());
        assert_relative_eq!(eta_from_theta(PI / 2.0), 0.0, epsilon = 1e-12);
    }
}
