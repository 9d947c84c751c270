//! Features of a pair of single-hit segments (outer, inner).

use crate::error::CriterionError;
use crate::geometry::{wrap_delta_phi, SimpleCircle};
use crate::hit::Hit;

/// 3D distance over |Δz|. Equals 1 for hits on a line parallel to the beam.
pub(super) fn rz_ratio(a: &Hit, b: &Hit) -> Result<f64, CriterionError> {
    let dz = a.z() - b.z();
    if dz == 0.0 {
        return Err(CriterionError::Degenerate("zero dz between hits"));
    }
    let dx = a.x() - b.x();
    let dy = a.y() - b.y();
    Ok((dx * dx + dy * dy + dz * dz).sqrt() / dz.abs())
}

/// (ρ/z) of the outer hit over (ρ/z) of the inner hit; 1 for a straight
/// track from the origin.
pub(super) fn straight_track_ratio(outer: &Hit, inner: &Hit) -> Result<f64, CriterionError> {
    if outer.z() == 0.0 || inner.z() == 0.0 {
        return Err(CriterionError::Degenerate("hit at z = 0"));
    }
    let slope_inner = inner.rho() / inner.z();
    if slope_inner == 0.0 {
        return Err(CriterionError::Degenerate("inner hit on the beam axis"));
    }
    Ok((outer.rho() / outer.z()) / slope_inner)
}

/// |Δφ| in degrees, in [0, 180].
pub(super) fn delta_phi_deg(outer: &Hit, inner: &Hit) -> f64 {
    wrap_delta_phi(outer.phi(), inner.phi()).abs().to_degrees()
}

/// Ratio of (turning angle from the IP)/z for both hits on the circle through
/// the IP and the two hits. A helix from the IP advances in z linearly with
/// the turning angle, so the ratio is close to 1.
pub(super) fn helix_with_ip(outer: &Hit, inner: &Hit) -> Result<f64, CriterionError> {
    if outer.z() == 0.0 || inner.z() == 0.0 {
        return Err(CriterionError::Degenerate("hit at z = 0"));
    }
    let ip = [0.0, 0.0];
    let po = [outer.x(), outer.y()];
    let pi = [inner.x(), inner.y()];
    let (s_outer, s_inner) = match SimpleCircle::through(ip, po, pi) {
        Some(circle) => (circle.turning_angle(ip, po), circle.turning_angle(ip, pi)),
        // Straight-line limit: arc length equals transverse distance.
        None => (outer.rho(), inner.rho()),
    };
    let inner_rate = s_inner / inner.z();
    if !inner_rate.is_finite() || inner_rate == 0.0 {
        return Err(CriterionError::Degenerate("no transverse motion at inner hit"));
    }
    Ok((s_outer / outer.z()) / inner_rate)
}
