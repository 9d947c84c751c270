//! Features of a pair of two-hit segments sharing their middle hit.
//!
//! Arguments are `a` (outermost), `b` (shared), `c` (innermost).

use crate::error::CriterionError;
use crate::geometry::{angle_between_2d, SimpleCircle, PT_PER_CM};
use crate::hit::Hit;

use super::two_hit::rz_ratio;

fn xy(h: &Hit) -> [f64; 2] {
    [h.x(), h.y()]
}

fn circle(a: &Hit, b: &Hit, c: &Hit) -> Result<SimpleCircle, CriterionError> {
    SimpleCircle::through(xy(a), xy(b), xy(c))
        .ok_or(CriterionError::Degenerate("collinear hits have no circle"))
}

pub(super) fn angle_3d_deg(a: &Hit, b: &Hit, c: &Hit) -> Result<f64, CriterionError> {
    let u = b.point() - a.point();
    let v = c.point() - b.point();
    if u.norm() == 0.0 || v.norm() == 0.0 {
        return Err(CriterionError::Degenerate("coincident hits"));
    }
    Ok(u.angle(&v).to_degrees())
}

pub(super) fn angle_2d_deg(a: &Hit, b: &Hit, c: &Hit) -> Result<f64, CriterionError> {
    let u = [b.x() - a.x(), b.y() - a.y()];
    let v = [c.x() - b.x(), c.y() - b.y()];
    let angle = angle_between_2d(u, v);
    if angle.is_nan() {
        return Err(CriterionError::Degenerate("no transverse displacement"));
    }
    Ok(angle.to_degrees())
}

pub(super) fn change_rz_ratio(a: &Hit, b: &Hit, c: &Hit) -> Result<f64, CriterionError> {
    Ok(rz_ratio(a, b)? / rz_ratio(b, c)?)
}

pub(super) fn pt(a: &Hit, b: &Hit, c: &Hit, field_scale: f64) -> Result<f64, CriterionError> {
    Ok(circle(a, b, c)?.radius * PT_PER_CM * field_scale)
}

pub(super) fn ip_circle_dist(a: &Hit, b: &Hit, c: &Hit) -> Result<f64, CriterionError> {
    Ok(circle(a, b, c)?.distance_to([0.0, 0.0]))
}
