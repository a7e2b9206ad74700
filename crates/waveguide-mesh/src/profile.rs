//! Two-dimensional (axial, radial) profile evaluation for the two
//! supported horn families, R-OSSE (radius-driven) and OSSE (length-driven).

use crate::error::MeshBuildError;
use crate::expr::Expression;

const DEG: f64 = std::f64::consts::PI / 180.0;

/// `formula_type`: a closed sum with two constructors, never modelled as
/// inheritance since there are exactly two profile families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaType {
    ROsse,
    Osse,
}

impl FormulaType {
    pub fn parse(s: &str) -> Result<Self, MeshBuildError> {
        match s {
            "R-OSSE" => Ok(FormulaType::ROsse),
            "OSSE" => Ok(FormulaType::Osse),
            other => Err(MeshBuildError::UnsupportedFormula(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThroatProfile {
    OsSe,
    CircularArc,
}

/// One evaluated (axial, radial) sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    pub x: f64,
    pub y: f64,
}

/// Parameters shared by both families, already phi-evaluated (phi is baked
/// into the resolved scalars below; only `rot_expr` is re-evaluated since it
/// is needed again at coverage inversion).
pub struct RosseParams {
    pub r: f64,
    pub a_deg: f64,
    pub r0: f64,
    pub a0_deg: f64,
    pub k: f64,
    pub apex_r: f64,
    pub b: f64,
    pub m: f64,
    pub q: f64,
    pub tmax: f64,
}

/// R-OSSE profile: returns `(x, y)` samples for `t` in `[0, tmax]` plus the
/// solved axial length `L`.
pub fn evaluate_rosse(params: &RosseParams, n_length: usize) -> Result<(Vec<ProfilePoint>, f64), MeshBuildError> {
    let RosseParams { r: target_r, a_deg, r0, a0_deg, k, apex_r, b, m, q, tmax } = *params;

    if r0 <= 0.0 || !k.is_finite() || q <= 0.0 || tmax <= 0.0 || tmax > 1.0 {
        return Err(MeshBuildError::InvalidProfileParameters(
            "r0 must be > 0, k finite, q > 0, tmax in (0, 1]".into(),
        ));
    }

    let a0 = a0_deg * DEG;
    let a = a_deg * DEG;

    let c1 = (k * r0).powi(2);
    let c2 = 2.0 * k * r0 * a0.tan();
    let c3 = a.tan().powi(2);
    let target = target_r + r0 * (k - 1.0);

    let l = if c3.abs() < 1e-12 {
        // near-conical: c3 -> 0 degenerates the quadratic to linear.
        if c2.abs() < 1e-12 {
            return Err(MeshBuildError::InvalidProfileParameters(
                "degenerate R-OSSE axial length solve".into(),
            ));
        }
        (target.powi(2) - c1) / c2
    } else {
        let disc = c2 * c2 - 4.0 * c3 * (c1 - target.powi(2));
        if disc < 0.0 {
            return Err(MeshBuildError::InvalidProfileParameters(
                "negative discriminant solving R-OSSE axial length".into(),
            ));
        }
        let root = disc.sqrt();
        ((-c2 + root) / (2.0 * c3)).max((-c2 - root) / (2.0 * c3))
    };

    if !l.is_finite() || l <= 0.0 {
        return Err(MeshBuildError::InvalidProfileParameters(
            "R-OSSE axial length solve produced a non-positive result".into(),
        ));
    }

    let sigma = (apex_r * apex_r + m * m).sqrt();
    let xi = b * l * (((apex_r * apex_r + (1.0 - m).powi(2)).sqrt()) - sigma);

    let mut points = Vec::with_capacity(n_length + 1);
    for i in 0..=n_length {
        let t = tmax * (i as f64) / (n_length as f64);
        let x = l * (sigma - (apex_r * apex_r + (t - m).powi(2)).sqrt()) + xi * t * t;
        let y_os = (c1 + c2 * l * t + c3 * l * l * t * t).sqrt() + r0 * (1.0 - k);
        let y_term = target_r + l * (1.0 - (1.0 + c3 * (t - 1.0).powi(2)).sqrt());
        let y = (1.0 - t.powf(q)) * y_os + t.powf(q) * y_term;
        if !x.is_finite() || !y.is_finite() {
            return Err(MeshBuildError::InvalidProfileParameters(format!(
                "non-finite R-OSSE sample at t={t}"
            )));
        }
        points.push(ProfilePoint { x, y });
    }

    Ok((points, l))
}

pub struct OsseParams {
    pub l: f64,
    pub s: f64,
    pub n: f64,
    pub q: f64,
    pub a_cov_deg: f64,
    pub r0_main: f64,
    pub a0_deg: f64,
    pub k: f64,
    pub h: f64,
    pub throat_ext_angle_deg: f64,
    pub throat_ext_length: f64,
    pub slot_length: f64,
    pub throat_profile: ThroatProfile,
    pub circ_arc_term_angle_deg: f64,
    pub circ_arc_radius: f64,
    pub rot_deg: f64,
    pub r0_base: f64,
}

/// OSSE profile: returns `(x, y)` samples across `[0, total_length]` plus
/// the total axial length.
pub fn evaluate_osse(params: &OsseParams, n_length: usize) -> Result<(Vec<ProfilePoint>, f64), MeshBuildError> {
    let p = params;
    if p.r0_main <= 0.0 || p.q <= 0.0 {
        return Err(MeshBuildError::InvalidProfileParameters(
            "r0 must be > 0 and q > 0 for OSSE".into(),
        ));
    }

    let ext_angle = p.throat_ext_angle_deg * DEG;

    let total_length = p.l + p.slot_length + p.throat_ext_length;
    if !total_length.is_finite() || total_length <= 0.0 {
        return Err(MeshBuildError::InvalidProfileParameters(
            "OSSE total_length must be positive and finite".into(),
        ));
    }

    let base = |z_main: f64| -> f64 { osse_base(p, z_main) };

    let termination = |z_main: f64| -> f64 { osse_termination(p, z_main) };

    let mut points = Vec::with_capacity(n_length + 1);
    for i in 0..=n_length {
        let z = total_length * (i as f64) / (n_length as f64);

        let (x, mut y) = if z <= p.throat_ext_length {
            (z, p.r0_base + z * ext_angle.tan())
        } else if z <= p.throat_ext_length + p.slot_length {
            (z, p.r0_main)
        } else {
            let z_main = z - p.throat_ext_length - p.slot_length;
            let y = match p.throat_profile {
                ThroatProfile::CircularArc => circular_arc_radius(
                    z_main,
                    p.l,
                    p.r0_main,
                    p.circ_arc_term_angle_deg,
                    p.circ_arc_radius,
                    base(p.l),
                )
                .unwrap_or_else(|| base(p.l)),
                ThroatProfile::OsSe => base(z_main) + termination(z_main),
            };
            (z, y)
        };

        if p.h != 0.0 {
            let t_norm = z / total_length;
            y += p.h * (t_norm * std::f64::consts::PI).sin();
        }

        let (x, y) = if p.rot_deg != 0.0 {
            rotate_about(x, y - p.r0_base, p.rot_deg)
        } else {
            (x, y)
        };
        let y = if p.rot_deg != 0.0 { y + p.r0_base } else { y };

        if !x.is_finite() || !y.is_finite() {
            return Err(MeshBuildError::InvalidProfileParameters(format!(
                "non-finite OSSE sample at z={z}"
            )));
        }
        points.push(ProfilePoint { x, y });
    }

    Ok((points, total_length))
}

/// `b(z)` of the OSSE main-body term: the closed-form OS radius at axial
/// position `z_main`, clamped under the square root so a negative `a0_deg`
/// paired with a small `z_main` yields `r0_main*(1-k)` rather than `NaN`.
pub(crate) fn osse_base(p: &OsseParams, z_main: f64) -> f64 {
    let a0 = p.a0_deg * DEG;
    let a_cov = p.a_cov_deg * DEG;
    ((p.k * p.r0_main).powi(2) + 2.0 * p.k * p.r0_main * z_main * a0.tan() + z_main * z_main * a_cov.tan().powi(2))
        .max(0.0)
        .sqrt()
        + p.r0_main * (1.0 - p.k)
}

/// Termination contribution added to `osse_base` over the main body.
pub(crate) fn osse_termination(p: &OsseParams, z_main: f64) -> f64 {
    if z_main <= 0.0 || !p.n.is_finite() || p.n <= 0.0 || !p.q.is_finite() || p.l <= 0.0 || !p.s.is_finite() {
        return 0.0;
    }
    let z_norm = (p.q * z_main / p.l).min(1.0);
    (p.s * p.l / p.q) * (1.0 - (1.0 - z_norm.powf(p.n)).powf(1.0 / p.n))
}

fn rotate_about(x: f64, y: f64, deg: f64) -> (f64, f64) {
    let rad = deg * DEG;
    let (s, c) = rad.sin_cos();
    (x * c - y * s, x * s + y * c)
}

/// Arc tangent at the throat with a terminal tangent angle, or an arc of a
/// fixed radius through the two endpoints when admissible. Falls back to
/// `None` (caller substitutes mouth_r) when neither construction holds.
fn circular_arc_radius(
    z_main: f64,
    l_main: f64,
    r0_main: f64,
    term_angle_deg: f64,
    fixed_radius: f64,
    mouth_r_fallback: f64,
) -> Option<f64> {
    if l_main <= 0.0 {
        return None;
    }
    let t = (z_main / l_main).clamp(0.0, 1.0);

    if fixed_radius > 0.0 {
        // Arc of the given radius through (0, r0_main) and (l_main, mouth_r_fallback).
        let dz = l_main;
        let dr = mouth_r_fallback - r0_main;
        let chord = (dz * dz + dr * dr).sqrt();
        if chord <= 2.0 * fixed_radius {
            let h = (fixed_radius * fixed_radius - (chord / 2.0).powi(2)).max(0.0).sqrt();
            let mid_z = dz / 2.0;
            let cz = mid_z; // center offset purely axial for a radial arc in this plane
            let y_at = |z: f64| -> Option<f64> {
                let dz2 = z - cz;
                let inside = fixed_radius * fixed_radius - dz2 * dz2;
                if inside < 0.0 {
                    return None;
                }
                Some(r0_main + dr / 2.0 - h + inside.sqrt())
            };
            return y_at(z_main);
        }
        return None;
    }

    let term_angle = term_angle_deg * DEG;
    if term_angle.cos().abs() < 1e-9 {
        return None;
    }
    let radius = l_main / term_angle.sin().max(1e-9);
    let y = r0_main + radius * (1.0 - (1.0 - t * t).max(0.0).sqrt());
    if y.is_finite() {
        Some(y)
    } else {
        None
    }
}

/// Evaluates a resolved-scalar expression across phi samples without
/// allocating intermediate closures per sample (the expression program is
/// compiled once per profile build).
pub fn sample_expression(expr: &Expression, phi_samples: &[f64]) -> Vec<f64> {
    phi_samples.iter().map(|&phi| expr.eval(phi)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base_rosse() -> RosseParams {
        RosseParams {
            r: 140.0,
            a_deg: 45.0,
            r0: 12.7,
            a0_deg: 15.5,
            k: 2.0,
            apex_r: 0.4,
            b: 0.2,
            m: 0.85,
            q: 3.4,
            tmax: 1.0,
        }
    }

    #[test]
    fn rosse_throat_closure_matches_r0() {
        let (pts, _l) = evaluate_rosse(&base_rosse(), 20).unwrap();
        assert!((pts[0].y - 12.7).abs() < 1e-6);
    }

    #[test]
    fn rosse_axial_length_is_positive() {
        let (_pts, l) = evaluate_rosse(&base_rosse(), 20).unwrap();
        assert!(l > 0.0 && l.is_finite());
    }

    #[test]
    fn rosse_rejects_nonpositive_throat_radius() {
        let mut params = base_rosse();
        params.r0 = 0.0;
        assert!(evaluate_rosse(&params, 10).is_err());
    }

    #[test]
    fn osse_throat_extension_is_linear() {
        let params = OsseParams {
            l: 120.0,
            s: 0.6,
            n: 4.158,
            q: 0.991,
            a_cov_deg: 60.0,
            r0_main: 12.7,
            a0_deg: 15.5,
            k: 7.0,
            h: 0.0,
            throat_ext_angle_deg: 10.0,
            throat_ext_length: 5.0,
            slot_length: 0.0,
            throat_profile: ThroatProfile::OsSe,
            circ_arc_term_angle_deg: 0.0,
            circ_arc_radius: 0.0,
            rot_deg: 0.0,
            r0_base: 12.7,
        };
        let (pts, total) = evaluate_osse(&params, 50).unwrap();
        assert_eq!(pts[0].y, 12.7);
        assert!(total > params.l);
    }
}
