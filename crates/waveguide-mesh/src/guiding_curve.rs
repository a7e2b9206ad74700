//! Guiding-curve radius functions and OSSE coverage-angle inversion.

use crate::profile::{osse_base, osse_termination, OsseParams, ThroatProfile};

const DEG: f64 = std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidingCurveType {
    None,
    Superellipse,
    Superformula,
}

pub struct SuperellipseParams {
    pub width: f64,
    pub aspect_ratio: f64,
    pub n: f64,
    pub rot_deg: f64,
}

pub struct SuperformulaParams {
    pub width: f64,
    pub aspect_ratio: f64,
    pub a: f64,
    pub b: f64,
    pub m1: f64,
    pub m2: f64,
    pub n1: f64,
    pub n2: f64,
    pub n3: f64,
    pub rot_deg: f64,
}

/// Radius of the guiding curve at azimuth `phi`, or `None` if disabled or
/// the evaluation is degenerate (e.g. division by zero).
pub fn superellipse_radius(params: &SuperellipseParams, phi: f64) -> Option<f64> {
    let a = params.width / 2.0;
    let b = a * params.aspect_ratio;
    if a <= 0.0 || b <= 0.0 || params.n <= 0.0 {
        return None;
    }
    let theta = phi - params.rot_deg * DEG;
    let term = (theta.cos() / a).abs().powf(params.n) + (theta.sin() / b).abs().powf(params.n);
    if term <= 0.0 || !term.is_finite() {
        return None;
    }
    let r = term.powf(-1.0 / params.n);
    r.is_finite().then_some(r)
}

pub fn superformula_radius(params: &SuperformulaParams, phi: f64) -> Option<f64> {
    if params.a <= 0.0 || params.b <= 0.0 || params.n1 == 0.0 {
        return None;
    }
    let theta = phi - params.rot_deg * DEG;
    let term1 = ((params.m1 * theta / 4.0).cos() / params.a).abs().powf(params.n2);
    let term2 = ((params.m2 * theta / 4.0).sin() / params.b).abs().powf(params.n3);
    let sum = term1 + term2;
    if sum <= 0.0 || !sum.is_finite() {
        return None;
    }
    let base = sum.powf(-1.0 / params.n1);
    let sx = params.width / 2.0;
    let sy = params.width / 2.0 * params.aspect_ratio;
    let x = base * theta.cos() * sx;
    let y = base * theta.sin() * sy;
    let r = (x * x + y * y).sqrt();
    r.is_finite().then_some(r)
}

/// Inverts the OSSE radial function at a fixed axial position to recover
/// the coverage angle that would produce `target_radius` there, by
/// bisection over `[0.5deg, 89deg]`.
pub fn invert_coverage_angle(
    base_params: &OsseParams,
    z_main: f64,
    target_radius: f64,
    iterations: u32,
) -> f64 {
    let eval_at = |a_cov_deg: f64| -> f64 {
        let mut p = OsseParams { a_cov_deg, ..clone_osse(base_params) };
        p.throat_profile = ThroatProfile::OsSe;
        osse_base(&p, z_main) + osse_termination(&p, z_main)
    };

    let mut lo = 0.5_f64;
    let mut hi = 89.0_f64;
    for _ in 0..iterations {
        let mid = (lo + hi) / 2.0;
        if eval_at(mid) < target_radius {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) / 2.0
}

fn clone_osse(p: &OsseParams) -> OsseParams {
    OsseParams {
        l: p.l,
        s: p.s,
        n: p.n,
        q: p.q,
        a_cov_deg: p.a_cov_deg,
        r0_main: p.r0_main,
        a0_deg: p.a0_deg,
        k: p.k,
        h: p.h,
        throat_ext_angle_deg: p.throat_ext_angle_deg,
        throat_ext_length: p.throat_ext_length,
        slot_length: p.slot_length,
        throat_profile: p.throat_profile,
        circ_arc_term_angle_deg: p.circ_arc_term_angle_deg,
        circ_arc_radius: p.circ_arc_radius,
        rot_deg: p.rot_deg,
        r0_base: p.r0_base,
    }
}

/// `dist` is interpreted as a fraction of `total_length` when `<= 1`,
/// otherwise as an absolute millimetre offset. Preserved overload per
/// the design notes; callers should not rely on this being unambiguous.
pub fn coverage_sample_z(dist: f64, total_length: f64, ext_len: f64, slot_len: f64) -> f64 {
    let raw = if dist <= 1.0 { dist * total_length } else { dist };
    let raw = raw.clamp(0.0, total_length);
    (raw - ext_len - slot_len).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn superellipse_is_circle_when_aspect_one() {
        let params = SuperellipseParams { width: 300.0, aspect_ratio: 1.0, n: 2.0, rot_deg: 0.0 };
        let r0 = superellipse_radius(&params, 0.0).unwrap();
        let r1 = superellipse_radius(&params, std::f64::consts::FRAC_PI_2).unwrap();
        assert!((r0 - r1).abs() < 1e-9);
        assert!((r0 - 150.0).abs() < 1e-9);
    }

    #[test]
    fn coverage_sample_z_interprets_fraction_vs_absolute() {
        assert_eq!(coverage_sample_z(0.5, 120.0, 0.0, 0.0), 60.0);
        assert_eq!(coverage_sample_z(80.0, 120.0, 0.0, 0.0), 80.0);
    }

    #[test]
    fn coverage_sample_z_clips_to_total_length() {
        assert_eq!(coverage_sample_z(500.0, 120.0, 0.0, 0.0), 120.0);
    }

    #[test]
    fn superellipse_target_radii_match_aspect_ratio_08() {
        let params = SuperellipseParams { width: 300.0, aspect_ratio: 0.8, n: 3.0, rot_deg: 0.0 };
        let r0 = superellipse_radius(&params, 0.0).unwrap();
        let r90 = superellipse_radius(&params, std::f64::consts::FRAC_PI_2).unwrap();
        assert!((r0 - 150.0).abs() < 1e-5);
        assert!((r90 - 120.0).abs() < 1e-5);
    }

    /// Coverage-angle bisection round trip: recovering the angle that
    /// produces `target_radius` and re-evaluating the same closed-form
    /// OSSE main-body radius at that angle should land back on the
    /// target within the tolerance the bisection is run to.
    #[test]
    fn invert_coverage_angle_round_trips_to_the_target_radius() {
        let base = OsseParams {
            l: 120.0,
            s: 0.0,
            n: 1.0,
            q: 1.0,
            a_cov_deg: 60.0,
            r0_main: 12.7,
            a0_deg: 15.5,
            k: 7.0,
            h: 0.0,
            throat_ext_angle_deg: 0.0,
            throat_ext_length: 0.0,
            slot_length: 0.0,
            throat_profile: ThroatProfile::OsSe,
            circ_arc_term_angle_deg: 0.0,
            circ_arc_radius: 0.0,
            rot_deg: 0.0,
            r0_base: 12.7,
        };
        let z_main = 60.0;
        for &target in &[150.0, 120.0] {
            let angle = invert_coverage_angle(&base, z_main, target, 60);
            let recovered = ((base.k * base.r0_main).powi(2)
                + 2.0 * base.k * base.r0_main * z_main * (base.a0_deg * DEG).tan()
                + z_main * z_main * (angle * DEG).tan().powi(2))
            .sqrt()
                + base.r0_main * (1.0 - base.k);
            assert!((recovered - target).abs() < 1e-5, "target {target}, recovered {recovered}");
        }
    }
}
