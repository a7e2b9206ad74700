//! Late-axial blend of the radial profile toward a rectangle or circle
//! target, applied after raw profile evaluation and before 3D projection.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphTarget {
    None,
    Rectangle,
    Circle,
}

#[derive(Debug, Clone, Copy)]
pub struct MorphParams {
    pub target: MorphTarget,
    pub fixed: f64,
    pub rate: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub corner: f64,
    pub allow_shrinkage: bool,
}

/// Per-slice half-sizes precomputed from the raw bounding box when the
/// caller hasn't pinned explicit morph width/height.
#[derive(Debug, Clone, Copy)]
pub struct SliceHalfSizes {
    pub half_w: f64,
    pub half_h: f64,
}

/// Applies the morph blend to one raw radius sample.
///
/// `t` is the normalised axial coordinate in `[0, 1]`; `phi` is the
/// azimuth; `raw_r` is the un-morphed radial sample at `(t, phi)`.
pub fn apply_morph(params: &MorphParams, t: f64, phi: f64, raw_r: f64, slice: SliceHalfSizes) -> f64 {
    if params.target == MorphTarget::None || t <= params.fixed {
        return raw_r;
    }

    let denom = (1.0 - params.fixed).max(1e-12);
    let factor = ((t - params.fixed) / denom).clamp(0.0, 1.0).powf(params.rate);

    let half_w = params.width.map(|w| w / 2.0).unwrap_or(slice.half_w);
    let half_h = params.height.map(|h| h / 2.0).unwrap_or(slice.half_h);

    let mut target_r = match params.target {
        MorphTarget::Circle => (half_w * half_h).sqrt(),
        MorphTarget::Rectangle => rounded_rect_radius(phi, half_w, half_h, params.corner),
        MorphTarget::None => unreachable!(),
    };

    if !params.allow_shrinkage {
        target_r = target_r.max(raw_r);
    }

    raw_r + factor * (target_r - raw_r)
}

/// Closed-form distance from the origin to a rectangle with rounded
/// corners of radius `corner_r`, along the ray `(cos phi, sin phi)`.
///
/// The rectangle is `[-half_w, half_w] x [-half_h, half_h]`; the corner
/// region is a quarter-circle of radius `corner_r` inset by
/// `(half_w - corner_r, half_h - corner_r)`.
pub fn rounded_rect_radius(phi: f64, half_w: f64, half_h: f64, corner_r: f64) -> f64 {
    let corner_r = corner_r.min(half_w).min(half_h).max(0.0);
    let dir = (phi.cos(), phi.sin());

    let cx = half_w - corner_r;
    let cy = half_h - corner_r;

    // Which side/corner region does this ray exit through, by slope.
    let ax = dir.0.abs();
    let ay = dir.1.abs();
    if ax < 1e-15 && ay < 1e-15 {
        return 0.0;
    }

    // Candidate flat-side intersections, ignoring sign (use |dir|).
    let t_right = if ax > 1e-15 { half_w / ax } else { f64::INFINITY };
    let t_top = if ay > 1e-15 { half_h / ay } else { f64::INFINITY };

    // The straight-side hit point, at whichever side is reached first.
    let t_side = t_right.min(t_top);
    let hit = (dir.0 * t_side, dir.1 * t_side);

    // If the straight-side hit point falls within the flat segment
    // (not in the rounded-corner quadrant), that is the answer.
    if hit.0.abs() <= cx + 1e-9 || hit.1.abs() <= cy + 1e-9 {
        return t_side;
    }

    // Otherwise the ray exits through the corner arc: solve
    // |t*dir - center|^2 = corner_r^2 for the positive root.
    let center = (cx * dir.0.signum(), cy * dir.1.signum());
    let ox = -center.0;
    let oy = -center.1;
    let a = dir.0 * dir.0 + dir.1 * dir.1;
    let b = 2.0 * (dir.0 * ox + dir.1 * oy);
    let c = ox * ox + oy * oy - corner_r * corner_r;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 || corner_r <= 1e-12 {
        return t_side;
    }
    let root = disc.sqrt();
    let t1 = (-b + root) / (2.0 * a);
    let t2 = (-b - root) / (2.0 * a);
    t1.max(t2).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_morph_before_fixed_point() {
        let params = MorphParams {
            target: MorphTarget::Circle,
            fixed: 0.5,
            rate: 1.0,
            width: Some(200.0),
            height: Some(120.0),
            corner: 10.0,
            allow_shrinkage: false,
        };
        let r = apply_morph(&params, 0.3, 0.0, 42.0, SliceHalfSizes { half_w: 50.0, half_h: 30.0 });
        assert_eq!(r, 42.0);
    }

    #[test]
    fn full_morph_at_t_one_reaches_target_circle() {
        let params = MorphParams {
            target: MorphTarget::Circle,
            fixed: 0.5,
            rate: 1.0,
            width: Some(200.0),
            height: Some(120.0),
            corner: 10.0,
            allow_shrinkage: true,
        };
        let r = apply_morph(&params, 1.0, 0.0, 10.0, SliceHalfSizes { half_w: 50.0, half_h: 30.0 });
        assert!((r - (100.0_f64 * 60.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn rounded_rect_matches_flat_side_on_axis() {
        let r = rounded_rect_radius(0.0, 100.0, 60.0, 10.0);
        assert!((r - 100.0).abs() < 1e-9);
    }

    #[test]
    fn shrinkage_disabled_clamps_target_to_raw() {
        let params = MorphParams {
            target: MorphTarget::Circle,
            fixed: 0.0,
            rate: 1.0,
            width: Some(10.0),
            height: Some(10.0),
            corner: 0.0,
            allow_shrinkage: false,
        };
        // target radius (5) is smaller than raw (50); clamp should prevent shrink.
        let r = apply_morph(&params, 1.0, 0.0, 50.0, SliceHalfSizes { half_w: 5.0, half_h: 5.0 });
        assert_eq!(r, 50.0);
    }
}
