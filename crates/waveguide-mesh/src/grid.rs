//! Builds the 3D point grids consumed by the geometry assembler.
//!
//! Two passes: raw (axial, radial) samples per (phi, t), then a 3D
//! projection that applies the morph blend to the radial component.

use waveguide_core::Vec3;

use crate::morph::{apply_morph, MorphParams, SliceHalfSizes};
use crate::params::Quadrants;
use crate::profile::ProfilePoint;

/// phi samples for the requested quadrant span.
pub fn phi_samples(quadrants: Quadrants, n_angular: u32) -> Vec<f64> {
    let span = quadrants.phi_span();
    let n = n_angular.max(1) as usize;
    if quadrants.is_full_circle() {
        (0..n).map(|i| span * (i as f64) / (n as f64)).collect()
    } else {
        (0..=n).map(|i| span * (i as f64) / (n as f64)).collect()
    }
}

/// `(n_phi, n_len+1)` raw radial samples, one profile evaluation per phi.
pub struct RawGrid {
    pub phi: Vec<f64>,
    /// `rows[phi_idx][t_idx]`
    pub rows: Vec<Vec<ProfilePoint>>,
}

impl RawGrid {
    pub fn n_phi(&self) -> usize {
        self.phi.len()
    }

    pub fn n_len_plus_one(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Per-slice raw bounding half-sizes, used when explicit morph width
    /// and height are not both supplied.
    pub fn slice_half_sizes(&self, t_idx: usize) -> SliceHalfSizes {
        let mut half_w = 0.0_f64;
        let mut half_h = 0.0_f64;
        for (phi_idx, &phi) in self.phi.iter().enumerate() {
            let y = self.rows[phi_idx][t_idx].y;
            half_w = half_w.max((y * phi.cos()).abs());
            half_h = half_h.max((y * phi.sin()).abs());
        }
        SliceHalfSizes { half_w, half_h }
    }
}

/// Projects the raw grid into 3D, applying the morph blend to the radial
/// component: `(y*cos(phi), y*sin(phi), x)`.
pub fn project_inner_grid(raw: &RawGrid, morph: Option<&MorphParams>) -> Vec<Vec<Vec3>> {
    let n_t = raw.n_len_plus_one();
    let slices: Vec<SliceHalfSizes> = (0..n_t).map(|t| raw.slice_half_sizes(t)).collect();

    raw.rows
        .iter()
        .enumerate()
        .map(|(phi_idx, row)| {
            let phi = raw.phi[phi_idx];
            row.iter()
                .enumerate()
                .map(|(t_idx, sample)| {
                    let t_norm = if n_t > 1 { t_idx as f64 / (n_t - 1) as f64 } else { 0.0 };
                    let y = match morph {
                        Some(m) => apply_morph(m, t_norm, phi, sample.y, slices[t_idx]),
                        None => sample.y,
                    };
                    Vec3::new(y * phi.cos(), y * phi.sin(), sample.x)
                })
                .collect()
        })
        .collect()
}

/// Offsets the inner profile outward by `wall_thickness` in the 2D
/// (axial, radial) plane, per row, using a discrete-derivative normal
/// estimate with majority-vote sign stabilisation.
pub fn offset_outer_row(inner_row: &[ProfilePoint], wall_thickness: f64) -> Vec<ProfilePoint> {
    let n = inner_row.len();
    if n == 0 {
        return Vec::new();
    }

    let mut signs = Vec::with_capacity(n);
    let mut normals = Vec::with_capacity(n);
    for i in 0..n {
        let prev = inner_row[i.saturating_sub(1)];
        let next = inner_row[(i + 1).min(n - 1)];
        let dx = next.x - prev.x;
        let dy = next.y - prev.y;
        let len = (dx * dx + dy * dy).sqrt();
        let (nx, ny) = if len > 1e-12 { (dy / len, -dx / len) } else { (1.0, 0.0) };
        normals.push((nx, ny));
        signs.push(if ny >= 0.0 { 1.0 } else { -1.0 });
    }
    let positive_votes = signs.iter().filter(|&&s| s > 0.0).count();
    let majority_sign = if positive_votes * 2 >= n { 1.0 } else { -1.0 };

    let mut outer: Vec<ProfilePoint> = inner_row
        .iter()
        .zip(normals.iter())
        .map(|(p, &(nx, ny))| ProfilePoint {
            x: p.x + majority_sign * nx * wall_thickness,
            y: p.y + majority_sign * ny * wall_thickness,
        })
        .collect();

    // Throat row forced to the inner throat's axial coordinate with
    // radius r_inner + wall_thickness.
    if let Some(first) = outer.first_mut() {
        first.x = inner_row[0].x;
        first.y = inner_row[0].y + wall_thickness;
    }

    outer
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn full_circle_excludes_right_endpoint() {
        let samples = phi_samples(Quadrants::Full, 4);
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], 0.0);
        assert!(samples[3] < std::f64::consts::TAU);
    }

    #[test]
    fn reduced_quadrant_includes_both_endpoints() {
        let samples = phi_samples(Quadrants::Q1, 4);
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[4], std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn outer_row_throat_matches_inner_plus_wall_thickness() {
        let inner = vec![
            ProfilePoint { x: 0.0, y: 12.7 },
            ProfilePoint { x: 10.0, y: 20.0 },
            ProfilePoint { x: 20.0, y: 30.0 },
        ];
        let outer = offset_outer_row(&inner, 6.0);
        assert_eq!(outer[0].x, inner[0].x);
        assert!((outer[0].y - (inner[0].y + 6.0)).abs() < 1e-9);
    }
}
