//! Composes restricted mesh-size fields and combines them by pointwise
//! minimum, matching the kernel's `Min`-over-`Restrict`-fields idiom.

use waveguide_kernel::MeshKernel;

use crate::error::MeshBuildResult;
use crate::params::QuadrantResolutions;

/// Resolutions driving the axial interpolation field.
pub struct AxialSizing {
    pub throat_res: f64,
    pub mouth_res: f64,
    pub z_throat: f64,
    pub z_mouth: f64,
}

impl AxialSizing {
    /// `AXIAL(z) = throat_res + (mouth_res - throat_res) * clamp(t, 0, 1)`.
    pub fn size_at(&self, z: f64) -> f64 {
        let span = (self.z_mouth - self.z_throat).max(1e-9);
        let t = ((z - self.z_throat) / span).clamp(0.0, 1.0);
        self.throat_res + (self.mouth_res - self.throat_res) * t
    }

    fn math_eval_expr(&self) -> String {
        format!(
            "{th} + ({mo} - {th}) * (((z - {zt}) / {span}) < 0 ? 0 : (((z - {zt}) / {span}) > 1 ? 1 : ((z - {zt}) / {span})))",
            th = self.throat_res,
            mo = self.mouth_res,
            zt = self.z_throat,
            span = (self.z_mouth - self.z_throat).max(1e-9),
        )
    }
}

/// Bilinear-per-panel, linear-in-z enclosure sizing between a front and
/// back panel, each with its own four quadrant corner resolutions.
pub struct EnclosureSizing {
    pub front: QuadrantResolutions,
    pub back: QuadrantResolutions,
    pub x_mid: f64,
    pub y_mid: f64,
    pub z_front: f64,
    pub z_back: f64,
}

impl EnclosureSizing {
    fn bilinear(res: &QuadrantResolutions, x: f64, y: f64, x_mid: f64, y_mid: f64) -> f64 {
        // Quadrant corners: Q1=(+x,+y) Q2=(-x,+y) Q3=(-x,-y) Q4=(+x,-y).
        let top = if x >= x_mid { res.q1 } else { res.q2 };
        let bottom = if x >= x_mid { res.q4 } else { res.q3 };
        let ty = if y >= y_mid { 1.0 } else { 0.0 };
        top * ty + bottom * (1.0 - ty)
    }

    pub fn size_at(&self, x: f64, y: f64, z: f64) -> f64 {
        let front = Self::bilinear(&self.front, x, y, self.x_mid, self.y_mid);
        let back = Self::bilinear(&self.back, x, y, self.x_mid, self.y_mid);
        let span = (self.z_back - self.z_front).max(1e-9);
        let t = ((z - self.z_front) / span).clamp(0.0, 1.0);
        front + (back - front) * t
    }
}

/// Builds every size field, restricts each to its surface
/// group, and combines them with a `Min` field set as the background mesh.
pub fn configure_mesh_size(
    kernel: &mut dyn MeshKernel,
    axial: &AxialSizing,
    axial_surfaces: &[i32],
    source_res: f64,
    source_surfaces: &[i32],
    rear_res: f64,
    rear_surfaces: &[i32],
    enclosure: Option<(&EnclosureSizing, &[i32])>,
) -> MeshBuildResult<()> {
    let mut fields = Vec::new();

    if !axial_surfaces.is_empty() {
        let f = kernel.add_size_field_math_eval(&axial.math_eval_expr())?;
        let restricted = kernel.add_size_field_restrict(f, axial_surfaces)?;
        fields.push(restricted);
    }

    if !source_surfaces.is_empty() {
        let f = kernel.add_size_field_math_eval(&source_res.to_string())?;
        let restricted = kernel.add_size_field_restrict(f, source_surfaces)?;
        fields.push(restricted);
    }

    if !rear_surfaces.is_empty() {
        let f = kernel.add_size_field_math_eval(&rear_res.to_string())?;
        let restricted = kernel.add_size_field_restrict(f, rear_surfaces)?;
        fields.push(restricted);
    }

    if let Some((enc, surfaces)) = enclosure {
        if !surfaces.is_empty() {
            let expr = format!(
                "{f1} + ({f2} - {f1}) * (((z - {zf}) / {span}) < 0 ? 0 : (((z - {zf}) / {span}) > 1 ? 1 : ((z - {zf}) / {span})))",
                f1 = EnclosureSizing::bilinear(&enc.front, enc.x_mid + 1.0, enc.y_mid + 1.0, enc.x_mid, enc.y_mid),
                f2 = EnclosureSizing::bilinear(&enc.back, enc.x_mid + 1.0, enc.y_mid + 1.0, enc.x_mid, enc.y_mid),
                zf = enc.z_front,
                span = (enc.z_back - enc.z_front).max(1e-9),
            );
            let f = kernel.add_size_field_math_eval(&expr)?;
            let restricted = kernel.add_size_field_restrict(f, surfaces)?;
            fields.push(restricted);
        }
    }

    if fields.is_empty() {
        return Ok(());
    }

    let combined = kernel.add_size_field_min(&fields)?;
    kernel.set_background_mesh_field(combined)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn axial_sizing_interpolates_linearly() {
        let axial = AxialSizing { throat_res: 5.0, mouth_res: 8.0, z_throat: 0.0, z_mouth: 100.0 };
        assert_eq!(axial.size_at(0.0), 5.0);
        assert_eq!(axial.size_at(100.0), 8.0);
        assert!((axial.size_at(50.0) - 6.5).abs() < 1e-9);
    }

    #[test]
    fn axial_sizing_clamps_outside_span() {
        let axial = AxialSizing { throat_res: 5.0, mouth_res: 8.0, z_throat: 0.0, z_mouth: 100.0 };
        assert_eq!(axial.size_at(-10.0), 5.0);
        assert_eq!(axial.size_at(200.0), 8.0);
    }

    #[test]
    fn enclosure_bilinear_matches_quadrant_corners() {
        let res = QuadrantResolutions { q1: 10.0, q2: 20.0, q3: 30.0, q4: 40.0 };
        assert_eq!(EnclosureSizing::bilinear(&res, 1.0, 1.0, 0.0, 0.0), 10.0);
        assert_eq!(EnclosureSizing::bilinear(&res, -1.0, 1.0, 0.0, 0.0), 20.0);
        assert_eq!(EnclosureSizing::bilinear(&res, -1.0, -1.0, 0.0, 0.0), 30.0);
        assert_eq!(EnclosureSizing::bilinear(&res, 1.0, -1.0, 0.0, 0.0), 40.0);
    }
}
