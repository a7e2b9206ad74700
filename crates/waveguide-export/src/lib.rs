//! Waveguide Export
//!
//! Serialises a tagged triangulation to Gmsh `.msh` (versions 2.2 and 4.1)
//! and to STL (ASCII and binary), independent of whatever produced the
//! triangulation.

use thiserror::Error;

pub mod msh;
pub mod stl;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("unsupported .msh version {0}, expected 2.2 or 4.1")]
    UnsupportedMshVersion(f64),
}

impl ExportError {
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::Io(_) => "io_failure",
            ExportError::InvalidMesh(_) => "invalid_mesh",
            ExportError::UnsupportedMshVersion(_) => "unsupported_msh_version",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// One physical-tag group: a canonical name and the 1-indexed tag it's
/// addressed by in the exported mesh formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalGroup {
    pub tag: i32,
    pub name: &'static str,
}

pub const RIGID_WALL: PhysicalGroup = PhysicalGroup { tag: 1, name: "SD1G0" };
pub const SOURCE_DISC: PhysicalGroup = PhysicalGroup { tag: 2, name: "SD1D1001" };

/// Flat, format-independent mesh data ready for serialisation: vertices in
/// world space, triangles as vertex-index triples, and one physical tag per
/// triangle (`1` = rigid wall, `2` = source disc, per [`RIGID_WALL`] /
/// [`SOURCE_DISC`]).
#[derive(Debug, Clone)]
pub struct ExportMesh {
    pub vertices: Vec<waveguide_core::Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub surface_tags: Vec<i32>,
}

impl ExportMesh {
    pub fn new(vertices: Vec<waveguide_core::Vec3>, triangles: Vec<[u32; 3]>, surface_tags: Vec<i32>) -> Self {
        Self { vertices, triangles, surface_tags }
    }

    pub fn validate(&self) -> Result<()> {
        if self.vertices.is_empty() {
            return Err(ExportError::InvalidMesh("no vertices".into()));
        }
        if self.triangles.is_empty() {
            return Err(ExportError::InvalidMesh("no triangles".into()));
        }
        if self.surface_tags.len() != self.triangles.len() {
            return Err(ExportError::InvalidMesh(
                "surface_tags length must match triangle count".into(),
            ));
        }
        let max_idx = self.vertices.len() as u32;
        for tri in &self.triangles {
            if tri.iter().any(|&i| i >= max_idx) {
                return Err(ExportError::InvalidMesh(format!(
                    "triangle index out of bounds (max {})",
                    max_idx - 1
                )));
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn element_count(&self) -> usize {
        self.triangles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waveguide_core::Vec3;

    fn triangle_mesh() -> ExportMesh {
        ExportMesh::new(
            vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
            vec![1],
        )
    }

    #[test]
    fn validates_well_formed_mesh() {
        assert!(triangle_mesh().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_bounds_index() {
        let mut mesh = triangle_mesh();
        mesh.triangles[0][1] = 9;
        let err = mesh.validate().unwrap_err();
        assert_eq!(err.code(), "invalid_mesh");
    }

    #[test]
    fn rejects_mismatched_tag_count() {
        let mut mesh = triangle_mesh();
        mesh.surface_tags.clear();
        let err = mesh.validate().unwrap_err();
        assert_eq!(err.code(), "invalid_mesh");
    }
}
