//! Unified error type for the mesh build pipeline.

use thiserror::Error;

pub type MeshBuildResult<T> = Result<T, MeshBuildError>;

/// Every way a build can fail, one variant per taxonomy entry.
#[derive(Error, Debug)]
pub enum MeshBuildError {
    #[error("invalid expression {text:?}: {reason}")]
    InvalidExpression { text: String, reason: String },

    #[error("invalid profile parameters: {0}")]
    InvalidProfileParameters(String),

    #[error("unsupported formula_type {0:?}")]
    UnsupportedFormula(String),

    #[error("unsupported quadrants value {0:?}")]
    UnsupportedQuadrants(String),

    #[error("adaptive-BEM path requires a closed shell (enc_depth > 0 or wall_thickness > 0)")]
    RequiresClosedShell,

    #[error("unsupported .msh version {0}, expected 2.2 or 4.1")]
    UnsupportedMshVersion(f64),

    #[error(transparent)]
    Kernel(#[from] waveguide_kernel::KernelError),

    #[error("non-manifold edge: {0}")]
    NonManifold(String),

    #[error("inconsistent triangle winding: {0}")]
    InconsistentWinding(String),

    #[error("mesh is not watertight: {0} boundary edge(s) remain")]
    NonWatertight(usize),

    #[error("boundary loop could not be stitched: {0}")]
    CrackedBoundary(String),

    #[error("mesh has {0} connected components, expected 1")]
    DisconnectedMesh(usize),

    #[error("invalid enclosed volume: {0}")]
    InvalidVolume(String),

    #[error("I/O failure: {0}")]
    IoFailure(String),

    #[error("unknown parameter key(s): {0:?}")]
    UnknownParameters(Vec<String>),
}

impl MeshBuildError {
    pub fn code(&self) -> &'static str {
        use MeshBuildError::*;
        match self {
            InvalidExpression { .. } => "invalid_expression",
            InvalidProfileParameters(_) => "invalid_profile_parameters",
            UnsupportedFormula(_) => "unsupported_formula",
            UnsupportedQuadrants(_) => "unsupported_quadrants",
            RequiresClosedShell => "requires_closed_shell",
            UnsupportedMshVersion(_) => "unsupported_msh_version",
            Kernel(k) => k.code(),
            NonManifold(_) => "non_manifold",
            InconsistentWinding(_) => "inconsistent_winding",
            NonWatertight(_) => "non_watertight",
            CrackedBoundary(_) => "cracked_boundary",
            DisconnectedMesh(_) => "disconnected_mesh",
            InvalidVolume(_) => "invalid_volume",
            IoFailure(_) => "io_failure",
            UnknownParameters(_) => "invalid_profile_parameters",
        }
    }
}
