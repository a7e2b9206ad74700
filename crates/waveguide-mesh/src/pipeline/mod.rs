//! The geometry assembly / sizing / post-processing stages that sit
//! between the point-grid builder and the final canonical mesh.

pub mod assembler;
pub mod postprocess;
pub mod sizing;
