//! Waveguide Mesh Core
//!
//! Kernel-agnostic geometric primitives shared by the rest of the
//! waveguide mesh builder workspace. Has no dependency on any specific
//! meshing backend.

pub mod geometry;

pub use geometry::{BoundingBox2, BoundingBox3, Vec2, Vec3};
