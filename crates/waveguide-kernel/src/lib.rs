//! Mesh kernel interface consumed by the waveguide mesh builder.
//!
//! Wraps the native OCCT/Gmsh bridge behind a safe [`MeshKernel`] trait and
//! a [`KernelSession`] guard that owns the process-wide exclusive lock for
//! the lifetime of one build. Only one session may be open at a time;
//! acquiring a second while the first is alive fails rather than blocking,
//! since nothing in this pipeline is meant to run concurrently with itself.

pub mod error;
#[allow(unsafe_op_in_unsafe_fn)]
pub mod ffi;

use std::pin::Pin;

use parking_lot::Mutex;
use waveguide_core::Vec3;

pub use error::{KernelError, KernelResult};

static KERNEL_LOCK: Mutex<()> = Mutex::new(());

/// Operations the mesh build pipeline needs from a geometry/meshing engine.
///
/// Exists so the pipeline crate can be tested against a fake kernel without
/// linking OCCT/Gmsh; [`KernelSession`] is the only production implementor.
pub trait MeshKernel {
    fn clear_model(&mut self) -> KernelResult<()>;
    fn set_geometry_tolerance(&mut self, tol: f64) -> KernelResult<()>;

    fn add_point(&mut self, p: Vec3) -> KernelResult<i32>;
    fn add_bspline(&mut self, points: &[Vec3]) -> KernelResult<i32>;
    fn add_bspline_surface(
        &mut self,
        points_flat: &[Vec3],
        nu: i32,
        nv: i32,
        deg_u: i32,
        deg_v: i32,
    ) -> KernelResult<i32>;
    fn add_wire(&mut self, curve_tags: &[i32]) -> KernelResult<i32>;
    fn add_plane_surface(&mut self, wire_tag: i32) -> KernelResult<i32>;
    fn add_surface_filling(&mut self, wire_tag: i32) -> KernelResult<i32>;
    fn add_thru_sections(&mut self, curve_tags: &[i32]) -> KernelResult<i32>;
    fn fragment(&mut self, surface_tags: &[i32]) -> KernelResult<Vec<i32>>;
    fn get_boundary(&mut self, surface_tag: i32) -> KernelResult<Vec<i32>>;
    fn get_bounding_box(&mut self, surface_tag: i32) -> KernelResult<(Vec3, Vec3)>;

    fn add_size_field_math_eval(&mut self, expr: &str) -> KernelResult<i32>;
    fn add_size_field_distance(&mut self, curve_tags: &[i32], sampling: i32) -> KernelResult<i32>;
    fn add_size_field_threshold(
        &mut self,
        input_field: i32,
        size_min: f64,
        size_max: f64,
        dist_min: f64,
        dist_max: f64,
    ) -> KernelResult<i32>;
    fn add_size_field_restrict(&mut self, input_field: i32, surface_tags: &[i32]) -> KernelResult<i32>;
    fn add_size_field_min(&mut self, field_ids: &[i32]) -> KernelResult<i32>;
    fn set_background_mesh_field(&mut self, field_id: i32) -> KernelResult<()>;

    fn generate_mesh_2d(&mut self) -> KernelResult<()>;
    fn remove_duplicate_nodes(&mut self, tolerance: f64) -> KernelResult<()>;
    fn add_physical_group(&mut self, name: &str, tag: i32, surface_tags: &[i32]) -> KernelResult<()>;

    fn extract_mesh(&mut self) -> KernelResult<RawMesh>;
    fn write_msh(&mut self, path: &str, version: f64) -> KernelResult<()>;
    fn write_stl(&mut self, path: &str) -> KernelResult<()>;
}

/// Flat node/triangle arrays read back from the engine, pre-welding.
#[derive(Debug, Clone, Default)]
pub struct RawMesh {
    pub nodes: Vec<Vec3>,
    pub triangles: Vec<RawTriangle>,
    pub physical_groups: Vec<(String, i32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTriangle {
    pub v0: u32,
    pub v1: u32,
    pub v2: u32,
    pub surface_tag: i32,
}

/// Owns the native model for one build and the process-wide lock that
/// guarantees no other build step touches the same engine concurrently.
///
/// The lock is released when the session is dropped, including on panic.
pub struct KernelSession {
    _guard: parking_lot::MutexGuard<'static, ()>,
    handle: Option<cxx::UniquePtr<ffi::ffi::KernelHandle>>,
}

impl KernelSession {
    /// Acquires the exclusive kernel lock and initializes a fresh native
    /// model. Fails immediately (never blocks) if a session is already open.
    pub fn acquire() -> KernelResult<Self> {
        let guard = KERNEL_LOCK
            .try_lock()
            .ok_or(KernelError::SessionAlreadyHeld)?;
        let handle = ffi::ffi::initialize_kernel().map_err(|e| {
            KernelError::RuntimeUnavailable(e.what().to_string())
        })?;
        if handle.is_null() {
            return Err(KernelError::RuntimeUnavailable(
                "native mesh kernel failed to initialize".into(),
            ));
        }
        tracing::debug!("mesh kernel session acquired");
        Ok(Self {
            _guard: guard,
            handle: Some(handle),
        })
    }

    fn pin(&mut self) -> Pin<&mut ffi::ffi::KernelHandle> {
        self.handle
            .as_mut()
            .expect("kernel handle taken before drop")
            .pin_mut()
    }
}

impl Drop for KernelSession {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            ffi::ffi::finalize_kernel(handle);
            tracing::debug!("mesh kernel session released");
        }
    }
}

fn to_point3(v: Vec3) -> ffi::ffi::Point3 {
    ffi::ffi::Point3 { x: v.x, y: v.y, z: v.z }
}

impl MeshKernel for KernelSession {
    fn clear_model(&mut self) -> KernelResult<()> {
        Ok(self.pin().clear_model()?)
    }

    fn set_geometry_tolerance(&mut self, tol: f64) -> KernelResult<()> {
        Ok(self.pin().set_geometry_tolerance(tol)?)
    }

    fn add_point(&mut self, p: Vec3) -> KernelResult<i32> {
        Ok(self.pin().add_point(to_point3(p))?)
    }

    fn add_bspline(&mut self, points: &[Vec3]) -> KernelResult<i32> {
        let points: Vec<ffi::ffi::Point3> = points.iter().copied().map(to_point3).collect();
        Ok(self.pin().add_bspline(&points)?)
    }

    fn add_bspline_surface(
        &mut self,
        points_flat: &[Vec3],
        nu: i32,
        nv: i32,
        deg_u: i32,
        deg_v: i32,
    ) -> KernelResult<i32> {
        let points: Vec<ffi::ffi::Point3> = points_flat.iter().copied().map(to_point3).collect();
        Ok(self.pin().add_bspline_surface(&points, nu, nv, deg_u, deg_v)?)
    }

    fn add_wire(&mut self, curve_tags: &[i32]) -> KernelResult<i32> {
        Ok(self.pin().add_wire(curve_tags)?)
    }

    fn add_plane_surface(&mut self, wire_tag: i32) -> KernelResult<i32> {
        Ok(self.pin().add_plane_surface(wire_tag)?)
    }

    fn add_surface_filling(&mut self, wire_tag: i32) -> KernelResult<i32> {
        Ok(self.pin().add_surface_filling(wire_tag)?)
    }

    fn add_thru_sections(&mut self, curve_tags: &[i32]) -> KernelResult<i32> {
        Ok(self.pin().add_thru_sections(curve_tags)?)
    }

    fn fragment(&mut self, surface_tags: &[i32]) -> KernelResult<Vec<i32>> {
        Ok(self.pin().fragment(surface_tags)?)
    }

    fn get_boundary(&mut self, surface_tag: i32) -> KernelResult<Vec<i32>> {
        Ok(self.pin().get_boundary(surface_tag)?)
    }

    fn get_bounding_box(&mut self, surface_tag: i32) -> KernelResult<(Vec3, Vec3)> {
        let b = self.pin().get_bounding_box(surface_tag)?;
        Ok((
            Vec3::new(b.xmin, b.ymin, b.zmin),
            Vec3::new(b.xmax, b.ymax, b.zmax),
        ))
    }

    fn add_size_field_math_eval(&mut self, expr: &str) -> KernelResult<i32> {
        Ok(self.pin().add_size_field_math_eval(expr)?)
    }

    fn add_size_field_distance(&mut self, curve_tags: &[i32], sampling: i32) -> KernelResult<i32> {
        Ok(self.pin().add_size_field_distance(curve_tags, sampling)?)
    }

    fn add_size_field_threshold(
        &mut self,
        input_field: i32,
        size_min: f64,
        size_max: f64,
        dist_min: f64,
        dist_max: f64,
    ) -> KernelResult<i32> {
        Ok(self
            .pin()
            .add_size_field_threshold(input_field, size_min, size_max, dist_min, dist_max)?)
    }

    fn add_size_field_restrict(&mut self, input_field: i32, surface_tags: &[i32]) -> KernelResult<i32> {
        Ok(self.pin().add_size_field_restrict(input_field, surface_tags)?)
    }

    fn add_size_field_min(&mut self, field_ids: &[i32]) -> KernelResult<i32> {
        Ok(self.pin().add_size_field_min(field_ids)?)
    }

    fn set_background_mesh_field(&mut self, field_id: i32) -> KernelResult<()> {
        Ok(self.pin().set_background_mesh_field(field_id)?)
    }

    fn generate_mesh_2d(&mut self) -> KernelResult<()> {
        Ok(self.pin().generate_mesh_2d()?)
    }

    fn remove_duplicate_nodes(&mut self, tolerance: f64) -> KernelResult<()> {
        Ok(self.pin().remove_duplicate_nodes(tolerance)?)
    }

    fn add_physical_group(&mut self, name: &str, tag: i32, surface_tags: &[i32]) -> KernelResult<()> {
        Ok(self.pin().add_physical_group(name, tag, surface_tags)?)
    }

    fn extract_mesh(&mut self) -> KernelResult<RawMesh> {
        let raw = self.pin().extract_mesh()?;
        let nodes = raw
            .node_x
            .iter()
            .zip(raw.node_y.iter())
            .zip(raw.node_z.iter())
            .map(|((&x, &y), &z)| Vec3::new(x, y, z))
            .collect();
        let triangles = raw
            .triangles
            .iter()
            .map(|t| RawTriangle {
                v0: t.v0 as u32,
                v1: t.v1 as u32,
                v2: t.v2 as u32,
                surface_tag: t.tag,
            })
            .collect();
        let physical_groups = raw
            .physical_names
            .iter()
            .cloned()
            .zip(raw.physical_tags.iter().copied())
            .collect();
        Ok(RawMesh { nodes, triangles, physical_groups })
    }

    fn write_msh(&mut self, path: &str, version: f64) -> KernelResult<()> {
        Ok(self.pin().write_msh(path, version)?)
    }

    fn write_stl(&mut self, path: &str) -> KernelResult<()> {
        Ok(self.pin().write_stl(path)?)
    }
}
