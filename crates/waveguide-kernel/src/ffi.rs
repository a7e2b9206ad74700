//! cxx bridge to the native geometry/meshing engine.
//!
//! The surface here is deliberately narrow: point and curve construction,
//! surface filling and lofting, boundary/bbox queries, mesh-size field
//! composition, 2D surface meshing, and file export. Anything CAD-editing
//! related (booleans, fillets, primitive factories, STEP/IGES import) has
//! no caller in this crate and is not exposed.

#[cxx::bridge(namespace = "waveguide_kernel")]
pub mod ffi {
    #[derive(Debug, Clone, Copy)]
    pub struct Point3 {
        pub x: f64,
        pub y: f64,
        pub z: f64,
    }

    #[derive(Debug, Clone, Copy)]
    pub struct BBox3 {
        pub xmin: f64,
        pub ymin: f64,
        pub zmin: f64,
        pub xmax: f64,
        pub ymax: f64,
        pub zmax: f64,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct TriangleFFI {
        pub v0: i32,
        pub v1: i32,
        pub v2: i32,
        pub tag: i32,
    }

    #[derive(Debug, Default)]
    pub struct MeshResultFFI {
        pub node_x: Vec<f64>,
        pub node_y: Vec<f64>,
        pub node_z: Vec<f64>,
        pub triangles: Vec<TriangleFFI>,
        pub physical_names: Vec<String>,
        pub physical_tags: Vec<i32>,
    }

    unsafe extern "C++" {
        include!("include/bridge.h");

        type KernelHandle;

        /// Initializes the underlying engine. Must be paired with
        /// `finalize_kernel`. Does not itself take the process-wide lock;
        /// that's `KernelSession::acquire`'s job on the Rust side.
        fn initialize_kernel() -> Result<UniquePtr<KernelHandle>>;
        fn finalize_kernel(handle: UniquePtr<KernelHandle>);

        fn clear_model(handle: Pin<&mut KernelHandle>) -> Result<()>;

        fn set_geometry_tolerance(handle: Pin<&mut KernelHandle>, tol: f64) -> Result<()>;

        /// Adds a discrete point, returns its OCC point tag.
        fn add_point(handle: Pin<&mut KernelHandle>, p: Point3) -> Result<i32>;

        /// Fits a B-spline curve through an ordered point list, returns its curve tag.
        fn add_bspline(handle: Pin<&mut KernelHandle>, points: &[Point3]) -> Result<i32>;

        /// Fits a B-spline surface through a flattened `nu x nv` regular
        /// point grid, returns surface tag.
        fn add_bspline_surface(
            handle: Pin<&mut KernelHandle>,
            points_flat: &[Point3],
            nu: i32,
            nv: i32,
            deg_u: i32,
            deg_v: i32,
        ) -> Result<i32>;

        /// Builds a closed wire from a list of curve tags.
        fn add_wire(handle: Pin<&mut KernelHandle>, curve_tags: &[i32]) -> Result<i32>;

        /// Fills a planar or near-planar wire as a single surface, returns surface tag.
        fn add_plane_surface(handle: Pin<&mut KernelHandle>, wire_tag: i32) -> Result<i32>;

        /// Fills an arbitrary (possibly non-planar) wire using a Coons/filling
        /// algorithm, returns surface tag.
        fn add_surface_filling(handle: Pin<&mut KernelHandle>, wire_tag: i32) -> Result<i32>;

        /// Lofts a surface through an ordered list of B-spline curve tags
        /// ("thru sections"), returns surface tag.
        fn add_thru_sections(handle: Pin<&mut KernelHandle>, curve_tags: &[i32]) -> Result<i32>;

        /// Merges coincident boundary entities between surfaces so downstream
        /// meshing treats them as shared.
        fn fragment(handle: Pin<&mut KernelHandle>, surface_tags: &[i32]) -> Result<Vec<i32>>;

        /// Returns the tags of the boundary curves of a surface.
        fn get_boundary(handle: Pin<&mut KernelHandle>, surface_tag: i32) -> Result<Vec<i32>>;

        fn get_bounding_box(handle: Pin<&mut KernelHandle>, surface_tag: i32) -> Result<BBox3>;

        /// Registers a MathEval-backed size field; `expr` may reference x, y, z.
        fn add_size_field_math_eval(handle: Pin<&mut KernelHandle>, expr: &str) -> Result<i32>;

        fn add_size_field_distance(
            handle: Pin<&mut KernelHandle>,
            curve_tags: &[i32],
            sampling: i32,
        ) -> Result<i32>;

        fn add_size_field_threshold(
            handle: Pin<&mut KernelHandle>,
            input_field: i32,
            size_min: f64,
            size_max: f64,
            dist_min: f64,
            dist_max: f64,
        ) -> Result<i32>;

        /// Restricts a field to only apply within the given surfaces.
        fn add_size_field_restrict(
            handle: Pin<&mut KernelHandle>,
            input_field: i32,
            surface_tags: &[i32],
        ) -> Result<i32>;

        fn add_size_field_min(handle: Pin<&mut KernelHandle>, field_ids: &[i32]) -> Result<i32>;

        fn set_background_mesh_field(handle: Pin<&mut KernelHandle>, field_id: i32) -> Result<()>;

        /// Generates a 2D surface mesh over the current model.
        fn generate_mesh_2d(handle: Pin<&mut KernelHandle>) -> Result<()>;

        fn remove_duplicate_nodes(handle: Pin<&mut KernelHandle>, tolerance: f64) -> Result<()>;

        /// Assigns a named physical group over a set of surface tags.
        fn add_physical_group(
            handle: Pin<&mut KernelHandle>,
            name: &str,
            tag: i32,
            surface_tags: &[i32],
        ) -> Result<()>;

        /// Reads back the generated mesh as flat node/triangle arrays.
        fn extract_mesh(handle: Pin<&mut KernelHandle>) -> Result<MeshResultFFI>;

        fn write_msh(handle: Pin<&mut KernelHandle>, path: &str, version: f64) -> Result<()>;
        fn write_stl(handle: Pin<&mut KernelHandle>, path: &str) -> Result<()>;
    }
}
