use waveguide_core::Vec3;
use waveguide_export::{msh, stl, ExportMesh};

fn tetrahedron_mesh() -> ExportMesh {
    let vertices = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
    ];
    let triangles = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
    let surface_tags = vec![1, 1, 1, 2];
    ExportMesh::new(vertices, triangles, surface_tags)
}

#[test]
fn msh_2_2_and_4_1_both_round_trip_element_counts() {
    let mesh = tetrahedron_mesh();

    for version in [msh::MshVersion::V2_2, msh::MshVersion::V4_1] {
        let text = msh::render(&mesh, version).unwrap();
        assert!(text.contains("SD1G0"));
        assert!(text.contains("SD1D1001"));
        assert!(text.contains("$Nodes"));
        assert!(text.contains("$Elements"));
    }
}

#[test]
fn unsupported_msh_version_is_rejected() {
    let err = msh::MshVersion::parse(1.0).unwrap_err();
    assert_eq!(err.code(), "unsupported_msh_version");
}

#[test]
fn stl_ascii_and_binary_write_to_disk() {
    let mesh = tetrahedron_mesh();
    let dir = tempfile::tempdir().unwrap();

    let ascii_path = dir.path().join("mesh.stl");
    stl::export_ascii(&mesh, &ascii_path).unwrap();
    assert!(ascii_path.exists());

    let binary_path = dir.path().join("mesh_bin.stl");
    stl::export_binary(&mesh, &binary_path).unwrap();
    let bytes = std::fs::read(&binary_path).unwrap();
    assert_eq!(bytes.len(), 80 + 4 + 50 * mesh.triangles.len());
}

#[test]
fn msh_file_write_round_trips_through_disk() {
    let mesh = tetrahedron_mesh();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mesh.msh");

    msh::write_file(&mesh, &path, msh::MshVersion::V4_1).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("$MeshFormat\n4.1"));
}
