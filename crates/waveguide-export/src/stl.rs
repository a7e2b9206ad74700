//! STL export, ASCII and binary, mirroring the layout the rest of the
//! pack's mesh exporters use.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::{ExportMesh, Result};

pub fn export_ascii<P: AsRef<Path>>(mesh: &ExportMesh, path: P) -> Result<()> {
    mesh.validate()?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "solid waveguide_mesh")?;
    for tri in &mesh.triangles {
        let v0 = mesh.vertices[tri[0] as usize];
        let v1 = mesh.vertices[tri[1] as usize];
        let v2 = mesh.vertices[tri[2] as usize];
        let n = compute_normal(v0, v1, v2);

        writeln!(writer, "  facet normal {} {} {}", n[0], n[1], n[2])?;
        writeln!(writer, "    outer loop")?;
        writeln!(writer, "      vertex {} {} {}", v0.x, v0.y, v0.z)?;
        writeln!(writer, "      vertex {} {} {}", v1.x, v1.y, v1.z)?;
        writeln!(writer, "      vertex {} {} {}", v2.x, v2.y, v2.z)?;
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid waveguide_mesh")?;
    Ok(())
}

pub fn export_binary<P: AsRef<Path>>(mesh: &ExportMesh, path: P) -> Result<()> {
    mesh.validate()?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let mut header = [0u8; 80];
    let header_text = b"waveguide-mesh binary STL";
    header[..header_text.len()].copy_from_slice(header_text);
    writer.write_all(&header)?;
    writer.write_all(&(mesh.triangles.len() as u32).to_le_bytes())?;

    for tri in &mesh.triangles {
        let v0 = mesh.vertices[tri[0] as usize];
        let v1 = mesh.vertices[tri[1] as usize];
        let v2 = mesh.vertices[tri[2] as usize];
        let n = compute_normal(v0, v1, v2);

        for component in n {
            writer.write_all(&(component as f32).to_le_bytes())?;
        }
        for v in [v0, v1, v2] {
            writer.write_all(&(v.x as f32).to_le_bytes())?;
            writer.write_all(&(v.y as f32).to_le_bytes())?;
            writer.write_all(&(v.z as f32).to_le_bytes())?;
        }
        writer.write_all(&[0u8, 0u8])?;
    }
    Ok(())
}

fn compute_normal(v0: waveguide_core::Vec3, v1: waveguide_core::Vec3, v2: waveguide_core::Vec3) -> [f64; 3] {
    let n = (v1 - v0).cross(v2 - v0);
    let len = n.length();
    if len > 1e-10 {
        [n.x / len, n.y / len, n.z / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waveguide_core::Vec3;

    fn make_test_mesh() -> ExportMesh {
        ExportMesh::new(
            vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.5, 1.0, 0.0)],
            vec![[0, 1, 2]],
            vec![1],
        )
    }

    #[test]
    fn ascii_export_has_solid_wrapper() {
        let mesh = make_test_mesh();
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("test.stl");

        export_ascii(&mesh, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("solid waveguide_mesh"));
        assert!(content.contains("facet normal"));
        assert!(content.trim_end().ends_with("endsolid waveguide_mesh"));
    }

    #[test]
    fn binary_export_has_expected_byte_length() {
        let mesh = make_test_mesh();
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("test_binary.stl");

        export_binary(&mesh, &path).unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 80 + 4 + 50);
    }

    #[test]
    fn normal_points_out_of_plane() {
        let n = compute_normal(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert!((n[2] - 1.0).abs() < 1e-6);
    }
}
