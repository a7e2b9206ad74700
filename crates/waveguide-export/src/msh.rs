//! Gmsh `.msh` text writer, supporting the two versions this system's
//! downstream BEM tooling accepts.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::{ExportError, ExportMesh, Result, RIGID_WALL, SOURCE_DISC};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MshVersion {
    V2_2,
    V4_1,
}

impl MshVersion {
    pub fn parse(version: f64) -> Result<Self> {
        if version == 2.2 {
            Ok(MshVersion::V2_2)
        } else if version == 4.1 {
            Ok(MshVersion::V4_1)
        } else {
            Err(ExportError::UnsupportedMshVersion(version))
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            MshVersion::V2_2 => 2.2,
            MshVersion::V4_1 => 4.1,
        }
    }
}

fn physical_name(tag: i32) -> &'static str {
    if tag == SOURCE_DISC.tag {
        SOURCE_DISC.name
    } else {
        RIGID_WALL.name
    }
}

/// Groups triangle indices by physical tag, in ascending tag order, so
/// every format writes entity/element blocks deterministically.
fn group_by_tag(mesh: &ExportMesh) -> BTreeMap<i32, Vec<usize>> {
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &tag) in mesh.surface_tags.iter().enumerate() {
        groups.entry(tag).or_default().push(i);
    }
    groups
}

/// Renders the mesh as `.msh` text in the requested version. Physical group
/// names (`SD1G0`, `SD1D1001`) are always preserved in `$PhysicalNames`,
/// regardless of version.
pub fn render(mesh: &ExportMesh, version: MshVersion) -> Result<String> {
    mesh.validate()?;
    match version {
        MshVersion::V2_2 => Ok(render_v2_2(mesh)),
        MshVersion::V4_1 => Ok(render_v4_1(mesh)),
    }
}

pub fn write_file<P: AsRef<Path>>(mesh: &ExportMesh, path: P, version: MshVersion) -> Result<()> {
    let text = render(mesh, version)?;
    let mut file = File::create(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

fn physical_names_block(groups: &BTreeMap<i32, Vec<usize>>) -> String {
    let mut out = String::new();
    out.push_str("$PhysicalNames\n");
    out.push_str(&format!("{}\n", groups.len()));
    for &tag in groups.keys() {
        out.push_str(&format!("2 {tag} \"{}\"\n", physical_name(tag)));
    }
    out.push_str("$EndPhysicalNames\n");
    out
}

fn render_v2_2(mesh: &ExportMesh) -> String {
    let groups = group_by_tag(mesh);
    let mut out = String::new();

    out.push_str("$MeshFormat\n2.2 0 8\n$EndMeshFormat\n");
    out.push_str(&physical_names_block(&groups));

    out.push_str("$Nodes\n");
    out.push_str(&format!("{}\n", mesh.vertices.len()));
    for (i, v) in mesh.vertices.iter().enumerate() {
        out.push_str(&format!("{} {} {} {}\n", i + 1, v.x, v.y, v.z));
    }
    out.push_str("$EndNodes\n");

    out.push_str("$Elements\n");
    out.push_str(&format!("{}\n", mesh.triangles.len()));
    let mut elm_id = 1usize;
    for (&tag, indices) in &groups {
        for &ti in indices {
            let tri = mesh.triangles[ti];
            out.push_str(&format!(
                "{elm_id} 2 2 {tag} {tag} {} {} {}\n",
                tri[0] + 1,
                tri[1] + 1,
                tri[2] + 1
            ));
            elm_id += 1;
        }
    }
    out.push_str("$EndElements\n");
    out
}

/// Groups by entity, one entity per physical tag, entity tag offset by
/// `1000` from the physical tag to keep the two numbering spaces visibly
/// distinct (Gmsh itself assigns these independently).
fn render_v4_1(mesh: &ExportMesh) -> String {
    let groups = group_by_tag(mesh);
    let mut out = String::new();

    out.push_str("$MeshFormat\n4.1 0 8\n$EndMeshFormat\n");
    out.push_str(&physical_names_block(&groups));

    out.push_str("$Entities\n");
    out.push_str(&format!("0 0 {} 0\n", groups.len()));
    for &tag in groups.keys() {
        let entity_tag = 1000 + tag;
        out.push_str(&format!("{entity_tag} 0 0 0 0 0 0 1 {tag} 0\n"));
    }
    out.push_str("$EndEntities\n");

    out.push_str("$Nodes\n");
    out.push_str(&format!("{} {} 1 {}\n", groups.len(), mesh.vertices.len(), mesh.vertices.len()));
    let mut node_id = 1usize;
    let mut node_blocks: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (&tag, indices) in &groups {
        let mut seen = Vec::new();
        for &ti in indices {
            for &vi in &mesh.triangles[ti] {
                if !seen.contains(&(vi as usize)) {
                    seen.push(vi as usize);
                }
            }
        }
        node_blocks.insert(tag, seen);
    }
    for (&tag, node_indices) in &node_blocks {
        let entity_tag = 1000 + tag;
        out.push_str(&format!("2 {entity_tag} 0 {}\n", node_indices.len()));
        let ids: Vec<usize> = (0..node_indices.len()).map(|k| node_id + k).collect();
        for id in &ids {
            out.push_str(&format!("{id}\n"));
        }
        for &vi in node_indices {
            let v = mesh.vertices[vi];
            out.push_str(&format!("{} {} {}\n", v.x, v.y, v.z));
        }
        node_id += node_indices.len();
    }
    out.push_str("$EndNodes\n");

    out.push_str("$Elements\n");
    out.push_str(&format!("{} {} 1 {}\n", groups.len(), mesh.triangles.len(), mesh.triangles.len()));
    let mut elm_id = 1usize;
    for (&tag, indices) in &groups {
        let entity_tag = 1000 + tag;
        out.push_str(&format!("2 {entity_tag} 2 {}\n", indices.len()));
        for &ti in indices {
            let tri = mesh.triangles[ti];
            out.push_str(&format!("{elm_id} {} {} {}\n", tri[0] + 1, tri[1] + 1, tri[2] + 1));
            elm_id += 1;
        }
    }
    out.push_str("$EndElements\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use waveguide_core::Vec3;

    fn two_triangle_mesh() -> ExportMesh {
        ExportMesh::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [1, 3, 2]],
            vec![1, 2],
        )
    }

    #[test]
    fn rejects_unsupported_version() {
        assert!(MshVersion::parse(3.0).is_err());
    }

    #[test]
    fn v2_2_preserves_physical_names() {
        let text = render(&two_triangle_mesh(), MshVersion::V2_2).unwrap();
        assert!(text.contains("\"SD1G0\""));
        assert!(text.contains("\"SD1D1001\""));
        assert!(text.contains("$Nodes"));
        assert!(text.contains("$Elements"));
    }

    #[test]
    fn v4_1_preserves_physical_names_and_groups_by_entity() {
        let text = render(&two_triangle_mesh(), MshVersion::V4_1).unwrap();
        assert!(text.contains("\"SD1G0\""));
        assert!(text.contains("\"SD1D1001\""));
        assert!(text.contains("$Entities"));
    }

    #[test]
    fn element_count_matches_triangle_count() {
        let mesh = two_triangle_mesh();
        let text = render(&mesh, MshVersion::V2_2).unwrap();
        let elements_line = text
            .lines()
            .skip_while(|l| *l != "$Elements")
            .nth(1)
            .unwrap();
        assert_eq!(elements_line, "2");
    }
}
