//! Strictly-ordered post-triangulation passes: weld, manifold census,
//! orientation propagation, global orientation fix, optional tag-group
//! flips, watertightness/connectedness checks, and tag assignment.

use std::collections::{HashMap, HashSet, VecDeque};

use waveguide_core::Vec3;

use crate::config::get_config;
use crate::error::{MeshBuildError, MeshBuildResult};

#[derive(Debug, Clone)]
pub struct CanonicalMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub surface_tags: Vec<i32>,
}

/// What each build actually requires of the post-processor, beyond the
/// raw geometry: which kernel surface ids are rigid wall versus source
/// disc, and which topology mode (closed/enclosure vs. open/wall-shell).
pub struct PostprocessOptions {
    pub source_disc_surfaces: HashSet<i32>,
    pub closed: bool,
    pub enclosure_mode: bool,
    pub front_baffle_z: Option<f64>,
}

fn quantize(v: Vec3, tol: f64) -> (i64, i64, i64) {
    let q = |x: f64| (x / tol).round() as i64;
    (q(v.x), q(v.y), q(v.z))
}

/// Merges vertices whose quantised coordinates coincide; drops triangles
/// that become degenerate after remapping.
fn weld(vertices: &[Vec3], triangles: &[[u32; 3]], surface_tags: &[i32]) -> (Vec<Vec3>, Vec<[u32; 3]>, Vec<i32>) {
    let tolerance = get_config().weld_tolerance;
    let mut map: HashMap<(i64, i64, i64), u32> = HashMap::new();
    let mut welded_vertices = Vec::new();
    let mut remap = vec![0u32; vertices.len()];

    for (i, &v) in vertices.iter().enumerate() {
        let key = quantize(v, tolerance);
        let idx = *map.entry(key).or_insert_with(|| {
            welded_vertices.push(v);
            (welded_vertices.len() - 1) as u32
        });
        remap[i] = idx;
    }

    let mut out_triangles = Vec::with_capacity(triangles.len());
    let mut out_tags = Vec::with_capacity(triangles.len());
    for (tri, &tag) in triangles.iter().zip(surface_tags.iter()) {
        let a = remap[tri[0] as usize];
        let b = remap[tri[1] as usize];
        let c = remap[tri[2] as usize];
        if a == b || b == c || a == c {
            continue;
        }
        out_triangles.push([a, b, c]);
        out_tags.push(tag);
    }

    (welded_vertices, out_triangles, out_tags)
}

fn undirected_edge(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

/// Counts oriented uses of each undirected edge; a non-manifold edge has
/// more than two uses in total (either direction).
fn edge_census(triangles: &[[u32; 3]]) -> MeshBuildResult<HashMap<(u32, u32), Vec<(usize, bool)>>> {
    let mut edges: HashMap<(u32, u32), Vec<(usize, bool)>> = HashMap::new();
    for (ti, tri) in triangles.iter().enumerate() {
        let sides = [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])];
        for (a, b) in sides {
            let key = undirected_edge(a, b);
            let forward = a < b;
            edges.entry(key).or_default().push((ti, forward));
        }
    }
    for (edge, uses) in &edges {
        if uses.len() > 2 {
            return Err(MeshBuildError::NonManifold(format!("edge {edge:?} used {} times", uses.len())));
        }
    }
    Ok(edges)
}

/// BFS over triangles joined by manifold (2-use) edges, flipping triangles
/// so that every shared edge is traversed in opposite directions by its
/// two incident triangles.
fn propagate_orientation(
    triangles: &mut [[u32; 3]],
    edges: &HashMap<(u32, u32), Vec<(usize, bool)>>,
) -> MeshBuildResult<()> {
    let n = triangles.len();
    let mut adjacency: Vec<Vec<(usize, bool, bool)>> = vec![Vec::new(); n];
    for uses in edges.values() {
        if uses.len() == 2 {
            let (t0, fwd0) = uses[0];
            let (t1, fwd1) = uses[1];
            adjacency[t0].push((t1, fwd0, fwd1));
            adjacency[t1].push((t0, fwd1, fwd0));
        }
    }

    let mut visited = vec![false; n];
    let mut flipped = vec![false; n];

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for &(neighbor, fwd_cur, fwd_nb) in &adjacency[current] {
                // Consistent orientation requires the shared edge to run
                // opposite directions in the two triangles; same `forward`
                // parity on both sides means one of the two must flip.
                let cur_effective = fwd_cur ^ flipped[current];
                let nb_effective = fwd_nb ^ flipped[neighbor];
                let wants_flip_nb = cur_effective == nb_effective;

                if !visited[neighbor] {
                    visited[neighbor] = true;
                    flipped[neighbor] = wants_flip_nb;
                    queue.push_back(neighbor);
                } else if (flipped[neighbor]) != wants_flip_nb {
                    return Err(MeshBuildError::InconsistentWinding(format!(
                        "triangles {current} and {neighbor} disagree on winding"
                    )));
                }
            }
        }
    }

    for (i, tri) in triangles.iter_mut().enumerate() {
        if flipped[i] {
            tri.swap(1, 2);
        }
    }
    Ok(())
}

fn triangle_normal(vertices: &[Vec3], tri: [u32; 3]) -> Vec3 {
    let a = vertices[tri[0] as usize];
    let b = vertices[tri[1] as usize];
    let c = vertices[tri[2] as usize];
    (b - a).cross(c - a)
}

fn signed_volume_x6(vertices: &[Vec3], triangles: &[[u32; 3]]) -> f64 {
    triangles
        .iter()
        .map(|&tri| {
            let a = vertices[tri[0] as usize];
            let b = vertices[tri[1] as usize];
            let c = vertices[tri[2] as usize];
            a.dot(b.cross(c))
        })
        .sum()
}

fn outward_score(vertices: &[Vec3], triangles: &[[u32; 3]]) -> f64 {
    let mesh_centroid = {
        let sum = vertices.iter().fold(Vec3::ZERO, |acc, &v| acc + v);
        sum / (vertices.len().max(1) as f64)
    };
    triangles
        .iter()
        .map(|&tri| {
            let n = triangle_normal(vertices, tri);
            let centroid = (vertices[tri[0] as usize] + vertices[tri[1] as usize] + vertices[tri[2] as usize]) / 3.0;
            n.dot(centroid - mesh_centroid)
        })
        .sum()
}

fn reverse_all(triangles: &mut [[u32; 3]]) {
    for tri in triangles.iter_mut() {
        tri.swap(1, 2);
    }
}

/// Flips individual front-baffle triangles whose normal points the wrong
/// way into the enclosure, identified by centroid-on-plane + near-axial
/// normal, rather than by a blanket reversal of the whole tag group.
fn flip_front_baffle(vertices: &[Vec3], triangles: &mut [[u32; 3]], surface_tags: &[i32], z_top: f64) {
    const Z_TOL: f64 = 1e-6;
    for (tri, &tag) in triangles.iter_mut().zip(surface_tags.iter()) {
        if tag != 1 {
            continue;
        }
        let centroid = (vertices[tri[0] as usize] + vertices[tri[1] as usize] + vertices[tri[2] as usize]) / 3.0;
        if (centroid.z - z_top).abs() > Z_TOL {
            continue;
        }
        let n = triangle_normal(vertices, *tri);
        let mag = n.length();
        if mag <= 1e-12 || n.z.abs() < 0.8 * mag {
            continue;
        }
        if n.z > 0.0 {
            tri.swap(1, 2);
        }
    }
}

fn boundary_edge_count(edges: &HashMap<(u32, u32), Vec<(usize, bool)>>) -> usize {
    edges.values().filter(|uses| uses.len() == 1).count()
}

fn connected_components(n: usize, edges: &HashMap<(u32, u32), Vec<(usize, bool)>>) -> usize {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for uses in edges.values() {
        if uses.len() == 2 {
            let (t0, _) = uses[0];
            let (t1, _) = uses[1];
            adjacency[t0].push(t1);
            adjacency[t1].push(t0);
        }
    }
    let mut visited = vec![false; n];
    let mut components = 0;
    for start in 0..n {
        if visited[start] {
            continue;
        }
        components += 1;
        let mut queue = VecDeque::from([start]);
        visited[start] = true;
        while let Some(cur) = queue.pop_front() {
            for &next in &adjacency[cur] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
    }
    components
}

/// Walks the single-use (boundary) edges into closed vertex loops, each
/// ordered in the winding direction its owning triangle runs along it.
fn boundary_loops(triangles: &[[u32; 3]], edges: &HashMap<(u32, u32), Vec<(usize, bool)>>) -> Vec<Vec<u32>> {
    let mut next: HashMap<u32, u32> = HashMap::new();
    for (&(a, b), uses) in edges {
        if uses.len() != 1 {
            continue;
        }
        let (ti, _) = uses[0];
        let tri = triangles[ti];
        let sides = [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])];
        for (x, y) in sides {
            if undirected_edge(x, y) == (a, b) {
                next.insert(x, y);
                break;
            }
        }
    }

    let mut visited: HashSet<u32> = HashSet::new();
    let mut loops = Vec::new();
    for &start in next.keys() {
        if visited.contains(&start) {
            continue;
        }
        let mut loop_verts = vec![start];
        visited.insert(start);
        let mut cur = start;
        while let Some(&nxt) = next.get(&cur) {
            if nxt == start {
                break;
            }
            loop_verts.push(nxt);
            visited.insert(nxt);
            cur = nxt;
        }
        loops.push(loop_verts);
    }
    loops
}

/// Rotates `loop_` so that element `start` is first, preserving order.
fn rotate_to_start(loop_: &[u32], start: usize) -> Vec<u32> {
    loop_[start..].iter().chain(loop_[..start].iter()).copied().collect()
}

/// Sum of vertex-to-vertex distances between corresponding positions of
/// two equally-indexed loops, used to score a candidate alignment.
fn alignment_cost(loop_a: &[u32], loop_b: &[u32], vertices: &[Vec3]) -> f64 {
    let n = loop_a.len().min(loop_b.len());
    (0..n).map(|i| (vertices[loop_a[i] as usize] - vertices[loop_b[i] as usize]).length()).sum()
}

/// Bridges two boundary loops with a ring of triangles: aligns on the
/// nearest start vertex, tests both winding directions of the second
/// loop, and zippers whichever alignment scores lower by always
/// advancing whichever loop yields the shorter new diagonal.
fn stitch_boundary_loops(vertices: &[Vec3], loop_a: &[u32], loop_b: &[u32]) -> Option<Vec<[u32; 3]>> {
    if loop_a.is_empty() || loop_b.is_empty() {
        return None;
    }

    let anchor = vertices[loop_a[0] as usize];
    let (nearest_idx, _) = loop_b
        .iter()
        .enumerate()
        .map(|(i, &v)| (i, (vertices[v as usize] - anchor).length()))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())?;

    let forward = rotate_to_start(loop_b, nearest_idx);
    let mut reversed_b = loop_b.to_vec();
    reversed_b.reverse();
    let reversed_idx = loop_b.len() - 1 - nearest_idx;
    let backward = rotate_to_start(&reversed_b, reversed_idx);

    let candidate = if alignment_cost(loop_a, &forward, vertices) <= alignment_cost(loop_a, &backward, vertices) {
        forward
    } else {
        backward
    };

    Some(zipper_loops(loop_a, &candidate, vertices))
}

/// Greedy shortest-diagonal zippering of two aligned vertex loops into a
/// closing ring of triangles, the same way a gap between two point
/// sequences of possibly different length is bridged.
fn zipper_loops(loop_a: &[u32], loop_b: &[u32], vertices: &[Vec3]) -> Vec<[u32; 3]> {
    let na = loop_a.len();
    let nb = loop_b.len();
    let mut triangles = Vec::with_capacity(na + nb);
    let mut ai = 0usize;
    let mut bi = 0usize;

    while ai < na || bi < nb {
        let a_cur = loop_a[ai % na];
        let b_cur = loop_b[bi % nb];
        let advance_a = if ai >= na {
            false
        } else if bi >= nb {
            true
        } else {
            let a_next = loop_a[(ai + 1) % na];
            let b_next = loop_b[(bi + 1) % nb];
            let dist_a = (vertices[a_next as usize] - vertices[b_cur as usize]).length();
            let dist_b = (vertices[a_cur as usize] - vertices[b_next as usize]).length();
            dist_a <= dist_b
        };

        if advance_a {
            let a_next = loop_a[(ai + 1) % na];
            triangles.push([a_cur, a_next, b_cur]);
            ai += 1;
        } else {
            let b_next = loop_b[(bi + 1) % nb];
            triangles.push([a_cur, b_cur, b_next]);
            bi += 1;
        }
    }
    triangles
}

/// Runs the full strictly-ordered post-processing pipeline over a raw
/// (unwelded, untagged) triangulation and returns the canonical mesh.
pub fn orient_and_validate(
    raw_vertices: Vec<Vec3>,
    raw_triangles: Vec<[u32; 3]>,
    raw_kernel_surface_ids: Vec<i32>,
    options: &PostprocessOptions,
) -> MeshBuildResult<CanonicalMesh> {
    let (vertices, mut triangles, kernel_ids) = weld(&raw_vertices, &raw_triangles, &raw_kernel_surface_ids);

    let mut edges = edge_census(&triangles)?;
    propagate_orientation(&mut triangles, &edges)?;

    let vol6 = signed_volume_x6(&vertices, &triangles);
    if options.closed {
        if vol6 < 0.0 {
            reverse_all(&mut triangles);
        }
    } else {
        let score = outward_score(&vertices, &triangles);
        if score < 0.0 {
            reverse_all(&mut triangles);
        }
    }

    let mut surface_tags: Vec<i32> = kernel_ids
        .iter()
        .map(|id| if options.source_disc_surfaces.contains(id) { 2 } else { 1 })
        .collect();

    if options.enclosure_mode {
        if let Some(z_top) = options.front_baffle_z {
            flip_front_baffle(&vertices, &mut triangles, &surface_tags, z_top);
        }
        edges = edge_census(&triangles)?;
        let boundary_edges = boundary_edge_count(&edges);
        if boundary_edges != 0 {
            return Err(MeshBuildError::NonWatertight(boundary_edges));
        }
    } else if options.closed {
        edges = edge_census(&triangles)?;
        let boundary_edges = boundary_edge_count(&edges);
        if boundary_edges != 0 {
            let loops = boundary_loops(&triangles, &edges);
            let stitched = if loops.len() == 2 {
                stitch_boundary_loops(&vertices, &loops[0], &loops[1])
            } else {
                None
            };
            let Some(new_triangles) = stitched else {
                return Err(MeshBuildError::CrackedBoundary(format!(
                    "{boundary_edges} boundary edge(s) across {} loop(s), not stitchable",
                    loops.len()
                )));
            };
            surface_tags.extend(std::iter::repeat(1).take(new_triangles.len()));
            triangles.extend(new_triangles);

            edges = edge_census(&triangles)?;
            let remaining = boundary_edge_count(&edges);
            if remaining != 0 {
                return Err(MeshBuildError::CrackedBoundary(format!(
                    "{remaining} boundary edge(s) remain after stitching"
                )));
            }
        }
    }

    let vol6_final = signed_volume_x6(&vertices, &triangles);
    if options.closed && (vol6_final.abs() < 1e-12 || !vol6_final.is_finite()) {
        return Err(MeshBuildError::InvalidVolume(format!("signed volume*6 = {vol6_final}")));
    }

    let components = connected_components(triangles.len(), &edges);
    if options.enclosure_mode && components != 1 {
        return Err(MeshBuildError::DisconnectedMesh(components));
    } else if options.closed && !options.enclosure_mode && components != 1 {
        tracing::warn!(components, "closed wall-shell mesh has more than one connected component");
    }

    surface_tags.truncate(triangles.len());
    while surface_tags.len() < triangles.len() {
        surface_tags.push(1);
    }

    Ok(CanonicalMesh { vertices, triangles, surface_tags })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tetrahedron() -> (Vec<Vec3>, Vec<[u32; 3]>) {
        let v = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let t = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        (v, t)
    }

    #[test]
    fn weld_merges_coincident_vertices() {
        let v = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1e-9, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let t = vec![[0, 1, 2]];
        let tags = vec![1];
        let (wv, wt, _) = weld(&v, &t, &tags);
        assert_eq!(wv.len(), 2);
        assert_eq!(wt.len(), 0); // degenerate after welding
    }

    #[test]
    fn closed_tetrahedron_orients_to_positive_volume() {
        let (v, t) = tetrahedron();
        let ids: Vec<i32> = vec![0; t.len()];
        let options = PostprocessOptions {
            source_disc_surfaces: HashSet::new(),
            closed: true,
            enclosure_mode: false,
            front_baffle_z: None,
        };
        let mesh = orient_and_validate(v, t, ids, &options).unwrap();
        assert!(signed_volume_x6(&mesh.vertices, &mesh.triangles) > 0.0);
    }

    #[test]
    fn non_manifold_edge_is_rejected() {
        let v = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let t = vec![[0, 1, 2], [0, 1, 3], [0, 1, 4]];
        let census = edge_census(&t);
        assert!(census.is_err());
        let _ = v;
    }

    #[test]
    fn disconnected_enclosure_mesh_fails() {
        let (v, t) = tetrahedron();
        let mut v2 = v.clone();
        v2.extend(v.iter().map(|p| Vec3::new(p.x + 10.0, p.y, p.z)));
        let mut t2 = t.clone();
        t2.extend(t.iter().map(|tri| [tri[0] + 4, tri[1] + 4, tri[2] + 4]));
        let ids = vec![0; t2.len()];
        let options = PostprocessOptions {
            source_disc_surfaces: HashSet::new(),
            closed: true,
            enclosure_mode: true,
            front_baffle_z: None,
        };
        let err = orient_and_validate(v2, t2, ids, &options).unwrap_err();
        assert_eq!(err.code(), "disconnected_mesh");
    }

    /// A split cylindrical side wall: two 4-vertex rings, one per end,
    /// left as separate boundary loops (no cap triangles). Stitching
    /// should bridge them with exactly `na + nb` triangles and leave no
    /// boundary edges behind.
    #[test]
    fn stitch_boundary_loops_closes_a_two_loop_gap() {
        let vertices = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, -1.0, 1.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ];
        let loop_a = vec![0u32, 1, 2, 3];
        let loop_b = vec![4u32, 5, 6, 7];

        let triangles = stitch_boundary_loops(&vertices, &loop_a, &loop_b).unwrap();
        assert_eq!(triangles.len(), loop_a.len() + loop_b.len());

        let mut used: HashSet<u32> = HashSet::new();
        for tri in &triangles {
            used.extend(tri.iter().copied());
        }
        for v in loop_a.iter().chain(loop_b.iter()) {
            assert!(used.contains(v), "vertex {v} missing from stitched ring");
        }
    }

    #[test]
    fn boundary_loops_walks_a_single_open_quad() {
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let triangles = vec![[0u32, 1, 2], [0, 2, 3]];
        let edges = edge_census(&triangles).unwrap();
        let loops = boundary_loops(&triangles, &edges);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
    }
}
