//! Top-level `build_waveguide_mesh` entry point: the strictly sequential
//! pipeline, wrapped in one scoped kernel acquisition.

use std::collections::HashSet;

use waveguide_core::Vec3;
use waveguide_kernel::{KernelSession, MeshKernel};

use crate::config::get_config;
use crate::error::{MeshBuildError, MeshBuildResult};
use crate::expr::Expression;
use crate::grid::{offset_outer_row, phi_samples, project_inner_grid, RawGrid};
use crate::guiding_curve::{coverage_sample_z, invert_coverage_angle};
use crate::morph::{MorphParams, MorphTarget};
use crate::params::{parse_quadrant_resolutions, ParamRecord, Quadrants};
use crate::pipeline::assembler::{
    build_enclosure_box, build_horn_surface, build_mouth_rim, build_rear_closure, build_source_disc,
};
use crate::pipeline::postprocess::{orient_and_validate, CanonicalMesh};
use crate::pipeline::sizing::{configure_mesh_size, AxialSizing, EnclosureSizing};
use crate::profile::{evaluate_osse, evaluate_rosse, FormulaType, OsseParams, ProfilePoint, RosseParams, ThroatProfile};

/// Final build output: the canonical mesh plus summary statistics.
pub struct BuildOutput {
    pub mesh: CanonicalMesh,
    pub node_count: usize,
    pub element_count: usize,
}

fn morph_params_from(record: &ParamRecord) -> Option<MorphParams> {
    let target = match record.morph_target.unwrap_or(0) {
        0 => return None,
        1 => MorphTarget::Rectangle,
        2 => MorphTarget::Circle,
        _ => return None,
    };
    Some(MorphParams {
        target,
        fixed: record.morph_fixed.unwrap_or(0.0),
        rate: record.morph_rate.unwrap_or(1.0),
        width: record.morph_width,
        height: record.morph_height,
        corner: record.morph_corner.unwrap_or(0.0),
        allow_shrinkage: record.morph_allow_shrinkage.unwrap_or(false),
    })
}

/// Evaluates the raw (un-morphed) 2D profile grid for every phi sample.
fn evaluate_raw_grid(
    record: &ParamRecord,
    formula: FormulaType,
    phi: &[f64],
) -> MeshBuildResult<(RawGrid, f64)> {
    let n_length = record.n_length as usize;
    let mut rows = Vec::with_capacity(phi.len());
    let mut total_length = 0.0_f64;

    let r_expr = Expression::parse_or_default(record.r.as_deref(), 140.0)?;
    let l_expr = Expression::parse_or_default(record.l.as_deref(), 120.0)?;
    let a_expr = Expression::parse_or_default(record.a.as_deref(), 45.0)?;
    let s_expr = Expression::parse_or_default(record.s.as_deref(), 0.6)?;

    let guiding = build_guiding_curve(record);

    for &p in phi {
        let a_deg = a_expr.eval(p);
        let a_deg = if let Some(ref g) = guiding {
            coverage_angle_override(record, formula, g, p, a_deg, s_expr.eval(p))?
        } else {
            a_deg
        };

        let (points, length) = match formula {
            FormulaType::ROsse => {
                let params = RosseParams {
                    r: r_expr.eval(p),
                    a_deg,
                    r0: record.r0,
                    a0_deg: record.a0,
                    k: record.k,
                    apex_r: record.apex_r.unwrap_or(0.0),
                    b: record.b.unwrap_or(0.0),
                    m: record.m.unwrap_or(0.0),
                    q: record.q.unwrap_or(1.0),
                    tmax: record.tmax.unwrap_or(1.0),
                };
                evaluate_rosse(&params, n_length)?
            }
            FormulaType::Osse => {
                let throat_profile = match record.throat_profile.unwrap_or(1) {
                    3 => ThroatProfile::CircularArc,
                    _ => ThroatProfile::OsSe,
                };
                let params = OsseParams {
                    l: l_expr.eval(p),
                    s: s_expr.eval(p),
                    n: record.n.unwrap_or(1.0),
                    q: record.q.unwrap_or(1.0),
                    a_cov_deg: a_deg,
                    r0_main: record.r0,
                    a0_deg: record.a0,
                    k: record.k,
                    h: record.h.unwrap_or(0.0),
                    throat_ext_angle_deg: record.throat_ext_angle.unwrap_or(0.0),
                    throat_ext_length: record.throat_ext_length.unwrap_or(0.0),
                    slot_length: record.slot_length.unwrap_or(0.0),
                    throat_profile,
                    circ_arc_term_angle_deg: record.circ_arc_term_angle.unwrap_or(0.0),
                    circ_arc_radius: record.circ_arc_radius.unwrap_or(0.0),
                    rot_deg: record.rot.unwrap_or(0.0),
                    r0_base: record.r0,
                };
                evaluate_osse(&params, n_length)?
            }
        };
        total_length = total_length.max(length);
        rows.push(points);
    }

    Ok((RawGrid { phi: phi.to_vec(), rows }, total_length))
}

enum GuidingCurveKind {
    Superellipse(crate::guiding_curve::SuperellipseParams),
    Superformula(crate::guiding_curve::SuperformulaParams),
}

fn build_guiding_curve(record: &ParamRecord) -> Option<GuidingCurveKind> {
    match record.gcurve_type.unwrap_or(0) {
        1 => Some(GuidingCurveKind::Superellipse(crate::guiding_curve::SuperellipseParams {
            width: record.gcurve_width.unwrap_or(0.0),
            aspect_ratio: record.gcurve_aspect_ratio.unwrap_or(1.0),
            n: record.gcurve_se_n.unwrap_or(2.0),
            rot_deg: record.gcurve_rot.unwrap_or(0.0),
        })),
        2 => Some(GuidingCurveKind::Superformula(crate::guiding_curve::SuperformulaParams {
            width: record.gcurve_width.unwrap_or(0.0),
            aspect_ratio: record.gcurve_aspect_ratio.unwrap_or(1.0),
            a: record.gcurve_a.unwrap_or(1.0),
            b: record.gcurve_b.unwrap_or(1.0),
            m1: record.gcurve_m1.unwrap_or(0.0),
            m2: record.gcurve_m2.unwrap_or(0.0),
            n1: record.gcurve_n1.unwrap_or(1.0),
            n2: record.gcurve_n2.unwrap_or(1.0),
            n3: record.gcurve_n3.unwrap_or(1.0),
            rot_deg: record.gcurve_rot.unwrap_or(0.0),
        })),
        _ => None,
    }
}

fn coverage_angle_override(
    record: &ParamRecord,
    formula: FormulaType,
    guiding: &GuidingCurveKind,
    phi: f64,
    fallback_a_deg: f64,
    s_val: f64,
) -> MeshBuildResult<f64> {
    if formula != FormulaType::Osse {
        return Ok(fallback_a_deg);
    }
    let target_radius = match guiding {
        GuidingCurveKind::Superellipse(p) => crate::guiding_curve::superellipse_radius(p, phi),
        GuidingCurveKind::Superformula(p) => crate::guiding_curve::superformula_radius(p, phi),
    };
    let Some(target_radius) = target_radius else {
        return Ok(fallback_a_deg);
    };

    let l = Expression::parse_or_default(record.l.as_deref(), 120.0)?.eval(phi);
    let ext_len = record.throat_ext_length.unwrap_or(0.0);
    let slot_len = record.slot_length.unwrap_or(0.0);
    let dist = record.gcurve_dist.unwrap_or(0.5);
    let total_length = l + ext_len + slot_len;
    let z_main = coverage_sample_z(dist, total_length, ext_len, slot_len);

    let base_params = OsseParams {
        l,
        s: s_val,
        n: record.n.unwrap_or(1.0),
        q: record.q.unwrap_or(1.0),
        a_cov_deg: fallback_a_deg,
        r0_main: record.r0,
        a0_deg: record.a0,
        k: record.k,
        h: 0.0,
        throat_ext_angle_deg: 0.0,
        throat_ext_length: ext_len,
        slot_length: slot_len,
        throat_profile: ThroatProfile::OsSe,
        circ_arc_term_angle_deg: 0.0,
        circ_arc_radius: 0.0,
        rot_deg: 0.0,
        r0_base: record.r0,
    };
    let iterations = get_config().coverage_bisection_iterations;
    Ok(invert_coverage_angle(&base_params, z_main, target_radius, iterations))
}

/// Runs the full build: `lock -> initialise -> clear model -> build ->
/// generate -> read back -> release`, returning the canonical mesh.
pub fn build_waveguide_mesh(record: &ParamRecord) -> MeshBuildResult<BuildOutput> {
    record.validate()?;
    let formula = FormulaType::parse(&record.formula_type)?;
    let quadrants = Quadrants::parse(if record.adaptive_bem { 1234 } else { record.quadrants })?;
    let closed = quadrants.is_full_circle() && (record.enc_depth.unwrap_or(0.0) > 0.0 || record.wall_thickness.unwrap_or(0.0) > 0.0);
    let enclosure_mode = record.enc_depth.unwrap_or(0.0) > 0.0;

    tracing::info!(formula_type = %record.formula_type, quadrants = record.quadrants, "starting waveguide mesh build");

    let phi = phi_samples(quadrants, record.n_angular);
    let (raw_grid, _total_length) = evaluate_raw_grid(record, formula, &phi)?;
    let morph = morph_params_from(record);
    let inner_grid_3d = project_inner_grid(&raw_grid, morph.as_ref());

    let mut session = KernelSession::acquire()?;
    session.clear_model()?;
    session.set_geometry_tolerance(get_config().geometry_tolerance)?;

    let inner_surfaces = build_horn_surface(&mut session, &inner_grid_3d, quadrants.is_full_circle())?;

    let throat_ring: Vec<Vec3> = inner_grid_3d.iter().map(|row| row[0]).collect();
    let source_surface = build_source_disc(&mut session, &inner_surfaces, &throat_ring)?;

    let mut source_disc_surfaces = HashSet::new();
    source_disc_surfaces.insert(source_surface);

    let z_throat = throat_ring.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
    let z_mouth = inner_grid_3d
        .iter()
        .flat_map(|row| row.iter().map(|p| p.z))
        .fold(f64::NEG_INFINITY, f64::max);

    let wall_thickness = record.wall_thickness.unwrap_or(0.0);
    let mut rear_surfaces = Vec::new();
    let mut mouth_rim_surfaces = Vec::new();
    let mut outer_surfaces = Vec::new();
    let mut enclosure_surfaces = Vec::new();
    let mut enclosure_sizing: Option<EnclosureSizing> = None;

    if enclosure_mode {
        let depth = record.enc_depth.unwrap_or(0.0);
        let mouth_surface = *inner_surfaces.last().unwrap();
        let mouth_bbox = session.get_bounding_box(mouth_surface)?;
        let mouth_boundary = session.get_boundary(mouth_surface)?;
        let mouth_curve = *mouth_boundary.first().ok_or_else(|| {
            MeshBuildError::Kernel(waveguide_kernel::KernelError::OperationFailed(
                "mouth surface has no boundary curve".into(),
            ))
        })?;

        let padding = (
            record.enc_space_l.unwrap_or(0.0),
            record.enc_space_t.unwrap_or(0.0),
            record.enc_space_r.unwrap_or(0.0),
            record.enc_space_b.unwrap_or(0.0),
        );
        let panels = build_enclosure_box(&mut session, mouth_bbox, padding, depth, mouth_curve)?;
        enclosure_surfaces.extend(&panels);

        let (_, mouth_res, _) = record.resolved_resolutions();
        let front = parse_quadrant_resolutions(record.enc_front_resolution.as_ref(), mouth_res);
        let back = parse_quadrant_resolutions(record.enc_back_resolution.as_ref(), mouth_res);
        let (lo, hi) = mouth_bbox;
        enclosure_sizing = Some(EnclosureSizing {
            front,
            back,
            x_mid: (lo.x + hi.x) / 2.0,
            y_mid: (lo.y + hi.y) / 2.0,
            z_front: z_mouth,
            z_back: z_mouth + depth,
        });
    } else if wall_thickness > 0.0 {
        let outer_rows: Vec<Vec<ProfilePoint>> =
            raw_grid.rows.iter().map(|row| offset_outer_row(row, wall_thickness)).collect();
        let outer_raw = RawGrid { phi: raw_grid.phi.clone(), rows: outer_rows };
        let outer_grid_3d = project_inner_grid(&outer_raw, None);
        outer_surfaces = build_horn_surface(&mut session, &outer_grid_3d, quadrants.is_full_circle())?;

        if let (Some(&inner_mouth), Some(&outer_mouth)) = (inner_surfaces.last(), outer_surfaces.last()) {
            if let Ok(rim) = build_mouth_rim(&mut session, inner_mouth, outer_mouth) {
                mouth_rim_surfaces.push(rim);
            }
        }

        let outer_throat_ring: Vec<Vec3> = outer_grid_3d.iter().map(|row| row[0]).collect();
        if let Ok((step, disc)) = build_rear_closure(&mut session, &outer_throat_ring, wall_thickness) {
            rear_surfaces.push(step);
            rear_surfaces.push(disc);
        }
    }

    let (throat_res, mouth_res, rear_res) = record.resolved_resolutions();

    let axial = AxialSizing { throat_res, mouth_res, z_throat, z_mouth };
    let mut axial_surfaces = inner_surfaces.clone();
    axial_surfaces.extend(&mouth_rim_surfaces);
    axial_surfaces.extend(&outer_surfaces);

    configure_mesh_size(
        &mut session,
        &axial,
        &axial_surfaces,
        throat_res,
        &[source_surface],
        rear_res,
        &rear_surfaces,
        enclosure_sizing.as_ref().map(|sizing| (sizing, enclosure_surfaces.as_slice())),
    )?;

    session.generate_mesh_2d()?;
    session.remove_duplicate_nodes(get_config().weld_tolerance)?;

    let mut rigid_wall_surfaces = axial_surfaces.clone();
    rigid_wall_surfaces.extend(&rear_surfaces);
    rigid_wall_surfaces.extend(&enclosure_surfaces);
    session.add_physical_group("SD1G0", 1, &rigid_wall_surfaces)?;
    session.add_physical_group("SD1D1001", 2, &[source_surface])?;

    let raw_mesh = session.extract_mesh()?;
    drop(session);

    let surface_ids: Vec<i32> = raw_mesh.triangles.iter().map(|t| t.surface_tag).collect();
    let triangles: Vec<[u32; 3]> = raw_mesh.triangles.iter().map(|t| [t.v0, t.v1, t.v2]).collect();

    let options = crate::pipeline::postprocess::PostprocessOptions {
        source_disc_surfaces,
        closed,
        enclosure_mode,
        front_baffle_z: if enclosure_mode { Some(z_mouth) } else { None },
    };
    let mesh = orient_and_validate(raw_mesh.nodes, triangles, surface_ids, &options)?;

    if mesh.surface_tags.iter().all(|&t| t != 2) && quadrants.is_full_circle() {
        tracing::warn!("no triangle carries the source disc tag on a full-circle build");
    }

    let node_count = mesh.vertices.len();
    let element_count = mesh.triangles.len();
    tracing::info!(node_count, element_count, "waveguide mesh build complete");

    Ok(BuildOutput { mesh, node_count, element_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_rosse_record() -> ParamRecord {
        let json = r#"{
            "formula_type":"R-OSSE","r":"140","a":"45","r0":12.7,"a0":15.5,"k":2,
            "apex_r":0.4,"b":0.2,"m":0.85,"q":3.4,"tmax":1.0,
            "n_angular":8,"n_length":4,"quadrants":1234,
            "throat_res":5,"mouth_res":8,"rear_res":25,"wall_thickness":0,"enc_depth":0
        }"#;
        ParamRecord::from_json(json).unwrap()
    }

    #[test]
    fn unsupported_formula_is_rejected_before_touching_the_kernel() {
        let mut record = minimal_rosse_record();
        record.formula_type = "foo".to_string();
        let err = build_waveguide_mesh(&record).unwrap_err();
        assert_eq!(err.code(), "unsupported_formula");
    }

    #[test]
    fn profile_grid_evaluates_without_a_kernel_session() {
        let record = minimal_rosse_record();
        let formula = FormulaType::parse(&record.formula_type).unwrap();
        let quadrants = Quadrants::parse(record.quadrants).unwrap();
        let phi = phi_samples(quadrants, record.n_angular);
        let (grid, _total_length) = evaluate_raw_grid(&record, formula, &phi).unwrap();
        assert_eq!(grid.n_phi(), phi.len());
        assert!((grid.rows[0][0].y - 12.7).abs() < 1e-6);
    }
}
