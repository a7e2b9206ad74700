//! Parameter record: the configuration surface for one mesh build.
//!
//! Deserializes with `#[serde(deny_unknown_fields)]` so unknown keys are
//! rejected at the `serde` layer before semantic validation runs.

use serde::{Deserialize, Serialize};

use crate::error::MeshBuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrants {
    Q1,
    Q1Q2,
    Q1Q4,
    Full,
}

impl Quadrants {
    pub fn parse(value: u32) -> Result<Self, MeshBuildError> {
        match value {
            1 => Ok(Quadrants::Q1),
            12 => Ok(Quadrants::Q1Q2),
            14 => Ok(Quadrants::Q1Q4),
            1234 => Ok(Quadrants::Full),
            other => Err(MeshBuildError::UnsupportedQuadrants(other.to_string())),
        }
    }

    pub fn is_full_circle(self) -> bool {
        self == Quadrants::Full
    }

    /// Span of azimuth covered, in radians.
    pub fn phi_span(self) -> f64 {
        match self {
            Quadrants::Q1 => std::f64::consts::FRAC_PI_2,
            Quadrants::Q1Q2 | Quadrants::Q1Q4 => std::f64::consts::PI,
            Quadrants::Full => std::f64::consts::TAU,
        }
    }
}

/// Presets controlling default resolution triples when the caller omits
/// explicit `throat_res`/`mouth_res`/`rear_res`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshQuality {
    Draft,
    Standard,
    Fine,
}

impl MeshQuality {
    pub const fn resolutions(self) -> (f64, f64, f64) {
        match self {
            MeshQuality::Draft => (8.0, 14.0, 35.0),
            MeshQuality::Standard => (5.0, 8.0, 25.0),
            MeshQuality::Fine => (2.5, 4.0, 15.0),
        }
    }
}

fn default_quadrants() -> u32 {
    1234
}

fn default_n_angular() -> u32 {
    72
}

fn default_n_length() -> u32 {
    20
}

fn default_msh_version() -> f64 {
    4.1
}

/// One-to-one with the external parameter document. Numeric/angular
/// fields that accept expressions are left as `String` here; `expr.rs`
/// compiles them lazily in the pipeline once `formula_type` is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamRecord {
    pub formula_type: String,

    // Profile parameters (scalar-or-expression fields as strings).
    #[serde(default)]
    pub r: Option<String>,
    #[serde(default)]
    pub l: Option<String>,
    #[serde(default)]
    pub a: Option<String>,
    #[serde(default)]
    pub s: Option<String>,
    pub r0: f64,
    pub a0: f64,
    pub k: f64,
    #[serde(default)]
    pub q: Option<f64>,
    #[serde(default)]
    pub apex_r: Option<f64>,
    #[serde(default)]
    pub b: Option<f64>,
    #[serde(default)]
    pub m: Option<f64>,
    #[serde(default)]
    pub tmax: Option<f64>,
    #[serde(default)]
    pub n: Option<f64>,
    #[serde(default)]
    pub h: Option<f64>,

    #[serde(default)]
    pub throat_profile: Option<u32>,
    #[serde(default)]
    pub throat_ext_angle: Option<f64>,
    #[serde(default)]
    pub throat_ext_length: Option<f64>,
    #[serde(default)]
    pub slot_length: Option<f64>,
    #[serde(default)]
    pub rot: Option<f64>,
    #[serde(default)]
    pub circ_arc_term_angle: Option<f64>,
    #[serde(default)]
    pub circ_arc_radius: Option<f64>,

    #[serde(default)]
    pub gcurve_type: Option<u32>,
    #[serde(default)]
    pub gcurve_width: Option<f64>,
    #[serde(default)]
    pub gcurve_aspect_ratio: Option<f64>,
    #[serde(default)]
    pub gcurve_se_n: Option<f64>,
    #[serde(default)]
    pub gcurve_rot: Option<f64>,
    #[serde(default)]
    pub gcurve_dist: Option<f64>,
    #[serde(default)]
    pub gcurve_a: Option<f64>,
    #[serde(default)]
    pub gcurve_b: Option<f64>,
    #[serde(default)]
    pub gcurve_m1: Option<f64>,
    #[serde(default)]
    pub gcurve_m2: Option<f64>,
    #[serde(default)]
    pub gcurve_n1: Option<f64>,
    #[serde(default)]
    pub gcurve_n2: Option<f64>,
    #[serde(default)]
    pub gcurve_n3: Option<f64>,

    #[serde(default)]
    pub morph_target: Option<u32>,
    #[serde(default)]
    pub morph_width: Option<f64>,
    #[serde(default)]
    pub morph_height: Option<f64>,
    #[serde(default)]
    pub morph_corner: Option<f64>,
    #[serde(default)]
    pub morph_rate: Option<f64>,
    #[serde(default)]
    pub morph_fixed: Option<f64>,
    #[serde(default)]
    pub morph_allow_shrinkage: Option<bool>,

    #[serde(default = "default_n_angular")]
    pub n_angular: u32,
    #[serde(default = "default_n_length")]
    pub n_length: u32,
    #[serde(default = "default_quadrants")]
    pub quadrants: u32,

    #[serde(default)]
    pub enc_depth: Option<f64>,
    #[serde(default)]
    pub enc_space_l: Option<f64>,
    #[serde(default)]
    pub enc_space_t: Option<f64>,
    #[serde(default)]
    pub enc_space_r: Option<f64>,
    #[serde(default)]
    pub enc_space_b: Option<f64>,
    #[serde(default)]
    pub enc_edge: Option<f64>,
    #[serde(default)]
    pub enc_edge_type: Option<u32>,
    #[serde(default)]
    pub corner_segments: Option<u32>,
    #[serde(default)]
    pub wall_thickness: Option<f64>,

    #[serde(default)]
    pub quality: Option<MeshQuality>,
    #[serde(default)]
    pub throat_res: Option<f64>,
    #[serde(default)]
    pub mouth_res: Option<f64>,
    #[serde(default)]
    pub rear_res: Option<f64>,
    #[serde(default)]
    pub enc_front_resolution: Option<serde_json::Value>,
    #[serde(default)]
    pub enc_back_resolution: Option<serde_json::Value>,

    #[serde(default = "default_msh_version")]
    pub msh_version: f64,
    #[serde(default)]
    pub write_stl: bool,

    /// Set by consumers of the adaptive-BEM path; coerces
    /// `quadrants` to full-circle before the build runs.
    #[serde(default)]
    pub adaptive_bem: bool,
}

impl ParamRecord {
    /// Resolves throat/mouth/rear resolutions, falling back to the quality
    /// preset (defaulting to `Standard`) when the caller omitted them.
    pub fn resolved_resolutions(&self) -> (f64, f64, f64) {
        let preset = self.quality.unwrap_or(MeshQuality::Standard).resolutions();
        (
            self.throat_res.unwrap_or(preset.0),
            self.mouth_res.unwrap_or(preset.1),
            self.rear_res.unwrap_or(preset.2),
        )
    }

    /// Semantic validation beyond what serde's schema already enforces.
    pub fn validate(&self) -> Result<(), MeshBuildError> {
        if self.r0 <= 0.0 {
            return Err(MeshBuildError::InvalidProfileParameters("r0 must be > 0".into()));
        }
        if !self.k.is_finite() {
            return Err(MeshBuildError::InvalidProfileParameters("k must be finite".into()));
        }
        if let Some(q) = self.q {
            if q <= 0.0 {
                return Err(MeshBuildError::InvalidProfileParameters("q must be > 0".into()));
            }
        }
        if let Some(n) = self.n {
            if n <= 0.0 {
                return Err(MeshBuildError::InvalidProfileParameters("n must be > 0".into()));
            }
        }
        if let Some(tmax) = self.tmax {
            if !(0.0 < tmax && tmax <= 1.0) {
                return Err(MeshBuildError::InvalidProfileParameters(
                    "tmax must be in (0, 1]".into(),
                ));
            }
        }
        if self.wall_thickness.unwrap_or(0.0) < 0.0 {
            return Err(MeshBuildError::InvalidProfileParameters(
                "wall_thickness must be >= 0".into(),
            ));
        }
        if self.enc_depth.unwrap_or(0.0) < 0.0 {
            return Err(MeshBuildError::InvalidProfileParameters("enc_depth must be >= 0".into()));
        }
        if self.corner_segments.unwrap_or(1) < 1 {
            return Err(MeshBuildError::InvalidProfileParameters(
                "corner_segments must be >= 1".into(),
            ));
        }

        let quadrants = Quadrants::parse(self.quadrants)?;
        let enc_depth = self.enc_depth.unwrap_or(0.0);
        if enc_depth > 0.0 && !quadrants.is_full_circle() {
            return Err(MeshBuildError::UnsupportedQuadrants(
                "enclosure box requires quadrants = 1234".into(),
            ));
        }

        if self.adaptive_bem {
            let wall_thickness = self.wall_thickness.unwrap_or(0.0);
            if enc_depth <= 0.0 && wall_thickness <= 0.0 {
                return Err(MeshBuildError::RequiresClosedShell);
            }
        }

        if self.msh_version != 2.2 && self.msh_version != 4.1 {
            return Err(MeshBuildError::UnsupportedMshVersion(self.msh_version));
        }

        Ok(())
    }

    /// Parses from JSON text, surfacing unknown-key rejections with their
    /// names rather than serde's generic message.
    pub fn from_json(text: &str) -> Result<Self, MeshBuildError> {
        serde_json::from_str(text).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("unknown field") {
                let name = msg
                    .split('`')
                    .nth(1)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| msg.clone());
                MeshBuildError::UnknownParameters(vec![name])
            } else {
                MeshBuildError::InvalidProfileParameters(msg)
            }
        })
    }
}

/// Per-quadrant resolutions for an enclosure panel (front or back),
/// mapping Q1=(+x,+y), Q2=(-x,+y), Q3=(-x,-y), Q4=(+x,-y).
#[derive(Debug, Clone, Copy)]
pub struct QuadrantResolutions {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub q4: f64,
}

/// Broadcasts a scalar to all four corners, or reads a 4-element array;
/// falls back to `default` for any missing element.
pub fn parse_quadrant_resolutions(value: Option<&serde_json::Value>, default: f64) -> QuadrantResolutions {
    match value {
        None => QuadrantResolutions { q1: default, q2: default, q3: default, q4: default },
        Some(serde_json::Value::Number(n)) => {
            let v = n.as_f64().unwrap_or(default);
            QuadrantResolutions { q1: v, q2: v, q3: v, q4: v }
        }
        Some(serde_json::Value::Array(items)) => {
            let get = |i: usize| items.get(i).and_then(|v| v.as_f64()).unwrap_or(default);
            QuadrantResolutions { q1: get(0), q2: get(1), q3: get(2), q4: get(3) }
        }
        Some(_) => QuadrantResolutions { q1: default, q2: default, q3: default, q4: default },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_unknown_field() {
        let json = r#"{"formula_type":"R-OSSE","r0":12.7,"a0":15.5,"k":2,"bogus_field":1}"#;
        let err = ParamRecord::from_json(json).unwrap_err();
        assert_eq!(err.code(), "invalid_profile_parameters");
    }

    #[test]
    fn quadrant_resolutions_broadcast_scalar() {
        let value = serde_json::json!(6.0);
        let res = parse_quadrant_resolutions(Some(&value), 1.0);
        assert_eq!((res.q1, res.q2, res.q3, res.q4), (6.0, 6.0, 6.0, 6.0));
    }

    #[test]
    fn quadrant_resolutions_fill_missing_with_default() {
        let value = serde_json::json!([1.0, 2.0]);
        let res = parse_quadrant_resolutions(Some(&value), 9.0);
        assert_eq!((res.q1, res.q2, res.q3, res.q4), (1.0, 2.0, 9.0, 9.0));
    }

    #[test]
    fn enclosure_requires_full_circle() {
        let json = r#"{"formula_type":"OSSE","r0":12.7,"a0":15.5,"k":7,"enc_depth":100,"quadrants":12}"#;
        let record: ParamRecord = serde_json::from_str(json).unwrap();
        let err = record.validate().unwrap_err();
        assert_eq!(err.code(), "unsupported_quadrants");
    }
}
