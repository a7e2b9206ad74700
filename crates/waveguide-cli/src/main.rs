//! Command-line entry point: `waveguide-mesh-cli build <params.json> <out_dir>`.
//!
//! Reads a parameter document, runs the full mesh build, and writes the
//! result to `<out_dir>`. On failure it prints the taxonomy code and detail
//! to stderr and exits with the category-specific code documented for the
//! `build` subcommand.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use waveguide_export::{msh, stl, ExportMesh};
use waveguide_mesh::{MeshBuildError, ParamRecord};

#[derive(Parser, Debug)]
#[command(name = "waveguide-mesh-cli", about, version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a waveguide mesh from a parameter document and write it to an output directory.
    Build {
        /// Path to the JSON parameter document.
        params: PathBuf,
        /// Directory to write mesh.msh (and mesh.stl if requested) into.
        out_dir: PathBuf,
    },
}

#[derive(Serialize)]
struct BuildStats {
    #[serde(rename = "nodeCount")]
    node_count: usize,
    #[serde(rename = "elementCount")]
    element_count: usize,
}

#[derive(Serialize)]
struct FailureRecord {
    code: &'static str,
    detail: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Build { params, out_dir } => match run_build(&params, &out_dir) {
            Ok(stats) => {
                println!("{}", serde_json::to_string(&stats).expect("stats always serialise"));
                ExitCode::SUCCESS
            }
            Err(failure) => {
                let record = FailureRecord { code: failure.code(), detail: failure.detail() };
                eprintln!("{}", serde_json::to_string(&record).unwrap_or_else(|_| record.detail.clone()));
                ExitCode::from(failure.exit_code())
            }
        },
    }
}

fn run_build(params_path: &Path, out_dir: &Path) -> Result<BuildStats, CliError> {
    let text = fs::read_to_string(params_path)
        .map_err(|e| CliError::Build(MeshBuildError::IoFailure(format!("reading {}: {e}", params_path.display()))))?;
    let record = ParamRecord::from_json(&text).map_err(CliError::Build)?;

    let output = waveguide_mesh::build_waveguide_mesh(&record).map_err(CliError::Build)?;

    fs::create_dir_all(out_dir)
        .map_err(|e| CliError::Build(MeshBuildError::IoFailure(format!("creating {}: {e}", out_dir.display()))))?;

    let export_mesh = ExportMesh::new(
        output.mesh.vertices.clone(),
        output.mesh.triangles.clone(),
        output.mesh.surface_tags.clone(),
    );

    let msh_version = msh::MshVersion::parse(record.msh_version).map_err(CliError::Export)?;
    msh::write_file(&export_mesh, out_dir.join("mesh.msh"), msh_version).map_err(CliError::Export)?;

    if record.write_stl {
        stl::export_binary(&export_mesh, out_dir.join("mesh.stl")).map_err(CliError::Export)?;
    }

    Ok(BuildStats { node_count: output.node_count, element_count: output.element_count })
}

enum CliError {
    Build(MeshBuildError),
    Export(waveguide_export::ExportError),
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            CliError::Build(e) => e.code(),
            CliError::Export(e) => e.code(),
        }
    }

    fn detail(&self) -> String {
        match self {
            CliError::Build(e) => e.to_string(),
            CliError::Export(e) => e.to_string(),
        }
    }

    /// Maps a taxonomy code to the command surface's three exit-code
    /// categories: validation, dependency/kernel, internal.
    fn exit_code(&self) -> u8 {
        match self.code() {
            "invalid_expression"
            | "invalid_profile_parameters"
            | "unsupported_formula"
            | "unsupported_quadrants"
            | "requires_closed_shell"
            | "unsupported_msh_version" => 2,
            "kernel_runtime_unavailable" | "kernel_failure" => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_map_to_exit_code_two() {
        let err = CliError::Build(MeshBuildError::UnsupportedFormula("XYZ".into()));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn kernel_failures_map_to_exit_code_three() {
        let err = CliError::Build(MeshBuildError::Kernel(
            waveguide_kernel::KernelError::RuntimeUnavailable("no backend".into()),
        ));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn export_format_failures_map_to_exit_code_two() {
        let err = CliError::Export(waveguide_export::ExportError::UnsupportedMshVersion(9.9));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn topology_failures_map_to_exit_code_one() {
        let err = CliError::Build(MeshBuildError::NonManifold("edge (3, 7)".into()));
        assert_eq!(err.exit_code(), 1);
    }
}
