//! Build script for waveguide-kernel.
//!
//! Links against OpenCASCADE (geometry kernel) and Gmsh (meshing engine),
//! the same pairing the original solver drove through its Python bindings.
//! - Linux: system installation, or WAVEGUIDE_OCCT_ROOT / WAVEGUIDE_GMSH_ROOT.
//! - macOS: Homebrew installation (brew install opencascade gmsh).
//! - Windows: WAVEGUIDE_OCCT_ROOT / WAVEGUIDE_GMSH_ROOT must point at an SDK layout.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=cpp/bridge.cpp");
    println!("cargo:rerun-if-changed=cpp/include/bridge.h");
    println!("cargo:rerun-if-changed=src/ffi.rs");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    let (occt_inc, occt_lib) = match target_os.as_str() {
        "macos" => find_root("WAVEGUIDE_OCCT_ROOT", &homebrew_prefix().join("opt/opencascade")),
        "linux" => find_occt_linux(),
        _ => find_root("WAVEGUIDE_OCCT_ROOT", &PathBuf::from("C:/occt")),
    };
    let (gmsh_inc, gmsh_lib) = match target_os.as_str() {
        "macos" => find_root("WAVEGUIDE_GMSH_ROOT", &homebrew_prefix().join("opt/gmsh")),
        "linux" => find_gmsh_linux(),
        _ => find_root("WAVEGUIDE_GMSH_ROOT", &PathBuf::from("C:/gmsh")),
    };

    if !occt_inc.exists() || !occt_lib.exists() {
        panic!(
            "OpenCASCADE not found (looked in {:?} / {:?}).\n\
             Install it (e.g. `apt install libocct-*-dev` or `brew install opencascade`) \
             or set WAVEGUIDE_OCCT_ROOT.",
            occt_inc, occt_lib
        );
    }
    if !gmsh_inc.exists() || !gmsh_lib.exists() {
        panic!(
            "Gmsh SDK not found (looked in {:?} / {:?}).\n\
             Install it (e.g. `apt install libgmsh-dev` or `brew install gmsh`) \
             or set WAVEGUIDE_GMSH_ROOT.",
            gmsh_inc, gmsh_lib
        );
    }

    println!("cargo:rustc-link-search=native={}", occt_lib.display());
    println!("cargo:rustc-link-search=native={}", gmsh_lib.display());

    let occt_libs = [
        "TKernel", "TKMath", "TKG2d", "TKG3d", "TKGeomBase", "TKBRep", "TKGeomAlgo", "TKTopAlgo",
        "TKPrim", "TKBO", "TKBool", "TKFillet", "TKShHealing", "TKMesh", "TKOffset",
    ];
    for lib in occt_libs {
        println!("cargo:rustc-link-lib=dylib={lib}");
    }
    println!("cargo:rustc-link-lib=dylib=gmsh");

    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let cpp_dir = PathBuf::from(&manifest_dir).join("cpp");

    let mut build = cxx_build::bridge("src/ffi.rs");
    build
        .file("cpp/bridge.cpp")
        .include(&occt_inc)
        .include(&gmsh_inc)
        .include(&cpp_dir)
        .std("c++17")
        .define("_USE_MATH_DEFINES", None);

    match target_os.as_str() {
        "macos" => {
            build.flag("-stdlib=libc++");
        }
        "linux" => {
            build.flag("-fPIC");
        }
        _ => {
            build.flag_if_supported("/EHsc");
        }
    }

    build.compile("waveguide_kernel_bridge");
}

fn find_root(env_var: &str, default_prefix: &PathBuf) -> (PathBuf, PathBuf) {
    if let Ok(root) = env::var(env_var) {
        let path = PathBuf::from(root);
        return (path.join("include"), path.join("lib"));
    }
    (default_prefix.join("include"), default_prefix.join("lib"))
}

fn find_occt_linux() -> (PathBuf, PathBuf) {
    let candidates = [
        ("/usr/include/opencascade", "/usr/lib/x86_64-linux-gnu"),
        ("/usr/include/opencascade", "/usr/lib"),
        ("/usr/local/include/opencascade", "/usr/local/lib"),
    ];
    for (inc, lib) in candidates {
        let inc_path = PathBuf::from(inc);
        let lib_path = PathBuf::from(lib);
        if inc_path.exists() && lib_path.join("libTKernel.so").exists() {
            return (inc_path, lib_path);
        }
    }
    if let Ok(root) = env::var("WAVEGUIDE_OCCT_ROOT") {
        let path = PathBuf::from(root);
        return (path.join("include/opencascade"), path.join("lib"));
    }
    (
        PathBuf::from("/usr/include/opencascade"),
        PathBuf::from("/usr/lib/x86_64-linux-gnu"),
    )
}

fn find_gmsh_linux() -> (PathBuf, PathBuf) {
    let candidates = [
        ("/usr/include", "/usr/lib/x86_64-linux-gnu"),
        ("/usr/local/include", "/usr/local/lib"),
    ];
    for (inc, lib) in candidates {
        let inc_path = PathBuf::from(inc);
        let lib_path = PathBuf::from(lib);
        if inc_path.join("gmsh.h").exists() {
            return (inc_path, lib_path);
        }
    }
    if let Ok(root) = env::var("WAVEGUIDE_GMSH_ROOT") {
        let path = PathBuf::from(root);
        return (path.join("include"), path.join("lib"));
    }
    (PathBuf::from("/usr/include"), PathBuf::from("/usr/lib/x86_64-linux-gnu"))
}

fn homebrew_prefix() -> PathBuf {
    if cfg!(target_arch = "aarch64") {
        PathBuf::from("/opt/homebrew")
    } else {
        PathBuf::from("/usr/local")
    }
}
