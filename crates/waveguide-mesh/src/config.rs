//! Process-wide build defaults, settable once at startup.

use std::sync::OnceLock;

/// Global defaults threaded through a build when the caller doesn't
/// override them per-record.
#[derive(Debug, Clone, Copy)]
pub struct WaveguideConfig {
    pub weld_tolerance: f64,
    pub geometry_tolerance: f64,
    pub coverage_bisection_iterations: u32,
}

impl Default for WaveguideConfig {
    fn default() -> Self {
        Self {
            weld_tolerance: 1e-6,
            geometry_tolerance: 1e-7,
            coverage_bisection_iterations: 60,
        }
    }
}

static GLOBAL_CONFIG: OnceLock<WaveguideConfig> = OnceLock::new();

/// Returns the process-wide config, initializing it to defaults on first
/// access if `set_config` was never called.
pub fn get_config() -> &'static WaveguideConfig {
    GLOBAL_CONFIG.get_or_init(WaveguideConfig::default)
}

/// Sets the process-wide config. Returns the rejected value if a config
/// was already established (by an earlier `set_config` or `get_config`).
pub fn set_config(config: WaveguideConfig) -> Result<(), Box<WaveguideConfig>> {
    GLOBAL_CONFIG.set(config).map_err(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_tolerances() {
        let config = WaveguideConfig::default();
        assert!(config.weld_tolerance > 0.0);
        assert!(config.coverage_bisection_iterations > 0);
    }
}
