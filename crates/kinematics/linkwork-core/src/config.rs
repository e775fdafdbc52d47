//! Solver configuration.

use serde::{Deserialize, Serialize};

/// What the spatial solver does when the tetrahedron-apex radicand `r1² − u² − v²` is negative,
/// i.e. when the three spheres around the known points do not meet.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadicandPolicy {
    /// Fail the solve with a degenerate-geometry error.
    #[default]
    Strict,
    /// Treat the radicand as zero and place the joint in the plane of the known points.
    ClampToZero,
    /// Take the absolute value of the radicand. This keeps a mechanism moving through
    /// configurations that have no real solution and can hide authoring mistakes.
    Absolute,
}

/// Configuration shared by the per-tick solve pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub radicand_policy: RadicandPolicy,
    /// Relative slack for the triangle-inequality and radicand checks. Violations this small
    /// compared to the lengths involved are rounding noise and are snapped to the boundary.
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            radicand_policy: RadicandPolicy::Strict,
            tolerance: 1e-9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: SolverConfig = serde_json::from_str(r#"{ "radicand_policy": "clamp_to_zero" }"#)
            .expect("config should parse");
        assert_eq!(cfg.radicand_policy, RadicandPolicy::ClampToZero);
        assert_eq!(cfg.tolerance, SolverConfig::default().tolerance);
    }
}
