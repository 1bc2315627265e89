//! Configuration structures for the engine's timestep, solver, and collision
//! knobs. Plain `serde`-derived data; none of these types change the
//! engine's physical semantics on their own — `World::with_config` just
//! applies their values wherever the solver and integrator leave room for a
//! tunable.

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};

/// Top-level engine configuration, grouping the solver and collision knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Nominal fixed time step in seconds, for callers that want to log or
    /// assert the simulation rate. `simulate` itself always integrates
    /// exactly the `dt` passed to it, with no internal substepping.
    pub dt: f64,

    /// Solver configuration.
    pub solver: SolverConfig,

    /// Collision detection configuration.
    pub collision: CollisionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            solver: SolverConfig::default(),
            collision: CollisionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validates that every field is inside its documented range.
    pub fn validate(&self) -> PhysicsResult<()> {
        if self.dt <= 0.0 {
            return Err(PhysicsError::invalid_configuration(
                "dt",
                self.dt.to_string(),
                "> 0",
            ));
        }
        self.solver.validate()?;
        self.collision.validate()
    }
}

/// Sequential Impulses solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Maximum sweeps over the equation set per step.
    pub max_iterations: usize,

    /// Early-exit threshold on total `|Δλ|` across one sweep.
    pub tolerance: f64,

    /// SPOOK stiffness parameter shared by every equation.
    pub spook_stiffness: f64,

    /// SPOOK relaxation parameter shared by every equation.
    pub spook_relaxation: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 1e-7,
            spook_stiffness: 1e7,
            spook_relaxation: 4.0,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> PhysicsResult<()> {
        if self.max_iterations == 0 {
            return Err(PhysicsError::invalid_configuration(
                "max_iterations",
                "0",
                "> 0",
            ));
        }
        if self.tolerance <= 0.0 {
            return Err(PhysicsError::invalid_configuration(
                "tolerance",
                self.tolerance.to_string(),
                "> 0",
            ));
        }
        if self.spook_stiffness <= 0.0 || self.spook_relaxation <= 0.0 {
            return Err(PhysicsError::invalid_configuration(
                "spook_stiffness/spook_relaxation",
                format!("{}/{}", self.spook_stiffness, self.spook_relaxation),
                "> 0",
            ));
        }
        Ok(())
    }
}

/// Broad/narrow phase collision configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionConfig {
    /// Broad phase method.
    pub broad_phase: BroadPhaseMethod,

    /// Default restitution used when a body's material does not set one.
    pub default_restitution: f64,

    /// Default friction used when a body's material does not set one.
    pub default_friction: f64,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            broad_phase: BroadPhaseMethod::SweepAndPrune,
            default_restitution: 0.3,
            default_friction: 0.3,
        }
    }
}

impl CollisionConfig {
    pub fn validate(&self) -> PhysicsResult<()> {
        if !(0.0..=1.0).contains(&self.default_restitution) {
            return Err(PhysicsError::invalid_configuration(
                "default_restitution",
                self.default_restitution.to_string(),
                "in [0, 1]",
            ));
        }
        if self.default_friction < 0.0 {
            return Err(PhysicsError::invalid_configuration(
                "default_friction",
                self.default_friction.to_string(),
                ">= 0",
            ));
        }
        Ok(())
    }
}

/// Broad phase collision detection methods. Only `SweepAndPrune` is
/// implemented; the other variants are reserved for future engines sharing
/// this configuration shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadPhaseMethod {
    SweepAndPrune,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_solver_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.solver.max_iterations, 20);
        assert_relative_eq(config.solver.tolerance, 1e-7);
        assert_relative_eq(config.dt, 1.0 / 60.0);
    }

    #[test]
    fn default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_iterations_is_invalid() {
        let mut config = EngineConfig::default();
        config.solver.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    fn assert_relative_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }
}
