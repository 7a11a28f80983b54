//! Compile/run-time constants shared across the engine, mirroring the
//! teacher's `config` module (which exposes `NUM_DIMENSIONS` the same
//! way). Unlike the teacher, dimensionality is fixed at 3 (spec §1:
//! the core performs no 2D reduction), so the only thing left to carry
//! here is the particle-type count, which is a runtime parameter
//! (`nPTypes`) rather than a compile-time constant.

/// Dark matter is, by convention, particle type index 1 (spec GLOSSARY).
pub const DARK_MATTER_TYPE: u8 = 1;

/// Default particle type count when not overridden by `nPTypes`.
pub const DEFAULT_NUM_PARTICLE_TYPES: u8 = 6;

/// `fVel` in the full-box prune radius (spec §4.4): converts the raw
/// velocity sum, in simulation units, into a displacement scale over
/// one step. Carried over from the original source's hardcoded value.
pub const VELOCITY_FACTOR: f64 = 0.4e-2;
