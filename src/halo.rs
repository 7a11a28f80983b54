//! The halo data model (spec §3).
use derive_more::Deref;
use derive_more::DerefMut;
use derive_more::From;
use glam::DVec3;
use serde::Deserialize;
use serde::Serialize;

/// Unique halo identifier, as assigned by the halo finder. Stable
/// across snapshots for the same physical structure when the finder
/// re-detects it, but *not* guaranteed stable for orphaned structures
/// (those keep their last real id while tokenized).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Deref, Serialize, Deserialize)]
pub struct HaloId(pub u64);

/// Particle identifier as assigned by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Deref, Serialize, Deserialize)]
pub struct ParticleId(pub u64);

/// Particle species tag. Dark matter is `config::DARK_MATTER_TYPE`.
pub type ParticleType = u8;

/// A local, process-relative index into one of the two active halo
/// slots, or a reference into the process's buffer (ghost) halos.
///
/// This replaces the source's sign-bit convention (`j < 0` ⇒ buffer)
/// flagged as fragile in spec §9 "Design Notes": the tag is explicit,
/// so an accidental comparison of two buffer references is a type-level
/// non-issue rather than an assertion that can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HaloRef {
    /// Arena index into `HaloStore::halos(slot)`.
    Local(generational_arena::Index),
    /// Index into the process's ghost/buffer halos for that slot.
    Buffer(usize),
}

/// Per-type particle counts, including dark matter at
/// `config::DARK_MATTER_TYPE`. The "aggregate slot" spec §3 mentions is
/// exposed as `Halo::total_particle_count`, computed on demand so it
/// can never drift out of sync with the per-type counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticleCounts(pub Vec<u64>);

impl ParticleCounts {
    pub fn get(&self, t: ParticleType) -> u64 {
        self.0.get(t as usize).copied().unwrap_or(0)
    }

    pub fn dark_matter(&self) -> u64 {
        self.get(crate::config::DARK_MATTER_TYPE)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

/// A single dark-matter halo, as produced by the catalog reader for
/// real halos, or synthesized by the orphan tracker for tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Halo {
    pub id: HaloId,
    pub host_id: Option<HaloId>,
    pub position: DVec3,
    pub velocity: DVec3,
    pub virial_radius: f64,
    pub particle_counts: ParticleCounts,
    pub spin: f64,
    pub high_res_mass_fraction: f64,

    /// True if this halo was injected by the orphan tracker rather
    /// than read from the catalog (spec §3).
    pub is_token: bool,
    /// Number of consecutive snapshots this halo has been tokenized.
    pub n_orphan_steps: u32,
}

impl Halo {
    pub fn total_mass(&self) -> u64 {
        self.particle_counts.total()
    }

    pub fn n_dark_matter(&self) -> u64 {
        self.particle_counts.dark_matter()
    }

    /// Search-radius widening multiplier applied to token halos in
    /// `CompareHalos` (spec §4.4): the longer a halo has drifted
    /// without a real detection, the more slack its position gets.
    pub fn orphan_radius_factor(&self) -> f64 {
        if self.is_token {
            self.n_orphan_steps.max(1) as f64
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_matter_count_reads_configured_slot() {
        let counts = ParticleCounts(vec![0, 42, 3]);
        assert_eq!(counts.dark_matter(), 42);
        assert_eq!(counts.total(), 45);
    }

    #[test]
    fn orphan_radius_factor_is_one_for_live_halos() {
        let h = Halo {
            id: HaloId(1),
            host_id: None,
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            virial_radius: 1.0,
            particle_counts: ParticleCounts(vec![0, 10]),
            spin: 0.0,
            high_res_mass_fraction: 1.0,
            is_token: false,
            n_orphan_steps: 0,
        };
        assert_eq!(h.orphan_radius_factor(), 1.0);
    }

    #[test]
    fn orphan_radius_factor_scales_with_age() {
        let mut h = Halo {
            id: HaloId(1),
            host_id: None,
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            virial_radius: 1.0,
            particle_counts: ParticleCounts(vec![0, 10]),
            spin: 0.0,
            high_res_mass_fraction: 1.0,
            is_token: true,
            n_orphan_steps: 3,
        };
        assert_eq!(h.orphan_radius_factor(), 3.0);
        h.n_orphan_steps = 0;
        assert_eq!(h.orphan_radius_factor(), 1.0);
    }
}
