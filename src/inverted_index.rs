//! Particle -> halo inverted index (spec §3), one instance per active
//! snapshot slot.
//!
//! The teacher keeps a `HashMap`/`HashSet` type alias
//! (`src/hash_map.rs`) pointing at Bevy's stable-order hasher so that
//! iteration order is deterministic within a process run. We use
//! `linked_hash_map::LinkedHashMap` for the same reason: spec §5
//! requires halo iteration order to follow catalog-reader insertion
//! order, and a `LinkedHashMap` preserves insertion order for free
//! instead of relying on a specific hasher's incidental behaviour.
use linked_hash_map::LinkedHashMap;

use crate::halo::HaloId;
use crate::halo::ParticleId;
use crate::halo::ParticleType;

pub type HashMap<K, V> = LinkedHashMap<K, V>;

/// A single (halo, type) ownership record for one particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub halo_id: HaloId,
    pub particle_type: ParticleType,
}

#[derive(Debug, Default)]
pub struct InvertedIndex {
    by_particle: HashMap<ParticleId, Vec<Ownership>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self {
            by_particle: HashMap::new(),
        }
    }

    pub fn record(&mut self, particle_id: ParticleId, halo_id: HaloId, particle_type: ParticleType) {
        self.by_particle
            .entry(particle_id)
            .or_insert_with(Vec::new)
            .push(Ownership { halo_id, particle_type });
    }

    pub fn owners(&self, particle_id: ParticleId) -> &[Ownership] {
        self.by_particle.get(&particle_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, particle_id: ParticleId) -> bool {
        self.by_particle.contains_key(&particle_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticleId, &Vec<Ownership>)> {
        self.by_particle.iter()
    }

    pub fn clear(&mut self) {
        self.by_particle.clear();
    }
}
