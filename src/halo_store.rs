//! C2: per-process collection of halos and their particle-id sets for
//! the two active snapshots (spec §4.2).
//!
//! Halos are held in a `generational_arena::Arena` rather than a plain
//! `Vec`: spec §9 "Design Notes" points out that the tree forms a DAG
//! with no object cycles and is "safe to own by step-indexed arenas
//! freed at step boundaries" — the arena gives us exactly that, plus
//! protection against a stale `HaloRef::Local` surviving a `clear()`
//! and silently aliasing an unrelated halo inserted afterwards.
use generational_arena::Arena;
use generational_arena::Index;

use crate::halo::Halo;
use crate::halo::HaloId;
use crate::inverted_index::InvertedIndex;
use crate::particle_set::ParticleSet;

/// Which of the two concurrently-held snapshots a slot refers to.
/// Slot 0 holds descendants (current snapshot), slot 1 holds
/// progenitors (previous snapshot), per spec §3 "Lifecycles".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Descendant = 0,
    Progenitor = 1,
}

#[derive(Default)]
struct SlotData {
    halos: Arena<Halo>,
    particle_sets: Arena<ParticleSet>,
    by_id: crate::inverted_index::HashMap<HaloId, Index>,
    inverted_index: InvertedIndex,
}

/// Holds the halo arrays, particle-id arrays and reverse id->index map
/// for both active snapshot slots (spec §4.2).
#[derive(Default)]
pub struct HaloStore {
    slots: [SlotData; 2],
}

impl HaloStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, slot: Slot) -> &SlotData {
        &self.slots[slot as usize]
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut SlotData {
        &mut self.slots[slot as usize]
    }

    /// Appends a halo and its particle set. The particle set must
    /// already be sorted per type (the `ParticleSet` constructors
    /// guarantee this), satisfying the insertion invariant of spec
    /// §4.2.
    pub fn append(&mut self, slot: Slot, halo: Halo, particle_set: ParticleSet) -> Index {
        let id = halo.id;
        let s = self.slot_mut(slot);
        let idx = s.halos.insert(halo);
        let pidx = s.particle_sets.insert(particle_set);
        debug_assert_eq!(idx, pidx, "halo and particle-set arenas must stay in lockstep");
        s.by_id.insert(id, idx);
        idx
    }

    pub fn halo(&self, slot: Slot, idx: Index) -> Option<&Halo> {
        self.slot(slot).halos.get(idx)
    }

    pub fn halo_mut(&mut self, slot: Slot, idx: Index) -> Option<&mut Halo> {
        self.slot_mut(slot).halos.get_mut(idx)
    }

    pub fn particle_set(&self, slot: Slot, idx: Index) -> Option<&ParticleSet> {
        self.slot(slot).particle_sets.get(idx)
    }

    pub fn particle_set_mut(&mut self, slot: Slot, idx: Index) -> Option<&mut ParticleSet> {
        self.slot_mut(slot).particle_sets.get_mut(idx)
    }

    pub fn index_of(&self, slot: Slot, id: HaloId) -> Option<Index> {
        self.slot(slot).by_id.get(&id).copied()
    }

    pub fn len(&self, slot: Slot) -> usize {
        self.slot(slot).halos.len()
    }

    pub fn is_empty(&self, slot: Slot) -> bool {
        self.len(slot) == 0
    }

    /// Iterates halos in insertion order (spec §5: "insertion order as
    /// produced by the catalog reader").
    pub fn iter(&self, slot: Slot) -> impl Iterator<Item = (Index, &Halo)> {
        self.slot(slot).halos.iter()
    }

    /// Clears a slot, dropping its halos, particle sets and index.
    /// Part of the shift operation (spec §4.8 step 8): must be called
    /// on slot 0 *before* slot 1 is moved into it, so peak memory
    /// stays at 2x a snapshot rather than 3x (spec §5).
    pub fn clear(&mut self, slot: Slot) {
        self.slots[slot as usize] = SlotData::default();
    }

    /// Builds (or rebuilds) the inverted index for a slot from its
    /// current particle sets (spec §4.2 `buildInvertedIndex`).
    pub fn build_inverted_index(&mut self, slot: Slot) {
        let s = self.slot_mut(slot);
        s.inverted_index.clear();
        for (idx, halo) in s.halos.iter() {
            let particle_set = &s.particle_sets[idx];
            for (particle_type, particle_id) in particle_set.iter_all() {
                s.inverted_index.record(particle_id, halo.id, particle_type);
            }
        }
    }

    pub fn inverted_index(&self, slot: Slot) -> &InvertedIndex {
        &self.slot(slot).inverted_index
    }

    /// Shifts this step's descendants into the progenitor slot for the
    /// next step, freeing the old (now fully consumed) progenitor slot
    /// first (spec §4.8 step 8, §5 memory discipline). The driver fills
    /// the now-empty descendant slot with the next freshly read
    /// catalog plus any orphan carry-over.
    pub fn shift(&mut self) {
        self.clear(Slot::Progenitor);
        self.slots.swap(0, 1);
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::halo::ParticleCounts;
    use crate::halo::ParticleId;

    fn halo(id: u64) -> Halo {
        Halo {
            id: HaloId(id),
            host_id: None,
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            virial_radius: 1.0,
            particle_counts: ParticleCounts(vec![0, 10]),
            spin: 0.0,
            high_res_mass_fraction: 1.0,
            is_token: false,
            n_orphan_steps: 0,
        }
    }

    #[test]
    fn append_and_lookup_by_id() {
        let mut store = HaloStore::new();
        let idx = store.append(
            Slot::Descendant,
            halo(42),
            ParticleSet::from_pairs(2, [(1, ParticleId(1))]),
        );
        assert_eq!(store.index_of(Slot::Descendant, HaloId(42)), Some(idx));
        assert_eq!(store.halo(Slot::Descendant, idx).unwrap().id, HaloId(42));
    }

    #[test]
    fn shift_moves_descendants_into_progenitors_and_empties_descendant_slot() {
        let mut store = HaloStore::new();
        store.append(Slot::Progenitor, halo(1), ParticleSet::new(2));
        store.append(Slot::Descendant, halo(2), ParticleSet::new(2));
        store.shift();
        assert_eq!(store.len(Slot::Progenitor), 1);
        assert!(store.index_of(Slot::Progenitor, HaloId(2)).is_some());
        assert!(store.index_of(Slot::Progenitor, HaloId(1)).is_none());
        assert!(store.is_empty(Slot::Descendant));
    }

    #[test]
    fn inverted_index_reflects_ownership() {
        let mut store = HaloStore::new();
        store.append(
            Slot::Descendant,
            halo(1),
            ParticleSet::from_pairs(2, [(1, ParticleId(5))]),
        );
        store.build_inverted_index(Slot::Descendant);
        assert!(store.inverted_index(Slot::Descendant).contains(ParticleId(5)));
    }
}
