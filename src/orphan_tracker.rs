//! C7: orphan tracker (spec §4.7), grounded in
//! `original_source/src/MergerTree.cpp`'s orphan-promotion branch at
//! the end of `CleanTrees`.
use linked_hash_map::LinkedHashMap;

use crate::halo::Halo;
use crate::halo::HaloId;
use crate::halo_store::HaloStore;
use crate::halo_store::Slot;
use crate::particle_set::ParticleSet;
use crate::tree_cleaner::CleanEdge;

/// A token halo carried forward across the shift, with the particle
/// set of its last real observation (spec §3).
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub halo: Halo,
    pub particle_set: ParticleSet,
}

/// `Live -> Token(k) -> ... -> Live | Expired` state machine (spec
/// §4.7), keyed by the halo id the token stands in for.
#[derive(Default)]
pub struct OrphanTracker {
    tokens: LinkedHashMap<HaloId, TokenRecord>,
}

impl OrphanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_token(&self, id: HaloId) -> bool {
        self.tokens.contains_key(&id)
    }

    /// Applies one step's transitions (spec §4.7). Must run after
    /// `tree_cleaner::clean_step` and before `HaloStore::shift`.
    ///
    /// Two independent things happen here, and they must not be
    /// conflated: a descendant with no retained progenitor becomes a
    /// *new* token read out of the descendant slot, while a token
    /// already carried into the progenitor slot from a previous step
    /// either gets reconnected (some descendant named it as progenitor
    /// this round) or ages another step in place. `previously_tracked`
    /// is snapshotted before the new-orphan pass so a halo freshly
    /// tokenized this step is never also run through the aging pass
    /// meant for halos tokenized on an earlier step.
    pub fn update(&mut self, edges: &[CleanEdge], store: &mut HaloStore, min_part_halo: u64, max_orphan_steps: u32) {
        let previously_tracked: Vec<HaloId> = self.tokens.keys().copied().collect();

        for edge in edges {
            if edge.is_orphan {
                self.promote(edge.descendant_id, store, Slot::Descendant, min_part_halo, max_orphan_steps);
            }
        }

        let mut reconnected_by: LinkedHashMap<HaloId, HaloId> = LinkedHashMap::new();
        for edge in edges {
            if !edge.is_orphan && previously_tracked.contains(&edge.progenitor_id) {
                reconnected_by.entry(edge.progenitor_id).or_insert(edge.descendant_id);
            }
        }

        for id in previously_tracked {
            if let Some(&descendant_id) = reconnected_by.get(&id) {
                let Some(token) = self.tokens.remove(&id) else { continue };
                // Reconnection: fold the token's last-known particles
                // into the now-live halo's set (spec: `ParticleSet::merge`
                // carries token history into the reconnected halo).
                if let Some(idx) = store.index_of(Slot::Descendant, descendant_id) {
                    if let Some(particle_set) = store.particle_set_mut(Slot::Descendant, idx) {
                        particle_set.merge(&token.particle_set);
                    }
                    if let Some(halo) = store.halo_mut(Slot::Descendant, idx) {
                        halo.is_token = false;
                        halo.n_orphan_steps = 0;
                    }
                }
            } else {
                // Still missing: the token sitting in the progenitor
                // slot was not claimed by anyone this round, so it ages
                // (or expires) in place rather than being dropped.
                self.promote(id, store, Slot::Progenitor, min_part_halo, max_orphan_steps);
            }
        }
    }

    fn promote(&mut self, id: HaloId, store: &HaloStore, slot: Slot, min_part_halo: u64, max_orphan_steps: u32) {
        let idx = match store.index_of(slot, id) {
            Some(i) => i,
            None => return,
        };
        let halo = match store.halo(slot, idx) {
            Some(h) => h,
            None => return,
        };
        if halo.n_dark_matter() <= min_part_halo {
            return;
        }
        let n_orphan_steps = self.tokens.get(&id).map_or(1, |t| t.halo.n_orphan_steps + 1);
        if n_orphan_steps > max_orphan_steps {
            // Expired: drop the token, the lineage ends here.
            self.tokens.remove(&id);
            return;
        }
        let particle_set = store.particle_set(slot, idx).cloned().unwrap_or_else(|| ParticleSet::new(0));
        let mut token_halo = halo.clone();
        token_halo.is_token = true;
        token_halo.n_orphan_steps = n_orphan_steps;
        self.tokens.insert(id, TokenRecord { halo: token_halo, particle_set });
    }

    /// Lists the current tokens for appending into the progenitor slot
    /// freshly produced by this step's shift (spec §4.7: tokens are
    /// carried forward "so the next progenitor search can treat these
    /// tokens as ordinary candidates"). A token must land on the
    /// progenitor side of the *next* search, not the descendant side:
    /// the halo it stands in for has already been shifted there once
    /// as an ordinary (non-token) entry if the catalog re-detected it,
    /// and appending the token too would duplicate that row. If the
    /// catalog never re-detects it, the shift carries nothing under
    /// that id and the token is the only thing keeping the lineage
    /// alive as a progenitor candidate.
    ///
    /// Does not remove them: a token's fate for the step (reconnect,
    /// age, or expire) is decided afterward by `update`, which is the
    /// only thing allowed to drop a token from the tracker.
    pub fn carry_over(&self) -> Vec<TokenRecord> {
        self.tokens.iter().map(|(_, v)| v.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::halo::ParticleCounts;
    use crate::halo::ParticleId;

    fn halo(id: u64, n_dm: u64) -> Halo {
        Halo {
            id: HaloId(id),
            host_id: None,
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            virial_radius: 1.0,
            particle_counts: ParticleCounts(vec![0, n_dm]),
            spin: 0.0,
            high_res_mass_fraction: 1.0,
            is_token: false,
            n_orphan_steps: 0,
        }
    }

    fn orphan_edge(id: HaloId) -> CleanEdge {
        CleanEdge {
            descendant_id: id,
            progenitor_id: id,
            n_common_per_type: Vec::new(),
            is_orphan: true,
        }
    }

    /// S3: an orphaned halo above `minPartHalo` is tokenized with
    /// `nOrphanSteps=1` and its particle set recorded for carry-over.
    #[test]
    fn orphan_above_threshold_is_tokenized() {
        let mut store = HaloStore::new();
        store.append(
            Slot::Descendant,
            halo(2, 100),
            ParticleSet::from_pairs(2, (200..300).map(|i| (1u8, ParticleId(i)))),
        );
        let mut tracker = OrphanTracker::new();
        tracker.update(&[orphan_edge(HaloId(2))], &mut store, 50, 5);

        assert_eq!(tracker.token_count(), 1);
        let carried = tracker.carry_over();
        assert_eq!(carried.len(), 1);
        assert!(carried[0].halo.is_token);
        assert_eq!(carried[0].halo.n_orphan_steps, 1);
        assert_eq!(carried[0].particle_set.ids(1).len(), 100);
    }

    #[test]
    fn orphan_below_threshold_is_not_tokenized() {
        let mut store = HaloStore::new();
        store.append(Slot::Descendant, halo(2, 10), ParticleSet::new(2));
        let mut tracker = OrphanTracker::new();
        tracker.update(&[orphan_edge(HaloId(2))], &mut store, 50, 5);
        assert_eq!(tracker.token_count(), 0);
    }

    /// S4: a reconnection clears the token flag and merges carried
    /// particles into the newly matched halo.
    #[test]
    fn reconnection_clears_token_and_merges_particles() {
        let mut store = HaloStore::new();
        let idx = store.append(
            Slot::Descendant,
            halo(2, 51),
            ParticleSet::from_pairs(2, (200..251).chain(300..350).map(|i| (1u8, ParticleId(i)))),
        );
        let mut tracker = OrphanTracker::new();
        tracker.tokens.insert(
            HaloId(2),
            TokenRecord {
                halo: {
                    let mut h = halo(2, 100);
                    h.is_token = true;
                    h.n_orphan_steps = 1;
                    h
                },
                particle_set: ParticleSet::from_pairs(2, (200..300).map(|i| (1u8, ParticleId(i)))),
            },
        );

        let matched_edge = CleanEdge {
            descendant_id: HaloId(2),
            progenitor_id: HaloId(2),
            n_common_per_type: vec![0, 51],
            is_orphan: false,
        };
        tracker.update(&[matched_edge], &mut store, 50, 5);

        assert_eq!(tracker.token_count(), 0);
        let halo_after = store.halo(Slot::Descendant, idx).unwrap();
        assert!(!halo_after.is_token);
        assert_eq!(halo_after.n_orphan_steps, 0);
        // Union of {200..251, 300..350} and the token's {200..300}.
        assert_eq!(store.particle_set(Slot::Descendant, idx).unwrap().ids(1).len(), 150);
    }

    #[test]
    fn repeated_orphan_steps_age_and_eventually_expire() {
        let mut store = HaloStore::new();
        store.append(Slot::Descendant, halo(2, 100), ParticleSet::from_pairs(2, [(1u8, ParticleId(1))]));
        let mut tracker = OrphanTracker::new();
        for step in 1..=3 {
            tracker.update(&[orphan_edge(HaloId(2))], &mut store, 50, 2);
            if step <= 2 {
                assert_eq!(tracker.token_count(), 1, "step {step}");
            } else {
                assert_eq!(tracker.token_count(), 0, "expired after exceeding max_orphan_steps");
            }
        }
    }
}
