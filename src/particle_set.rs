//! Per-halo particle id sets, kept sorted ascending per type (spec §3
//! invariant, required by C4's direct-intersection mode).
use serde::Deserialize;
use serde::Serialize;

use crate::halo::ParticleId;
use crate::halo::ParticleType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticleSet {
    /// `ids_by_type[t]` is the sorted, deduplicated list of particle
    /// ids of type `t` bound to this halo.
    ids_by_type: Vec<Vec<ParticleId>>,
}

impl ParticleSet {
    pub fn new(num_types: usize) -> Self {
        Self {
            ids_by_type: vec![Vec::new(); num_types],
        }
    }

    /// Builds a set from possibly-unsorted `(type, id)` pairs, sorting
    /// and deduplicating per type on construction so every other
    /// method can assume the invariant holds.
    pub fn from_pairs(num_types: usize, pairs: impl IntoIterator<Item = (ParticleType, ParticleId)>) -> Self {
        let mut set = Self::new(num_types);
        for (t, id) in pairs {
            set.insert(t, id);
        }
        set.sort_and_dedup();
        set
    }

    fn insert(&mut self, t: ParticleType, id: ParticleId) {
        if self.ids_by_type.len() <= t as usize {
            self.ids_by_type.resize(t as usize + 1, Vec::new());
        }
        self.ids_by_type[t as usize].push(id);
    }

    fn sort_and_dedup(&mut self) {
        for ids in self.ids_by_type.iter_mut() {
            ids.sort_unstable();
            ids.dedup();
        }
    }

    pub fn num_types(&self) -> usize {
        self.ids_by_type.len()
    }

    pub fn ids(&self, t: ParticleType) -> &[ParticleId] {
        self.ids_by_type.get(t as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter_all(&self) -> impl Iterator<Item = (ParticleType, ParticleId)> + '_ {
        self.ids_by_type
            .iter()
            .enumerate()
            .flat_map(|(t, ids)| ids.iter().map(move |id| (t as ParticleType, *id)))
    }

    /// Count of shared particle ids of type `t` with `other`, using a
    /// merge-style walk over the two sorted slices (spec §4.4: "sorted
    /// sequence intersection").
    pub fn count_common(&self, other: &ParticleSet, t: ParticleType) -> u64 {
        let a = self.ids(t);
        let b = other.ids(t);
        let (mut i, mut j) = (0, 0);
        let mut count = 0u64;
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    count += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        count
    }

    /// Per-type common-particle counts against `other`, one entry per
    /// type (the `nCommon[T][K]` rows of spec §3, for a single `K`).
    pub fn count_common_per_type(&self, other: &ParticleSet) -> Vec<u64> {
        let n = self.num_types().max(other.num_types());
        (0..n as ParticleType).map(|t| self.count_common(other, t)).collect()
    }

    /// Merges another observation into this set (used by the orphan
    /// tracker when a token is reconnected with freshly observed
    /// particles, per S4).
    pub fn merge(&mut self, other: &ParticleSet) {
        if self.ids_by_type.len() < other.ids_by_type.len() {
            self.ids_by_type.resize(other.ids_by_type.len(), Vec::new());
        }
        for (t, ids) in other.ids_by_type.iter().enumerate() {
            self.ids_by_type[t].extend(ids.iter().copied());
        }
        self.sort_and_dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(v: u64) -> ParticleId {
        ParticleId(v)
    }

    #[test]
    fn construction_sorts_and_dedups() {
        let set = ParticleSet::from_pairs(2, [(1, pid(5)), (1, pid(1)), (1, pid(5)), (1, pid(3))]);
        assert_eq!(set.ids(1), &[pid(1), pid(3), pid(5)]);
    }

    #[test]
    fn count_common_matches_set_intersection() {
        let a = ParticleSet::from_pairs(2, (1..=10).map(|i| (1, pid(i))));
        let b = ParticleSet::from_pairs(2, (6..=15).map(|i| (1, pid(i))));
        assert_eq!(a.count_common(&b, 1), 5);
        assert_eq!(a.count_common(&b, 0), 0);
    }

    #[test]
    fn subset_relationship_counts_full_smaller_set() {
        let small = ParticleSet::from_pairs(2, (1..=5).map(|i| (1, pid(i))));
        let large = ParticleSet::from_pairs(2, (1..=10).map(|i| (1, pid(i))));
        assert_eq!(small.count_common(&large, 1), 5);
    }
}
