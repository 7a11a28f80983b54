//! C4: progenitor search (spec §4.4), grounded in
//! `original_source/src/MergerTree.cpp`'s `AssignMap`/`CompareHalos`
//! and the `#ifdef CMP_MAP` / direct-intersection branches, rewritten
//! per spec §9 as runtime-selected strategies behind one trait instead
//! of compile-time flags.
use linked_hash_map::LinkedHashMap;

use crate::buffer_exchange::BufferRegion;
use crate::config::DARK_MATTER_TYPE;
use crate::grid::Grid;
use crate::halo::Halo;
use crate::halo::HaloId;
use crate::halo::HaloRef;
use crate::halo_store::HaloStore;
use crate::halo_store::Slot;
use crate::merit::Candidate;
use crate::parameters::CompareMode;
use crate::parameters::DomainMode;
use crate::particle_set::ParticleSet;

#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub domain_mode: DomainMode,
    pub compare_mode: CompareMode,
    pub d_max_factor: f64,
    pub min_part_cmp: u64,
}

/// Candidate links for every descendant halo, in descendant
/// enumeration order, each candidate list in the order it was
/// discovered (spec §4.4/§4.5: the enumeration order merit's
/// tie-break is defined against).
pub type CandidateMap = LinkedHashMap<HaloId, Vec<Candidate>>;

/// One side of a halo comparison: either a halo local to the "from"
/// store/slot, or a ghost halo replicated from another process.
enum Side<'a> {
    Local(&'a Halo, &'a ParticleSet),
    Buffer(&'a Halo, &'a ParticleSet),
}

impl<'a> Side<'a> {
    fn halo(&self) -> &'a Halo {
        match self {
            Side::Local(h, _) | Side::Buffer(h, _) => h,
        }
    }

    fn particle_set(&self) -> &'a ParticleSet {
        match self {
            Side::Local(_, p) | Side::Buffer(_, p) => p,
        }
    }
}

fn resolve<'a>(store: &'a HaloStore, slot: Slot, buffer: &'a BufferRegion, r: HaloRef) -> Option<Side<'a>> {
    match r {
        HaloRef::Local(idx) => {
            let halo = store.halo(slot, idx)?;
            let particle_set = store.particle_set(slot, idx)?;
            Some(Side::Local(halo, particle_set))
        }
        HaloRef::Buffer(i) => {
            let entry = buffer.get(i)?;
            Some(Side::Buffer(&entry.halo, &entry.particle_set))
        }
    }
}

/// `CompareHalos` heuristic prune (spec §4.4).
fn compare_halos(a: &Halo, b: &Halo, config: &SearchConfig, distance: f64) -> bool {
    let mut r_max = match config.domain_mode {
        DomainMode::Zoom => (a.virial_radius + b.virial_radius) * 25.0,
        DomainMode::Full => {
            let v_max = a.velocity.length() + b.velocity.length();
            (a.virial_radius + b.virial_radius) * config.d_max_factor * v_max * crate::config::VELOCITY_FACTOR
        }
    };
    // The original source widens by whichever side is the token; since
    // which side is "primary" depends on call direction, take the
    // larger of the two factors rather than assume an enumeration order.
    if a.is_token || b.is_token {
        r_max *= a.orphan_radius_factor().max(b.orphan_radius_factor());
    }
    distance < r_max
}

/// Shared strategy surface for both comparison modes (spec §9
/// "Polymorphism via compile-time flags"). `grid` is the grid built
/// over `to_slot`, and `periodic_distance` a box-aware distance
/// function; Mode A ignores both, Mode B uses `grid` to shortlist
/// candidates before pruning with `compare_halos`. Taking plain
/// `&dyn Fn` (rather than `impl Fn`) keeps this trait object-safe, so
/// a genuine implementation backs every comparison mode reachable
/// through `dyn ProgenitorSearch`, not just whichever one a caller
/// happens to call inherently.
pub trait ProgenitorSearch {
    /// Runs one direction of the search: `from_slot` holds the
    /// descendants, `to_slot` holds the candidate progenitors. `buffer`
    /// is the ghost region for `to_slot` (empty in zoom mode).
    fn run(&self, store: &HaloStore, from_slot: Slot, to_slot: Slot, buffer: &BufferRegion, grid: &Grid, periodic_distance: &dyn Fn(glam::DVec3, glam::DVec3) -> f64) -> CandidateMap;
}

pub struct MapJoinSearch {
    pub config: SearchConfig,
}

impl ProgenitorSearch for MapJoinSearch {
    /// Mode A (spec §4.4): walk the particle->halo inverted indices of
    /// both slots together, incrementing a per-(descendant,
    /// progenitor, type) counter for every particle id owned on both
    /// sides. The grid/distance are Mode B's concerns only.
    fn run(&self, store: &HaloStore, from_slot: Slot, to_slot: Slot, _buffer: &BufferRegion, _grid: &Grid, _periodic_distance: &dyn Fn(glam::DVec3, glam::DVec3) -> f64) -> CandidateMap {
        let from_index = store.inverted_index(from_slot);
        let to_index = store.inverted_index(to_slot);

        // descendant id -> progenitor id -> per-type counts, preserving
        // the order descendants/progenitors were first encountered.
        let mut counts: LinkedHashMap<HaloId, LinkedHashMap<HaloId, Vec<u64>>> = LinkedHashMap::new();
        let mut dm_counts: LinkedHashMap<HaloId, u64> = LinkedHashMap::new();
        for (idx, halo) in store.iter(to_slot) {
            let pset = store.particle_set(to_slot, idx).unwrap();
            dm_counts.insert(halo.id, pset.ids(DARK_MATTER_TYPE).len() as u64);
        }

        for (descendant_idx, descendant) in store.iter(from_slot) {
            let descendant_pset = match store.particle_set(from_slot, descendant_idx) {
                Some(p) => p,
                None => continue,
            };
            let entry = counts.entry(descendant.id).or_insert_with(LinkedHashMap::new);
            for (particle_type, particle_id) in descendant_pset.iter_all() {
                if !to_index.contains(particle_id) {
                    continue;
                }
                for owner in to_index.owners(particle_id) {
                    if owner.particle_type != particle_type {
                        continue;
                    }
                    let per_type = entry.entry(owner.halo_id).or_insert_with(|| vec![0u64; from_index_width(store, to_slot)]);
                    if (particle_type as usize) < per_type.len() {
                        per_type[particle_type as usize] += 1;
                    }
                }
            }
        }

        let mut result = CandidateMap::new();
        for (descendant_id, progenitors) in counts.into_iter() {
            let mut candidates = Vec::new();
            for (progenitor_id, per_type_counts) in progenitors.into_iter() {
                let total: u64 = per_type_counts.iter().sum();
                if total <= self.config.min_part_cmp {
                    continue;
                }
                candidates.push(Candidate {
                    progenitor_id,
                    n_dark_matter_progenitor: dm_counts.get(&progenitor_id).copied().unwrap_or(0),
                    n_common_per_type: per_type_counts,
                });
            }
            if !candidates.is_empty() {
                result.insert(descendant_id, candidates);
            }
        }
        result
    }
}

fn from_index_width(store: &HaloStore, slot: Slot) -> usize {
    store
        .iter(slot)
        .next()
        .and_then(|(idx, _)| store.particle_set(slot, idx))
        .map(ParticleSet::num_types)
        .unwrap_or(crate::config::DEFAULT_NUM_PARTICLE_TYPES as usize)
}

pub struct DirectIntersectSearch {
    pub config: SearchConfig,
}

impl ProgenitorSearch for DirectIntersectSearch {
    /// Mode B (spec §4.4): for each descendant, use the grid to get a
    /// short candidate list on `to_slot`, prune with `CompareHalos`,
    /// then intersect sorted particle-id sequences.
    fn run(&self, store: &HaloStore, from_slot: Slot, to_slot: Slot, buffer: &BufferRegion, grid: &Grid, periodic_distance: &dyn Fn(glam::DVec3, glam::DVec3) -> f64) -> CandidateMap {
        let mut result = CandidateMap::new();
        for (from_idx, descendant) in store.iter(from_slot) {
            let descendant_pset = match store.particle_set(from_slot, from_idx) {
                Some(p) => p,
                None => continue,
            };
            let r_search = descendant.virial_radius * 2.0 + grid.cell_size();
            let nearby = grid.list_nearby(descendant.position, r_search);
            let mut candidates = Vec::new();
            for halo_ref in nearby {
                let side = match resolve(store, to_slot, buffer, halo_ref) {
                    Some(s) => s,
                    None => continue,
                };
                let candidate_halo = side.halo();
                if candidate_halo.id == descendant.id {
                    continue;
                }
                let distance = periodic_distance(descendant.position, candidate_halo.position);
                if !compare_halos(descendant, candidate_halo, &self.config, distance) {
                    continue;
                }
                let per_type = descendant_pset.count_common_per_type(side.particle_set());
                let total: u64 = per_type.iter().sum();
                if total <= self.config.min_part_cmp {
                    continue;
                }
                candidates.push(Candidate {
                    progenitor_id: candidate_halo.id,
                    n_dark_matter_progenitor: side.particle_set().ids(DARK_MATTER_TYPE).len() as u64,
                    n_common_per_type: per_type,
                });
            }
            if !candidates.is_empty() {
                result.insert(descendant.id, candidates);
            }
        }
        result
    }
}
