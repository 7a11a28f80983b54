//! C3: buffer (ghost) exchange (spec §4.3), grounded in the teacher's
//! `communication` stack generalized from gas-particle-component
//! exchange to halo/particle-set exchange.
use serde::Deserialize;
use serde::Serialize;

use crate::communication::CollectiveCommunicator;
use crate::communication::DataByRank;
use crate::communication::ExchangeCommunicator;
use crate::communication::Operation;
use crate::communication::Rank;
use crate::communication::SizedCommunicator;
use crate::communication::WorldCommunicator;
use crate::grid::Grid;
use crate::grid::SlabRange;
use crate::halo::Halo;
use crate::halo::HaloRef;
use crate::halo_store::HaloStore;
use crate::halo_store::Slot;
use crate::particle_set::ParticleSet;

/// One halo replicated into a neighbour's ghost region, with its
/// particle set, so downstream comparisons never need a round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferEntry {
    pub halo: Halo,
    pub particle_set: ParticleSet,
}

/// The process-local ghost region for one slot: every `BufferEntry`
/// received from other ranks, indexed by `HaloRef::Buffer(i)` (spec
/// §4.3 "locBuffHalos").
#[derive(Debug, Clone, Default)]
pub struct BufferRegion {
    entries: Vec<BufferEntry>,
}

impl BufferRegion {
    pub fn get(&self, idx: usize) -> Option<&BufferEntry> {
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &BufferEntry)> {
        self.entries.iter().enumerate()
    }

    pub fn resolve(&self, halo_ref: HaloRef) -> Option<&BufferEntry> {
        match halo_ref {
            HaloRef::Buffer(i) => self.get(i),
            HaloRef::Local(_) => None,
        }
    }
}

/// Determines, for every other rank, which of this process's halos in
/// `slot` lie within `ghost_width` cells of that rank's owned slab
/// (spec §4.3 step 2).
fn halos_of_interest_to_neighbours(
    store: &HaloStore,
    slot: Slot,
    grid: &Grid,
    my_slab: SlabRange,
    num_ranks: usize,
    ghost_width: usize,
) -> DataByRank<Vec<BufferEntry>> {
    let mut out = DataByRank::empty();
    for (idx, halo) in store.iter(slot) {
        let x_cell = (halo.position.x / grid.cell_size()).floor() as i64;
        for rank in 0..num_ranks {
            let neighbour_slab = grid.slab_for_rank(rank, num_ranks);
            if my_slab == neighbour_slab {
                continue;
            }
            if neighbour_slab.within_ghost_width(x_cell, grid.n_grid(), ghost_width) {
                let particle_set = store.particle_set(slot, idx).cloned().unwrap_or_else(|| ParticleSet::new(0));
                out.push(
                    rank as Rank,
                    BufferEntry {
                        halo: halo.clone(),
                        particle_set,
                    },
                );
            }
        }
    }
    out
}

/// Runs the all-to-some exchange for one slot and returns the combined
/// ghost region (spec §4.3 step 3). A transport failure here (an MPI
/// error, or a disconnected in-process channel) is fatal for the step
/// per §4.3/§7: the underlying communicator panics, which the driver
/// turns into step-abort via `std::panic::catch_unwind`.
pub fn exchange_buffers<C>(
    exchanger: &mut ExchangeCommunicator<C, BufferEntry>,
    store: &HaloStore,
    slot: Slot,
    grid: &Grid,
    my_slab: SlabRange,
    ghost_width: usize,
) -> BufferRegion
where
    C: WorldCommunicator<BufferEntry> + SizedCommunicator,
{
    let num_ranks = exchanger.size();
    if num_ranks <= 1 {
        return BufferRegion::default();
    }
    let to_send = halos_of_interest_to_neighbours(store, slot, grid, my_slab, num_ranks, ghost_width);
    let received = exchanger.exchange_all(to_send);
    let mut entries = Vec::new();
    for (_rank, mut batch) in received.into_iter() {
        entries.append(&mut batch);
    }
    BufferRegion { entries }
}

/// Reports the total number of buffered halos across all processes,
/// used for diagnostics (spec §5 "collective reductions for orphan
/// counters" — the same pattern applies to ghost-region sizing).
pub fn total_buffer_size<C: CollectiveCommunicator<u64>>(communicator: &mut C, local: usize) -> u64 {
    communicator.reduce(&(local as u64), Operation::Sum)
}

#[cfg(all(test, feature = "local"))]
mod tests {
    use std::thread;

    use glam::DVec3;

    use super::*;
    use crate::communication::get_local_communicators;
    use crate::halo::HaloId;
    use crate::halo::ParticleCounts;

    fn halo(id: u64, x: f64) -> Halo {
        Halo {
            id: HaloId(id),
            host_id: None,
            position: DVec3::new(x, 0.0, 0.0),
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
    fn boundary_halo_is_replicated_to_the_neighbouring_rank() {
        let comms = get_local_communicators::<BufferEntry>(2);
        let handles: Vec<_> = comms
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                thread::spawn(move || {
                    let grid = Grid::new(4, 8.0);
                    let my_slab = grid.slab_for_rank(rank, 2);
                    let mut store = HaloStore::new();
                    // Rank 0 owns x-cells [0,2), rank 1 owns [2,4); put
                    // a rank-0 halo right at the boundary (cell 1).
                    if rank == 0 {
                        store.append(Slot::Progenitor, halo(1, 3.0), ParticleSet::from_pairs(2, [(1, crate::halo::ParticleId(7))]));
                    }
                    let mut exchanger = ExchangeCommunicator::new(comm);
                    let region = exchange_buffers(&mut exchanger, &store, Slot::Progenitor, &grid, my_slab, 2);
                    if rank == 1 {
                        assert_eq!(region.len(), 1);
                        assert_eq!(region.get(0).unwrap().halo.id, HaloId(1));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
