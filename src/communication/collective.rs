//! Collective reductions used for cross-rank diagnostics (spec §5:
//! total orphan counts, total halo counts per step), adapted from the
//! teacher's `communication::collective_communicator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Sum,
}

pub trait CollectiveCommunicator<T> {
    fn all_gather(&mut self, send: &T) -> Vec<T>;
    fn reduce(&mut self, send: &T, op: Operation) -> T;
}

#[cfg(not(feature = "local"))]
impl CollectiveCommunicator<u64> for super::mpi_world::MpiWorld<u64> {
    fn all_gather(&mut self, send: &u64) -> Vec<u64> {
        super::mpi_world::MpiWorld::all_gather(self, send)
    }

    fn reduce(&mut self, send: &u64, op: Operation) -> u64 {
        match op {
            Operation::Sum => self.all_reduce_sum(send),
        }
    }
}

/// In-process stand-in used under the `local` feature: every rank
/// already observed every other rank's contribution is not true here,
/// so callers on the `local` backend provide the full set of per-rank
/// values directly instead of going through a communicator.
pub fn local_reduce(values: &[u64], op: Operation) -> u64 {
    match op {
        Operation::Sum => values.iter().sum(),
    }
}
