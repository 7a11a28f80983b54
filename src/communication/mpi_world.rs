//! The real MPI-backed communicator, adapted from the teacher's
//! `communication::mpi_world`. One process-wide MPI universe is held
//! behind a `lazy_static`, since the `mpi` crate's `Universe` must
//! live for the whole process and cannot be re-initialized; everything
//! else (`MpiWorld<T>`) is cheap to construct per message type.
use std::any::TypeId;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::Mutex;

use lazy_static::lazy_static;
use mpi::collective::SystemOperation;
use mpi::environment::Universe;
use mpi::request::Scope;
use mpi::request::WaitGuard;
use mpi::topology::SystemCommunicator;
use mpi::traits::Communicator;
use mpi::traits::CommunicatorCollectives;
use mpi::traits::Destination;
use mpi::traits::Equivalence;
use mpi::traits::MatchedReceiveVec;
use mpi::traits::Source;
use mpi::Tag;
use mpi::Threading;

use super::rank::Rank;
use super::sized_communicator::SizedCommunicator;

pub struct StaticUniverse(Arc<Mutex<Option<Universe>>>);

impl StaticUniverse {
    pub fn world(&self) -> SystemCommunicator {
        self.0.lock().unwrap().as_ref().unwrap().world()
    }

    /// Drops the held `Universe`, calling `MPI_Finalize`. Must be
    /// called explicitly at shutdown: a value behind `lazy_static`
    /// never runs its destructor.
    pub fn finalize(&self) {
        let _ = self.0.lock().unwrap().take();
    }
}

lazy_static! {
    pub static ref MPI_UNIVERSE: StaticUniverse = {
        let threading = Threading::Single;
        let (universe, _) = mpi::initialize_with_threading(threading)
            .expect("failed to initialize MPI universe");
        StaticUniverse(Arc::new(Mutex::new(Some(universe))))
    };
}

fn get_tag_for_type<T: 'static>() -> Tag {
    let mut hasher = DefaultHasher::new();
    TypeId::of::<T>().hash(&mut hasher);
    // Truncate to a positive i16's worth of bits: tags only need to be
    // distinct enough to avoid accidental collisions between message
    // types travelling between the same pair of ranks concurrently.
    (hasher.finish() as i16).unsigned_abs() as i32
}

#[derive(Clone)]
pub struct MpiWorld<T> {
    world: SystemCommunicator,
    tag: Tag,
    _marker: PhantomData<T>,
}

impl<T: 'static> MpiWorld<T> {
    pub fn new() -> Self {
        Self {
            world: MPI_UNIVERSE.world(),
            tag: get_tag_for_type::<T>(),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Default for MpiWorld<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SizedCommunicator for MpiWorld<T> {
    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn rank(&self) -> Rank {
        self.world.rank()
    }
}

impl<T> super::world_communicator::WorldCommunicator<T> for MpiWorld<T>
where
    T: Equivalence,
{
    fn blocking_send_vec(&mut self, rank: Rank, data: Vec<T>) {
        MpiWorld::blocking_send_vec(self, rank, &data);
    }

    fn receive_vec(&mut self, rank: Rank) -> Vec<T> {
        MpiWorld::receive_vec(self, rank)
    }
}

impl<T> MpiWorld<T>
where
    T: Equivalence,
{
    pub fn receive_vec(&mut self, rank: Rank) -> Vec<T> {
        let process = self.world.process_at_rank(rank);
        let result = process.matched_probe_with_tag(self.tag);
        let (data, _) = result.matched_receive_vec();
        data
    }

    pub fn blocking_send_vec(&mut self, rank: Rank, data: &[T]) {
        let process = self.world.process_at_rank(rank);
        process.send_with_tag(data, self.tag);
    }

    #[must_use]
    pub fn immediate_send_vec<'a, Sc: Scope<'a>>(
        &mut self,
        scope: Sc,
        rank: Rank,
        data: &'a [T],
    ) -> Option<WaitGuard<'a, [T], Sc>> {
        let process = self.world.process_at_rank(rank);
        Some(WaitGuard::from(process.immediate_send_with_tag(scope, data, self.tag)))
    }
}

/// Allocates an uninitialized receive buffer for a collective call.
/// Safe because every element is written by the subsequent MPI call
/// before it is read.
unsafe fn get_buffer<T>(num_elements: usize) -> Vec<T> {
    let mut buffer: Vec<std::mem::MaybeUninit<T>> = Vec::with_capacity(num_elements);
    buffer.set_len(num_elements);
    std::mem::transmute(buffer)
}

impl<T> MpiWorld<T>
where
    T: Equivalence,
{
    /// One value per rank, ordered by rank (spec §5: diagnostic
    /// collective reductions for orphan counters).
    pub fn all_gather(&mut self, send: &T) -> Vec<T> {
        let mut result = unsafe { get_buffer(self.world.size() as usize) };
        self.world.all_gather_into(send, &mut result[..]);
        result
    }
}

impl MpiWorld<u64> {
    pub fn all_reduce_sum(&mut self, send: &u64) -> u64 {
        let mut sum = 0u64;
        self.world.all_reduce_into(send, &mut sum, SystemOperation::sum());
        sum
    }
}
