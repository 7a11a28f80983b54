//! A communicator wrapper that turns one-sided sends into a full
//! exchange: every rank that hasn't explicitly sent data to a peer
//! this round sends an empty vector instead, so `receive_vec` never
//! blocks waiting on a peer with nothing to say (spec §4.3: "pairwise
//! sends, non-blocking, receive-count negotiated first" — modelled
//! here as "every rank always sends something").
use std::marker::PhantomData;

use super::data_by_rank::DataByRank;
use super::rank::Rank;
use super::sized_communicator::SizedCommunicator;
use super::world_communicator::WorldCommunicator;

pub struct ExchangeCommunicator<C, T> {
    communicator: C,
    pending: DataByRank<bool>,
    _marker: PhantomData<T>,
}

impl<C: SizedCommunicator, T> ExchangeCommunicator<C, T> {
    pub fn new(communicator: C) -> Self {
        let pending = DataByRank::from_communicator(&communicator);
        Self {
            communicator,
            pending,
            _marker: PhantomData,
        }
    }
}

impl<C, T> SizedCommunicator for ExchangeCommunicator<C, T>
where
    C: SizedCommunicator,
{
    fn rank(&self) -> Rank {
        self.communicator.rank()
    }

    fn size(&self) -> usize {
        self.communicator.size()
    }
}

impl<C, T> ExchangeCommunicator<C, T>
where
    C: WorldCommunicator<T> + SizedCommunicator,
{
    pub fn blocking_send_vec(&mut self, rank: Rank, data: Vec<T>) {
        debug_assert!(!*self.pending.get(&rank).unwrap_or(&false));
        if let Some(flag) = self.pending.get_mut(&rank) {
            *flag = true;
        }
        self.communicator.blocking_send_vec(rank, data);
    }

    fn empty_send_to_others(&mut self) {
        for rank in self.communicator.other_ranks() {
            if !*self.pending.get(&rank).unwrap_or(&false) {
                self.blocking_send_vec(rank, Vec::new());
            }
        }
    }

    /// Sends one bucket of data per neighbouring rank and returns what
    /// every neighbour sent back this round (spec §4.3 step 3: "an
    /// all-to-some exchange").
    pub fn exchange_all(&mut self, data: DataByRank<Vec<T>>) -> DataByRank<Vec<T>> {
        for (rank, items) in data.into_iter() {
            self.blocking_send_vec(rank, items);
        }
        self.receive_vec()
    }

    fn receive_vec(&mut self) -> DataByRank<Vec<T>> {
        self.empty_send_to_others();
        let mut received = DataByRank::empty();
        for rank in self.communicator.other_ranks() {
            received.insert(rank, self.communicator.receive_vec(rank));
            if let Some(flag) = self.pending.get_mut(&rank) {
                *flag = false;
            }
        }
        received
    }
}
