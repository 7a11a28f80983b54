//! In-process communicator backend used by tests and by `ZOOM` mode
//! (spec §6: zoom simulations run as a single process, so no real MPI
//! transport is needed). Adapted from the teacher's
//! `communication::local`: the teacher exchanges raw bytes over
//! `mpsc` channels so that arbitrary `Equivalence` types cross the
//! "wire"; since this is purely in-process, we exchange `Vec<T>`
//! values directly and drop the byte-transmute step as unnecessary.
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;

use super::data_by_rank::DataByRank;
use super::rank::Rank;
use super::sized_communicator::SizedCommunicator;
use super::world_communicator::WorldCommunicator;

pub struct LocalCommunicator<T> {
    senders: DataByRank<Sender<Vec<T>>>,
    receivers: DataByRank<Receiver<Vec<T>>>,
    rank: Rank,
    size: usize,
}

impl<T> SizedCommunicator for LocalCommunicator<T> {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }
}

impl<T: Send> WorldCommunicator<T> for LocalCommunicator<T> {
    fn blocking_send_vec(&mut self, rank: Rank, data: Vec<T>) {
        self.senders[rank].send(data).expect("peer rank's receiver dropped");
    }

    fn receive_vec(&mut self, rank: Rank) -> Vec<T> {
        self.receivers[rank].recv().expect("peer rank's sender dropped")
    }
}

/// Builds one fully-connected mesh of `LocalCommunicator`s, one per
/// rank, so tests can exercise the same `WorldCommunicator` trait the
/// MPI backend implements without spawning real processes.
pub fn get_local_communicators<T: Send>(size: usize) -> Vec<LocalCommunicator<T>> {
    let mut senders: Vec<DataByRank<Sender<Vec<T>>>> = (0..size).map(|_| DataByRank::empty()).collect();
    let mut receivers: Vec<DataByRank<Receiver<Vec<T>>>> = (0..size).map(|_| DataByRank::empty()).collect();
    for from in 0..size {
        for to in 0..size {
            if from == to {
                continue;
            }
            let (tx, rx) = std::sync::mpsc::channel();
            senders[from].insert(to as Rank, tx);
            receivers[to].insert(from as Rank, rx);
        }
    }
    senders
        .into_iter()
        .zip(receivers)
        .enumerate()
        .map(|(rank, (senders, receivers))| LocalCommunicator {
            senders,
            receivers,
            rank: rank as Rank,
            size,
        })
        .collect()
}
