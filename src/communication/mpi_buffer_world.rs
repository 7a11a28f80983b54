//! Byte-serialized MPI transport for ghost-halo batches (spec §4.3).
//!
//! `BufferEntry` carries a variable-length particle-id set, so it
//! can't implement `mpi::traits::Equivalence` the way the fixed-layout
//! types `MpiWorld<T>`'s blanket transport expects. Wraps a byte-level
//! `MpiWorld<u8>` instead: each batch is serialized to YAML and sent
//! as one message, mirroring how the teacher's own non-`Equivalence`
//! payloads cross the wire in `communication::local` (there, by
//! sidestepping `Equivalence` entirely over in-process channels).
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::mpi_world::MpiWorld;
use super::rank::Rank;
use super::sized_communicator::SizedCommunicator;
use super::world_communicator::WorldCommunicator;
use crate::buffer_exchange::BufferEntry;

pub struct MpiBufferWorld {
    bytes: MpiWorld<u8>,
}

impl MpiBufferWorld {
    pub fn new() -> Self {
        Self { bytes: MpiWorld::new() }
    }
}

impl Default for MpiBufferWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SizedCommunicator for MpiBufferWorld {
    fn size(&self) -> usize {
        self.bytes.size()
    }

    fn rank(&self) -> Rank {
        self.bytes.rank()
    }
}

fn encode<T: Serialize>(data: &T) -> Vec<u8> {
    serde_yaml::to_string(data).expect("buffer batch must serialize").into_bytes()
}

fn decode<T: DeserializeOwned>(bytes: Vec<u8>) -> T {
    let text = String::from_utf8(bytes).expect("peer sent a non-UTF8 buffer batch");
    serde_yaml::from_str(&text).expect("peer sent a malformed buffer batch")
}

impl WorldCommunicator<BufferEntry> for MpiBufferWorld {
    fn blocking_send_vec(&mut self, rank: Rank, data: Vec<BufferEntry>) {
        self.bytes.blocking_send_vec(rank, &encode(&data));
    }

    fn receive_vec(&mut self, rank: Rank) -> Vec<BufferEntry> {
        decode(self.bytes.receive_vec(rank))
    }
}
