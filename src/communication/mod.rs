//! Rank-to-rank communication stack (spec §4.3 / §A4): a transport
//! (`mpi_world` by default, `local` in-process channels behind the
//! `local` feature for single-process zoom runs and tests) plus the
//! transport-agnostic `ExchangeCommunicator` used by the buffer
//! exchange and by orphan-count diagnostics.
mod collective;
mod data_by_rank;
mod exchange_communicator;
#[cfg(feature = "local")]
mod local;
#[cfg(not(feature = "local"))]
mod mpi_buffer_world;
#[cfg(not(feature = "local"))]
mod mpi_world;
mod rank;
mod sized_communicator;
mod world_communicator;

pub use collective::CollectiveCommunicator;
pub use collective::Operation;
pub use data_by_rank::DataByRank;
pub use exchange_communicator::ExchangeCommunicator;
pub use rank::NumRanks;
pub use rank::Rank;
pub use rank::WorldRank;
pub use sized_communicator::SizedCommunicator;
pub use world_communicator::WorldCommunicator;

#[cfg(not(feature = "local"))]
pub use mpi_buffer_world::MpiBufferWorld;
#[cfg(not(feature = "local"))]
pub use mpi_world::MpiWorld as Communicator;
#[cfg(not(feature = "local"))]
pub use mpi_world::MPI_UNIVERSE;

#[cfg(feature = "local")]
pub use local::get_local_communicators;
#[cfg(feature = "local")]
pub use local::LocalCommunicator as Communicator;

pub type Exchanger<T> = ExchangeCommunicator<Communicator<T>, T>;
