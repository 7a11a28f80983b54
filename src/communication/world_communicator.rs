use super::rank::Rank;

/// Point-to-point send/receive of vectors of `T`, implemented by both
/// the real MPI backend and the in-process `local` test backend.
pub trait WorldCommunicator<T> {
    fn blocking_send_vec(&mut self, rank: Rank, data: Vec<T>);
    fn receive_vec(&mut self, rank: Rank) -> Vec<T>;
}
