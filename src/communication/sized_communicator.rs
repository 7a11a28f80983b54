use super::rank::Rank;

pub trait SizedCommunicator {
    fn size(&self) -> usize;
    fn rank(&self) -> Rank;

    fn other_ranks(&self) -> Vec<Rank> {
        (0..self.size() as Rank).filter(|rank| *rank != self.rank()).collect()
    }
}
