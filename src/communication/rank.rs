/// MPI rank: this process's position among equal participants.
pub type Rank = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumRanks(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldRank(pub Rank);

impl WorldRank {
    pub fn is_main(&self) -> bool {
        self.0 == Self::main()
    }

    pub fn main() -> Rank {
        0
    }
}
