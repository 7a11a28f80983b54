//! Per-neighbour-rank data buckets (spec §4.3), adapted from the
//! teacher's `communication::data_by_rank` module.
use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::ops::IndexMut;

use super::rank::Rank;
use super::sized_communicator::SizedCommunicator;

#[derive(Clone)]
pub struct DataByRank<T>(HashMap<Rank, T>);

impl<T: fmt::Debug> fmt::Debug for DataByRank<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T> DataByRank<T> {
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn get(&self, rank: &Rank) -> Option<&T> {
        self.0.get(rank)
    }

    pub fn get_mut(&mut self, rank: &Rank) -> Option<&mut T> {
        self.0.get_mut(rank)
    }

    pub fn insert(&mut self, rank: Rank, data: T) {
        self.0.insert(rank, data);
    }

    pub fn remove(&mut self, rank: &Rank) -> Option<T> {
        self.0.remove(rank)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rank, &T)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Rank, &mut T)> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Default> DataByRank<T> {
    /// One default-valued entry per other rank, used to seed per-rank
    /// exchange buffers before any sends happen.
    pub fn from_communicator(communicator: &impl SizedCommunicator) -> Self {
        Self(
            (0..communicator.size())
                .filter(|rank| *rank != communicator.rank() as usize)
                .map(|rank| (rank as Rank, T::default()))
                .collect(),
        )
    }
}

impl<T> DataByRank<Vec<T>> {
    pub fn push(&mut self, rank: Rank, data: T) {
        self.0.entry(rank).or_insert_with(Vec::new).push(data);
    }

    pub fn drain_all(&mut self) -> impl Iterator<Item = (Rank, Vec<T>)> + '_ {
        self.0.iter_mut().map(|(k, v)| (*k, v.drain(..).collect()))
    }

    /// Like `drain_all`, but in ascending rank order, for deterministic
    /// edge-emission order within a process (spec §5).
    pub fn drain_all_sorted(&mut self) -> impl Iterator<Item = (Rank, Vec<T>)> + '_ {
        let mut keys: Vec<_> = self.0.keys().copied().collect();
        keys.sort_unstable();
        keys.into_iter().map(|k| (k, self.0.remove(&k).unwrap()))
    }
}

impl<T> Index<Rank> for DataByRank<T> {
    type Output = T;

    fn index(&self, index: Rank) -> &Self::Output {
        self.get(&index).unwrap()
    }
}

impl<T> IndexMut<Rank> for DataByRank<T> {
    fn index_mut(&mut self, index: Rank) -> &mut Self::Output {
        self.get_mut(&index).unwrap()
    }
}

impl<T> IntoIterator for DataByRank<T> {
    type Item = (Rank, T);
    type IntoIter = hash_map::IntoIter<Rank, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_drain_sorted() {
        let mut data = DataByRank::empty();
        data.push(2, "b");
        data.push(0, "a");
        data.push(1, "c");
        let drained: Vec<_> = data.drain_all_sorted().collect();
        assert_eq!(drained, vec![(0, vec!["a"]), (1, vec!["c"]), (2, vec!["b"])]);
    }
}
