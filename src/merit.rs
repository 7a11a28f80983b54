//! Merit ranking (C5, spec §4.5), grounded in
//! `original_source/src/MergerTree.cpp`'s candidate-sorting pass.
use crate::config::DARK_MATTER_TYPE;
use crate::halo::HaloId;

/// A (descendant, progenitor) candidate link with per-type shared
/// particle counts, before merit has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub progenitor_id: HaloId,
    pub n_common_per_type: Vec<u64>,
    pub n_dark_matter_progenitor: u64,
}

impl Candidate {
    fn n_common_dark_matter(&self) -> u64 {
        self.n_common_per_type.get(DARK_MATTER_TYPE as usize).copied().unwrap_or(0)
    }
}

/// `merit = nCommon_DM / (1.0001 * ratio - 1.0)`, `ratio =
/// max(nDM_a, nDM_b) / min(nDM_a, nDM_b)`, perturbed by `1 + 1e-5*k` in
/// original enumeration order (spec §4.5) so ties always resolve to a
/// strict order.
fn merit(n_dark_matter_descendant: u64, candidate: &Candidate, k: usize) -> f64 {
    let n_dm_a = n_dark_matter_descendant as f64;
    let n_dm_b = candidate.n_dark_matter_progenitor as f64;
    let ratio = n_dm_a.max(n_dm_b) / n_dm_a.min(n_dm_b);
    let base = candidate.n_common_dark_matter() as f64 / (1.0001 * ratio - 1.0);
    base * (1.0 + 1e-5 * k as f64)
}

/// Ranks candidates by merit descending, stable on the enumeration
/// order the tie-break term is defined against.
pub fn rank_candidates(n_dark_matter_descendant: u64, candidates: Vec<Candidate>) -> Vec<(Candidate, f64)> {
    let n = candidates.len();
    // k runs from n-1 down to 0 over the enumeration order, so an
    // earlier-found candidate wins a tie (spec S6: the first-listed
    // candidate ranks first), rather than the last-found one.
    let mut ranked: Vec<(Candidate, f64)> = candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| {
            let k = n - 1 - index;
            let m = merit(n_dark_matter_descendant, &candidate, k);
            (candidate, m)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u64, n_common_dm: u64, n_dm: u64) -> Candidate {
        Candidate {
            progenitor_id: HaloId(id),
            n_common_per_type: vec![0, n_common_dm],
            n_dark_matter_progenitor: n_dm,
        }
    }

    #[test]
    fn ranks_by_merit_descending() {
        let candidates = vec![candidate(1, 5, 10), candidate(2, 9, 10)];
        let ranked = rank_candidates(10, candidates);
        assert_eq!(ranked[0].0.progenitor_id, HaloId(2));
        assert_eq!(ranked[1].0.progenitor_id, HaloId(1));
    }

    #[test]
    fn equal_merit_breaks_tie_toward_first_enumerated() {
        let candidates = vec![candidate(10, 50, 100), candidate(11, 50, 100)];
        let ranked = rank_candidates(100, candidates);
        assert_eq!(ranked[0].0.progenitor_id, HaloId(10));
        assert!(ranked[0].1 > ranked[1].1);
        let base = 50.0 / (1.0001 - 1.0);
        assert!((ranked[0].1 - ranked[1].1 - base * 1e-5).abs() < 1e-6);
    }
}
