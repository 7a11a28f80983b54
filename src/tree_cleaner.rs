//! C6: tree cleaner (spec §4.6), grounded in
//! `original_source/src/MergerTree.cpp`'s `CleanTrees` mutual-best-match
//! pass.
use crate::halo::HaloId;
use crate::merit::rank_candidates;
use crate::merit::Candidate;
use crate::progenitor_search::CandidateMap;

/// One emitted tree edge for a single step. `is_orphan` marks the
/// self-referential entry a halo gets when it has no surviving
/// progenitor (spec §3 "isOrphan").
#[derive(Debug, Clone, PartialEq)]
pub struct CleanEdge {
    pub descendant_id: HaloId,
    pub progenitor_id: HaloId,
    pub n_common_per_type: Vec<u64>,
    pub is_orphan: bool,
}

fn orphan_edge(descendant_id: HaloId) -> CleanEdge {
    CleanEdge {
        descendant_id,
        progenitor_id: descendant_id,
        n_common_per_type: Vec::new(),
        is_orphan: true,
    }
}

/// `hB`'s best descendant according to the backward search (spec §4.6
/// step 2): rank `backward`'s candidates for `progenitor_id` (which
/// plays the descendant role in the backward direction) and take the
/// top one's id.
fn best_backward_descendant(backward: &CandidateMap, progenitor_id: HaloId, n_dark_matter: &impl Fn(HaloId) -> u64) -> Option<HaloId> {
    let candidates: Vec<Candidate> = backward.get(&progenitor_id)?.clone();
    let ranked = rank_candidates(n_dark_matter(progenitor_id), candidates);
    ranked.into_iter().next().map(|(c, _)| c.progenitor_id)
}

/// Reconciles forward and backward searches for one step, emitting one
/// or more edges per descendant, or a single orphan self-edge when
/// none survive (spec §4.6).
///
/// `n_dark_matter` must resolve dark-matter counts for halo ids from
/// *either* snapshot slot, since it is used both to rank forward
/// candidates (descendant ids) and to rank backward candidates
/// (progenitor ids playing the descendant role).
pub fn clean_step(forward: &CandidateMap, backward: &CandidateMap, all_descendants: impl IntoIterator<Item = HaloId>, n_dark_matter: impl Fn(HaloId) -> u64) -> Vec<CleanEdge> {
    let mut edges = Vec::new();
    for descendant_id in all_descendants {
        let candidates = match forward.get(&descendant_id) {
            Some(c) if !c.is_empty() => c.clone(),
            _ => {
                edges.push(orphan_edge(descendant_id));
                continue;
            }
        };

        let ranked = rank_candidates(n_dark_matter(descendant_id), candidates);
        let retained: Vec<Candidate> = ranked
            .into_iter()
            .filter(|(candidate, _)| best_backward_descendant(backward, candidate.progenitor_id, &n_dark_matter) == Some(descendant_id))
            .map(|(candidate, _)| candidate)
            .collect();

        if retained.is_empty() {
            edges.push(orphan_edge(descendant_id));
            continue;
        }

        let reranked = rank_candidates(n_dark_matter(descendant_id), retained);
        for (candidate, _merit) in reranked {
            edges.push(CleanEdge {
                descendant_id,
                progenitor_id: candidate.progenitor_id,
                n_common_per_type: candidate.n_common_per_type,
                is_orphan: false,
            });
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use linked_hash_map::LinkedHashMap;

    use super::*;

    fn candidate(id: u64, n_common_dm: u64, n_dm: u64) -> Candidate {
        Candidate {
            progenitor_id: HaloId(id),
            n_common_per_type: vec![0, n_common_dm],
            n_dark_matter_progenitor: n_dm,
        }
    }

    /// S1: a single descendant and its mutual-best progenitor produce
    /// exactly one non-orphan edge.
    #[test]
    fn identity_link_is_mutual_best_and_survives() {
        let mut forward = CandidateMap::new();
        forward.insert(HaloId(42), vec![candidate(42, 10, 10)]);
        let mut backward = CandidateMap::new();
        backward.insert(HaloId(42), vec![candidate(42, 10, 10)]);

        let edges = clean_step(&forward, &backward, [HaloId(42)], |_| 10);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].progenitor_id, HaloId(42));
        assert!(!edges[0].is_orphan);
    }

    /// S2: a major merger keeps both progenitor edges when each is
    /// also the mutual best match for its own descendant.
    #[test]
    fn major_merger_keeps_both_mutual_matches() {
        let mut forward = CandidateMap::new();
        forward.insert(HaloId(3), vec![candidate(1, 5, 5), candidate(2, 5, 5)]);
        let mut backward = CandidateMap::new();
        backward.insert(HaloId(1), vec![candidate(3, 5, 10)]);
        backward.insert(HaloId(2), vec![candidate(3, 5, 10)]);

        let n_dm = |id: HaloId| if id == HaloId(3) { 10 } else { 5 };
        let edges = clean_step(&forward, &backward, [HaloId(3)], n_dm);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| !e.is_orphan));
    }

    /// Testable property #4: a disagreeing backward search drops the
    /// forward edge and the descendant becomes an orphan instead.
    #[test]
    fn backward_disagreement_drops_the_edge() {
        let mut forward = CandidateMap::new();
        forward.insert(HaloId(20), vec![candidate(10, 8, 8)]);
        let mut backward = CandidateMap::new();
        // Halo 10's best backward descendant is halo 99, not 20.
        backward.insert(HaloId(10), vec![candidate(99, 8, 8)]);

        let edges = clean_step(&forward, &backward, [HaloId(20)], |_| 8);
        assert_eq!(edges.len(), 1);
        assert!(edges[0].is_orphan);
        assert_eq!(edges[0].progenitor_id, HaloId(20));
    }

    /// Descendants with no forward candidates at all get an orphan
    /// self-edge without panicking.
    #[test]
    fn no_candidates_yields_orphan_edge() {
        let forward = CandidateMap::new();
        let backward = CandidateMap::new();
        let edges = clean_step(&forward, &backward, [HaloId(7)], |_| 0);
        assert_eq!(edges, vec![orphan_edge(HaloId(7))]);
    }

    /// S6: when two candidates are mutual-best matches with equal
    /// base merit, the re-ranked edge order still favours the
    /// first-enumerated candidate.
    #[test]
    fn tied_mutual_matches_are_emitted_in_merit_order() {
        let mut forward = CandidateMap::new();
        forward.insert(HaloId(20), vec![candidate(10, 50, 100), candidate(11, 50, 100)]);
        let mut backward = CandidateMap::new();
        backward.insert(HaloId(10), vec![candidate(20, 50, 100)]);
        backward.insert(HaloId(11), vec![candidate(20, 50, 100)]);

        let edges = clean_step(&forward, &backward, [HaloId(20)], |_| 100);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].progenitor_id, HaloId(10));
        assert_eq!(edges[1].progenitor_id, HaloId(11));
    }

    #[test]
    fn insertion_order_of_all_descendants_is_preserved() {
        let ids: Vec<HaloId> = vec![HaloId(2), HaloId(1)];
        let forward: CandidateMap = LinkedHashMap::new();
        let backward: CandidateMap = LinkedHashMap::new();
        let edges = clean_step(&forward, &backward, ids.clone(), |_| 0);
        assert_eq!(edges.iter().map(|e| e.descendant_id).collect::<Vec<_>>(), ids);
    }
}
