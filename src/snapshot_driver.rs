//! C8: snapshot driver (spec §4.8), grounded in
//! `original_source/src/MergerTree.cpp`'s per-snapshot main loop,
//! rewritten as the explicit `Engine` aggregate spec §9 asks for
//! ("Global mutable state... become fields of a single `Engine`
//! aggregate passed explicitly").
//!
//! Open question resolved here (see `DESIGN.md`): the source's slot
//! numbering (`locHalos[0]`="current", `locHalos[1]`="previous") reads
//! as self-contradictory against its own shift mechanics once the
//! glossary's "progenitor is earlier, descendant is later" is taken
//! seriously. This driver keeps the glossary definition literally:
//! `Slot::Progenitor` always holds the chronologically earlier
//! snapshot, `Slot::Descendant` the later one, and `HaloStore::shift`
//! moves this step's descendants into next step's progenitor slot.
//!
//! Orphan tokens are carried into that same freshly shifted progenitor
//! slot, not the descendant slot: a token is a stand-in progenitor
//! candidate for the *next* search, so it must sit on the progenitor
//! side of it. Carrying it into the descendant slot instead would put
//! the token in direct competition with its own unaged copy, which the
//! ordinary shift already placed on the progenitor side one step
//! earlier — an identical particle set on both sides of the same
//! search is a guaranteed mutual-best match, which would silently
//! "reconnect" a halo to itself after exactly one missing step.
use crate::buffer_exchange::exchange_buffers;
use crate::buffer_exchange::BufferRegion;
use crate::catalog::particle_set_from_record;
use crate::catalog::CatalogReader;
use crate::communication::ExchangeCommunicator;
use crate::communication::SizedCommunicator;
use crate::communication::WorldCommunicator;
use crate::error::MergerTreeError;
use crate::error::Result;
use crate::grid::Grid;
use crate::halo::HaloId;
use crate::halo::HaloRef;
use crate::halo_store::HaloStore;
use crate::halo_store::Slot;
use crate::orphan_tracker::OrphanTracker;
use crate::output::records_from_edges;
use crate::output::TreeRecord;
use crate::parameters::CompareMode;
use crate::parameters::RuntimeConfig;
use crate::progenitor_search::CandidateMap;
use crate::progenitor_search::DirectIntersectSearch;
use crate::progenitor_search::MapJoinSearch;
use crate::progenitor_search::ProgenitorSearch;
use crate::progenitor_search::SearchConfig;
use crate::snapshot_index::SnapshotEntry;
use crate::tree_cleaner::clean_step;

pub struct SnapshotDriver<R, C> {
    config: RuntimeConfig,
    reader: R,
    exchanger: ExchangeCommunicator<C, crate::buffer_exchange::BufferEntry>,
    store: HaloStore,
    orphans: OrphanTracker,
    seeded: bool,
}

impl<R, C> SnapshotDriver<R, C>
where
    R: CatalogReader,
    C: WorldCommunicator<crate::buffer_exchange::BufferEntry> + SizedCommunicator,
{
    pub fn new(config: RuntimeConfig, reader: R, communicator: C) -> Self {
        Self {
            config,
            reader,
            exchanger: ExchangeCommunicator::new(communicator),
            store: HaloStore::new(),
            orphans: OrphanTracker::new(),
            seeded: false,
        }
    }

    fn read_into(&mut self, slot: Slot, entry: &SnapshotEntry) -> Result<()> {
        let snap_str = format!("{:03}", entry.number);
        for chunk in 0..self.config.n_chunks_per_file as u32 {
            let records = self.reader.read_chunk(&snap_str, entry.redshift, chunk)?;
            for record in records {
                let particle_set = particle_set_from_record(self.config.n_ptypes, &record);
                self.store.append(slot, record.halo, particle_set);
            }
        }
        self.store.build_inverted_index(slot);
        Ok(())
    }

    /// Reads the first (earliest) snapshot into the progenitor slot,
    /// priming the loop before any step runs.
    pub fn seed(&mut self, first: &SnapshotEntry) -> Result<()> {
        self.read_into(Slot::Progenitor, first)?;
        self.seeded = true;
        Ok(())
    }

    /// Number of halos currently tracked as orphan tokens, exposed for
    /// diagnostics and tests (spec §5's orphan-counter reductions apply
    /// the same way at the per-rank level this reads).
    pub fn orphan_token_count(&self) -> usize {
        self.orphans.token_count()
    }

    fn slab(&self, grid: &Grid) -> crate::grid::SlabRange {
        grid.slab_for_rank(self.exchanger.rank() as usize, self.exchanger.size())
    }

    fn build_grid(&self, slot: Slot, buffer: &BufferRegion) -> Grid {
        let mut grid = Grid::new(self.config.n_grid, self.config.box_size);
        for (idx, halo) in self.store.iter(slot) {
            grid.assign(halo.position, HaloRef::Local(idx));
        }
        for (i, entry) in buffer.iter() {
            grid.assign(entry.halo.position, HaloRef::Buffer(i));
        }
        grid
    }

    fn n_dark_matter(&self, id: HaloId) -> u64 {
        for slot in [Slot::Descendant, Slot::Progenitor] {
            if let Some(idx) = self.store.index_of(slot, id) {
                if let Some(halo) = self.store.halo(slot, idx) {
                    return halo.n_dark_matter();
                }
            }
        }
        0
    }

    fn search_config(&self) -> SearchConfig {
        SearchConfig {
            domain_mode: self.config.domain_mode,
            compare_mode: self.config.compare_mode,
            d_max_factor: self.config.d_max_factor,
            min_part_cmp: self.config.min_part_cmp,
        }
    }

    fn run_search(&self, from_slot: Slot, to_slot: Slot, buffer: &BufferRegion) -> CandidateMap {
        let box_ = crate::grid::SimulationBox::cube_from_side_length(self.config.box_size);
        let distance = |a: glam::DVec3, b: glam::DVec3| box_.periodic_distance(a, b);
        let cfg = self.search_config();
        let grid = self.build_grid(to_slot, buffer);
        let search: Box<dyn ProgenitorSearch> = match cfg.compare_mode {
            CompareMode::CmpMap => Box::new(MapJoinSearch { config: cfg }),
            CompareMode::DirectIntersect => Box::new(DirectIntersectSearch { config: cfg }),
        };
        search.run(&self.store, from_slot, to_slot, buffer, &grid, &distance)
    }

    /// Runs one snapshot transition: reads `next` into the descendant
    /// slot, searches/ranks/cleans, updates orphans, emits this step's
    /// clean edges, then shifts state for the next call (spec §4.8).
    pub fn run_step(&mut self, next: &SnapshotEntry) -> Result<Vec<TreeRecord>> {
        if !self.seeded {
            return Err(MergerTreeError::InvariantViolation {
                detail: "run_step called before seed()".to_string(),
            });
        }
        self.store.clear(Slot::Descendant);
        self.read_into(Slot::Descendant, next)?;

        let grid = Grid::new(self.config.n_grid, self.config.box_size);
        let my_slab = self.slab(&grid);
        let progenitor_buffer = exchange_buffers(&mut self.exchanger, &self.store, Slot::Progenitor, &grid, my_slab, self.config.ghost_width);
        let descendant_buffer = exchange_buffers(&mut self.exchanger, &self.store, Slot::Descendant, &grid, my_slab, self.config.ghost_width);

        let forward = self.run_search(Slot::Descendant, Slot::Progenitor, &progenitor_buffer);
        let backward = self.run_search(Slot::Progenitor, Slot::Descendant, &descendant_buffer);

        let descendant_ids: Vec<HaloId> = self.store.iter(Slot::Descendant).map(|(_, h)| h.id).collect();
        let edges = clean_step(&forward, &backward, descendant_ids, |id| self.n_dark_matter(id));

        self.orphans.update(&edges, &mut self.store, self.config.min_part_halo, self.config.max_orphan_steps);

        let records = records_from_edges(&edges);
        self.store.shift();

        // Top up the freshly shifted progenitor slot with carried
        // tokens, skipping any id the shift itself already carried
        // over under an ordinary (non-token) entry. A halo the catalog
        // re-detects needs no token: its own particles already carry
        // the continuity. A halo the catalog never re-detects has no
        // entry here at all after the shift, and the token is what
        // keeps it alive as a progenitor candidate for the next search.
        let carried_ids: std::collections::HashSet<HaloId> = self.store.iter(Slot::Progenitor).map(|(_, h)| h.id).collect();
        for token in self.orphans.carry_over() {
            if !carried_ids.contains(&token.halo.id) {
                self.store.append(Slot::Progenitor, token.halo, token.particle_set);
            }
        }
        self.store.build_inverted_index(Slot::Progenitor);

        Ok(records)
    }

    /// Runs every transition in `snapshots` (already ordered oldest to
    /// newest) after seeding from the first entry.
    pub fn run(&mut self, snapshots: &[SnapshotEntry]) -> Result<Vec<Vec<TreeRecord>>> {
        let (first, rest) = match snapshots.split_first() {
            Some(split) => split,
            None => return Ok(Vec::new()),
        };
        self.seed(first)?;
        let mut all_records = Vec::with_capacity(rest.len());
        for entry in rest {
            all_records.push(self.run_step(entry)?);
        }
        Ok(all_records)
    }
}
