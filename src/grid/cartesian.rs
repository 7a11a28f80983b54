//! C1: the spatial grid (spec §4.1).
//!
//! Binning follows the teacher's `grid::cartesian::IntegerPosition`
//! idiom: floor-divide a position by the cell size per axis, collect
//! halo indices per cell, and enumerate neighbours by offsetting the
//! integer coordinates with periodic wraparound.
use glam::DVec3;

use crate::grid::extent::SimulationBox;
use crate::halo::HaloRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellCoord {
    x: i64,
    y: i64,
    z: i64,
}

impl CellCoord {
    fn wrapped(&self, n_grid: i64) -> Self {
        let wrap = |v: i64| v.rem_euclid(n_grid);
        Self {
            x: wrap(self.x),
            y: wrap(self.y),
            z: wrap(self.z),
        }
    }
}

fn cell_index(c: CellCoord, n_grid: i64) -> usize {
    (c.x * n_grid * n_grid + c.y * n_grid + c.z) as usize
}

/// C1 Spatial Grid: assigns halos to cells of a periodic `nGrid^3`
/// grid and answers radius queries (spec §4.1).
pub struct Grid {
    n_grid: i64,
    cell_size: f64,
    box_size: f64,
    cells: Vec<Vec<HaloRef>>,
}

impl Grid {
    /// `Init(nGrid, boxSize)`.
    pub fn new(n_grid: usize, box_size: f64) -> Self {
        assert!(n_grid > 0, "nGrid must be positive");
        let n_grid = n_grid as i64;
        Self {
            n_grid,
            cell_size: box_size / n_grid as f64,
            box_size,
            cells: vec![Vec::new(); (n_grid * n_grid * n_grid) as usize],
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn n_grid(&self) -> usize {
        self.n_grid as usize
    }

    fn coord_of(&self, pos: DVec3) -> CellCoord {
        CellCoord {
            x: (pos.x / self.cell_size).floor() as i64,
            y: (pos.y / self.cell_size).floor() as i64,
            z: (pos.z / self.cell_size).floor() as i64,
        }
        .wrapped(self.n_grid)
    }

    /// `AssignToGrid(x, haloIndex)`.
    pub fn assign(&mut self, pos: DVec3, halo_ref: HaloRef) {
        let coord = self.coord_of(pos);
        self.cells[cell_index(coord, self.n_grid)].push(halo_ref);
    }

    pub fn clear(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.clear();
        }
    }

    /// `ListNearbyHalos(x, r)`: halo refs whose owning cell lies within
    /// `ceil(r / cellSize)` cells of `x`'s cell, periodically wrapped.
    /// Order-stable: cells are visited in a fixed nested-loop order and
    /// each cell's contents are returned in insertion order.
    pub fn list_nearby(&self, pos: DVec3, radius: f64) -> Vec<HaloRef> {
        let centre = self.coord_of(pos);
        let cell_radius = (radius / self.cell_size).ceil() as i64;
        let mut result = Vec::new();
        for dx in -cell_radius..=cell_radius {
            for dy in -cell_radius..=cell_radius {
                for dz in -cell_radius..=cell_radius {
                    let coord = CellCoord {
                        x: centre.x + dx,
                        y: centre.y + dy,
                        z: centre.z + dz,
                    }
                    .wrapped(self.n_grid);
                    result.extend(self.cells[cell_index(coord, self.n_grid)].iter().copied());
                }
            }
        }
        result
    }

    /// `FindPatchOnTask()`: a 1D slab decomposition along the x axis,
    /// balanced so each of `num_ranks` processes owns a contiguous,
    /// near-equal range of x-cell-layers (spec §4.1: "the simplest
    /// correct choice").
    pub fn slab_for_rank(&self, rank: usize, num_ranks: usize) -> SlabRange {
        assert!(num_ranks > 0 && rank < num_ranks);
        let n = self.n_grid as usize;
        let base = n / num_ranks;
        let remainder = n % num_ranks;
        // The first `remainder` ranks get one extra layer each, so the
        // slabs differ in size by at most one layer.
        let start = rank * base + rank.min(remainder);
        let extra = if rank < remainder { 1 } else { 0 };
        let len = base + extra;
        SlabRange {
            x_min: start,
            x_max: start + len,
        }
    }

    pub fn box_size(&self) -> f64 {
        self.box_size
    }
}

/// A contiguous range of x-cell-layers `[x_min, x_max)` owned by one
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabRange {
    pub x_min: usize,
    pub x_max: usize,
}

impl SlabRange {
    pub fn contains_x(&self, x_cell: usize) -> bool {
        x_cell >= self.x_min && x_cell < self.x_max
    }

    /// Whether a position (wrapped into `[0, box_size)`) falls within
    /// `ghost_width` cells of this slab's boundary, used by C3 to
    /// decide what belongs in the ghost region.
    pub fn within_ghost_width(&self, x_cell: i64, n_grid: usize, ghost_width: usize) -> bool {
        let n_grid = n_grid as i64;
        let x_cell = x_cell.rem_euclid(n_grid);
        let lo = self.x_min as i64 - ghost_width as i64;
        let hi = self.x_max as i64 + ghost_width as i64;
        // Check containment with periodic wraparound of the [lo, hi) window.
        (lo..hi).any(|c| c.rem_euclid(n_grid) == x_cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_and_retrieve_from_same_cell() {
        let mut grid = Grid::new(4, 8.0);
        grid.assign(DVec3::new(1.0, 1.0, 1.0), HaloRef::Buffer(0));
        let nearby = grid.list_nearby(DVec3::new(1.0, 1.0, 1.0), 0.1);
        assert_eq!(nearby.len(), 1);
    }

    #[test]
    fn list_nearby_wraps_periodically() {
        let mut grid = Grid::new(4, 8.0);
        // cell size is 2.0; a halo at x=7.9 sits in the last cell, which
        // is a periodic neighbour of the first cell at x=0.1.
        grid.assign(DVec3::new(7.9, 1.0, 1.0), HaloRef::Buffer(0));
        let nearby = grid.list_nearby(DVec3::new(0.1, 1.0, 1.0), 0.5);
        assert_eq!(nearby.len(), 1);
    }

    #[test]
    fn slab_decomposition_is_balanced_and_covers_the_grid() {
        let grid = Grid::new(10, 10.0);
        let slabs: Vec<_> = (0..3).map(|r| grid.slab_for_rank(r, 3)).collect();
        assert_eq!(slabs[0].x_min, 0);
        assert_eq!(slabs.last().unwrap().x_max, 10);
        for w in slabs.windows(2) {
            assert_eq!(w[0].x_max, w[1].x_min);
        }
        let sizes: Vec<_> = slabs.iter().map(|s| s.x_max - s.x_min).collect();
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
    }

    #[test]
    fn list_nearby_is_order_stable() {
        let mut grid = Grid::new(4, 8.0);
        grid.assign(DVec3::new(1.0, 1.0, 1.0), HaloRef::Buffer(1));
        grid.assign(DVec3::new(1.0, 1.0, 1.0), HaloRef::Buffer(2));
        let a = grid.list_nearby(DVec3::new(1.0, 1.0, 1.0), 1.0);
        let b = grid.list_nearby(DVec3::new(1.0, 1.0, 1.0), 1.0);
        assert_eq!(a, b);
    }
}
