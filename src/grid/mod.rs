pub mod cartesian;
pub mod extent;

pub use cartesian::Grid;
pub use cartesian::SlabRange;
pub use extent::Extent;
pub use extent::SimulationBox;
