//! Spatial interpolation of scattered samples onto grids
//!
//! - IDW: Inverse Distance Weighting, global or with a neighbour search
//! - KdTree: neighbour index used by limited IDW searches

mod idw;
pub mod kdtree;

pub use idw::{idw, idw_at, Idw, IdwParams, IdwSearch};
pub use kdtree::{KdTree, Neighbor};
