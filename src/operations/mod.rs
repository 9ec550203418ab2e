pub mod meshing;
pub mod reconcile;
pub mod sizing;
