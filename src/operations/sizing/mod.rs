//! Mesh-sizing field composition.
//!
//! Every field gets its index from one [`FieldSet`] per meshing run. Restrict
//! fields are the leaves; [`min_field`] reduces them into the single
//! background field and closes the set.

mod farfield;
mod field_set;
mod growth;
mod primitives;
mod small_surface;
mod uniform;
mod wing;

pub use farfield::{set_farfield_mesh, FarfieldGrowth};
pub use field_set::{FieldSet, FieldSetState};
pub use growth::GrowthLaw;
pub use primitives::{
    analytic_field, distance_field, min_field, restrict_field, threshold_field, DISTANCE_SAMPLING,
};
pub use small_surface::{
    equilateral_triangle_area, measure_surface_area, refine_small_surfaces,
    size_for_triangle_count, SmallSurfaceRefinement, FLAGGED_SURFACE_COLOR,
};
pub use uniform::{set_fuselage_mesh, uniform_band, UniformBand};
pub use wing::{
    min_pairwise_distance, refine_wing_section, truncation_refine, EdgeRefinement,
    SectionRefinement, WingRefinementReport, MAX_REFINE,
};
