use tracing::{info, warn};

use crate::error::Result;
use crate::kernel::{FieldIndex, MeshEngine};
use crate::topology::{Dim, Part, Tag};

use super::primitives::{distance_field, restrict_field, threshold_field};
use super::FieldSet;

/// Fields of a uniform-size band around a set of surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBand {
    pub distance: FieldIndex,
    pub threshold: FieldIndex,
    /// The registered leaf.
    pub restrict: FieldIndex,
}

/// Distance to `surfaces` feeding a threshold clamped to `size`, restricted
/// to the same surfaces.
///
/// # Errors
///
/// Returns an error if a field cannot be built.
pub fn uniform_band<E>(
    engine: &mut E,
    fields: &mut FieldSet,
    surfaces: &[Tag],
    size: f64,
) -> Result<UniformBand>
where
    E: MeshEngine + ?Sized,
{
    let distance = distance_field(engine, fields, Dim::Surface, surfaces)?;
    let threshold = threshold_field(engine, fields, distance, size, size)?;
    let restrict = restrict_field(engine, fields, Dim::Surface, surfaces, None)?;
    Ok(UniformBand {
        distance,
        threshold,
        restrict,
    })
}

/// Uniform sizing over a fuselage at its nominal mesh size.
///
/// Parts without a mesh size are skipped with a warning and yield `None`.
///
/// # Errors
///
/// Returns an error if a field cannot be built.
pub fn set_fuselage_mesh<E>(
    engine: &mut E,
    fields: &mut FieldSet,
    part: &Part,
) -> Result<Option<UniformBand>>
where
    E: MeshEngine + ?Sized,
{
    let Some(size) = part.mesh_size else {
        warn!("{} has no mesh size, uniform sizing skipped", part.uid);
        return Ok(None);
    };
    info!("Set mesh refinement of {}", part.uid);
    uniform_band(engine, fields, &part.surface_tags(), size).map(Some)
}
