use tracing::{info, warn};

use crate::error::Result;
use crate::kernel::MeshEngine;
use crate::topology::{Dim, Part, Tag};

use super::primitives::{analytic_field, distance_field, restrict_field, threshold_field};
use super::{FieldSet, GrowthLaw};

/// Size growth from the aircraft out to the far field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FarfieldGrowth {
    pub farfield_size: f64,
    /// Characteristic length of the aircraft.
    pub length: f64,
    pub power: f64,
}

impl FarfieldGrowth {
    #[must_use]
    pub const fn new(farfield_size: f64, length: f64) -> Self {
        Self {
            farfield_size,
            length,
            power: 1.5,
        }
    }

    #[must_use]
    pub const fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    /// The law growing from `near_size`.
    #[must_use]
    pub const fn law(&self, near_size: f64) -> GrowthLaw {
        GrowthLaw::PowerGrowth {
            near_size,
            far_size: self.farfield_size,
            length: self.length,
            power: self.power,
        }
    }
}

/// Per part, grows the size from the part's mesh size to the far-field size
/// over the characteristic length, bounded above by the far-field size.
/// Both fields are restricted to the fluid volume.
///
/// Returns the number of parts that received fields; parts without a mesh
/// size are skipped with a warning.
///
/// # Errors
///
/// Returns an error if a field cannot be built.
pub fn set_farfield_mesh<E>(
    engine: &mut E,
    fields: &mut FieldSet,
    parts: &[Part],
    domain_volumes: &[Tag],
    growth: &FarfieldGrowth,
) -> Result<usize>
where
    E: MeshEngine + ?Sized,
{
    info!("Set mesh refinement of fluid domain");
    let far = growth.farfield_size;
    let mut count = 0;

    for part in parts {
        let Some(size) = part.mesh_size else {
            warn!("{} has no mesh size, far-field growth skipped", part.uid);
            continue;
        };
        let surfaces = part.surface_tags();

        let distance = distance_field(engine, fields, Dim::Surface, &surfaces)?;
        analytic_field(engine, fields, &growth.law(size).expression(distance))?;
        restrict_field(engine, fields, Dim::Volume, domain_volumes, None)?;

        let distance = distance_field(engine, fields, Dim::Surface, &surfaces)?;
        threshold_field(engine, fields, distance, far, far)?;
        restrict_field(engine, fields, Dim::Volume, domain_volumes, None)?;
        count += 1;
    }
    Ok(count)
}
