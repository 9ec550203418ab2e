use tracing::{info, warn};

use crate::error::{GeometryError, KernelError, Result};
use crate::kernel::{Rgba, Session, MESH_VOLUME_PLUGIN};
use crate::topology::{Dim, DimTag, Part, Tag};

use super::farfield::FarfieldGrowth;
use super::primitives::{analytic_field, restrict_field};
use super::uniform::uniform_band;
use super::FieldSet;

/// `sqrt(3) / 4` rounded as in the triangle-count inversion.
const EQUILATERAL_FACTOR: f64 = 0.433_012_70;

/// Area of an equilateral triangle of side `size`.
#[must_use]
pub fn equilateral_triangle_area(size: f64) -> f64 {
    3.0_f64.sqrt() / 4.0 * size * size
}

/// Side of the equilateral triangle that tiles `area` with `count` triangles.
#[must_use]
pub fn size_for_triangle_count(area: f64, count: f64) -> f64 {
    (area / count / EQUILATERAL_FACTOR).sqrt()
}

/// Temporary physical group and plugin views used to measure one surface.
///
/// Dropping the probe removes the group and every view created since it was
/// opened, whether or not the measurement succeeded.
struct AreaProbe<'a, S: Session + ?Sized> {
    session: &'a mut S,
    group: Tag,
    views_before: Vec<Tag>,
}

impl<'a, S: Session + ?Sized> AreaProbe<'a, S> {
    fn open(session: &'a mut S, surface: Tag) -> Result<Self> {
        let views_before = session.view_tags();
        let group = session.add_physical_group(Dim::Surface, &[surface])?;
        Ok(Self {
            session,
            group,
            views_before,
        })
    }

    fn measure(&mut self) -> Result<f64> {
        self.session
            .set_plugin_number(MESH_VOLUME_PLUGIN, "Dimension", 2.0)?;
        self.session
            .set_plugin_number(MESH_VOLUME_PLUGIN, "PhysicalGroup", f64::from(self.group))?;
        self.session.run_plugin(MESH_VOLUME_PLUGIN)?;

        let view = self
            .created_views()
            .last()
            .copied()
            .ok_or_else(|| KernelError::Failed {
                operation: "plugin.run",
                message: format!("{MESH_VOLUME_PLUGIN} produced no view"),
            })?;
        Ok(self.session.view_last_value(view)?)
    }

    fn created_views(&self) -> Vec<Tag> {
        self.session
            .view_tags()
            .into_iter()
            .filter(|v| !self.views_before.contains(v))
            .collect()
    }
}

impl<S: Session + ?Sized> Drop for AreaProbe<'_, S> {
    fn drop(&mut self) {
        let views = self.created_views();
        if !views.is_empty() {
            if let Err(err) = self.session.remove_views(&views) {
                warn!("Failed to remove measurement views {views:?}: {err}");
            }
        }
        if let Err(err) = self
            .session
            .remove_physical_groups(&[(Dim::Surface, self.group)])
        {
            warn!("Failed to remove measurement group {}: {err}", self.group);
        }
    }
}

/// Measures the area of one surface through the engine's measurement plugin.
///
/// The temporary group and views are released before returning, on success
/// and on error.
///
/// # Errors
///
/// Returns an error if the group cannot be created or the plugin fails.
pub fn measure_surface_area<S>(session: &mut S, surface: Tag) -> Result<f64>
where
    S: Session + ?Sized,
{
    let mut probe = AreaProbe::open(session, surface)?;
    probe.measure()
}

/// Under-resolution detection settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmallSurfaceRefinement {
    /// Fewest triangles a surface should be meshed with.
    pub nb_min_triangle: u32,
    /// Growth back to the far-field size around a refined surface.
    pub growth: FarfieldGrowth,
}

impl SmallSurfaceRefinement {
    #[must_use]
    pub const fn new(nb_min_triangle: u32, growth: FarfieldGrowth) -> Self {
        Self {
            nb_min_triangle,
            growth,
        }
    }
}

/// Color marking an under-resolved surface.
pub const FLAGGED_SURFACE_COLOR: Rgba = Rgba::new(255, 0, 255, 255);

/// Refines every surface of `part` that its nominal size would mesh with
/// fewer than `nb_min_triangle` triangles.
///
/// Each flagged surface gets a uniform band at the size giving exactly that
/// many triangles, and a growth from that size to the far-field size over
/// the fluid volume. Returns the flagged surface tags.
///
/// # Errors
///
/// Returns an error if a measured area is not positive, or a measurement or
/// field fails.
pub fn refine_small_surfaces<S>(
    session: &mut S,
    fields: &mut FieldSet,
    part: &Part,
    domain_volumes: &[Tag],
    params: &SmallSurfaceRefinement,
) -> Result<Vec<Tag>>
where
    S: Session + ?Sized,
{
    let Some(size) = part.mesh_size else {
        warn!("{} has no mesh size, small surface check skipped", part.uid);
        return Ok(Vec::new());
    };
    let count = f64::from(params.nb_min_triangle);
    let threshold = count * equilateral_triangle_area(size);
    let mut flagged = Vec::new();

    for surface in part.surface_tags() {
        let area = measure_surface_area(session, surface)?;
        if area <= 0.0 {
            return Err(GeometryError::NonPositiveArea { tag: surface, area }.into());
        }
        if area >= threshold {
            continue;
        }

        let local_size = size_for_triangle_count(area, count);
        info!(
            "Surface {surface} of {} is under-resolved (area {area:.3e}), local size {local_size:.3e}",
            part.uid
        );
        session.set_color(&[DimTag::surface(surface)], FLAGGED_SURFACE_COLOR, false)?;

        let band = uniform_band(session, fields, &[surface], local_size)?;
        let law = params.growth.law(local_size);
        analytic_field(session, fields, &law.expression(band.distance))?;
        restrict_field(session, fields, Dim::Volume, domain_volumes, None)?;
        flagged.push(surface);
    }

    if !flagged.is_empty() {
        info!(
            "Surface mesh of {} was insufficient, {} surface(s) refined",
            part.uid,
            flagged.len()
        );
    }
    Ok(flagged)
}
