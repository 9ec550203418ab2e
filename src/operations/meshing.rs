//! Point sizes, region colors and the mesh quality summary.

use tracing::{debug, info};

use crate::error::Result;
use crate::kernel::{Rgba, Session};
use crate::topology::{Part, PartType};

use super::reconcile::ReconciledDomain;

/// Marker of the engine's element quality statistic lines.
pub const QUALITY_MARKER: &str = "< quality <";
/// Number of quality lines kept in the summary.
pub const QUALITY_LINES: usize = 10;

pub const FARFIELD_COLOR: Rgba = Rgba::new(255, 200, 0, 255);
pub const SYMMETRY_COLOR: Rgba = Rgba::new(138, 43, 226, 150);
/// Alpha of part surfaces, so the far field stays readable behind them.
const PART_ALPHA: u8 = 100;

/// Display color of a part type's surfaces.
#[must_use]
pub fn part_color(part_type: PartType) -> Option<Rgba> {
    let color = match part_type {
        PartType::Fuselage => Rgba::new(255, 215, 0, PART_ALPHA),
        PartType::Wing => Rgba::new(0, 200, 200, PART_ALPHA),
        PartType::Pylon => Rgba::new(255, 0, 0, PART_ALPHA),
        PartType::Nacelle => Rgba::new(160, 160, 160, PART_ALPHA),
        PartType::Engine => Rgba::new(96, 96, 96, PART_ALPHA),
        PartType::Other => return None,
    };
    Some(color)
}

/// Nominal mesh sizes per region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSizes {
    pub farfield: f64,
    pub fuselage: f64,
    pub wings: f64,
}

impl RegionSizes {
    /// Nominal size of a part: fuselages use the fuselage size, everything
    /// else the wing size.
    #[must_use]
    pub fn for_part(&self, part_type: PartType) -> f64 {
        match part_type {
            PartType::Fuselage => self.fuselage,
            _ => self.wings,
        }
    }
}

/// Sets each part's nominal size on its points and colors its surfaces.
///
/// Parts are processed in slice order; a point shared by several parts
/// ends up with the size of the last one.
///
/// # Errors
///
/// Returns an error if the kernel rejects a size or color.
pub fn apply_part_sizes<S>(session: &mut S, parts: &mut [Part], sizes: &RegionSizes) -> Result<()>
where
    S: Session + ?Sized,
{
    for part in parts.iter_mut() {
        let size = sizes.for_part(part.part_type);
        part.mesh_size = Some(size);
        let points: Vec<_> = part.points().iter().copied().collect();
        session.set_mesh_size(&points, size)?;
        debug!("{}: size {size} on {} points", part.uid, points.len());

        if let Some(color) = part_color(part.part_type) {
            let surfaces: Vec<_> = part.surfaces().iter().copied().collect();
            session.set_color(&surfaces, color, false)?;
        }
    }
    Ok(())
}

/// Sets the far-field size on the points not owned by any part, and colors
/// the far-field and symmetry surfaces.
///
/// # Errors
///
/// Returns an error if the kernel rejects a size or color.
pub fn apply_farfield_sizes<S>(session: &mut S, domain: &ReconciledDomain, size: f64) -> Result<()>
where
    S: Session + ?Sized,
{
    session.set_mesh_size(&domain.farfield_points, size)?;
    session.set_color(&domain.boundary.farfield, FARFIELD_COLOR, false)?;
    if !domain.boundary.symmetry.is_empty() {
        session.set_color(&domain.boundary.symmetry, SYMMETRY_COLOR, false)?;
    }
    info!(
        "Far-field size {size} set on {} points",
        domain.farfield_points.len()
    );
    Ok(())
}

/// The last [`QUALITY_LINES`] log lines carrying [`QUALITY_MARKER`], oldest first.
#[must_use]
pub fn quality_summary(lines: &[String]) -> Vec<String> {
    let mut quality: Vec<String> = lines
        .iter()
        .rev()
        .filter(|line| line.contains(QUALITY_MARKER))
        .take(QUALITY_LINES)
        .cloned()
        .collect();
    quality.reverse();
    quality
}
