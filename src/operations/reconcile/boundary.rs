use std::collections::BTreeSet;

use tracing::info;

use crate::error::Result;
use crate::kernel::GeometryKernel;
use crate::topology::{Dim, DimTag, Part, Tag};

/// Name of the physical group holding the far-field surfaces.
pub const FARFIELD_GROUP: &str = "Farfield";
/// Name of the physical group holding the symmetry-plane surfaces.
pub const SYMMETRY_GROUP: &str = "symmetry";
/// Name of the final fluid volume and its physical group.
pub const FLUID_GROUP: &str = "fluid";

/// The final domain's boundary surfaces split by region.
///
/// The three sets are pairwise disjoint and together equal the final
/// domain's surfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryPartition {
    pub aircraft: Vec<DimTag>,
    pub farfield: Vec<DimTag>,
    pub symmetry: Vec<DimTag>,
}

impl BoundaryPartition {
    #[must_use]
    pub fn farfield_tags(&self) -> Vec<Tag> {
        self.farfield.iter().map(|e| e.tag).collect()
    }

    #[must_use]
    pub fn symmetry_tags(&self) -> Vec<Tag> {
        self.symmetry.iter().map(|e| e.tag).collect()
    }
}

/// Physical group tags created for the boundary markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionGroups {
    /// One surface group per part, in part order, as `(uid, group)`.
    pub parts: Vec<(String, Tag)>,
    pub symmetry: Option<Tag>,
    pub farfield: Tag,
    pub fluid: Tag,
}

/// Splits the final domain's surfaces into aircraft, far-field and symmetry.
///
/// With `symmetry`, a far-field candidate whose bounding curves include an
/// aircraft curve is a symmetry surface: the symmetry plane is the only
/// outer surface that touches the aircraft.
///
/// # Errors
///
/// Returns an error if an adjacency query fails.
pub fn partition_boundary<K>(
    kernel: &K,
    final_domain: &Part,
    aircraft: &Part,
    symmetry: bool,
) -> Result<BoundaryPartition>
where
    K: GeometryKernel + ?Sized,
{
    let aircraft_surfaces: Vec<DimTag> = final_domain
        .surfaces()
        .intersection(aircraft.surfaces())
        .copied()
        .collect();
    let candidates = final_domain
        .entities
        .difference(&aircraft.entities, Dim::Surface);

    if !symmetry {
        return Ok(BoundaryPartition {
            aircraft: aircraft_surfaces,
            farfield: candidates,
            symmetry: Vec::new(),
        });
    }

    let aircraft_lines: BTreeSet<Tag> = aircraft.line_tags().into_iter().collect();
    let mut farfield = Vec::new();
    let mut symmetry_surfaces = Vec::new();
    for surface in candidates {
        let adjacent = kernel.adjacencies(surface)?;
        if adjacent.downward.iter().any(|t| aircraft_lines.contains(t)) {
            symmetry_surfaces.push(surface);
        } else {
            farfield.push(surface);
        }
    }

    Ok(BoundaryPartition {
        aircraft: aircraft_surfaces,
        farfield,
        symmetry: symmetry_surfaces,
    })
}

/// Creates the physical groups carried into the mesh file as boundary markers.
///
/// # Errors
///
/// Returns an error if the kernel rejects a group.
pub fn label_regions<K>(
    kernel: &mut K,
    parts: &[Part],
    boundary: &BoundaryPartition,
    final_domain: &Part,
    symmetry: bool,
) -> Result<RegionGroups>
where
    K: GeometryKernel + ?Sized,
{
    let mut groups = RegionGroups::default();

    for part in parts {
        let group = kernel.add_physical_group(Dim::Surface, &part.surface_tags())?;
        kernel.set_physical_name(Dim::Surface, group, &part.uid)?;
        groups.parts.push((part.uid.clone(), group));
    }

    if symmetry {
        let group = kernel.add_physical_group(Dim::Surface, &boundary.symmetry_tags())?;
        kernel.set_physical_name(Dim::Surface, group, SYMMETRY_GROUP)?;
        groups.symmetry = Some(group);
    }

    groups.farfield = kernel.add_physical_group(Dim::Surface, &boundary.farfield_tags())?;
    kernel.set_physical_name(Dim::Surface, groups.farfield, FARFIELD_GROUP)?;

    groups.fluid = kernel.add_physical_group(Dim::Volume, &final_domain.volume_tags())?;
    kernel.set_physical_name(Dim::Volume, groups.fluid, &final_domain.uid)?;

    kernel.synchronize()?;
    info!("Boundary markers generated");
    Ok(groups)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kernel::memory::MemorySession;
    use crate::math::Point3;
    use crate::topology::PartType;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn farfield_is_domain_minus_aircraft() {
        let session = MemorySession::new();
        let mut domain = Part::new(FLUID_GROUP, PartType::Other);
        domain
            .entities
            .extend([1, 2, 3, 4].map(DimTag::surface));
        let mut aircraft = Part::new("aircraft", PartType::Other);
        aircraft.entities.extend([2, 4].map(DimTag::surface));

        let split = partition_boundary(&session, &domain, &aircraft, false).unwrap();
        assert_eq!(split.aircraft, vec![DimTag::surface(2), DimTag::surface(4)]);
        assert_eq!(split.farfield, vec![DimTag::surface(1), DimTag::surface(3)]);
        assert!(split.symmetry.is_empty());
    }

    #[test]
    fn surfaces_touching_aircraft_curves_become_symmetry() {
        let mut session = MemorySession::new();
        // Two faces of a box sharing the edge at x = 1, y = 0.
        let bottom = session.model_mut().quad([
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
        ]);
        let side = session.model_mut().quad([
            p(1.0, 0.0, 0.0),
            p(1.0, 0.0, 1.0),
            p(1.0, 1.0, 1.0),
            p(1.0, 1.0, 0.0),
        ]);
        let far = session.model_mut().quad([
            p(5.0, 5.0, 5.0),
            p(6.0, 5.0, 5.0),
            p(6.0, 6.0, 5.0),
            p(5.0, 6.0, 5.0),
        ]);
        let shared_edge = session
            .model_mut()
            .segment(p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0));

        let mut domain = Part::new(FLUID_GROUP, PartType::Other);
        domain
            .entities
            .extend([bottom, side, far].map(DimTag::surface));
        let mut aircraft = Part::new("aircraft", PartType::Other);
        aircraft
            .entities
            .extend([DimTag::surface(side), DimTag::curve(shared_edge)]);

        let split = partition_boundary(&session, &domain, &aircraft, true).unwrap();
        assert_eq!(split.aircraft, vec![DimTag::surface(side)]);
        assert_eq!(split.symmetry, vec![DimTag::surface(bottom)]);
        assert_eq!(split.farfield, vec![DimTag::surface(far)]);
    }

    #[test]
    fn groups_are_named_after_regions() {
        let mut session = MemorySession::new();
        let v = session.model_mut().add_box(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
        let faces = session.model().boundary_of(DimTag::volume(v)).unwrap().to_vec();

        let mut wing = Part::new("wing", PartType::Wing);
        wing.entities.extend([DimTag::surface(faces[0])]);
        let mut domain = Part::new(FLUID_GROUP, PartType::Other);
        domain.entities.extend([DimTag::volume(v)]);
        let boundary = BoundaryPartition {
            aircraft: vec![DimTag::surface(faces[0])],
            farfield: faces[1..].iter().map(|&t| DimTag::surface(t)).collect(),
            symmetry: Vec::new(),
        };

        let groups = label_regions(&mut session, &[wing], &boundary, &domain, false).unwrap();
        assert!(groups.symmetry.is_none());
        assert_eq!(groups.parts[0].0, "wing");
        assert_eq!(
            session
                .physical_group(Dim::Surface, FARFIELD_GROUP)
                .unwrap()
                .entities
                .len(),
            5
        );
        assert_eq!(
            session.physical_group(Dim::Volume, FLUID_GROUP).unwrap().tag,
            groups.fluid
        );
    }
}
