//! Topology reconciliation.
//!
//! A boolean fragment of the far-field against the part solids returns new
//! sub-volumes with no record of ownership. [`Reconcile`] re-derives which
//! part owns every point, curve, surface and volume of the result, removes
//! the volumes where parts overlap, and reduces the model to a single fluid
//! volume whose boundary is labeled per region.

mod boundary;
mod farfield;
mod overlap;

pub use boundary::{
    label_regions, partition_boundary, BoundaryPartition, RegionGroups, FARFIELD_GROUP,
    FLUID_GROUP, SYMMETRY_GROUP,
};
pub use farfield::{build_farfield, symmetry_rotation, FarfieldEnvelope};
pub use overlap::{extract_shared_children, strip_symmetry_children};

use tracing::{debug, info};

use crate::error::{GeometryError, Result, TopologyError};
use crate::kernel::GeometryKernel;
use crate::math::{Aabb, Vector3, TOLERANCE};
use crate::topology::{Dim, DimTag, Part, PartType, Tag};

/// A part together with the solid imported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedPart {
    pub part: Part,
    pub solid: DimTag,
}

impl ImportedPart {
    #[must_use]
    pub fn new(part: Part, solid: DimTag) -> Self {
        Self { part, solid }
    }
}

/// Outcome of [`Reconcile::execute`].
#[derive(Debug, Clone)]
pub struct ReconciledDomain {
    /// Surviving parts in input order, owned entities cleaned against the final domain.
    pub parts: Vec<Part>,
    /// Uids of parts dropped because the symmetry trim left them no children.
    pub dropped: Vec<String>,
    /// Overlap volumes removed from the model.
    pub unwanted: Vec<DimTag>,
    /// The single remaining fluid volume and its boundary.
    pub final_domain: Part,
    /// Union of all surviving parts.
    pub aircraft: Part,
    pub boundary: BoundaryPartition,
    /// Points of the final domain not owned by any part.
    pub farfield_points: Vec<DimTag>,
    /// Bounding box of the imported solids.
    pub bounding_box: Aabb,
    /// Radius of the far-field sphere.
    pub domain_length: f64,
    pub groups: RegionGroups,
}

impl ReconciledDomain {
    /// Largest axis extent of the imported geometry.
    #[must_use]
    pub fn characteristic_length(&self) -> f64 {
        self.bounding_box.characteristic_length()
    }

    #[must_use]
    pub fn domain_volume_tags(&self) -> Vec<Tag> {
        self.final_domain.volume_tags()
    }

    #[must_use]
    pub fn aircraft_surface_tags(&self) -> Vec<Tag> {
        self.aircraft.surface_tags()
    }
}

/// Fragments the part solids with a far-field sphere and reconciles ownership.
///
/// Parts keep the order they are given in; that order is the order later
/// used to set point sizes, where the last part wins on shared points.
pub struct Reconcile {
    farfield_factor: f64,
    symmetry: Option<Vector3>,
}

impl Reconcile {
    /// Creates a reconciliation with a far-field radius of
    /// `farfield_factor` times the characteristic length.
    #[must_use]
    pub fn new(farfield_factor: f64) -> Self {
        Self {
            farfield_factor,
            symmetry: None,
        }
    }

    /// Keeps only the half-space on the positive side of the plane through
    /// the model center with the given normal.
    #[must_use]
    pub fn with_symmetry(mut self, normal: Vector3) -> Self {
        self.symmetry = Some(normal);
        self
    }

    /// Executes the reconciliation.
    ///
    /// # Errors
    ///
    /// Returns an error if a kernel operation fails, the geometry has zero
    /// extent, the fragment output does not match its operands, or more or
    /// less than one volume remains at the end.
    pub fn execute<K>(&self, kernel: &mut K, parts: Vec<ImportedPart>) -> Result<ReconciledDomain>
    where
        K: GeometryKernel + ?Sized,
    {
        kernel.synchronize()?;
        let bounding_box = kernel.bounding_box()?;
        let characteristic_length = bounding_box.characteristic_length();
        if characteristic_length < TOLERANCE {
            return Err(GeometryError::Degenerate(format!(
                "characteristic length {characteristic_length} of the imported geometry"
            ))
            .into());
        }
        let domain_length = self.farfield_factor * characteristic_length;

        let envelope = build_farfield(
            kernel,
            bounding_box.center(),
            domain_length,
            self.symmetry,
        )?;

        let mut tools: Vec<DimTag> = parts.iter().map(|p| p.solid).collect();
        tools.extend(envelope.trim);

        info!("Start fragment operation");
        let fragmented = kernel.fragment(&[envelope.sphere], &tools)?;
        kernel.synchronize()?;
        info!("Fragment operation finished");

        let expected = 1 + tools.len();
        if fragmented.children.len() != expected {
            return Err(TopologyError::FragmentMismatch {
                expected,
                found: fragmented.children.len(),
            }
            .into());
        }

        // The first list belongs to the far-field sphere.
        let mut lists = fragmented.children.into_iter().skip(1);
        let mut parts: Vec<Part> = parts
            .into_iter()
            .zip(lists.by_ref())
            .map(|(imported, children)| {
                let mut part = imported.part;
                part.children = children.into_iter().collect();
                part
            })
            .collect();
        let trimmed: Vec<DimTag> = lists.next().unwrap_or_default();

        for part in &parts {
            debug!("{} has generated {} children", part.uid, part.children.len());
        }

        let (kept, dropped) = strip_symmetry_children(kernel, parts, &trimmed)?;
        parts = kept;

        let unwanted = extract_shared_children(&mut parts);
        if !unwanted.is_empty() {
            kernel.remove(&unwanted, true)?;
            kernel.synchronize()?;
        }
        info!("Removed {} overlap children from the model", unwanted.len());

        let mut good_children = Vec::new();
        for part in &mut parts {
            for child in part.children.clone() {
                debug!("Associating child {child} to parent {}", part.uid);
                part.associate_child_to_parent(kernel, child)?;
                good_children.push(child);
            }
        }
        kernel.remove(&good_children, true)?;
        kernel.synchronize()?;

        let left = kernel.entities(Dim::Volume);
        let [fluid] = left.as_slice() else {
            return Err(TopologyError::DomainNotSingular(left.len()).into());
        };
        let mut final_domain = Part::new(FLUID_GROUP, PartType::Other);
        final_domain.associate_child_to_parent(kernel, *fluid)?;

        let mut aircraft = Part::new("aircraft", PartType::Other);
        for part in &mut parts {
            part.clean_inside_entities(&final_domain);
            aircraft.absorb(part);
        }
        info!("Model has been cleaned");

        let symmetry = self.symmetry.is_some();
        let boundary = partition_boundary(kernel, &final_domain, &aircraft, symmetry)?;
        let farfield_points = final_domain
            .entities
            .difference(&aircraft.entities, Dim::Point);
        let groups = label_regions(kernel, &parts, &boundary, &final_domain, symmetry)?;

        Ok(ReconciledDomain {
            parts,
            dropped: dropped.into_iter().map(|p| p.uid).collect(),
            unwanted,
            final_domain,
            aircraft,
            boundary,
            farfield_points,
            bounding_box,
            domain_length,
            groups,
        })
    }
}
