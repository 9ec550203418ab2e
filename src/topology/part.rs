use std::collections::BTreeSet;

use crate::error::Result;
use crate::kernel::GeometryKernel;

use super::{BoundaryOptions, Dim, DimTag, Tag, WingSection};

/// Classification of an aircraft part, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PartType {
    Fuselage,
    Wing,
    Pylon,
    Nacelle,
    Engine,
    #[default]
    Other,
}

impl PartType {
    /// Maps a free-form type name (e.g. from an aircraft description file) to a part type.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.contains("fuselage") {
            PartType::Fuselage
        } else if name.contains("pylon") {
            PartType::Pylon
        } else if name.contains("nacelle") {
            PartType::Nacelle
        } else if name.contains("engine") {
            PartType::Engine
        } else if name.contains("wing") {
            PartType::Wing
        } else {
            PartType::Other
        }
    }
}

/// Owned entities of a part, one ordered set per dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySets {
    sets: [BTreeSet<DimTag>; 4],
}

impl EntitySets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities of one dimension, sorted by tag.
    #[must_use]
    pub fn get(&self, dim: Dim) -> &BTreeSet<DimTag> {
        &self.sets[dim.index()]
    }

    /// Plain tags of one dimension, sorted.
    #[must_use]
    pub fn tags(&self, dim: Dim) -> Vec<Tag> {
        self.get(dim).iter().map(|e| e.tag).collect()
    }

    /// Adds entities, filing each under its own dimension.
    pub fn extend(&mut self, entities: impl IntoIterator<Item = DimTag>) {
        for entity in entities {
            self.sets[entity.dim.index()].insert(entity);
        }
    }

    /// Union with another set, per dimension.
    pub fn absorb(&mut self, other: &EntitySets) {
        for dim in Dim::ALL {
            self.sets[dim.index()].extend(other.get(dim).iter().copied());
        }
    }

    /// Keeps only entities also present in `other`, per dimension.
    pub fn retain_shared(&mut self, other: &EntitySets) {
        for dim in Dim::ALL {
            let keep = other.get(dim);
            self.sets[dim.index()].retain(|e| keep.contains(e));
        }
    }

    /// Entities of `dim` present here but not in `other`.
    #[must_use]
    pub fn difference(&self, other: &EntitySets, dim: Dim) -> Vec<DimTag> {
        self.get(dim).difference(other.get(dim)).copied().collect()
    }

    /// `true` when every entity of every dimension is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &EntitySets) -> bool {
        Dim::ALL
            .iter()
            .all(|&dim| self.get(dim).is_subset(other.get(dim)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.iter().all(BTreeSet::is_empty)
    }
}

/// A named geometric object and the kernel entities it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    /// Part name, usually the stem of its source file.
    pub uid: String,
    pub part_type: PartType,
    /// Owned points, curves, surfaces and volumes.
    pub entities: EntitySets,
    /// Volumes the last fragment produced from this part, before reconciliation.
    pub children: BTreeSet<DimTag>,
    /// Nominal mesh size, assigned once point sizes are applied.
    pub mesh_size: Option<f64>,
    /// Chordwise sections, filled in by wing classification.
    pub wing_sections: Vec<WingSection>,
}

impl Part {
    #[must_use]
    pub fn new(uid: impl Into<String>, part_type: PartType) -> Self {
        Self {
            uid: uid.into(),
            part_type,
            entities: EntitySets::new(),
            children: BTreeSet::new(),
            mesh_size: None,
            wing_sections: Vec::new(),
        }
    }

    #[must_use]
    pub fn points(&self) -> &BTreeSet<DimTag> {
        self.entities.get(Dim::Point)
    }

    #[must_use]
    pub fn lines(&self) -> &BTreeSet<DimTag> {
        self.entities.get(Dim::Curve)
    }

    #[must_use]
    pub fn surfaces(&self) -> &BTreeSet<DimTag> {
        self.entities.get(Dim::Surface)
    }

    #[must_use]
    pub fn volumes(&self) -> &BTreeSet<DimTag> {
        self.entities.get(Dim::Volume)
    }

    #[must_use]
    pub fn point_tags(&self) -> Vec<Tag> {
        self.entities.tags(Dim::Point)
    }

    #[must_use]
    pub fn line_tags(&self) -> Vec<Tag> {
        self.entities.tags(Dim::Curve)
    }

    #[must_use]
    pub fn surface_tags(&self) -> Vec<Tag> {
        self.entities.tags(Dim::Surface)
    }

    #[must_use]
    pub fn volume_tags(&self) -> Vec<Tag> {
        self.entities.tags(Dim::Volume)
    }

    /// Assigns a fragment child volume and its whole boundary to this part.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel cannot resolve the child's boundary.
    pub fn associate_child_to_parent<K>(&mut self, kernel: &K, child: DimTag) -> Result<()>
    where
        K: GeometryKernel + ?Sized,
    {
        let found = volume_entities(kernel, child)?;
        self.entities.extend([child]);
        self.entities.extend(found.surfaces);
        self.entities.extend(found.lines);
        self.entities.extend(found.points);
        Ok(())
    }

    /// Drops owned entities that are not part of the final domain.
    ///
    /// Boundary fragments of interior cavities survive association but are
    /// gone from the final domain; this removes them.
    pub fn clean_inside_entities(&mut self, final_domain: &Part) {
        self.entities.retain_shared(&final_domain.entities);
    }

    /// Merges another part's entities into this one.
    pub fn absorb(&mut self, other: &Part) {
        self.entities.absorb(&other.entities);
    }
}

/// The boundary of one volume, split by dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeEntities {
    /// Surfaces in kernel order.
    pub surfaces: Vec<DimTag>,
    /// Curves, deduplicated and sorted.
    pub lines: Vec<DimTag>,
    /// Points, deduplicated and sorted.
    pub points: Vec<DimTag>,
}

/// Collects the surfaces, curves and points bounding a volume.
///
/// Surfaces come from the volume's combined boundary; curves from each
/// surface's boundary; points from each surface's recursive boundary.
///
/// # Errors
///
/// Returns an error if a boundary query fails.
pub fn volume_entities<K>(kernel: &K, volume: DimTag) -> Result<VolumeEntities>
where
    K: GeometryKernel + ?Sized,
{
    let surfaces = kernel.boundary(&[volume], BoundaryOptions::COMBINED)?;

    let mut lines = BTreeSet::new();
    let mut points = BTreeSet::new();
    for surface in &surfaces {
        lines.extend(kernel.boundary(&[*surface], BoundaryOptions::COMBINED)?);
        points.extend(kernel.boundary(&[*surface], BoundaryOptions::COMBINED_RECURSIVE)?);
    }

    Ok(VolumeEntities {
        surfaces,
        lines: lines.into_iter().collect(),
        points: points.into_iter().collect(),
    })
}
