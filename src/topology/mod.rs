pub mod part;
pub mod wing;

pub use part::{volume_entities, EntitySets, Part, PartType, VolumeEntities};
pub use wing::WingSection;

use std::fmt;

/// Kernel-side integer identifier of an entity within one dimension.
pub type Tag = i32;

/// Topological dimension of a kernel entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dim {
    Point = 0,
    Curve = 1,
    Surface = 2,
    Volume = 3,
}

impl Dim {
    /// All dimensions, lowest first.
    pub const ALL: [Dim; 4] = [Dim::Point, Dim::Curve, Dim::Surface, Dim::Volume];

    /// Numeric dimension as used by the kernel.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Dimension one below, or `None` for points.
    #[must_use]
    pub const fn lower(self) -> Option<Dim> {
        match self {
            Dim::Point => None,
            Dim::Curve => Some(Dim::Point),
            Dim::Surface => Some(Dim::Curve),
            Dim::Volume => Some(Dim::Surface),
        }
    }

    /// Dimension one above, or `None` for volumes.
    #[must_use]
    pub const fn upper(self) -> Option<Dim> {
        match self {
            Dim::Point => Some(Dim::Curve),
            Dim::Curve => Some(Dim::Surface),
            Dim::Surface => Some(Dim::Volume),
            Dim::Volume => None,
        }
    }
}

/// A (dimension, tag) pair identifying one entity in the kernel's current model.
///
/// Only meaningful while the kernel session is alive; kernel-side deletion
/// invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimTag {
    pub dim: Dim,
    pub tag: Tag,
}

impl DimTag {
    #[must_use]
    pub const fn new(dim: Dim, tag: Tag) -> Self {
        Self { dim, tag }
    }

    #[must_use]
    pub const fn point(tag: Tag) -> Self {
        Self::new(Dim::Point, tag)
    }

    #[must_use]
    pub const fn curve(tag: Tag) -> Self {
        Self::new(Dim::Curve, tag)
    }

    #[must_use]
    pub const fn surface(tag: Tag) -> Self {
        Self::new(Dim::Surface, tag)
    }

    #[must_use]
    pub const fn volume(tag: Tag) -> Self {
        Self::new(Dim::Volume, tag)
    }
}

impl fmt::Display for DimTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dim.index(), self.tag)
    }
}

/// Flags for boundary queries, mirroring the kernel's `getBoundary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundaryOptions {
    /// Return the boundary of the union of the inputs (shared entities cancel).
    pub combined: bool,
    /// Keep orientation signs on the returned tags.
    pub oriented: bool,
    /// Descend all the way down to points.
    pub recursive: bool,
}

impl BoundaryOptions {
    /// `combined = true`, `oriented = false`, `recursive = false`.
    pub const COMBINED: Self = Self {
        combined: true,
        oriented: false,
        recursive: false,
    };

    /// `combined = true`, `oriented = false`, `recursive = true`.
    pub const COMBINED_RECURSIVE: Self = Self {
        combined: true,
        oriented: false,
        recursive: true,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimtags_sort_by_dimension_then_tag() {
        let mut tags = vec![
            DimTag::surface(1),
            DimTag::curve(7),
            DimTag::curve(2),
            DimTag::point(9),
        ];
        tags.sort();
        assert_eq!(
            tags,
            vec![
                DimTag::point(9),
                DimTag::curve(2),
                DimTag::curve(7),
                DimTag::surface(1)
            ]
        );
    }

    #[test]
    fn dimension_neighbours() {
        assert_eq!(Dim::Volume.lower(), Some(Dim::Surface));
        assert_eq!(Dim::Point.lower(), None);
        assert_eq!(Dim::Curve.upper(), Some(Dim::Surface));
        assert_eq!(Dim::Volume.upper(), None);
        assert_eq!(DimTag::volume(4).to_string(), "(3, 4)");
    }
}
