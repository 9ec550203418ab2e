use super::{Point3, Vector3};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Smallest box containing every point, or `None` for an empty input.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        let mut aabb = Self {
            min: first,
            max: first,
        };
        for p in points {
            aabb.include(p);
        }
        Some(aabb)
    }

    /// Grows the box to contain `p`.
    pub fn include(&mut self, p: &Point3) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    /// Extent along each axis.
    #[must_use]
    pub fn extents(&self) -> Vector3 {
        self.max - self.min
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Largest axis extent, used to non-dimensionalize growth laws.
    #[must_use]
    pub fn characteristic_length(&self) -> f64 {
        self.extents().max()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn characteristic_length_is_largest_extent() {
        let aabb = Aabb::from_points(&[p(-1.0, 0.0, 0.0), p(3.0, 1.0, 0.5)]).unwrap();
        assert_relative_eq!(aabb.characteristic_length(), 4.0);
        assert_relative_eq!(aabb.center(), p(1.0, 0.5, 0.25));
    }

    #[test]
    fn from_points_covers_all() {
        let pts = [p(0.0, 2.0, 0.0), p(1.0, -1.0, 4.0), p(-3.0, 0.0, 1.0)];
        let aabb = Aabb::from_points(&pts).unwrap();
        assert_relative_eq!(aabb.min, p(-3.0, -1.0, 0.0));
        assert_relative_eq!(aabb.max, p(1.0, 2.0, 4.0));
        assert!(Aabb::from_points(std::iter::empty::<&Point3>()).is_none());
    }

    #[test]
    fn include_grows_the_box() {
        let mut aabb = Aabb::from_points(&[p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)]).unwrap();
        aabb.include(&p(5.0, -2.0, 3.0));
        assert_relative_eq!(aabb.extents(), Vector3::new(5.0, 3.0, 3.0));
    }
}
