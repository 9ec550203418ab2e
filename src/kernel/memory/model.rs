use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::f64::consts::PI;

use crate::error::KernelError;
use crate::math::{Aabb, Point3, Vector3, TOLERANCE};
use crate::topology::{Dim, DimTag, Tag};

/// Quantization step for deduplicating points by position.
const SNAP: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
struct EntityRecord {
    /// Tags of the bounding entities one dimension down.
    boundary: Vec<Tag>,
    /// Position, for points only.
    coords: Option<Point3>,
    /// Area, for surfaces only.
    area: f64,
}

/// Boundary-representation entity store.
///
/// Volumes are bounded by surfaces, surfaces by curves, curves by points.
/// Entities are shared by reference: two volumes touching along a face hold
/// the same surface tag. Tags are allocated per dimension and never reused.
///
/// The `point`, `segment`, `quad` and `add_box` builders deduplicate by
/// geometry, so boxes laid out on a common grid form a conforming complex.
#[derive(Debug, Default)]
pub struct TopologyModel {
    entities: [BTreeMap<Tag, EntityRecord>; 4],
    next_tag: [Tag; 4],
    point_index: HashMap<[i64; 3], Tag>,
    segment_index: HashMap<(Tag, Tag), Tag>,
    face_index: HashMap<Vec<Tag>, Tag>,
}

impl TopologyModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, dim: Dim, record: EntityRecord) -> Tag {
        self.next_tag[dim.index()] += 1;
        let tag = self.next_tag[dim.index()];
        self.entities[dim.index()].insert(tag, record);
        tag
    }

    fn record(&self, entity: DimTag) -> Result<&EntityRecord, KernelError> {
        self.entities[entity.dim.index()]
            .get(&entity.tag)
            .ok_or(KernelError::EntityNotFound(entity))
    }

    // --- Builders ---

    /// Inserts a point without deduplication.
    pub fn add_point(&mut self, p: Point3) -> Tag {
        self.insert(
            Dim::Point,
            EntityRecord {
                coords: Some(p),
                ..EntityRecord::default()
            },
        )
    }

    /// Returns the point at `p`, creating it if none exists there.
    pub fn point(&mut self, p: Point3) -> Tag {
        let key = snap(&p);
        if let Some(&tag) = self.point_index.get(&key) {
            return tag;
        }
        let tag = self.add_point(p);
        self.point_index.insert(key, tag);
        tag
    }

    /// Inserts a curve through the given points without deduplication.
    ///
    /// A closed curve (circle) lists its single seam point.
    pub fn add_curve(&mut self, points: &[Tag]) -> Tag {
        self.insert(
            Dim::Curve,
            EntityRecord {
                boundary: points.to_vec(),
                ..EntityRecord::default()
            },
        )
    }

    /// Returns the straight segment between `a` and `b`, creating it if needed.
    pub fn segment(&mut self, a: Point3, b: Point3) -> Tag {
        let pa = self.point(a);
        let pb = self.point(b);
        let key = (pa.min(pb), pa.max(pb));
        if let Some(&tag) = self.segment_index.get(&key) {
            return tag;
        }
        let tag = self.add_curve(&[pa, pb]);
        self.segment_index.insert(key, tag);
        tag
    }

    /// Inserts a surface bounded by the given curves without deduplication.
    pub fn add_surface(&mut self, curves: &[Tag], area: f64) -> Tag {
        self.insert(
            Dim::Surface,
            EntityRecord {
                boundary: curves.to_vec(),
                area,
                ..EntityRecord::default()
            },
        )
    }

    /// Returns the planar quadrilateral with corners in loop order, creating it if needed.
    pub fn quad(&mut self, corners: [Point3; 4]) -> Tag {
        let curves: Vec<Tag> = (0..4)
            .map(|i| self.segment(corners[i], corners[(i + 1) % 4]))
            .collect();
        let mut key = curves.clone();
        key.sort_unstable();
        if let Some(&tag) = self.face_index.get(&key) {
            return tag;
        }
        let diag_a = corners[2] - corners[0];
        let diag_b = corners[3] - corners[1];
        let area = 0.5 * diag_a.cross(&diag_b).norm();
        let tag = self.add_surface(&curves, area);
        self.face_index.insert(key, tag);
        tag
    }

    /// Inserts a volume bounded by the given surfaces.
    pub fn add_volume(&mut self, surfaces: &[Tag]) -> Tag {
        self.insert(
            Dim::Volume,
            EntityRecord {
                boundary: surfaces.to_vec(),
                ..EntityRecord::default()
            },
        )
    }

    /// Inserts an axis-aligned box volume, sharing faces with existing grid boxes.
    pub fn add_box(&mut self, min: Point3, max: Point3) -> Tag {
        let (x0, y0, z0) = (min.x, min.y, min.z);
        let (x1, y1, z1) = (max.x, max.y, max.z);
        let p = Point3::new;
        let faces = [
            [p(x0, y0, z0), p(x0, y1, z0), p(x0, y1, z1), p(x0, y0, z1)],
            [p(x1, y0, z0), p(x1, y1, z0), p(x1, y1, z1), p(x1, y0, z1)],
            [p(x0, y0, z0), p(x1, y0, z0), p(x1, y0, z1), p(x0, y0, z1)],
            [p(x0, y1, z0), p(x1, y1, z0), p(x1, y1, z1), p(x0, y1, z1)],
            [p(x0, y0, z0), p(x1, y0, z0), p(x1, y1, z0), p(x0, y1, z0)],
            [p(x0, y0, z1), p(x1, y0, z1), p(x1, y1, z1), p(x0, y1, z1)],
        ];
        let surfaces: Vec<Tag> = faces.into_iter().map(|f| self.quad(f)).collect();
        self.add_volume(&surfaces)
    }

    /// Inserts a sphere: two pole points, a seam curve, one surface, one volume.
    pub fn add_sphere(&mut self, center: Point3, radius: f64) -> Tag {
        let south = self.add_point(center - Vector3::z() * radius);
        let north = self.add_point(center + Vector3::z() * radius);
        let seam = self.add_curve(&[south, north]);
        let surface = self.add_surface(&[seam], 4.0 * PI * radius * radius);
        self.add_volume(&[surface])
    }

    /// Inserts an elliptic disk in the XY plane: one rim point, one closed curve, one surface.
    pub fn add_disk(&mut self, center: Point3, rx: f64, ry: f64) -> Tag {
        let rim = self.add_point(center + Vector3::x() * rx);
        let circle = self.add_curve(&[rim]);
        self.add_surface(&[circle], PI * rx * ry)
    }

    /// Sweeps a surface along `direction` into a prism.
    ///
    /// Returns `[top, volume, laterals..]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface or one of its sub-entities is missing.
    pub fn extrude_surface(
        &mut self,
        surface: Tag,
        direction: Vector3,
    ) -> Result<Vec<DimTag>, KernelError> {
        let base = self.record(DimTag::surface(surface))?.clone();
        let mut moved_points: BTreeMap<Tag, Tag> = BTreeMap::new();
        let mut top_curves = Vec::with_capacity(base.boundary.len());
        let mut laterals = Vec::with_capacity(base.boundary.len());

        for &curve in &base.boundary {
            let curve_points = self.record(DimTag::curve(curve))?.boundary.clone();
            let mut new_points = Vec::with_capacity(curve_points.len());
            let mut rails = Vec::with_capacity(curve_points.len());
            for &pt in &curve_points {
                let moved = if let Some(&moved) = moved_points.get(&pt) {
                    moved
                } else {
                    let moved = self.add_point(self.coords(pt)? + direction);
                    moved_points.insert(pt, moved);
                    moved
                };
                new_points.push(moved);
                rails.push(self.add_curve(&[pt, moved]));
            }
            let top_curve = self.add_curve(&new_points);
            top_curves.push(top_curve);

            let chord = match (curve_points.first(), curve_points.last()) {
                (Some(&a), Some(&b)) => (self.coords(b)? - self.coords(a)?).norm(),
                _ => 0.0,
            };
            let mut lateral_curves = vec![curve, top_curve];
            lateral_curves.extend(rails);
            laterals.push(self.add_surface(&lateral_curves, chord * direction.norm()));
        }

        let top = self.add_surface(&top_curves, base.area);
        let mut bounding = vec![surface, top];
        bounding.extend(laterals.iter().copied());
        let volume = self.add_volume(&bounding);

        let mut out = vec![DimTag::surface(top), DimTag::volume(volume)];
        out.extend(laterals.into_iter().map(DimTag::surface));
        Ok(out)
    }

    // --- Queries ---

    #[must_use]
    pub fn contains(&self, entity: DimTag) -> bool {
        self.entities[entity.dim.index()].contains_key(&entity.tag)
    }

    /// Tags of all entities of one dimension, sorted.
    #[must_use]
    pub fn tags(&self, dim: Dim) -> Vec<Tag> {
        self.entities[dim.index()].keys().copied().collect()
    }

    /// Direct boundary tags of an entity (one dimension down).
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    pub fn boundary_of(&self, entity: DimTag) -> Result<&[Tag], KernelError> {
        Ok(&self.record(entity)?.boundary)
    }

    /// Position of a point.
    ///
    /// # Errors
    ///
    /// Returns an error if the point does not exist.
    pub fn coords(&self, point: Tag) -> Result<Point3, KernelError> {
        let entity = DimTag::point(point);
        self.record(entity)?
            .coords
            .ok_or(KernelError::EntityNotFound(entity))
    }

    /// Stored area of a surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface does not exist.
    pub fn area(&self, surface: Tag) -> Result<f64, KernelError> {
        Ok(self.record(DimTag::surface(surface))?.area)
    }

    /// All points reached by descending an entity's boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity on the way does not exist.
    pub fn points_of(&self, entity: DimTag) -> Result<BTreeSet<Tag>, KernelError> {
        let mut points = BTreeSet::new();
        let mut stack = vec![entity];
        while let Some(current) = stack.pop() {
            let record = self.record(current)?;
            match current.dim.lower() {
                None => {
                    points.insert(current.tag);
                }
                Some(lower) => {
                    stack.extend(record.boundary.iter().map(|&t| DimTag::new(lower, t)));
                }
            }
        }
        Ok(points)
    }

    /// Tags of entities one dimension up whose boundary contains `entity`.
    #[must_use]
    pub fn upward(&self, entity: DimTag) -> Vec<Tag> {
        let Some(upper) = entity.dim.upper() else {
            return Vec::new();
        };
        self.entities[upper.index()]
            .iter()
            .filter(|(_, record)| record.boundary.contains(&entity.tag))
            .map(|(&tag, _)| tag)
            .collect()
    }

    /// `true` when some entity one dimension up still uses `entity`.
    #[must_use]
    pub fn is_used(&self, entity: DimTag) -> bool {
        !self.upward(entity).is_empty()
    }

    /// Surfaces bounding exactly one of the given volumes.
    ///
    /// # Errors
    ///
    /// Returns an error if a volume does not exist.
    pub fn exterior_faces(&self, volumes: &[Tag]) -> Result<Vec<Tag>, KernelError> {
        let mut counts: BTreeMap<Tag, usize> = BTreeMap::new();
        for &volume in volumes {
            for &surface in self.boundary_of(DimTag::volume(volume))? {
                *counts.entry(surface).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .filter(|&(_, count)| count == 1)
            .map(|(tag, _)| tag)
            .collect())
    }

    /// Bounding box of every point, or `None` for an empty model.
    #[must_use]
    pub fn bounding_box(&self) -> Option<Aabb> {
        let points: Vec<Point3> = self.entities[Dim::Point.index()]
            .values()
            .filter_map(|r| r.coords)
            .collect();
        Aabb::from_points(&points)
    }

    /// Mean position of the points of an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    pub fn center_of_mass(&self, entity: DimTag) -> Result<Point3, KernelError> {
        let points = self.points_of(entity)?;
        let mut sum = Vector3::zeros();
        for &pt in &points {
            sum += self.coords(pt)?.coords;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = points.len().max(1) as f64;
        Ok(Point3::from(sum / n))
    }

    // --- Mutation ---

    /// Removes an entity; with `recursive`, also its unused boundary entities.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    pub fn remove(&mut self, entity: DimTag, recursive: bool) -> Result<(), KernelError> {
        let record = self.entities[entity.dim.index()]
            .remove(&entity.tag)
            .ok_or(KernelError::EntityNotFound(entity))?;
        self.forget(entity);

        if recursive {
            if let Some(lower) = entity.dim.lower() {
                let unique: BTreeSet<Tag> = record.boundary.into_iter().collect();
                for tag in unique {
                    let child = DimTag::new(lower, tag);
                    if self.contains(child) && !self.is_used(child) {
                        self.remove(child, true)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Moves points through `map`.
    ///
    /// # Errors
    ///
    /// Returns an error if a point does not exist.
    pub fn transform_points(
        &mut self,
        points: &BTreeSet<Tag>,
        map: impl Fn(Point3) -> Point3,
    ) -> Result<(), KernelError> {
        for &tag in points {
            let entity = DimTag::point(tag);
            let record = self.entities[Dim::Point.index()]
                .get_mut(&tag)
                .ok_or(KernelError::EntityNotFound(entity))?;
            record.coords = record.coords.map(&map);
            self.point_index.retain(|_, t| *t != tag);
        }
        Ok(())
    }

    fn forget(&mut self, entity: DimTag) {
        let tag = entity.tag;
        match entity.dim {
            Dim::Point => self.point_index.retain(|_, t| *t != tag),
            Dim::Curve => self.segment_index.retain(|_, t| *t != tag),
            Dim::Surface => self.face_index.retain(|_, t| *t != tag),
            Dim::Volume => {}
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn snap(p: &Point3) -> [i64; 3] {
    [
        (p.x / SNAP).round() as i64,
        (p.y / SNAP).round() as i64,
        (p.z / SNAP).round() as i64,
    ]
}

/// `true` when `p` lies on the plane through `origin` with normal `normal`.
#[must_use]
pub fn on_plane(p: &Point3, origin: &Point3, normal: &Vector3) -> bool {
    (p - origin).dot(normal).abs() < TOLERANCE.sqrt()
}
