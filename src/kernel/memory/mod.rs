//! In-memory session implementing both kernel traits.
//!
//! Geometry lives in a [`TopologyModel`]; the boolean fragment is supplied
//! as a hook because the store has no geometric intersection engine. Field,
//! sizing, grouping and meshing calls are recorded for inspection. Used for
//! dry runs of the reconciliation and sizing logic, and by the test suite.

mod model;

pub use model::{on_plane, TopologyModel};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use nalgebra::{Rotation3, Unit};

use crate::error::KernelError;
use crate::math::{Aabb, Point3, Vector3, TOLERANCE};
use crate::topology::{BoundaryOptions, Dim, DimTag, Tag};

use super::{
    Adjacencies, FieldIndex, FieldKind, FragmentOutput, GeometryKernel, MeshEngine, Rgba,
    MESH_VOLUME_PLUGIN,
};

/// Computes the fragment of `objects` against `tools` on the store.
pub type FragmentHook = Box<
    dyn FnMut(&mut TopologyModel, &[DimTag], &[DimTag]) -> Result<FragmentOutput, KernelError>,
>;

/// Builds the entities of an importable shape.
pub type ShapeBuilder = Box<dyn FnOnce(&mut TopologyModel) -> Vec<DimTag>>;

/// A recorded mesh field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    pub kind: FieldKind,
    pub numbers: BTreeMap<String, f64>,
    pub lists: BTreeMap<String, Vec<f64>>,
    pub strings: BTreeMap<String, String>,
}

impl FieldRecord {
    fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            numbers: BTreeMap::new(),
            lists: BTreeMap::new(),
            strings: BTreeMap::new(),
        }
    }
}

/// A recorded physical group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalGroup {
    pub dim: Dim,
    pub tag: Tag,
    pub entities: Vec<Tag>,
    pub name: Option<String>,
}

/// Journal entry for engine calls whose order matters.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshCall {
    Background(FieldIndex),
    Generate(Dim),
    Optimize(String, u32),
    ClearMesh,
    StartLogger,
    Write(PathBuf),
    Gui,
    Clear,
}

/// In-memory geometry kernel and mesh engine.
#[derive(Default)]
pub struct MemorySession {
    model: TopologyModel,
    fragment_hook: Option<FragmentHook>,
    shapes: HashMap<PathBuf, ShapeBuilder>,
    groups: BTreeMap<(Dim, Tag), PhysicalGroup>,
    next_group: Tag,
    colors: HashMap<DimTag, Rgba>,
    fields: BTreeMap<FieldIndex, FieldRecord>,
    field_add_calls: usize,
    options: BTreeMap<String, f64>,
    plugin_numbers: HashMap<(String, String), f64>,
    fail_next_plugin: bool,
    views: BTreeMap<Tag, Vec<f64>>,
    next_view: Tag,
    mesh_sizes: BTreeMap<Tag, f64>,
    calls: Vec<MeshCall>,
    log: Vec<String>,
}

impl MemorySession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn model(&self) -> &TopologyModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut TopologyModel {
        &mut self.model
    }

    /// Installs the computation run by [`GeometryKernel::fragment`].
    pub fn on_fragment(
        &mut self,
        hook: impl FnMut(&mut TopologyModel, &[DimTag], &[DimTag]) -> Result<FragmentOutput, KernelError>
            + 'static,
    ) {
        self.fragment_hook = Some(Box::new(hook));
    }

    /// Makes `path` importable; the builder runs on first import.
    pub fn register_shape(
        &mut self,
        path: impl Into<PathBuf>,
        builder: impl FnOnce(&mut TopologyModel) -> Vec<DimTag> + 'static,
    ) {
        self.shapes.insert(path.into(), Box::new(builder));
    }

    /// Makes the next plugin run fail.
    pub fn fail_next_plugin_run(&mut self) {
        self.fail_next_plugin = true;
    }

    /// Appends a line to the engine log.
    pub fn push_log_line(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    #[must_use]
    pub fn field(&self, index: FieldIndex) -> Option<&FieldRecord> {
        self.fields.get(&index)
    }

    /// Indices of every registered field, sorted.
    #[must_use]
    pub fn field_indices(&self) -> Vec<FieldIndex> {
        self.fields.keys().copied().collect()
    }

    /// Number of successful `add_field` calls.
    #[must_use]
    pub fn field_add_calls(&self) -> usize {
        self.field_add_calls
    }

    /// Fields of one kind, sorted by index.
    #[must_use]
    pub fn fields_of_kind(&self, kind: FieldKind) -> Vec<(FieldIndex, &FieldRecord)> {
        self.fields
            .iter()
            .filter(|(_, f)| f.kind == kind)
            .map(|(&i, f)| (i, f))
            .collect()
    }

    /// Background fields in the order they were assigned.
    #[must_use]
    pub fn background_fields(&self) -> Vec<FieldIndex> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                MeshCall::Background(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn option(&self, name: &str) -> Option<f64> {
        self.options.get(name).copied()
    }

    /// Explicit mesh size currently set at a point.
    #[must_use]
    pub fn mesh_size(&self, point: Tag) -> Option<f64> {
        self.mesh_sizes.get(&point).copied()
    }

    #[must_use]
    pub fn color(&self, entity: DimTag) -> Option<Rgba> {
        self.colors.get(&entity).copied()
    }

    /// Physical groups currently defined.
    pub fn physical_groups(&self) -> impl Iterator<Item = &PhysicalGroup> {
        self.groups.values()
    }

    /// The named physical group of a dimension, if any.
    #[must_use]
    pub fn physical_group(&self, dim: Dim, name: &str) -> Option<&PhysicalGroup> {
        self.groups
            .values()
            .find(|g| g.dim == dim && g.name.as_deref() == Some(name))
    }

    #[must_use]
    pub fn calls(&self) -> &[MeshCall] {
        &self.calls
    }

    fn field_mut(
        &mut self,
        index: FieldIndex,
        operation: &'static str,
    ) -> Result<&mut FieldRecord, KernelError> {
        self.fields.get_mut(&index).ok_or_else(|| KernelError::Failed {
            operation,
            message: format!("unknown field {index}"),
        })
    }

    fn entity_boundary(
        &self,
        entity: DimTag,
        recursive: bool,
    ) -> Result<Vec<DimTag>, KernelError> {
        let Some(lower) = entity.dim.lower() else {
            if self.model.contains(entity) {
                return Ok(Vec::new());
            }
            return Err(KernelError::EntityNotFound(entity));
        };
        if recursive {
            Ok(self
                .model
                .points_of(entity)?
                .into_iter()
                .map(DimTag::point)
                .collect())
        } else {
            Ok(self
                .model
                .boundary_of(entity)?
                .iter()
                .map(|&t| DimTag::new(lower, t))
                .collect())
        }
    }

    fn measure_group(&self) -> Result<f64, KernelError> {
        let number = |option: &str| {
            self.plugin_numbers
                .get(&(MESH_VOLUME_PLUGIN.to_owned(), option.to_owned()))
                .copied()
                .ok_or_else(|| KernelError::Failed {
                    operation: "plugin.run",
                    message: format!("{MESH_VOLUME_PLUGIN}: option {option} not set"),
                })
        };
        #[allow(clippy::cast_possible_truncation)]
        let group_tag = number("PhysicalGroup")? as Tag;
        let dim = match number("Dimension")? {
            d if (d - 2.0).abs() < TOLERANCE => Dim::Surface,
            d if (d - 3.0).abs() < TOLERANCE => Dim::Volume,
            _ => return Err(KernelError::Unsupported("MeshVolume dimension")),
        };
        let group = self
            .groups
            .get(&(dim, group_tag))
            .ok_or_else(|| KernelError::Failed {
                operation: "plugin.run",
                message: format!("no physical group {group_tag}"),
            })?;
        if dim != Dim::Surface {
            return Err(KernelError::Unsupported("volume measurement"));
        }
        group
            .entities
            .iter()
            .map(|&s| self.model.area(s))
            .sum::<Result<f64, KernelError>>()
    }
}

impl GeometryKernel for MemorySession {
    fn import_shapes(&mut self, path: &Path) -> Result<Vec<DimTag>, KernelError> {
        let builder = self.shapes.remove(path).ok_or_else(|| {
            KernelError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no shape registered for {}", path.display()),
            ))
        })?;
        Ok(builder(&mut self.model))
    }

    fn synchronize(&mut self) -> Result<(), KernelError> {
        Ok(())
    }

    fn fragment(
        &mut self,
        objects: &[DimTag],
        tools: &[DimTag],
    ) -> Result<FragmentOutput, KernelError> {
        let hook = self
            .fragment_hook
            .as_mut()
            .ok_or(KernelError::Unsupported("fragment"))?;
        hook(&mut self.model, objects, tools)
    }

    fn boundary(
        &self,
        entities: &[DimTag],
        options: BoundaryOptions,
    ) -> Result<Vec<DimTag>, KernelError> {
        let mut out: Vec<DimTag> = Vec::new();
        let mut counts: BTreeMap<DimTag, usize> = BTreeMap::new();
        for &entity in entities {
            for found in self.entity_boundary(entity, options.recursive)? {
                let count = counts.entry(found).or_default();
                if *count == 0 || !options.combined {
                    out.push(found);
                }
                *count += 1;
            }
        }
        if options.combined && !options.recursive {
            out.retain(|e| counts.get(e).is_some_and(|c| c % 2 == 1));
        }
        Ok(out)
    }

    fn entities(&self, dim: Dim) -> Vec<DimTag> {
        self.model
            .tags(dim)
            .into_iter()
            .map(|t| DimTag::new(dim, t))
            .collect()
    }

    fn bounding_box(&self) -> Result<Aabb, KernelError> {
        self.model.bounding_box().ok_or(KernelError::Failed {
            operation: "getBoundingBox",
            message: "model is empty".into(),
        })
    }

    fn center_of_mass(&self, entity: DimTag) -> Result<Point3, KernelError> {
        self.model.center_of_mass(entity)
    }

    fn adjacencies(&self, entity: DimTag) -> Result<Adjacencies, KernelError> {
        let downward = if entity.dim == Dim::Point {
            if !self.model.contains(entity) {
                return Err(KernelError::EntityNotFound(entity));
            }
            Vec::new()
        } else {
            self.model.boundary_of(entity)?.to_vec()
        };
        Ok(Adjacencies {
            upward: self.model.upward(entity),
            downward,
        })
    }

    fn remove(&mut self, entities: &[DimTag], recursive: bool) -> Result<(), KernelError> {
        for &entity in entities {
            // Recursive removal of an earlier entity may already have taken this one.
            if recursive && !self.model.contains(entity) {
                continue;
            }
            self.model.remove(entity, recursive)?;
        }
        Ok(())
    }

    fn add_sphere(&mut self, center: Point3, radius: f64) -> Result<Tag, KernelError> {
        if radius <= TOLERANCE {
            return Err(KernelError::Failed {
                operation: "addSphere",
                message: format!("radius {radius} must be positive"),
            });
        }
        Ok(self.model.add_sphere(center, radius))
    }

    fn add_disk(&mut self, center: Point3, rx: f64, ry: f64) -> Result<Tag, KernelError> {
        if rx <= TOLERANCE || ry <= TOLERANCE {
            return Err(KernelError::Failed {
                operation: "addDisk",
                message: format!("radii ({rx}, {ry}) must be positive"),
            });
        }
        Ok(self.model.add_disk(center, rx, ry))
    }

    fn rotate(
        &mut self,
        entities: &[DimTag],
        origin: Point3,
        axis: Vector3,
        angle: f64,
    ) -> Result<(), KernelError> {
        if axis.norm() < TOLERANCE {
            return Err(KernelError::Failed {
                operation: "rotate",
                message: "rotation axis must be non-zero".into(),
            });
        }
        let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(axis), angle);
        let mut points = BTreeSet::new();
        for &entity in entities {
            points.extend(self.model.points_of(entity)?);
        }
        self.model
            .transform_points(&points, |p| origin + rotation * (p - origin))
    }

    fn extrude(
        &mut self,
        entities: &[DimTag],
        direction: Vector3,
    ) -> Result<Vec<DimTag>, KernelError> {
        if direction.norm() < TOLERANCE {
            return Err(KernelError::Failed {
                operation: "extrude",
                message: "extrusion direction must be non-zero".into(),
            });
        }
        let mut out = Vec::new();
        for &entity in entities {
            if entity.dim != Dim::Surface {
                return Err(KernelError::Unsupported("extrusion of non-surface entities"));
            }
            out.extend(self.model.extrude_surface(entity.tag, direction)?);
        }
        Ok(out)
    }

    fn add_physical_group(&mut self, dim: Dim, tags: &[Tag]) -> Result<Tag, KernelError> {
        for &tag in tags {
            let entity = DimTag::new(dim, tag);
            if !self.model.contains(entity) {
                return Err(KernelError::EntityNotFound(entity));
            }
        }
        self.next_group += 1;
        let tag = self.next_group;
        self.groups.insert(
            (dim, tag),
            PhysicalGroup {
                dim,
                tag,
                entities: tags.to_vec(),
                name: None,
            },
        );
        Ok(tag)
    }

    fn set_physical_name(&mut self, dim: Dim, group: Tag, name: &str) -> Result<(), KernelError> {
        let entry = self
            .groups
            .get_mut(&(dim, group))
            .ok_or_else(|| KernelError::Failed {
                operation: "setPhysicalName",
                message: format!("no physical group {group} of dimension {}", dim.index()),
            })?;
        entry.name = Some(name.to_owned());
        Ok(())
    }

    fn remove_physical_groups(&mut self, groups: &[(Dim, Tag)]) -> Result<(), KernelError> {
        for key in groups {
            self.groups
                .remove(key)
                .ok_or_else(|| KernelError::Failed {
                    operation: "removePhysicalGroups",
                    message: format!("no physical group {}", key.1),
                })?;
        }
        Ok(())
    }

    fn set_color(
        &mut self,
        entities: &[DimTag],
        color: Rgba,
        recursive: bool,
    ) -> Result<(), KernelError> {
        for &entity in entities {
            if !self.model.contains(entity) {
                return Err(KernelError::EntityNotFound(entity));
            }
            self.colors.insert(entity, color);
            if recursive {
                for point in self.model.points_of(entity)? {
                    self.colors.insert(DimTag::point(point), color);
                }
            }
        }
        Ok(())
    }
}

impl MeshEngine for MemorySession {
    fn add_field(&mut self, kind: FieldKind, index: FieldIndex) -> Result<(), KernelError> {
        if self.fields.contains_key(&index) {
            return Err(KernelError::Failed {
                operation: "field.add",
                message: format!("field {index} already exists"),
            });
        }
        self.fields.insert(index, FieldRecord::new(kind));
        self.field_add_calls += 1;
        Ok(())
    }

    fn set_field_number(
        &mut self,
        index: FieldIndex,
        property: &str,
        value: f64,
    ) -> Result<(), KernelError> {
        self.field_mut(index, "field.setNumber")?
            .numbers
            .insert(property.to_owned(), value);
        Ok(())
    }

    fn set_field_numbers(
        &mut self,
        index: FieldIndex,
        property: &str,
        values: &[f64],
    ) -> Result<(), KernelError> {
        self.field_mut(index, "field.setNumbers")?
            .lists
            .insert(property.to_owned(), values.to_vec());
        Ok(())
    }

    fn set_field_string(
        &mut self,
        index: FieldIndex,
        property: &str,
        value: &str,
    ) -> Result<(), KernelError> {
        self.field_mut(index, "field.setString")?
            .strings
            .insert(property.to_owned(), value.to_owned());
        Ok(())
    }

    fn set_background_field(&mut self, index: FieldIndex) -> Result<(), KernelError> {
        self.field_mut(index, "field.setAsBackgroundMesh")?;
        self.calls.push(MeshCall::Background(index));
        Ok(())
    }

    fn set_option_number(&mut self, name: &str, value: f64) -> Result<(), KernelError> {
        self.options.insert(name.to_owned(), value);
        Ok(())
    }

    fn set_plugin_number(
        &mut self,
        plugin: &str,
        option: &str,
        value: f64,
    ) -> Result<(), KernelError> {
        if plugin != MESH_VOLUME_PLUGIN {
            return Err(KernelError::Unsupported("plugin"));
        }
        self.plugin_numbers
            .insert((plugin.to_owned(), option.to_owned()), value);
        Ok(())
    }

    fn run_plugin(&mut self, plugin: &str) -> Result<(), KernelError> {
        if plugin != MESH_VOLUME_PLUGIN {
            return Err(KernelError::Unsupported("plugin"));
        }
        if std::mem::take(&mut self.fail_next_plugin) {
            return Err(KernelError::Failed {
                operation: "plugin.run",
                message: format!("{MESH_VOLUME_PLUGIN} failed"),
            });
        }
        let value = self.measure_group()?;
        self.next_view += 1;
        self.views.insert(self.next_view, vec![value]);
        Ok(())
    }

    fn view_tags(&self) -> Vec<Tag> {
        self.views.keys().copied().collect()
    }

    fn view_last_value(&self, view: Tag) -> Result<f64, KernelError> {
        self.views
            .get(&view)
            .and_then(|data| data.last().copied())
            .ok_or_else(|| KernelError::Failed {
                operation: "view.getListData",
                message: format!("view {view} holds no data"),
            })
    }

    fn remove_views(&mut self, views: &[Tag]) -> Result<(), KernelError> {
        for view in views {
            self.views
                .remove(view)
                .ok_or_else(|| KernelError::Failed {
                    operation: "view.remove",
                    message: format!("no view {view}"),
                })?;
        }
        Ok(())
    }

    fn set_mesh_size(&mut self, points: &[DimTag], size: f64) -> Result<(), KernelError> {
        for &point in points {
            if point.dim != Dim::Point || !self.model.contains(point) {
                return Err(KernelError::EntityNotFound(point));
            }
            self.mesh_sizes.insert(point.tag, size);
        }
        Ok(())
    }

    fn generate(&mut self, dim: Dim) -> Result<(), KernelError> {
        self.calls.push(MeshCall::Generate(dim));
        Ok(())
    }

    fn optimize(&mut self, method: &str, iterations: u32) -> Result<(), KernelError> {
        self.calls
            .push(MeshCall::Optimize(method.to_owned(), iterations));
        Ok(())
    }

    fn clear_mesh(&mut self) -> Result<(), KernelError> {
        self.calls.push(MeshCall::ClearMesh);
        Ok(())
    }

    fn start_logger(&mut self) {
        self.calls.push(MeshCall::StartLogger);
    }

    fn log_lines(&self) -> Vec<String> {
        self.log.clone()
    }

    fn write(&mut self, path: &Path) -> Result<(), KernelError> {
        self.calls.push(MeshCall::Write(path.to_path_buf()));
        Ok(())
    }

    fn run_gui(&mut self) -> Result<(), KernelError> {
        self.calls.push(MeshCall::Gui);
        Ok(())
    }

    /// Journals the call; state is kept for inspection.
    fn clear(&mut self) {
        self.calls.push(MeshCall::Clear);
    }
}
