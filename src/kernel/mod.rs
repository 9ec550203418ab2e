//! Interfaces to the external geometry kernel and mesh engine.
//!
//! Both subsystems are process-wide mutable state with no internal
//! concurrency guarantees, so every call takes `&mut self` or `&self` on a
//! single session object and runs in program order.

pub mod memory;

use std::path::Path;

use crate::error::KernelError;
use crate::math::{Aabb, Point3, Vector3};
use crate::topology::{BoundaryOptions, Dim, DimTag, Tag};

/// Engine plugin measuring the area or volume of a physical group.
pub const MESH_VOLUME_PLUGIN: &str = "MeshVolume";

/// Globally unique index of a mesh field within one meshing run.
pub type FieldIndex = i32;

/// Result of a boolean fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentOutput {
    /// Every volume of the fragmented model.
    pub fragments: Vec<DimTag>,
    /// Per input operand (objects first, then tools), the volumes generated from it.
    pub children: Vec<Vec<DimTag>>,
}

/// Upward and downward neighbours of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacencies {
    /// Tags of entities one dimension up that this entity bounds.
    pub upward: Vec<Tag>,
    /// Tags of entities one dimension down that bound this entity.
    pub downward: Vec<Tag>,
}

/// An RGBA display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Mesh field kinds used by the sizing composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Distance,
    Restrict,
    Threshold,
    MathEval,
    Min,
}

impl FieldKind {
    /// Kernel name of the field kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FieldKind::Distance => "Distance",
            FieldKind::Restrict => "Restrict",
            FieldKind::Threshold => "Threshold",
            FieldKind::MathEval => "MathEval",
            FieldKind::Min => "Min",
        }
    }
}

/// Boundary-representation CAD kernel.
pub trait GeometryKernel {
    /// Imports every shape of a CAD file, returning the created entities.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains no shape.
    fn import_shapes(&mut self, path: &Path) -> Result<Vec<DimTag>, KernelError>;

    /// Commits pending CAD operations to the model.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel rejects the pending operations.
    fn synchronize(&mut self) -> Result<(), KernelError>;

    /// Boolean fragment of `objects` against `tools`.
    ///
    /// # Errors
    ///
    /// Returns an error on any geometric failure; callers treat it as fatal.
    fn fragment(
        &mut self,
        objects: &[DimTag],
        tools: &[DimTag],
    ) -> Result<FragmentOutput, KernelError>;

    /// Boundary of a set of entities.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity does not exist.
    fn boundary(
        &self,
        entities: &[DimTag],
        options: BoundaryOptions,
    ) -> Result<Vec<DimTag>, KernelError>;

    /// All entities of one dimension in the model.
    fn entities(&self, dim: Dim) -> Vec<DimTag>;

    /// Bounding box of the whole model.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is empty.
    fn bounding_box(&self) -> Result<Aabb, KernelError>;

    /// Center of mass of one entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    fn center_of_mass(&self, entity: DimTag) -> Result<Point3, KernelError>;

    /// Upward and downward adjacencies of one entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    fn adjacencies(&self, entity: DimTag) -> Result<Adjacencies, KernelError>;

    /// Removes entities; with `recursive`, also removes their boundary
    /// entities that no remaining entity still uses.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity does not exist.
    fn remove(&mut self, entities: &[DimTag], recursive: bool) -> Result<(), KernelError>;

    /// Adds a solid sphere, returning its volume tag.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive radius.
    fn add_sphere(&mut self, center: Point3, radius: f64) -> Result<Tag, KernelError>;

    /// Adds a planar disk in the XY plane through `center`, returning its surface tag.
    ///
    /// # Errors
    ///
    /// Returns an error for non-positive radii.
    fn add_disk(&mut self, center: Point3, rx: f64, ry: f64) -> Result<Tag, KernelError>;

    /// Rotates entities about an axis through `origin`.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero axis or a missing entity.
    fn rotate(
        &mut self,
        entities: &[DimTag],
        origin: Point3,
        axis: Vector3,
        angle: f64,
    ) -> Result<(), KernelError>;

    /// Extrudes entities along `direction`.
    ///
    /// For a surface the output is `[top surface, volume, lateral surfaces..]`.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero direction or a missing entity.
    fn extrude(
        &mut self,
        entities: &[DimTag],
        direction: Vector3,
    ) -> Result<Vec<DimTag>, KernelError>;

    /// Creates a physical group and returns its tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the group cannot be created.
    fn add_physical_group(&mut self, dim: Dim, tags: &[Tag]) -> Result<Tag, KernelError>;

    /// Names a physical group.
    ///
    /// # Errors
    ///
    /// Returns an error if the group does not exist.
    fn set_physical_name(&mut self, dim: Dim, group: Tag, name: &str) -> Result<(), KernelError>;

    /// Removes physical groups.
    ///
    /// # Errors
    ///
    /// Returns an error if a group does not exist.
    fn remove_physical_groups(&mut self, groups: &[(Dim, Tag)]) -> Result<(), KernelError>;

    /// Sets the display color of entities.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity does not exist.
    fn set_color(
        &mut self,
        entities: &[DimTag],
        color: Rgba,
        recursive: bool,
    ) -> Result<(), KernelError>;
}

/// Mesh-field and meshing engine.
pub trait MeshEngine {
    /// Registers a new field under `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the field.
    fn add_field(&mut self, kind: FieldKind, index: FieldIndex) -> Result<(), KernelError>;

    /// Sets a numeric field property.
    ///
    /// # Errors
    ///
    /// Returns an error if the field does not exist.
    fn set_field_number(
        &mut self,
        index: FieldIndex,
        property: &str,
        value: f64,
    ) -> Result<(), KernelError>;

    /// Sets a list-valued field property.
    ///
    /// # Errors
    ///
    /// Returns an error if the field does not exist.
    fn set_field_numbers(
        &mut self,
        index: FieldIndex,
        property: &str,
        values: &[f64],
    ) -> Result<(), KernelError>;

    /// Sets a string field property.
    ///
    /// # Errors
    ///
    /// Returns an error if the field does not exist.
    fn set_field_string(
        &mut self,
        index: FieldIndex,
        property: &str,
        value: &str,
    ) -> Result<(), KernelError>;

    /// Makes a field the active background sizing function.
    ///
    /// # Errors
    ///
    /// Returns an error if the field does not exist.
    fn set_background_field(&mut self, index: FieldIndex) -> Result<(), KernelError>;

    /// Sets a numeric engine option.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown option.
    fn set_option_number(&mut self, name: &str, value: f64) -> Result<(), KernelError>;

    /// Sets a numeric plugin option.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown plugin.
    fn set_plugin_number(
        &mut self,
        plugin: &str,
        option: &str,
        value: f64,
    ) -> Result<(), KernelError>;

    /// Runs a plugin; results land in a new view.
    ///
    /// # Errors
    ///
    /// Returns an error if the plugin fails.
    fn run_plugin(&mut self, plugin: &str) -> Result<(), KernelError>;

    /// Tags of all current views, oldest first.
    fn view_tags(&self) -> Vec<Tag>;

    /// Last scalar value stored in a view's list data.
    ///
    /// # Errors
    ///
    /// Returns an error if the view does not exist or holds no data.
    fn view_last_value(&self, view: Tag) -> Result<f64, KernelError>;

    /// Removes views.
    ///
    /// # Errors
    ///
    /// Returns an error if a view does not exist.
    fn remove_views(&mut self, views: &[Tag]) -> Result<(), KernelError>;

    /// Sets an explicit mesh size at points; the last call wins on each point.
    ///
    /// # Errors
    ///
    /// Returns an error if a point does not exist.
    fn set_mesh_size(&mut self, points: &[DimTag], size: f64) -> Result<(), KernelError>;

    /// Generates the mesh up to `dim`.
    ///
    /// # Errors
    ///
    /// Returns an error if meshing fails.
    fn generate(&mut self, dim: Dim) -> Result<(), KernelError>;

    /// Runs a mesh optimizer.
    ///
    /// # Errors
    ///
    /// Returns an error if optimization fails.
    fn optimize(&mut self, method: &str, iterations: u32) -> Result<(), KernelError>;

    /// Discards the current mesh, keeping geometry and fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses.
    fn clear_mesh(&mut self) -> Result<(), KernelError>;

    /// Starts capturing engine log messages.
    fn start_logger(&mut self);

    /// Captured log messages, oldest first.
    fn log_lines(&self) -> Vec<String>;

    /// Writes the mesh to `path`; the format follows the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn write(&mut self, path: &Path) -> Result<(), KernelError>;

    /// Opens the interactive viewer and blocks until it is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if no viewer is available.
    fn run_gui(&mut self) -> Result<(), KernelError>;

    /// Clears the whole session.
    fn clear(&mut self);
}

/// One kernel session providing both CAD and meshing.
pub trait Session: GeometryKernel + MeshEngine {}

impl<T: GeometryKernel + MeshEngine + ?Sized> Session for T {}
