//! Meshing configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::math::Vector3;
use crate::operations::meshing::RegionSizes;
use crate::operations::sizing::{EdgeRefinement, FarfieldGrowth, SmallSurfaceRefinement};

/// Settings of one meshing run.
///
/// Every field has a default, so a TOML file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct MeshingConfig {
    /// Far-field radius as a multiple of the aircraft's largest extent.
    pub farfield_factor: f64,

    /// Mesh only the half domain on the positive side of the symmetry plane.
    pub symmetry: bool,

    /// Normal of the symmetry plane.
    pub symmetry_normal: [f64; 3],

    pub mesh_size_farfield: f64,
    pub mesh_size_fuselage: f64,
    pub mesh_size_wings: f64,

    /// Leading/trailing-edge refinement factor; 1 disables all sizing fields.
    pub refine_factor: f64,

    /// Raise the refinement factor on thin truncated trailing edges.
    pub refine_truncated: bool,

    /// Refine surfaces too small for their part's mesh size.
    pub refine_small_surfaces: bool,

    /// Fewest triangles a surface should be meshed with.
    pub nb_min_triangle: u32,

    /// Edge refinement length as a fraction of the mean chord.
    pub chord_percent: f64,

    /// Exponent of the edge refinement law.
    pub edge_power: f64,

    /// Exponent of the far-field growth law.
    pub farfield_power: f64,

    /// Open the interactive viewer after the surface and the volume mesh.
    pub open_gui: bool,

    /// Laplace smoothing passes on the surface mesh.
    pub smoothing_iterations: u32,
}

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            farfield_factor: 5.0,
            symmetry: false,
            symmetry_normal: [0.0, 1.0, 0.0],
            mesh_size_farfield: 12.0,
            mesh_size_fuselage: 0.2,
            mesh_size_wings: 0.2,
            refine_factor: 4.0,
            refine_truncated: true,
            refine_small_surfaces: true,
            nb_min_triangle: 150,
            chord_percent: 0.25,
            edge_power: 2.0,
            farfield_power: 1.5,
            open_gui: false,
            smoothing_iterations: 1,
        }
    }
}

impl MeshingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or a value is invalid.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub const fn with_farfield_factor(mut self, factor: f64) -> Self {
        self.farfield_factor = factor;
        self
    }

    #[must_use]
    pub const fn with_symmetry(mut self, symmetry: bool) -> Self {
        self.symmetry = symmetry;
        self
    }

    #[must_use]
    pub const fn with_symmetry_normal(mut self, normal: [f64; 3]) -> Self {
        self.symmetry_normal = normal;
        self
    }

    #[must_use]
    pub const fn with_mesh_sizes(mut self, farfield: f64, fuselage: f64, wings: f64) -> Self {
        self.mesh_size_farfield = farfield;
        self.mesh_size_fuselage = fuselage;
        self.mesh_size_wings = wings;
        self
    }

    #[must_use]
    pub const fn with_refine_factor(mut self, refine: f64) -> Self {
        self.refine_factor = refine;
        self
    }

    #[must_use]
    pub const fn with_refine_truncated(mut self, enable: bool) -> Self {
        self.refine_truncated = enable;
        self
    }

    #[must_use]
    pub const fn with_small_surface_refinement(mut self, enable: bool, nb_min_triangle: u32) -> Self {
        self.refine_small_surfaces = enable;
        self.nb_min_triangle = nb_min_triangle;
        self
    }

    #[must_use]
    pub const fn with_open_gui(mut self, open: bool) -> Self {
        self.open_gui = open;
        self
    }

    /// Checks that sizes, factors and exponents are positive and the
    /// symmetry normal is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("farfield_factor", self.farfield_factor),
            ("mesh_size_farfield", self.mesh_size_farfield),
            ("mesh_size_fuselage", self.mesh_size_fuselage),
            ("mesh_size_wings", self.mesh_size_wings),
            ("refine_factor", self.refine_factor),
            ("chord_percent", self.chord_percent),
            ("edge_power", self.edge_power),
            ("farfield_power", self.farfield_power),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    name,
                    value,
                    reason: "must be positive",
                }
                .into());
            }
        }
        if self.nb_min_triangle == 0 {
            return Err(ConfigError::InvalidValue {
                name: "nb_min_triangle",
                value: 0.0,
                reason: "must be at least 1",
            }
            .into());
        }
        let norm = self.normal().norm();
        if !(norm.is_finite() && norm > 0.0) {
            return Err(ConfigError::InvalidValue {
                name: "symmetry_normal",
                value: norm,
                reason: "must be a non-zero vector",
            }
            .into());
        }
        Ok(())
    }

    /// Symmetry plane normal as a vector.
    #[must_use]
    pub fn normal(&self) -> Vector3 {
        Vector3::from(self.symmetry_normal)
    }

    /// `true` unless the refinement factor is exactly 1.
    #[must_use]
    pub fn sizing_fields_enabled(&self) -> bool {
        (self.refine_factor - 1.0).abs() > f64::EPSILON
    }

    #[must_use]
    pub fn region_sizes(&self) -> RegionSizes {
        RegionSizes {
            farfield: self.mesh_size_farfield,
            fuselage: self.mesh_size_fuselage,
            wings: self.mesh_size_wings,
        }
    }

    #[must_use]
    pub fn edge_refinement(&self) -> EdgeRefinement {
        EdgeRefinement::new(self.mesh_size_wings, self.refine_factor)
            .with_chord_percent(self.chord_percent)
            .with_power(self.edge_power)
            .with_truncation_adapt(self.refine_truncated)
    }

    /// Far-field growth over `characteristic_length`.
    #[must_use]
    pub fn farfield_growth(&self, characteristic_length: f64) -> FarfieldGrowth {
        FarfieldGrowth::new(self.mesh_size_farfield, characteristic_length)
            .with_power(self.farfield_power)
    }

    #[must_use]
    pub fn small_surface_refinement(&self, characteristic_length: f64) -> SmallSurfaceRefinement {
        SmallSurfaceRefinement::new(
            self.nb_min_triangle,
            self.farfield_growth(characteristic_length),
        )
    }
}
