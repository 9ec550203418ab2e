use thiserror::Error;

use crate::topology::{Dim, DimTag};

/// Top-level error type for domain reconciliation and sizing-field composition.
#[derive(Debug, Error)]
pub enum AeroDomainError {
    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures reported by the geometry kernel or the mesh engine.
///
/// These are fatal for a run: CAD booleans are not retried.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("{operation} failed: {message}")]
    Failed {
        operation: &'static str,
        message: String,
    },

    #[error("entity not found: {0}")]
    EntityNotFound(DimTag),

    #[error("operation not supported by this session: {0}")]
    Unsupported(&'static str),

    #[error("kernel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Caller bugs. Never recoverable.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("{operation} does not accept dimension {dim:?} (allowed: {allowed:?})")]
    InvalidDimension {
        operation: &'static str,
        dim: Dim,
        allowed: &'static [Dim],
    },

    #[error("field index {0} is already in use")]
    FieldIndexReused(i32),

    #[error("no field has been created yet")]
    NoFieldDefined,

    #[error("field set is finalized, no further fields may be added")]
    FieldSetFinalized,

    #[error("minimum field requires at least one restrict field")]
    EmptyFieldList,
}

/// Topological expectations that the fragmented model failed to meet.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("expected exactly one volume in the final domain, found {0}")]
    DomainNotSingular(usize),

    #[error("fragment returned {found} children lists, expected {expected}")]
    FragmentMismatch { expected: usize, found: usize },

    #[error("wing section of {part} has {count} trailing-edge curves (expected 1 or 3)")]
    UnsupportedTrailingEdge { part: String, count: usize },
}

/// Degenerate geometric inputs.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("truncated trailing edge of {part} has non-positive thickness {thickness}")]
    DegenerateTrailingEdge { part: String, thickness: f64 },

    #[error("surface {tag} has non-positive measured area {area}")]
    NonPositiveArea { tag: i32, area: f64 },
}

/// Invalid meshing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} = {value} is invalid: {reason}")]
    InvalidValue {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Convenience type alias for results using [`AeroDomainError`].
pub type Result<T> = std::result::Result<T, AeroDomainError>;
