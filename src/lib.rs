pub mod config;
pub mod error;
pub mod kernel;
pub mod math;
pub mod operations;
pub mod pipeline;
pub mod topology;

pub use config::MeshingConfig;
pub use error::{AeroDomainError, Result};
pub use pipeline::{generate_mesh, MeshOutcome, PartSource};
