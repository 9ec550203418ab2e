use std::f64::consts::PI;

use tracing::info;

use crate::error::{GeometryError, KernelError, Result};
use crate::kernel::GeometryKernel;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::topology::{Dim, DimTag};

/// Extrusion length of the symmetry trim, relative to the far-field radius.
const TRIM_DEPTH_FACTOR: f64 = 1.1;

/// The enclosing far-field solid and the optional half-space trim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FarfieldEnvelope {
    pub sphere: DimTag,
    /// Solid occupying the discarded half of the domain, when symmetry is on.
    pub trim: Option<DimTag>,
    pub center: Point3,
    pub radius: f64,
}

/// Rotation bringing the +z axis onto `normal`, as `(axis, angle)`.
///
/// Returns `None` when `normal` already points along +z.
///
/// # Errors
///
/// Returns an error if `normal` is the zero vector.
pub fn symmetry_rotation(normal: &Vector3) -> Result<Option<(Vector3, f64)>> {
    let norm = normal.norm();
    if norm < TOLERANCE {
        return Err(GeometryError::Degenerate("symmetry normal is the zero vector".into()).into());
    }
    let n = normal / norm;
    let z = Vector3::z();
    let cos = z.dot(&n).clamp(-1.0, 1.0);

    if (cos - 1.0).abs() < TOLERANCE {
        return Ok(None);
    }
    if (cos + 1.0).abs() < TOLERANCE {
        return Ok(Some((Vector3::x(), PI)));
    }
    Ok(Some((z.cross(&n), cos.acos())))
}

/// Builds the far-field sphere and, if `symmetry` names a plane normal, the
/// trim solid covering the half-space on the negative side of that plane.
///
/// # Errors
///
/// Returns an error if the kernel fails to build or move a solid, or the
/// normal is degenerate.
pub fn build_farfield<K>(
    kernel: &mut K,
    center: Point3,
    radius: f64,
    symmetry: Option<Vector3>,
) -> Result<FarfieldEnvelope>
where
    K: GeometryKernel + ?Sized,
{
    let sphere = DimTag::volume(kernel.add_sphere(center, radius)?);
    kernel.synchronize()?;

    let trim = match symmetry {
        Some(normal) => {
            info!("Preparing symmetry trim");
            let rotation = symmetry_rotation(&normal)?;
            let n = normal.normalize();

            let disk = DimTag::surface(kernel.add_disk(center, radius, radius)?);
            if let Some((axis, angle)) = rotation {
                kernel.rotate(&[disk], center, axis, angle)?;
            }
            let extruded = kernel.extrude(&[disk], n * (-TRIM_DEPTH_FACTOR * radius))?;
            let volume = extruded
                .get(1)
                .copied()
                .filter(|e| e.dim == Dim::Volume)
                .ok_or_else(|| KernelError::Failed {
                    operation: "extrude",
                    message: "symmetry disk extrusion produced no volume".into(),
                })?;
            kernel.synchronize()?;
            Some(volume)
        }
        None => None,
    };

    Ok(FarfieldEnvelope {
        sphere,
        trim,
        center,
        radius,
    })
}
