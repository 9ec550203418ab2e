//! Thin wrappers over the engine's field kinds.
//!
//! Each call allocates its own index from the [`FieldSet`] before touching
//! the engine.

use tracing::debug;

use crate::error::{ContractError, Result};
use crate::kernel::{FieldIndex, FieldKind, MeshEngine};
use crate::topology::{Dim, Tag};

use super::FieldSet;

/// Points sampled along each curve or surface by a distance field.
pub const DISTANCE_SAMPLING: f64 = 100.0;

const DISTANCE_DIMS: &[Dim] = &[Dim::Curve, Dim::Surface];
const RESTRICT_DIMS: &[Dim] = &[Dim::Surface, Dim::Volume];

fn as_numbers(tags: &[Tag]) -> Vec<f64> {
    tags.iter().map(|&t| f64::from(t)).collect()
}

fn entity_list(dim: Dim) -> &'static str {
    match dim {
        Dim::Point => "PointsList",
        Dim::Curve => "CurvesList",
        Dim::Surface => "SurfacesList",
        Dim::Volume => "VolumesList",
    }
}

fn check_dim(operation: &'static str, dim: Dim, allowed: &'static [Dim]) -> Result<()> {
    if allowed.contains(&dim) {
        Ok(())
    } else {
        Err(ContractError::InvalidDimension {
            operation,
            dim,
            allowed,
        }
        .into())
    }
}

/// Distance to the listed curves (`Dim::Curve`) or surfaces (`Dim::Surface`).
///
/// # Errors
///
/// Returns a contract error for any other dimension, or an engine error.
pub fn distance_field<E>(
    engine: &mut E,
    fields: &mut FieldSet,
    dim: Dim,
    tags: &[Tag],
) -> Result<FieldIndex>
where
    E: MeshEngine + ?Sized,
{
    check_dim("distance_field", dim, DISTANCE_DIMS)?;
    let index = fields.allocate_index()?;
    engine.add_field(FieldKind::Distance, index)?;
    engine.set_field_numbers(index, entity_list(dim), &as_numbers(tags))?;
    engine.set_field_number(index, "Sampling", DISTANCE_SAMPLING)?;
    Ok(index)
}

/// Limits `source` (default: the last field created) to the listed surfaces
/// or volumes, and registers the result as a leaf of the minimum field.
///
/// # Errors
///
/// Returns a contract error for a dimension other than surface or volume,
/// or when `source` (or, by default, any field) does not exist yet.
pub fn restrict_field<E>(
    engine: &mut E,
    fields: &mut FieldSet,
    dim: Dim,
    tags: &[Tag],
    source: Option<FieldIndex>,
) -> Result<FieldIndex>
where
    E: MeshEngine + ?Sized,
{
    check_dim("restrict_field", dim, RESTRICT_DIMS)?;
    let source = match source {
        Some(index) => {
            fields.check_source(index)?;
            index
        }
        None => fields.last_index()?,
    };
    let index = fields.allocate_index()?;
    engine.add_field(FieldKind::Restrict, index)?;
    engine.set_field_number(index, "InField", f64::from(source))?;
    engine.set_field_numbers(index, entity_list(dim), &as_numbers(tags))?;
    fields.register_leaf(index)?;
    Ok(index)
}

/// `size_min` near the feature measured by `source`, `size_max` far from it.
///
/// # Errors
///
/// Returns a contract error if `source` was never allocated or the set is
/// finalized, or an engine error.
pub fn threshold_field<E>(
    engine: &mut E,
    fields: &mut FieldSet,
    source: FieldIndex,
    size_min: f64,
    size_max: f64,
) -> Result<FieldIndex>
where
    E: MeshEngine + ?Sized,
{
    fields.check_source(source)?;
    let index = fields.allocate_index()?;
    engine.add_field(FieldKind::Threshold, index)?;
    engine.set_field_number(index, "InField", f64::from(source))?;
    engine.set_field_number(index, "SizeMin", size_min)?;
    engine.set_field_number(index, "SizeMax", size_max)?;
    Ok(index)
}

/// A field given by a closed-form expression; `F<n>` refers to field `n`.
///
/// # Errors
///
/// Returns an error if the set is finalized or the engine rejects the field.
pub fn analytic_field<E>(engine: &mut E, fields: &mut FieldSet, expression: &str) -> Result<FieldIndex>
where
    E: MeshEngine + ?Sized,
{
    let index = fields.allocate_index()?;
    engine.add_field(FieldKind::MathEval, index)?;
    engine.set_field_string(index, "F", expression)?;
    debug!("Field {index}: {expression}");
    Ok(index)
}

/// Reduces every registered leaf with a pointwise minimum and makes it the
/// background field. Point, boundary and curvature sizing are switched off.
///
/// Finalizes `fields`; no field can be added afterwards.
///
/// # Errors
///
/// Returns a contract error if no leaf was registered or the set is already
/// finalized.
pub fn min_field<E>(engine: &mut E, fields: &mut FieldSet) -> Result<FieldIndex>
where
    E: MeshEngine + ?Sized,
{
    if fields.leaves().is_empty() {
        return Err(ContractError::EmptyFieldList.into());
    }
    let leaves: Vec<f64> = fields.leaves().iter().map(|&i| f64::from(i)).collect();
    let index = fields.allocate_index()?;
    engine.add_field(FieldKind::Min, index)?;
    engine.set_field_numbers(index, "FieldsList", &leaves)?;
    engine.set_background_field(index)?;
    fields.finalize(index)?;

    engine.set_option_number("Mesh.MeshSizeExtendFromBoundary", 0.0)?;
    engine.set_option_number("Mesh.MeshSizeFromPoints", 0.0)?;
    engine.set_option_number("Mesh.MeshSizeFromCurvature", 0.0)?;
    Ok(index)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::AeroDomainError;
    use crate::kernel::memory::MemorySession;

    #[test]
    fn distance_rejects_volumes() {
        let mut session = MemorySession::new();
        let mut fields = FieldSet::new();
        let err = distance_field(&mut session, &mut fields, Dim::Volume, &[1]).unwrap_err();
        assert!(matches!(
            err,
            AeroDomainError::Contract(ContractError::InvalidDimension { dim: Dim::Volume, .. })
        ));
        assert_eq!(fields.allocated(), 0);
    }

    #[test]
    fn restrict_rejects_curves_and_needs_a_source() {
        let mut session = MemorySession::new();
        let mut fields = FieldSet::new();
        assert!(restrict_field(&mut session, &mut fields, Dim::Curve, &[1], None).is_err());
        assert!(matches!(
            restrict_field(&mut session, &mut fields, Dim::Surface, &[1], None),
            Err(AeroDomainError::Contract(ContractError::NoFieldDefined))
        ));
    }

    #[test]
    fn threshold_needs_an_existing_source() {
        let mut session = MemorySession::new();
        let mut fields = FieldSet::new();
        assert!(matches!(
            threshold_field(&mut session, &mut fields, 1, 0.1, 0.1),
            Err(AeroDomainError::Contract(ContractError::NoFieldDefined))
        ));
        assert_eq!(fields.allocated(), 0);
        assert!(session.field_indices().is_empty());

        let distance = distance_field(&mut session, &mut fields, Dim::Curve, &[2]).unwrap();
        let threshold = threshold_field(&mut session, &mut fields, distance, 0.1, 0.1).unwrap();
        assert_relative_eq!(
            session.field(threshold).unwrap().numbers["InField"],
            f64::from(distance)
        );
    }

    #[test]
    fn restrict_rejects_an_unallocated_source() {
        let mut session = MemorySession::new();
        let mut fields = FieldSet::new();
        distance_field(&mut session, &mut fields, Dim::Surface, &[1]).unwrap();
        assert!(matches!(
            restrict_field(&mut session, &mut fields, Dim::Volume, &[1], Some(99)),
            Err(AeroDomainError::Contract(ContractError::NoFieldDefined))
        ));
        assert_eq!(fields.allocated(), 1);
        assert!(fields.leaves().is_empty());
    }

    #[test]
    fn restrict_defaults_to_last_field() {
        let mut session = MemorySession::new();
        let mut fields = FieldSet::new();
        let distance = distance_field(&mut session, &mut fields, Dim::Curve, &[3, 4]).unwrap();
        let restrict =
            restrict_field(&mut session, &mut fields, Dim::Volume, &[1], None).unwrap();

        let record = session.field(restrict).unwrap();
        assert_eq!(record.kind, FieldKind::Restrict);
        assert_relative_eq!(record.numbers["InField"], f64::from(distance));
        assert_eq!(record.lists["VolumesList"], vec![1.0]);
        assert_eq!(fields.leaves(), &[restrict]);

        let distance = session.field(distance).unwrap();
        assert_eq!(distance.lists["CurvesList"], vec![3.0, 4.0]);
        assert_relative_eq!(distance.numbers["Sampling"], DISTANCE_SAMPLING);
    }

    #[test]
    fn min_field_becomes_background_once() {
        let mut session = MemorySession::new();
        let mut fields = FieldSet::new();
        assert!(matches!(
            min_field(&mut session, &mut fields),
            Err(AeroDomainError::Contract(ContractError::EmptyFieldList))
        ));

        distance_field(&mut session, &mut fields, Dim::Surface, &[1]).unwrap();
        let leaf = restrict_field(&mut session, &mut fields, Dim::Surface, &[1], None).unwrap();
        let min = min_field(&mut session, &mut fields).unwrap();

        assert_eq!(session.background_fields(), vec![min]);
        assert_eq!(session.field(min).unwrap().lists["FieldsList"], vec![f64::from(leaf)]);
        assert_eq!(session.option("Mesh.MeshSizeFromPoints"), Some(0.0));
        assert!(distance_field(&mut session, &mut fields, Dim::Surface, &[1]).is_err());
        assert!(min_field(&mut session, &mut fields).is_err());
    }
}
