use crate::error::{ContractError, Result};
use crate::kernel::FieldIndex;

/// Lifecycle of a [`FieldSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSetState {
    /// Indices are being allocated.
    Building,
    /// The minimum field with this index is the background field.
    Finalized(FieldIndex),
}

/// Composition context for one meshing run.
///
/// Hands out globally unique field indices and collects the restrict fields
/// that the final minimum field reduces over. Passed by `&mut` into every
/// field-building call.
#[derive(Debug, Clone)]
pub struct FieldSet {
    allocated: FieldIndex,
    leaves: Vec<FieldIndex>,
    state: FieldSetState,
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocated: 0,
            leaves: Vec::new(),
            state: FieldSetState::Building,
        }
    }

    /// Allocates the next field index. Indices start at 1.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::FieldSetFinalized`] once the background
    /// field has been assigned.
    pub fn allocate_index(&mut self) -> Result<FieldIndex> {
        self.ensure_building()?;
        self.allocated += 1;
        Ok(self.allocated)
    }

    /// Records a restrict field as an input of the final minimum field.
    ///
    /// # Errors
    ///
    /// Returns an error if the set is finalized, the index was never
    /// allocated, or it is already registered.
    pub fn register_leaf(&mut self, index: FieldIndex) -> Result<()> {
        self.ensure_building()?;
        self.check_source(index)?;
        if self.leaves.contains(&index) {
            return Err(ContractError::FieldIndexReused(index).into());
        }
        self.leaves.push(index);
        Ok(())
    }

    /// Checks that `index` names a field this set has already allocated.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::NoFieldDefined`] otherwise.
    pub fn check_source(&self, index: FieldIndex) -> Result<()> {
        if index < 1 || index > self.allocated {
            return Err(ContractError::NoFieldDefined.into());
        }
        Ok(())
    }

    /// Index of the most recently allocated field.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::NoFieldDefined`] before the first allocation.
    pub fn last_index(&self) -> Result<FieldIndex> {
        if self.allocated == 0 {
            return Err(ContractError::NoFieldDefined.into());
        }
        Ok(self.allocated)
    }

    /// Registered restrict fields, in registration order.
    #[must_use]
    pub fn leaves(&self) -> &[FieldIndex] {
        &self.leaves
    }

    /// Number of indices allocated so far.
    #[must_use]
    pub fn allocated(&self) -> usize {
        usize::try_from(self.allocated).unwrap_or_default()
    }

    #[must_use]
    pub fn state(&self) -> FieldSetState {
        self.state
    }

    /// The background field, once finalized.
    #[must_use]
    pub fn background(&self) -> Option<FieldIndex> {
        match self.state {
            FieldSetState::Finalized(index) => Some(index),
            FieldSetState::Building => None,
        }
    }

    pub(super) fn finalize(&mut self, index: FieldIndex) -> Result<()> {
        self.ensure_building()?;
        self.state = FieldSetState::Finalized(index);
        Ok(())
    }

    fn ensure_building(&self) -> Result<()> {
        match self.state {
            FieldSetState::Building => Ok(()),
            FieldSetState::Finalized(_) => Err(ContractError::FieldSetFinalized.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::AeroDomainError;

    #[test]
    fn indices_are_sequential_from_one() {
        let mut fields = FieldSet::new();
        assert!(fields.last_index().is_err());
        assert_eq!(fields.allocate_index().unwrap(), 1);
        assert_eq!(fields.allocate_index().unwrap(), 2);
        assert_eq!(fields.last_index().unwrap(), 2);
        assert_eq!(fields.allocated(), 2);
    }

    #[test]
    fn leaves_must_be_allocated_and_unique() {
        let mut fields = FieldSet::new();
        let index = fields.allocate_index().unwrap();
        fields.register_leaf(index).unwrap();

        assert!(matches!(
            fields.register_leaf(index),
            Err(AeroDomainError::Contract(ContractError::FieldIndexReused(1)))
        ));
        assert!(fields.register_leaf(7).is_err());
        assert_eq!(fields.leaves(), &[1]);
    }

    #[test]
    fn sources_must_already_exist() {
        let mut fields = FieldSet::new();
        assert!(fields.check_source(1).is_err());
        fields.allocate_index().unwrap();
        fields.check_source(1).unwrap();
        assert!(fields.check_source(0).is_err());
        assert!(fields.check_source(2).is_err());
    }

    #[test]
    fn finalized_set_rejects_allocation() {
        let mut fields = FieldSet::new();
        let index = fields.allocate_index().unwrap();
        fields.finalize(index).unwrap();

        assert_eq!(fields.background(), Some(index));
        assert!(matches!(
            fields.allocate_index(),
            Err(AeroDomainError::Contract(ContractError::FieldSetFinalized))
        ));
        assert!(fields.finalize(index).is_err());
    }
}
