//! The capability a diff type supplies to take part in transforms.

use crate::result::{PairTransform, TransformResult};
use crate::transform::{self, InvalidDiff, TransformBudget, TransformError};
use std::fmt;
use std::slice;

/// Rules for one kind of diff.
///
/// Implementors define what emptiness, inversion, compaction and pairwise
/// transformation mean for their diff type. Sequence-level transformation is
/// provided on top of [`OtSystem::transform_pair`] and is the same for every
/// implementation.
///
/// # Laws
///
/// - `squash(&[d])` is empty iff `is_empty(&d)`.
/// - Applying `invert(seq)` after `seq` restores the original state.
/// - `squash` keeps the net effect, never lengthens its input and returns an
///   empty vector for empty input.
/// - For a [`PairTransform::Rebased`] outcome, applying `right` then the
///   rebased left, and `left` then the rebased right, reach the same state.
///   Tie-breaks must not depend on which side a diff arrived on.
pub trait OtSystem {
    /// The diff type these rules operate on.
    type Diff: Clone + fmt::Debug;

    /// Whether applying `diff` leaves the state unchanged.
    fn is_empty(&self, diff: &Self::Diff) -> bool;

    /// The sequence that undoes `diffs`.
    fn invert(&self, diffs: &[Self::Diff]) -> Vec<Self::Diff>;

    /// A sequence with the same net effect, no longer than `diffs`.
    fn squash(&self, diffs: &[Self::Diff]) -> Vec<Self::Diff>;

    /// Transform two non-empty diffs applied to the same state.
    ///
    /// # Errors
    ///
    /// Returns an error when the pair cannot come from one consistent state.
    /// Incompatible but well-formed edits are a
    /// [`PairTransform::Conflict`], not an error.
    fn transform_pair(
        &self,
        left: &Self::Diff,
        right: &Self::Diff,
    ) -> Result<PairTransform<Self::Diff>, TransformError>;

    /// [`OtSystem::transform_pair`] called from inside a running transform.
    ///
    /// Systems composed of other systems override this to run their component
    /// transforms with [`transform::transform_nested`], so nested work shares
    /// the caller's configuration and step budget.
    ///
    /// # Errors
    ///
    /// Same as [`OtSystem::transform_pair`], plus budget exhaustion in nested
    /// work.
    fn transform_pair_in(
        &self,
        left: &Self::Diff,
        right: &Self::Diff,
        budget: &mut TransformBudget<'_>,
    ) -> Result<PairTransform<Self::Diff>, TransformError> {
        let _ = budget;
        self.transform_pair(left, right)
    }

    /// Structural check run on every input diff before transforming.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDiff`] for diffs that no state could accept.
    fn validate(&self, diff: &Self::Diff) -> Result<(), InvalidDiff> {
        let _ = diff;
        Ok(())
    }

    /// Whether every diff in the sequence is empty.
    fn is_empty_sequence(&self, diffs: &[Self::Diff]) -> bool {
        diffs.iter().all(|diff| self.is_empty(diff))
    }

    /// Transform two diverging sequences with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`transform::transform_with`].
    fn transform(
        &self,
        left: &[Self::Diff],
        right: &[Self::Diff],
    ) -> Result<TransformResult<Self::Diff>, TransformError> {
        transform::transform(self, left, right)
    }

    /// Transform two single diffs; same as `transform(&[left], &[right])`.
    ///
    /// # Errors
    ///
    /// See [`transform::transform_with`].
    fn transform_one(
        &self,
        left: &Self::Diff,
        right: &Self::Diff,
    ) -> Result<TransformResult<Self::Diff>, TransformError> {
        self.transform(slice::from_ref(left), slice::from_ref(right))
    }
}

impl<S: OtSystem + ?Sized> OtSystem for &S {
    type Diff = S::Diff;

    fn is_empty(&self, diff: &Self::Diff) -> bool {
        (**self).is_empty(diff)
    }

    fn invert(&self, diffs: &[Self::Diff]) -> Vec<Self::Diff> {
        (**self).invert(diffs)
    }

    fn squash(&self, diffs: &[Self::Diff]) -> Vec<Self::Diff> {
        (**self).squash(diffs)
    }

    fn transform_pair(
        &self,
        left: &Self::Diff,
        right: &Self::Diff,
    ) -> Result<PairTransform<Self::Diff>, TransformError> {
        (**self).transform_pair(left, right)
    }

    fn transform_pair_in(
        &self,
        left: &Self::Diff,
        right: &Self::Diff,
        budget: &mut TransformBudget<'_>,
    ) -> Result<PairTransform<Self::Diff>, TransformError> {
        (**self).transform_pair_in(left, right, budget)
    }

    fn validate(&self, diff: &Self::Diff) -> Result<(), InvalidDiff> {
        (**self).validate(diff)
    }
}
