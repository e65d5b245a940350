//! Product of two OT systems.
//!
//! A document often has independent parts (body text, a title, a counter)
//! that each have their own diff type. [`MergedSystem`] runs their rules side
//! by side over [`MergedDiff`], which carries one sequence per part.
//!
//! | Operation | Behaviour |
//! |-----------|-----------|
//! | `is_empty` | every component squashes to nothing |
//! | `invert` | reverse, invert each component |
//! | `squash` | flatten each component, squash, emit at most one diff |
//! | `transform_pair` | transform components independently; any conflict wins |
//!
//! Component transforms run inside the caller's transform, sharing its
//! [`TransformConfig`] and step budget.
//!
//! Nest `MergedSystem`s for more than two parts.

use crate::config::TransformConfig;
use crate::result::{PairTransform, TransformResult};
use crate::system::OtSystem;
use crate::transform::{transform_nested, InvalidDiff, TransformBudget, TransformError};
use serde::{Deserialize, Serialize};

/// A diff to a two-part document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedDiff<A, B> {
    /// Diffs to the first part
    pub first: Vec<A>,
    /// Diffs to the second part
    pub second: Vec<B>,
}

impl<A, B> Default for MergedDiff<A, B> {
    fn default() -> Self {
        Self {
            first: Vec::new(),
            second: Vec::new(),
        }
    }
}

impl<A, B> MergedDiff<A, B> {
    /// Create from component sequences.
    #[must_use]
    pub fn new(first: Vec<A>, second: Vec<B>) -> Self {
        Self { first, second }
    }

    /// A diff that only touches the first part.
    #[must_use]
    pub fn first_only(first: Vec<A>) -> Self {
        Self {
            first,
            second: Vec::new(),
        }
    }

    /// A diff that only touches the second part.
    #[must_use]
    pub fn second_only(second: Vec<B>) -> Self {
        Self {
            first: Vec::new(),
            second,
        }
    }
}

/// Two systems combined component-wise.
#[derive(Debug, Clone, Default)]
pub struct MergedSystem<A, B> {
    first: A,
    second: B,
}

impl<A, B> MergedSystem<A, B> {
    /// Combine two systems.
    #[must_use]
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    /// System for the first part.
    #[must_use]
    pub fn first(&self) -> &A {
        &self.first
    }

    /// System for the second part.
    #[must_use]
    pub fn second(&self) -> &B {
        &self.second
    }
}

impl<A, B> OtSystem for MergedSystem<A, B>
where
    A: OtSystem,
    B: OtSystem,
{
    type Diff = MergedDiff<A::Diff, B::Diff>;

    fn is_empty(&self, diff: &Self::Diff) -> bool {
        self.first.squash(&diff.first).is_empty() && self.second.squash(&diff.second).is_empty()
    }

    fn invert(&self, diffs: &[Self::Diff]) -> Vec<Self::Diff> {
        diffs
            .iter()
            .rev()
            .map(|diff| MergedDiff {
                first: self.first.invert(&diff.first),
                second: self.second.invert(&diff.second),
            })
            .collect()
    }

    fn squash(&self, diffs: &[Self::Diff]) -> Vec<Self::Diff> {
        let first: Vec<A::Diff> = diffs.iter().flat_map(|d| d.first.iter().cloned()).collect();
        let second: Vec<B::Diff> = diffs.iter().flat_map(|d| d.second.iter().cloned()).collect();

        let squashed = MergedDiff {
            first: self.first.squash(&first),
            second: self.second.squash(&second),
        };

        if squashed.first.is_empty() && squashed.second.is_empty() {
            Vec::new()
        } else {
            vec![squashed]
        }
    }

    fn transform_pair(
        &self,
        left: &Self::Diff,
        right: &Self::Diff,
    ) -> Result<PairTransform<Self::Diff>, TransformError> {
        let config = TransformConfig::default();
        self.transform_pair_in(left, right, &mut TransformBudget::new(&config))
    }

    fn transform_pair_in(
        &self,
        left: &Self::Diff,
        right: &Self::Diff,
        budget: &mut TransformBudget<'_>,
    ) -> Result<PairTransform<Self::Diff>, TransformError> {
        let first = transform_nested(&self.first, budget, &left.first, &right.first)?;
        let second = transform_nested(&self.second, budget, &left.second, &right.second)?;

        match (first, second) {
            (
                TransformResult::Success {
                    left: first_left,
                    right: first_right,
                },
                TransformResult::Success {
                    left: second_left,
                    right: second_right,
                },
            ) => Ok(PairTransform::of(
                MergedDiff::new(first_left, second_left),
                MergedDiff::new(first_right, second_right),
            )),
            (TransformResult::Conflict(conflict), _) => Ok(PairTransform::conflict(format!(
                "first part: {}",
                conflict.reason
            ))),
            (_, TransformResult::Conflict(conflict)) => Ok(PairTransform::conflict(format!(
                "second part: {}",
                conflict.reason
            ))),
        }
    }

    fn validate(&self, diff: &Self::Diff) -> Result<(), InvalidDiff> {
        for component in &diff.first {
            self.first.validate(component)?;
        }
        for component in &diff.second {
            self.second.validate(component)?;
        }
        Ok(())
    }
}
