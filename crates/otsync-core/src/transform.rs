//! Sequence-level transformation.
//!
//! Given two diff sequences applied by independent actors to the same state,
//! produce rebased sequences that make both actors converge. The work is
//! reduced to single-diff rules supplied by an [`OtSystem`]:
//!
//! ```text
//!         r1        r2
//!   S0 ───────► ● ───────► R
//!    │          │          │
//!  l1│       l1'│      l1''│
//!    ▼   r1'    ▼   r2'    ▼
//!    ● ───────► ● ───────► ●
//! ```
//!
//! Each left diff is pushed through the remaining right sequence one head at
//! a time; the right diffs it crosses are rebased in the same pass. When a
//! rule returns several diffs, the reduction recurses on them. The first
//! conflict aborts the whole transform so callers never see half-rebased
//! sequences.

use crate::config::{ConfigError, TransformConfig};
use crate::result::{Conflict, PairTransform, TransformResult};
use crate::system::OtSystem;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::slice;

/// Which actor's sequence a diff belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    /// The left actor
    Left,
    /// The right actor
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// A diff rejected by [`OtSystem::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidDiff(pub String);

impl InvalidDiff {
    /// Create from a description of what is wrong.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Errors that stop a transform from running at all.
///
/// Conflicts between well-formed diffs are not errors; they are reported as
/// [`TransformResult::Conflict`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// An input diff failed validation
    #[error("malformed {side} diff at index {index}: {reason}")]
    MalformedDiff {
        /// Sequence containing the diff
        side: Side,
        /// Position of the diff in its input sequence
        index: usize,
        /// Validation message
        reason: String,
    },
    /// An input sequence exceeds the configured limit
    #[error("{side} sequence has {len} diffs, limit is {limit}")]
    SequenceTooLong {
        /// Offending sequence
        side: Side,
        /// Its length
        len: usize,
        /// Configured limit
        limit: usize,
    },
    /// Two diffs cannot originate from one shared state
    #[error("inconsistent diffs: {0}")]
    Inconsistent(String),
    /// The transform configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The rules kept producing work past the configured budget
    #[error("transform exceeded {limit} pairwise steps")]
    StepLimitExceeded {
        /// Configured budget
        limit: usize,
    },
}

/// Transform with the default [`TransformConfig`].
///
/// # Errors
///
/// See [`transform_with`].
pub fn transform<S>(
    system: &S,
    left: &[S::Diff],
    right: &[S::Diff],
) -> Result<TransformResult<S::Diff>, TransformError>
where
    S: OtSystem + ?Sized,
{
    transform_with(system, &TransformConfig::default(), left, right)
}

/// Transform two sequences applied to the same ancestor state.
///
/// On success, `left` of the result is applied after the original `right`
/// and vice versa; both orders reach the same state.
///
/// # Errors
///
/// Returns [`TransformError`] if the configuration is unusable, an input is
/// too long or fails validation, a rule reports inconsistent inputs, or the
/// step budget runs out.
pub fn transform_with<S>(
    system: &S,
    config: &TransformConfig,
    left: &[S::Diff],
    right: &[S::Diff],
) -> Result<TransformResult<S::Diff>, TransformError>
where
    S: OtSystem + ?Sized,
{
    config.validate()?;
    config.check_len(Side::Left, left.len())?;
    config.check_len(Side::Right, right.len())?;
    validate_sequence(system, Side::Left, left)?;
    validate_sequence(system, Side::Right, right)?;

    let mut budget = TransformBudget::new(config);
    let result = rebase(system, &mut budget, left, right)?;

    match &result {
        TransformResult::Success {
            left: left_out,
            right: right_out,
        } => tracing::debug!(
            left_in = left.len(),
            right_in = right.len(),
            left_out = left_out.len(),
            right_out = right_out.len(),
            steps = budget.steps(),
            "Transformed diff sequences"
        ),
        TransformResult::Conflict(conflict) => tracing::debug!(
            left_in = left.len(),
            right_in = right.len(),
            steps = budget.steps(),
            reason = %conflict.reason,
            "Transform stopped on conflict"
        ),
    }

    Ok(result)
}

/// Configuration and step count shared by a transform and every transform
/// nested inside it.
///
/// Systems composed of other systems receive the budget through
/// [`OtSystem::transform_pair_in`] and pass it to [`transform_nested`], so
/// component work counts against the caller's limit.
#[derive(Debug)]
pub struct TransformBudget<'a> {
    config: &'a TransformConfig,
    steps: usize,
}

impl<'a> TransformBudget<'a> {
    /// Start an empty budget for `config`.
    #[must_use]
    pub fn new(config: &'a TransformConfig) -> Self {
        Self { config, steps: 0 }
    }

    /// Settings in effect.
    #[must_use]
    pub fn config(&self) -> &'a TransformConfig {
        self.config
    }

    /// Pairwise steps taken so far.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Record one pairwise step.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::StepLimitExceeded`] once the step count
    /// passes `max_pair_steps`.
    pub fn charge(&mut self) -> Result<(), TransformError> {
        self.steps += 1;
        if self.steps > self.config.max_pair_steps {
            return Err(TransformError::StepLimitExceeded {
                limit: self.config.max_pair_steps,
            });
        }
        Ok(())
    }
}

/// Transform component sequences from inside a running transform.
///
/// Applies the length limit and input preparation of the budget's
/// configuration and draws steps from the same budget. Inputs are not
/// validated again.
///
/// # Errors
///
/// Returns [`TransformError`] if an input is too long, a rule reports
/// inconsistent inputs, or the shared budget runs out.
pub fn transform_nested<S>(
    system: &S,
    budget: &mut TransformBudget<'_>,
    left: &[S::Diff],
    right: &[S::Diff],
) -> Result<TransformResult<S::Diff>, TransformError>
where
    S: OtSystem + ?Sized,
{
    let config = budget.config();
    config.check_len(Side::Left, left.len())?;
    config.check_len(Side::Right, right.len())?;
    rebase(system, budget, left, right)
}

fn rebase<S>(
    system: &S,
    budget: &mut TransformBudget<'_>,
    left: &[S::Diff],
    right: &[S::Diff],
) -> Result<TransformResult<S::Diff>, TransformError>
where
    S: OtSystem + ?Sized,
{
    let config = budget.config();
    let left_input = prepare(system, config, left);
    let right_input = prepare(system, config, right);

    Rebaser { system, budget }.sequences(&left_input, &right_input)
}

fn validate_sequence<S>(system: &S, side: Side, diffs: &[S::Diff]) -> Result<(), TransformError>
where
    S: OtSystem + ?Sized,
{
    for (index, diff) in diffs.iter().enumerate() {
        system
            .validate(diff)
            .map_err(|err| TransformError::MalformedDiff {
                side,
                index,
                reason: err.0,
            })?;
    }
    Ok(())
}

/// Drop empty diffs, or squash when configured to.
fn prepare<'a, S>(system: &S, config: &TransformConfig, diffs: &'a [S::Diff]) -> Cow<'a, [S::Diff]>
where
    S: OtSystem + ?Sized,
{
    if config.squash_inputs {
        Cow::Owned(system.squash(diffs))
    } else if diffs.iter().any(|diff| system.is_empty(diff)) {
        Cow::Owned(
            diffs
                .iter()
                .filter(|diff| !system.is_empty(diff))
                .cloned()
                .collect(),
        )
    } else {
        Cow::Borrowed(diffs)
    }
}

struct Rebaser<'a, 'b, S: ?Sized> {
    system: &'a S,
    budget: &'a mut TransformBudget<'b>,
}

impl<S> Rebaser<'_, '_, S>
where
    S: OtSystem + ?Sized,
{
    /// Rebase every left diff through the whole right sequence.
    fn sequences(
        &mut self,
        left: &[S::Diff],
        right: &[S::Diff],
    ) -> Result<TransformResult<S::Diff>, TransformError> {
        let mut left_rebased = Vec::with_capacity(left.len());
        let mut right_rest = right.to_vec();

        for diff in left {
            match self.one_against_many(diff, &right_rest)? {
                TransformResult::Success { left, right } => {
                    left_rebased.extend(left);
                    right_rest = right;
                }
                conflict @ TransformResult::Conflict(_) => return Ok(conflict),
            }
        }

        Ok(TransformResult::success(left_rebased, right_rest))
    }

    /// Rebase a single left diff through a right sequence.
    fn one_against_many(
        &mut self,
        diff: &S::Diff,
        right: &[S::Diff],
    ) -> Result<TransformResult<S::Diff>, TransformError> {
        let mut left_rest = vec![diff.clone()];
        let mut right_rebased = Vec::with_capacity(right.len());

        for other in right {
            let step = match left_rest.as_slice() {
                [] => {
                    right_rebased.push(other.clone());
                    continue;
                }
                [single] => self.pair(single, other)?,
                many => self.sequences(many, slice::from_ref(other))?,
            };

            match step {
                TransformResult::Success { left, right } => {
                    right_rebased.extend(right);
                    left_rest = left;
                }
                conflict @ TransformResult::Conflict(_) => return Ok(conflict),
            }
        }

        Ok(TransformResult::success(left_rest, right_rebased))
    }

    fn pair(
        &mut self,
        left: &S::Diff,
        right: &S::Diff,
    ) -> Result<TransformResult<S::Diff>, TransformError> {
        self.budget.charge()?;

        let outcome = self.system.transform_pair_in(left, right, self.budget)?;
        tracing::trace!(?left, ?right, ?outcome, "Transformed pair");

        Ok(match outcome {
            PairTransform::Rebased {
                left: left_out,
                right: right_out,
            } => TransformResult::success(self.non_empty(left_out), self.non_empty(right_out)),
            PairTransform::Conflict { reason } => TransformResult::Conflict(Conflict {
                left: left.clone(),
                right: right.clone(),
                reason,
            }),
        })
    }

    fn non_empty(&self, mut diffs: Vec<S::Diff>) -> Vec<S::Diff> {
        diffs.retain(|diff| !self.system.is_empty(diff));
        diffs
    }
}
