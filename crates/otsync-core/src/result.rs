//! Outcomes of transforming concurrent diffs.
//!
//! Naming convention used throughout the crate: `left` always refers to the
//! left actor's diffs and `right` to the right actor's. After a transform,
//! rebased `left` diffs are applied on top of the original right sequence and
//! rebased `right` diffs on top of the original left sequence.

use serde::{Deserialize, Serialize};

/// Result of transforming two diff sequences that share an ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformResult<D> {
    /// Both sides were reconciled
    Success {
        /// Left diffs rebased onto the right side
        left: Vec<D>,
        /// Right diffs rebased onto the left side
        right: Vec<D>,
    },
    /// Two diffs could not be reconciled automatically
    Conflict(Conflict<D>),
}

impl<D> TransformResult<D> {
    /// A successful result.
    #[must_use]
    pub fn success(left: Vec<D>, right: Vec<D>) -> Self {
        Self::Success { left, right }
    }

    /// Whether both sides were reconciled.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether the transform stopped on a conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Rebased left diffs, if successful.
    #[must_use]
    pub fn left(&self) -> Option<&[D]> {
        match self {
            Self::Success { left, .. } => Some(left),
            Self::Conflict(_) => None,
        }
    }

    /// Rebased right diffs, if successful.
    #[must_use]
    pub fn right(&self) -> Option<&[D]> {
        match self {
            Self::Success { right, .. } => Some(right),
            Self::Conflict(_) => None,
        }
    }

    /// The conflict, if any.
    #[must_use]
    pub fn conflict(&self) -> Option<&Conflict<D>> {
        match self {
            Self::Success { .. } => None,
            Self::Conflict(conflict) => Some(conflict),
        }
    }

    /// Split into `(left, right)` rebased sequences, if successful.
    #[must_use]
    pub fn into_success(self) -> Option<(Vec<D>, Vec<D>)> {
        match self {
            Self::Success { left, right } => Some((left, right)),
            Self::Conflict(_) => None,
        }
    }

    /// The same result seen from the other side.
    #[must_use]
    pub fn swapped(self) -> Self {
        match self {
            Self::Success { left, right } => Self::Success {
                left: right,
                right: left,
            },
            Self::Conflict(conflict) => Self::Conflict(conflict.swapped()),
        }
    }
}

/// A pair of concurrent diffs that touch the same unit of state in
/// incompatible ways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict<D> {
    /// The left diff, as it stood when the rule rejected it
    pub left: D,
    /// The right diff, as it stood when the rule rejected it
    pub right: D,
    /// Human-readable description of the overlap
    pub reason: String,
}

impl<D> Conflict<D> {
    /// The same conflict with sides exchanged.
    #[must_use]
    pub fn swapped(self) -> Self {
        Self {
            left: self.right,
            right: self.left,
            reason: self.reason,
        }
    }
}

impl<D: std::fmt::Debug> std::fmt::Display for Conflict<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "conflict between {:?} and {:?}: {}",
            self.left, self.right, self.reason
        )
    }
}

/// Outcome of a single-diff transform rule.
///
/// Rules may expand or absorb diffs, so each side is a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairTransform<D> {
    /// Both diffs rebased
    Rebased {
        /// Left diff rebased onto the right diff
        left: Vec<D>,
        /// Right diff rebased onto the left diff
        right: Vec<D>,
    },
    /// The diffs are structurally incompatible
    Conflict {
        /// Description of the overlap
        reason: String,
    },
}

impl<D> PairTransform<D> {
    /// One rebased diff per side.
    #[must_use]
    pub fn of(left: D, right: D) -> Self {
        Self::Rebased {
            left: vec![left],
            right: vec![right],
        }
    }

    /// Only the left side has something left to apply; the right diff's
    /// effect is already covered.
    #[must_use]
    pub fn only_left(left: D) -> Self {
        Self::Rebased {
            left: vec![left],
            right: Vec::new(),
        }
    }

    /// Only the right side has something left to apply.
    #[must_use]
    pub fn only_right(right: D) -> Self {
        Self::Rebased {
            left: Vec::new(),
            right: vec![right],
        }
    }

    /// Both diffs made the same change.
    #[must_use]
    pub fn empty() -> Self {
        Self::Rebased {
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// The diffs cannot be reconciled.
    #[must_use]
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Exchange sides, for rules written for one argument order only.
    #[must_use]
    pub fn swapped(self) -> Self {
        match self {
            Self::Rebased { left, right } => Self::Rebased {
                left: right,
                right: left,
            },
            conflict @ Self::Conflict { .. } => conflict,
        }
    }
}
