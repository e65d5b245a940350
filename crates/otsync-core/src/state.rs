//! Document states that diffs apply to.
//!
//! The transform machinery never touches state. This trait exists so diff
//! types can ship a reference interpretation, and so convergence can be
//! checked by applying both sides of a transform result.

/// A mutable document state.
pub trait OtState<D> {
    /// Apply one diff.
    ///
    /// # Errors
    ///
    /// Returns error if the diff does not fit the current state. The state
    /// is left unchanged in that case.
    fn apply(&mut self, diff: &D) -> Result<(), StateError>;

    /// Apply a sequence in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`StateError`]; earlier diffs stay applied.
    fn apply_all(&mut self, diffs: &[D]) -> Result<(), StateError> {
        for diff in diffs {
            self.apply(diff)?;
        }
        Ok(())
    }
}

/// Errors from applying a diff to a state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Diff addresses a position past the end of the state
    #[error("position {position} out of bounds for length {len}")]
    OutOfBounds {
        /// Requested position
        position: usize,
        /// Current length
        len: usize,
    },
    /// Diff expects different existing content
    #[error("state mismatch: {0}")]
    Mismatch(String),
}
