//! Building blocks for diff sequence algebra.
//!
//! Most diff types only know how to invert one diff or combine two
//! neighbouring diffs. These helpers lift such rules to whole sequences.

/// Squash a sequence by repeatedly combining neighbours.
///
/// `squash_pair(first, second)` returns the single diff equivalent to
/// applying `first` then `second`, or `None` if they do not combine. A
/// combined diff is retried against its new left neighbour, and empty diffs
/// are dropped. No two neighbours in the output combine, so squashing the
/// output again returns it unchanged.
pub fn squash_adjacent<D, E, P>(diffs: &[D], is_empty: E, squash_pair: P) -> Vec<D>
where
    D: Clone,
    E: Fn(&D) -> bool,
    P: Fn(&D, &D) -> Option<D>,
{
    let mut squashed: Vec<D> = Vec::with_capacity(diffs.len());

    for diff in diffs {
        if is_empty(diff) {
            continue;
        }

        let mut pending = Some(diff.clone());
        while let Some(current) = pending.take() {
            let Some(previous) = squashed.last() else {
                squashed.push(current);
                break;
            };

            match squash_pair(previous, &current) {
                Some(combined) => {
                    squashed.pop();
                    if !is_empty(&combined) {
                        pending = Some(combined);
                    }
                }
                None => squashed.push(current),
            }
        }
    }

    tracing::debug!(before = diffs.len(), after = squashed.len(), "Squashed diffs");
    squashed
}

/// Invert a sequence: reverse it and invert each diff.
pub fn invert_each<D, F, I>(diffs: &[D], invert_one: F) -> Vec<D>
where
    F: Fn(&D) -> I,
    I: IntoIterator<Item = D>,
{
    diffs.iter().rev().flat_map(invert_one).collect()
}
