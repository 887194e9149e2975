//! Atomic application of edit plans.

use tracing::debug;
use weaver_ir::InstructionSequence;

use crate::errors::{EditError, EditResult};
use crate::plan::EditPlan;

/// Apply `plan` to `sequence`, back to front.
///
/// Works on a copy, so on error the sequence is exactly as it was.
pub fn apply(sequence: &mut InstructionSequence, plan: &EditPlan) -> EditResult<()> {
    let groups = plan.groups()?;
    let mut work = sequence.clone();

    for group in groups.iter().rev() {
        let count = group.removed.len();
        let current = work
            .slice(group.at..group.at + count)
            .ok_or_else(|| EditError::out_of_bounds(group.at, count, work.len()))?;
        if current != group.removed.as_slice() {
            return Err(EditError::stale(group.at));
        }

        if count == 0 {
            work.insert(group.at, group.inserted.clone())?;
        } else {
            work.replace_range(group.at, count, group.inserted.clone())?;
        }
    }

    debug!(
        groups = groups.len(),
        removed = plan.removed_len(),
        inserted = plan.inserted_len(),
        "applied edit plan"
    );
    *sequence = work;
    Ok(())
}
