//! Edit plans and the planner producing them.

use std::collections::BTreeSet;

use tracing::debug;
use weaver_analysis::{DependencyBlock, MatchResult, StackEffectOracle};
use weaver_ir::{FieldRef, Instruction, InstructionSequence};

use crate::errors::{EditError, EditResult};
use crate::template::ReplacementTemplate;

/// One edit, positioned against the sequence as it was when planned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edit {
    Delete {
        start: usize,
        removed: Vec<Instruction>,
    },
    Insert {
        at: usize,
        instructions: Vec<Instruction>,
    },
}

impl Edit {
    pub fn position(&self) -> usize {
        match self {
            Edit::Delete { start, .. } => *start,
            Edit::Insert { at, .. } => *at,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditPlan {
    pub edits: Vec<Edit>,
    pub required_storage: Vec<FieldRef>,
}

/// All edits sharing one position, coalesced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EditGroup {
    pub at: usize,
    pub removed: Vec<Instruction>,
    pub inserted: Vec<Instruction>,
}

impl EditPlan {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn removed_len(&self) -> usize {
        self.edits
            .iter()
            .map(|edit| match edit {
                Edit::Delete { removed, .. } => removed.len(),
                Edit::Insert { .. } => 0,
            })
            .sum()
    }

    pub fn inserted_len(&self) -> usize {
        self.edits
            .iter()
            .map(|edit| match edit {
                Edit::Insert { instructions, .. } => instructions.len(),
                Edit::Delete { .. } => 0,
            })
            .sum()
    }

    /// Edits grouped by position, ascending, with overlap checked.
    pub(crate) fn groups(&self) -> EditResult<Vec<EditGroup>> {
        let mut edits: Vec<&Edit> = self.edits.iter().collect();
        // Stable: inserts at one position keep their plan order.
        edits.sort_by_key(|edit| edit.position());

        let mut groups: Vec<EditGroup> = Vec::new();
        for edit in edits {
            let at = edit.position();
            if groups.last().is_none_or(|group| group.at != at) {
                if let Some(last) = groups.last()
                    && at < last.at + last.removed.len()
                {
                    return Err(EditError::overlap(at));
                }
                groups.push(EditGroup {
                    at,
                    removed: Vec::new(),
                    inserted: Vec::new(),
                });
            }
            let Some(group) = groups.last_mut() else {
                continue;
            };
            match edit {
                Edit::Delete { removed, .. } => {
                    if !group.removed.is_empty() {
                        return Err(EditError::overlap(at));
                    }
                    group.removed.extend(removed.iter().cloned());
                }
                Edit::Insert { instructions, .. } => {
                    group.inserted.extend(instructions.iter().cloned());
                }
            }
        }
        Ok(groups)
    }

    /// The plan that undoes this one once it has been applied.
    pub fn invert(&self) -> EditResult<EditPlan> {
        let mut edits = Vec::new();
        let mut shift: isize = 0;
        for group in self.groups()? {
            let at = group.at.saturating_add_signed(shift);
            shift += group.inserted.len() as isize - group.removed.len() as isize;
            if !group.inserted.is_empty() {
                edits.push(Edit::Delete {
                    start: at,
                    removed: group.inserted,
                });
            }
            if !group.removed.is_empty() {
                edits.push(Edit::Insert {
                    at,
                    instructions: group.removed,
                });
            }
        }
        Ok(EditPlan {
            edits,
            required_storage: Vec::new(),
        })
    }
}

/// Turns a match, its dependency blocks and a template into an [`EditPlan`].
pub struct Planner<'a> {
    sequence: &'a InstructionSequence,
    oracle: &'a StackEffectOracle<'a>,
}

impl<'a> Planner<'a> {
    pub fn new(sequence: &'a InstructionSequence, oracle: &'a StackEffectOracle<'a>) -> Self {
        Planner { sequence, oracle }
    }

    /// Delete the match range plus everything the blocks cover, and insert the
    /// rendered template in its place.
    pub fn plan(
        &self,
        matched: &MatchResult,
        blocks: &[&DependencyBlock],
        template: &ReplacementTemplate,
    ) -> EditResult<EditPlan> {
        if let Some(failure) = &matched.failure {
            return Err(EditError::unmatched(failure));
        }

        for capture in &matched.captures {
            self.check_current(capture.index, &capture.instruction)?;
        }
        let mut deletion: BTreeSet<usize> = matched.range.clone().collect();
        for block in blocks {
            self.check_block(block)?;
            deletion.extend(block.covered_indices());
        }

        let start = deletion.first().copied().unwrap_or(matched.range.start);
        if let Some(gap) = deletion
            .iter()
            .zip(start..)
            .find_map(|(&index, expected)| (index != expected).then_some(expected))
        {
            return Err(EditError::non_contiguous(gap));
        }
        let count = deletion.len();
        let removed = self
            .sequence
            .slice(start..start + count)
            .ok_or_else(|| EditError::out_of_bounds(start, count, self.sequence.len()))?
            .to_vec();

        let inserted = template.render(matched, blocks)?;
        let actual = self.oracle.net_of(&inserted)? - self.oracle.net_of(&removed)?;
        if actual != template.declared_delta {
            return Err(EditError::stack_imbalance(template.declared_delta, actual));
        }
        if template.declared_delta != 0 && template.new_storage.is_empty() {
            return Err(EditError::unregistered_storage(template.declared_delta));
        }

        debug!(
            start,
            removed = removed.len(),
            inserted = inserted.len(),
            "planned rewrite"
        );
        let mut edits = Vec::with_capacity(2);
        if !removed.is_empty() {
            edits.push(Edit::Delete { start, removed });
        }
        if !inserted.is_empty() {
            edits.push(Edit::Insert {
                at: start,
                instructions: inserted,
            });
        }
        Ok(EditPlan {
            edits,
            required_storage: template.new_storage.clone(),
        })
    }

    fn check_block(&self, block: &DependencyBlock) -> EditResult<()> {
        self.check_current(block.index, &block.instruction)?;
        block
            .children
            .iter()
            .try_for_each(|child| self.check_block(child))
    }

    fn check_current(&self, index: usize, instruction: &Instruction) -> EditResult<()> {
        match self.sequence.get(index) {
            Some(current) if current == instruction => Ok(()),
            _ => Err(EditError::stale(index)),
        }
    }
}
