//! Mutable instruction container of one routine.
//!
//! Mutation keeps branch targets consistent with the new positions. A branch that
//! would end up pointing into the middle of removed code is rejected before
//! anything changes.

use std::ops::{Index, Range};

use serde::{Deserialize, Serialize};

use crate::errors::{SequenceError, SequenceResult};
use crate::instruction::{Instruction, Operand};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstructionSequence {
    instructions: Vec<Instruction>,
}

impl InstructionSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn slice(&self, range: Range<usize>) -> Option<&[Instruction]> {
        self.instructions.get(range)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Append at the end. Targets of the pushed instruction are taken as-is.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Insert `instructions` before position `at`.
    ///
    /// Existing branches to `at` or later keep pointing at the same instruction.
    pub fn insert(&mut self, at: usize, instructions: Vec<Instruction>) -> SequenceResult<()> {
        if at > self.len() {
            return Err(SequenceError::out_of_bounds(at, 0, self.len()));
        }
        let shift = instructions.len();
        for instruction in &mut self.instructions {
            if let Some(target) = instruction.target()
                && target >= at
            {
                instruction.operand = Operand::Target(target + shift);
            }
        }
        self.instructions.splice(at..at, instructions);
        Ok(())
    }

    /// Remove `count` instructions starting at `start`, returning them.
    ///
    /// A branch to `start` falls through to the successor of the removed range.
    pub fn remove_range(&mut self, start: usize, count: usize) -> SequenceResult<Vec<Instruction>> {
        self.replace_range(start, count, Vec::new())
    }

    /// Replace `count` instructions starting at `start` with `replacement`,
    /// returning the removed ones.
    ///
    /// A branch to `start` lands on the first replacement instruction.
    pub fn replace_range(
        &mut self,
        start: usize,
        count: usize,
        replacement: Vec<Instruction>,
    ) -> SequenceResult<Vec<Instruction>> {
        let end = start
            .checked_add(count)
            .filter(|end| *end <= self.len())
            .ok_or_else(|| SequenceError::out_of_bounds(start, count, self.len()))?;

        // Surviving branches only; the removed ones go away with their range.
        for (index, instruction) in self.instructions.iter().enumerate() {
            if (start..end).contains(&index) {
                continue;
            }
            if let Some(target) = instruction.target()
                && target > start
                && target < end
            {
                return Err(SequenceError::dangling_branch(index, target));
            }
        }

        let inserted = replacement.len();
        let removed: Vec<Instruction> = self.instructions.splice(start..end, replacement).collect();
        let (before, rest) = self.instructions.split_at_mut(start);
        let after = &mut rest[inserted..];
        for instruction in before.iter_mut().chain(after.iter_mut()) {
            if let Some(target) = instruction.target()
                && target >= end
            {
                instruction.operand = Operand::Target(target - count + inserted);
            }
        }
        Ok(removed)
    }
}

impl Index<usize> for InstructionSequence {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Instruction {
        &self.instructions[index]
    }
}

impl From<Vec<Instruction>> for InstructionSequence {
    fn from(instructions: Vec<Instruction>) -> Self {
        InstructionSequence { instructions }
    }
}

impl FromIterator<Instruction> for InstructionSequence {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        InstructionSequence {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a InstructionSequence {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
