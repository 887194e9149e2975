//! Stack-dependency slicing.
//!
//! Replays the structural push/pop bookkeeping of a straight-line prefix to find
//! the instructions that produced each operand of a target instruction. No data
//! flow is tracked: branches are ignored and an instruction that pushes anything
//! occupies exactly one shadow slot.

use std::fmt::Write;

use tracing::warn;
use weaver_ir::{Instruction, InstructionSequence};

use crate::errors::{SliceError, SliceResult};
use crate::stack_effect::StackEffectOracle;

/// One instruction and the blocks that produced its operands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DependencyBlock {
    pub instruction: Instruction,
    pub index: usize,
    /// One per popped operand, earliest-pushed first.
    pub children: Vec<DependencyBlock>,
}

impl DependencyBlock {
    pub fn leaf(instruction: Instruction, index: usize) -> Self {
        DependencyBlock {
            instruction,
            index,
            children: Vec::new(),
        }
    }

    /// Descendant reached by following child positions from this block.
    pub fn child(&self, path: &[usize]) -> Option<&DependencyBlock> {
        path.iter()
            .try_fold(self, |block, &position| block.children.get(position))
    }

    /// Indices of this block and all its descendants, ascending.
    pub fn covered_indices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        self.walk(&mut |block| indices.push(block.index));
        indices.sort_unstable();
        indices
    }

    /// Instructions of the whole subtree in sequence order.
    pub fn instructions(&self) -> Vec<Instruction> {
        let mut blocks = Vec::new();
        self.walk(&mut |block| blocks.push(block));
        blocks.sort_by_key(|block| block.index);
        blocks
            .into_iter()
            .map(|block| block.instruction.clone())
            .collect()
    }

    /// Number of blocks in the subtree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(DependencyBlock::size).sum::<usize>()
    }

    /// Total values pushed by the direct children.
    pub fn operand_push_sum(&self, oracle: &StackEffectOracle<'_>) -> SliceResult<usize> {
        self.children
            .iter()
            .map(|child| {
                oracle
                    .effect(&child.instruction, child.index)
                    .map(|effect| effect.pushes)
            })
            .sum()
    }

    /// Indented dependency tree, one block per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let _ = writeln!(
            out,
            "{:indent$}{:04}: {}",
            "",
            self.index,
            self.instruction,
            indent = depth * 2
        );
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }

    fn walk<'s>(&'s self, visit: &mut impl FnMut(&'s DependencyBlock)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// A pop that found fewer blocks on the shadow stack than it asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Approximation {
    pub index: usize,
    pub requested: usize,
    pub available: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slice {
    pub root: DependencyBlock,
    pub approximations: Vec<Approximation>,
}

impl Slice {
    /// `true` when every pop on the way found its operands.
    pub fn is_exact(&self) -> bool {
        self.approximations.is_empty()
    }
}

/// Build the dependency tree of the instruction at `target`.
pub fn slice(
    sequence: &InstructionSequence,
    target: usize,
    oracle: &StackEffectOracle<'_>,
) -> SliceResult<Slice> {
    if target >= sequence.len() {
        return Err(SliceError::target_out_of_range(target, sequence.len()));
    }

    let mut stack: Vec<DependencyBlock> = Vec::new();
    let mut approximations = Vec::new();

    for (index, instruction) in sequence.iter().enumerate().take(target + 1) {
        let effect = oracle.effect(instruction, index)?;
        let available = stack.len().min(effect.pops);
        if available < effect.pops {
            warn!(
                index,
                requested = effect.pops,
                available,
                instruction = %instruction,
                "shadow stack underflow, slice is approximate"
            );
            approximations.push(Approximation {
                index,
                requested: effect.pops,
                available,
            });
        }
        let children = stack.split_off(stack.len() - available);
        let block = DependencyBlock {
            instruction: instruction.clone(),
            index,
            children,
        };

        if index == target {
            return Ok(Slice {
                root: block,
                approximations,
            });
        }
        if effect.pushes > 0 {
            stack.push(block);
        }
    }

    // `target < len` guarantees the loop reaches it.
    Err(SliceError::target_out_of_range(target, sequence.len()))
}
