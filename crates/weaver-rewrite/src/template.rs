//! Replacement templates.

use weaver_analysis::{DependencyBlock, MatchResult};
use weaver_ir::{FieldRef, Instruction};

use crate::errors::{EditError, EditResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplatePart {
    /// A literal instruction.
    Emit(Instruction),
    /// Re-emit the subtree at `path` below the `block`-th dependency block.
    /// An empty path re-emits the block itself.
    Operand { block: usize, path: Vec<usize> },
    /// The n-th captured instruction of the match.
    Capture(usize),
    /// The n-th extracted name, as a string load.
    LoadName(usize),
}

impl TemplatePart {
    pub fn operand(block: usize, path: impl Into<Vec<usize>>) -> Self {
        TemplatePart::Operand {
            block,
            path: path.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplacementTemplate {
    pub parts: Vec<TemplatePart>,
    /// Expected `net(inserted) - net(deleted)`.
    pub declared_delta: isize,
    /// Fields the declaring type must gain for the replacement to be valid.
    pub new_storage: Vec<FieldRef>,
}

impl ReplacementTemplate {
    pub fn new(parts: impl Into<Vec<TemplatePart>>) -> Self {
        ReplacementTemplate {
            parts: parts.into(),
            declared_delta: 0,
            new_storage: Vec::new(),
        }
    }

    pub fn with_delta(mut self, delta: isize) -> Self {
        self.declared_delta = delta;
        self
    }

    pub fn with_storage(mut self, field: FieldRef) -> Self {
        self.new_storage.push(field);
        self
    }

    /// Expand the template against a match and its dependency blocks.
    pub fn render(
        &self,
        matched: &MatchResult,
        blocks: &[&DependencyBlock],
    ) -> EditResult<Vec<Instruction>> {
        let mut out = Vec::new();
        for part in &self.parts {
            match part {
                TemplatePart::Emit(instruction) => out.push(instruction.clone()),
                TemplatePart::Operand { block, path } => {
                    let subtree = blocks
                        .get(*block)
                        .and_then(|root| root.child(path))
                        .ok_or_else(|| EditError::unknown_operand(*block, path))?;
                    out.extend(subtree.instructions());
                }
                TemplatePart::Capture(n) => {
                    let capture = matched
                        .capture(*n)
                        .ok_or_else(|| EditError::unknown_capture(*n))?;
                    out.push(capture.instruction.clone());
                }
                TemplatePart::LoadName(n) => {
                    let name = matched.name(*n).ok_or_else(|| EditError::unknown_name(*n))?;
                    out.push(Instruction::ldstr(name));
                }
            }
        }
        Ok(out)
    }
}
