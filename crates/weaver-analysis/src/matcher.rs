//! Anchored pattern matching without backtracking.

use std::ops::Range;

use derive_more::Display;
use smallvec::SmallVec;
use weaver_ir::{Instruction, InstructionSequence};

use crate::pattern::{Direction, MatchContext, OperandInspector, Pattern};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Capture {
    pub index: usize,
    pub instruction: Instruction,
}

/// Why a match failed. `element` is the declared position in the pattern.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum MatchFailure {
    #[display("required element {element} of `{pattern}` not found at {}", describe_index(*index))]
    PatternMismatch {
        pattern: &'static str,
        element: usize,
        index: Option<usize>,
    },

    #[display("element {element} of `{pattern}` at {index}: {reason}")]
    UnresolvedOperand {
        pattern: &'static str,
        element: usize,
        index: usize,
        reason: String,
    },
}

fn describe_index(index: Option<usize>) -> String {
    match index {
        Some(index) => index.to_string(),
        None => "sequence boundary".to_owned(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MatchResult {
    pub failure: Option<MatchFailure>,
    /// Captured instructions, in declared element order.
    pub captures: SmallVec<[Capture; 4]>,
    /// Extracted names, in declared element order.
    pub names: SmallVec<[String; 2]>,
    /// Matched instructions; empty on failure.
    pub range: Range<usize>,
}

impl MatchResult {
    fn failed(anchor: usize, failure: MatchFailure) -> Self {
        MatchResult {
            failure: Some(failure),
            captures: SmallVec::new(),
            names: SmallVec::new(),
            range: anchor..anchor,
        }
    }

    pub fn is_match(&self) -> bool {
        self.failure.is_none()
    }

    pub fn capture(&self, n: usize) -> Option<&Capture> {
        self.captures.get(n)
    }

    pub fn name(&self, n: usize) -> Option<&str> {
        self.names.get(n).map(String::as_str)
    }
}

#[derive(Clone, Copy)]
pub struct Matcher<'a> {
    inspector: &'a dyn OperandInspector,
}

impl<'a> Matcher<'a> {
    pub fn new(inspector: &'a dyn OperandInspector) -> Self {
        Matcher { inspector }
    }

    pub fn inspector(&self) -> &'a dyn OperandInspector {
        self.inspector
    }

    /// Match `pattern` anchored at `anchor`.
    ///
    /// Absent optional elements leave the cursor where it is; the first failing
    /// required element ends the match.
    pub fn match_at(
        &self,
        sequence: &InstructionSequence,
        anchor: usize,
        pattern: &Pattern,
    ) -> MatchResult {
        let backward = pattern.direction == Direction::Backward;
        let mut order: Vec<_> = pattern.elements.iter().enumerate().collect();
        if backward {
            order.reverse();
        }

        let mut cursor = Some(anchor);
        let mut consumed = 0usize;
        let mut captures = SmallVec::<[Capture; 4]>::new();
        let mut names = SmallVec::<[String; 2]>::new();

        for (element_index, element) in order {
            let Some((index, instruction)) =
                cursor.and_then(|index| sequence.get(index).map(|i| (index, i)))
            else {
                if element.optional {
                    continue;
                }
                return MatchResult::failed(
                    anchor,
                    MatchFailure::PatternMismatch {
                        pattern: pattern.name,
                        element: element_index,
                        index: None,
                    },
                );
            };

            let cx = MatchContext {
                sequence,
                index,
                inspector: self.inspector,
            };
            if !element.accepts(instruction, &cx) {
                if element.optional {
                    continue;
                }
                return MatchResult::failed(
                    anchor,
                    MatchFailure::PatternMismatch {
                        pattern: pattern.name,
                        element: element_index,
                        index: Some(index),
                    },
                );
            }

            if element.capture {
                captures.push(Capture {
                    index,
                    instruction: instruction.clone(),
                });
            }
            if let Some(extract) = element.name {
                match extract(instruction, &cx) {
                    Ok(name) if !name.is_empty() => names.push(name),
                    Ok(_) => {}
                    Err(reason) => {
                        return MatchResult::failed(
                            anchor,
                            MatchFailure::UnresolvedOperand {
                                pattern: pattern.name,
                                element: element_index,
                                index,
                                reason: reason.0,
                            },
                        );
                    }
                }
            }

            consumed += 1;
            cursor = if backward {
                index.checked_sub(1)
            } else {
                Some(index + 1)
            };
        }

        let range = if backward {
            captures.reverse();
            names.reverse();
            anchor + 1 - consumed..anchor + 1
        } else {
            anchor..anchor + consumed
        };
        MatchResult {
            failure: None,
            captures,
            names,
            range,
        }
    }
}
