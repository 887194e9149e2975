//! Error types for edit planning and application.

use derive_more::{Display, From};
use weaver_analysis::SliceError;
use weaver_ir::SequenceError;

pub type EditResult<T> = Result<T, EditError>;

#[derive(Clone, Display, Debug, From, PartialEq, Eq)]
#[display("{kind}")]
pub struct EditError {
    #[from]
    kind: Box<EditErrorKind>,
}

impl<E> From<E> for EditError
where
    EditErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        EditError {
            kind: Box::new(EditErrorKind::from(error)),
        }
    }
}

impl EditError {
    pub fn stack_imbalance(declared: isize, actual: isize) -> Self {
        EditErrorKind::StackImbalance { declared, actual }.into()
    }

    pub fn unregistered_storage(declared: isize) -> Self {
        EditErrorKind::UnregisteredStorage { declared }.into()
    }

    pub fn non_contiguous(gap: usize) -> Self {
        EditErrorKind::NonContiguous { gap }.into()
    }

    pub fn stale(at: usize) -> Self {
        EditErrorKind::Stale { at }.into()
    }

    pub fn out_of_bounds(start: usize, count: usize, len: usize) -> Self {
        EditErrorKind::OutOfBounds { start, count, len }.into()
    }

    pub fn overlap(at: usize) -> Self {
        EditErrorKind::Overlap { at }.into()
    }

    pub fn unmatched(reason: impl std::fmt::Display) -> Self {
        EditErrorKind::Unmatched(reason.to_string()).into()
    }

    pub fn unknown_operand(block: usize, path: &[usize]) -> Self {
        EditErrorKind::UnknownOperand {
            block,
            path: format!("{path:?}"),
        }
        .into()
    }

    pub fn unknown_capture(n: usize) -> Self {
        EditErrorKind::UnknownCapture(n).into()
    }

    pub fn unknown_name(n: usize) -> Self {
        EditErrorKind::UnknownName(n).into()
    }

    pub fn kind(&self) -> &EditErrorKind {
        &self.kind
    }

    /// Errors that invalidate the whole routine rather than one call site.
    pub fn is_fatal(&self) -> bool {
        matches!(*self.kind, EditErrorKind::StackImbalance { .. })
    }
}

#[derive(Clone, Display, Debug, PartialEq, Eq)]
pub enum EditErrorKind {
    #[display("Stack imbalance: template declares {declared:+}, replacement changes depth by {actual:+}")]
    StackImbalance { declared: isize, actual: isize },

    #[display("Template changes stack depth by {declared:+} without registering storage")]
    UnregisteredStorage { declared: isize },

    #[display("Deletion set is not contiguous: index {gap} is missing")]
    NonContiguous { gap: usize },

    #[display("Stale edit at {at}: sequence content changed since planning")]
    Stale { at: usize },

    #[display("Edit range {start}..{start}+{count} out of bounds for sequence of length {len}")]
    OutOfBounds {
        start: usize,
        count: usize,
        len: usize,
    },

    #[display("Overlapping edits at {at}")]
    Overlap { at: usize },

    #[display("Cannot plan from a failed match: {_0}")]
    Unmatched(String),

    #[display("Template operand {path} of block {block} does not exist")]
    UnknownOperand { block: usize, path: String },

    #[display("Template refers to missing capture {_0}")]
    UnknownCapture(usize),

    #[display("Template refers to missing name {_0}")]
    UnknownName(usize),

    #[display("Sequence error: {_0}")]
    Sequence(SequenceError),

    #[display("Stack effect error: {_0}")]
    StackEffect(SliceError),
}

impl From<SequenceError> for EditErrorKind {
    fn from(error: SequenceError) -> Self {
        EditErrorKind::Sequence(error)
    }
}

impl From<SliceError> for EditErrorKind {
    fn from(error: SliceError) -> Self {
        EditErrorKind::StackEffect(error)
    }
}

impl std::error::Error for EditError {}
