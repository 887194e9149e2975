//! Error types for sequence mutation.

use derive_more::{Display, From};

pub type SequenceResult<T> = Result<T, SequenceError>;

#[derive(Clone, Display, Debug, From, PartialEq, Eq)]
#[display("{kind}")]
pub struct SequenceError {
    #[from]
    kind: Box<SequenceErrorKind>,
}

impl<E> From<E> for SequenceError
where
    SequenceErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        SequenceError {
            kind: Box::new(SequenceErrorKind::from(error)),
        }
    }
}

impl SequenceError {
    pub fn out_of_bounds(start: usize, count: usize, len: usize) -> Self {
        SequenceErrorKind::OutOfBounds { start, count, len }.into()
    }

    pub fn dangling_branch(branch: usize, target: usize) -> Self {
        SequenceErrorKind::DanglingBranch { branch, target }.into()
    }

    pub fn kind(&self) -> &SequenceErrorKind {
        &self.kind
    }
}

#[derive(Clone, Display, Debug, PartialEq, Eq)]
pub enum SequenceErrorKind {
    #[display("Range {start}..{start}+{count} out of bounds for sequence of length {len}")]
    OutOfBounds {
        start: usize,
        count: usize,
        len: usize,
    },

    #[display("Branch at {branch} targets removed instruction {target}")]
    DanglingBranch { branch: usize, target: usize },
}

impl std::error::Error for SequenceError {}
