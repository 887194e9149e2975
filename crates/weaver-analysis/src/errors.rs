//! Error types for stack-effect queries and slicing.

use derive_more::{Display, From};

pub type SliceResult<T> = Result<T, SliceError>;

#[derive(Clone, Display, Debug, From, PartialEq, Eq)]
#[display("{kind}")]
pub struct SliceError {
    #[from]
    kind: Box<SliceErrorKind>,
}

impl<E> From<E> for SliceError
where
    SliceErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        SliceError {
            kind: Box::new(SliceErrorKind::from(error)),
        }
    }
}

impl SliceError {
    pub fn target_out_of_range(target: usize, len: usize) -> Self {
        SliceErrorKind::TargetOutOfRange { target, len }.into()
    }

    pub fn unresolved_signature(index: usize, instruction: impl std::fmt::Display) -> Self {
        SliceErrorKind::UnresolvedSignature {
            index,
            instruction: instruction.to_string(),
        }
        .into()
    }

    pub fn kind(&self) -> &SliceErrorKind {
        &self.kind
    }
}

#[derive(Clone, Display, Debug, PartialEq, Eq)]
pub enum SliceErrorKind {
    #[display("Slice target {target} out of range for sequence of length {len}")]
    TargetOutOfRange { target: usize, len: usize },

    #[display("Cannot resolve call signature of `{instruction}` at {index}")]
    UnresolvedSignature { index: usize, instruction: String },
}

impl std::error::Error for SliceError {}
