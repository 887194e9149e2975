//! Read-only analyses over instruction sequences: stack effects, anchored
//! pattern matching and stack-dependency slicing.

pub mod errors;
pub mod matcher;
pub mod pattern;
pub mod slice;
pub mod stack_effect;

pub use errors::{SliceError, SliceErrorKind, SliceResult};
pub use matcher::{Capture, MatchFailure, MatchResult, Matcher};
pub use pattern::{
    ConventionInspector, Direction, MatchContext, NameExtractor, OperandInspector, Pattern,
    PatternElement, Predicate, UnresolvedOperand, predicates,
};
pub use slice::{Approximation, DependencyBlock, Slice, slice};
pub use stack_effect::{
    CallSignature, OperandSignatures, SignatureResolver, StackEffect, StackEffectOracle,
};
