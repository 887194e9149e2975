//! Instruction model for compiled method bodies.
//!
//! An [`InstructionSequence`] owns the instructions of one routine. Opcodes are a
//! closed set with macro forms already folded into operands.

pub mod errors;
pub mod instruction;
pub mod opcode;
pub mod printer;
pub mod sequence;

pub use errors::{SequenceError, SequenceErrorKind, SequenceResult};
pub use instruction::{CallSiteSig, FieldRef, Instruction, MethodRef, Operand, TypeRef};
pub use opcode::{OpCode, StackBehavior};
pub use printer::listing;
pub use sequence::InstructionSequence;
