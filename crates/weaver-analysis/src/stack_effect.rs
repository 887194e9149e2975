//! Stack-effect oracle.
//!
//! Fixed opcodes answer from the opcode table. Call-like opcodes consult a
//! [`SignatureResolver`]; `ret` consults the enclosing routine's return type.

use weaver_ir::{Instruction, Operand, StackBehavior};

use crate::errors::{SliceError, SliceResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StackEffect {
    pub pops: usize,
    pub pushes: usize,
}

impl StackEffect {
    pub const fn new(pops: usize, pushes: usize) -> Self {
        StackEffect { pops, pushes }
    }

    /// `pushes - pops`.
    pub fn net(self) -> isize {
        self.pushes as isize - self.pops as isize
    }
}

/// What the stack needs to know about an invoked routine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallSignature {
    pub params: usize,
    pub has_this: bool,
    pub returns_value: bool,
}

pub trait SignatureResolver: Send + Sync {
    /// Signature invoked by a `call`, `callvirt`, `calli` or `newobj`.
    fn call_signature(&self, instruction: &Instruction) -> Option<CallSignature>;
}

/// Reads signatures straight from method and call-site operands.
#[derive(Clone, Copy, Debug, Default)]
pub struct OperandSignatures;

static OPERAND_SIGNATURES: OperandSignatures = OperandSignatures;

impl SignatureResolver for OperandSignatures {
    fn call_signature(&self, instruction: &Instruction) -> Option<CallSignature> {
        match &instruction.operand {
            Operand::Method(method) => Some(CallSignature {
                params: method.params.len(),
                has_this: method.has_this,
                returns_value: method.returns_value(),
            }),
            Operand::CallSite(sig) => Some(CallSignature {
                params: sig.params.len(),
                has_this: sig.has_this,
                returns_value: sig.return_type.is_some(),
            }),
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
pub struct StackEffectOracle<'a> {
    resolver: &'a dyn SignatureResolver,
    returns_value: bool,
}

impl<'a> StackEffectOracle<'a> {
    /// `returns_value` describes the routine owning the instructions.
    pub fn new(resolver: &'a dyn SignatureResolver, returns_value: bool) -> Self {
        StackEffectOracle {
            resolver,
            returns_value,
        }
    }

    pub fn returns_value(&self) -> bool {
        self.returns_value
    }

    /// Effect of the instruction at `index`; `index` is only used for errors.
    pub fn effect(&self, instruction: &Instruction, index: usize) -> SliceResult<StackEffect> {
        let signature = || {
            self.resolver
                .call_signature(instruction)
                .ok_or_else(|| SliceError::unresolved_signature(index, instruction))
        };
        let effect = match instruction.op.stack_behavior() {
            StackBehavior::Fixed { pops, pushes } => StackEffect::new(pops, pushes),
            StackBehavior::Call => {
                let sig = signature()?;
                StackEffect::new(
                    sig.params + usize::from(sig.has_this),
                    usize::from(sig.returns_value),
                )
            }
            // The function pointer is pushed last, on top of the arguments.
            StackBehavior::Indirect => {
                let sig = signature()?;
                StackEffect::new(
                    sig.params + usize::from(sig.has_this) + 1,
                    usize::from(sig.returns_value),
                )
            }
            StackBehavior::Construct => StackEffect::new(signature()?.params, 1),
            StackBehavior::Return => StackEffect::new(usize::from(self.returns_value), 0),
        };
        Ok(effect)
    }

    pub fn net_effect(&self, instruction: &Instruction, index: usize) -> SliceResult<isize> {
        self.effect(instruction, index).map(StackEffect::net)
    }

    /// Sum of net effects over a run of instructions.
    pub fn net_of<'i>(
        &self,
        instructions: impl IntoIterator<Item = &'i Instruction>,
    ) -> SliceResult<isize> {
        instructions
            .into_iter()
            .enumerate()
            .map(|(index, instruction)| self.net_effect(instruction, index))
            .sum()
    }
}

impl StackEffectOracle<'static> {
    /// Oracle resolving signatures from operands alone.
    pub fn from_operands(returns_value: bool) -> Self {
        StackEffectOracle::new(&OPERAND_SIGNATURES, returns_value)
    }
}

impl std::fmt::Debug for StackEffectOracle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackEffectOracle")
            .field("returns_value", &self.returns_value)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weaver_ir::{CallSiteSig, MethodRef, OpCode};

    fn oracle() -> StackEffectOracle<'static> {
        StackEffectOracle::from_operands(true)
    }

    #[test]
    fn instance_call_pops_receiver() {
        let call = Instruction::callvirt(
            MethodRef::new("Demo.Model", "Add")
                .instance()
                .params(["System.Int32", "System.Int32"])
                .returns("System.Int32"),
        );
        assert_eq!(oracle().effect(&call, 0).unwrap(), StackEffect::new(3, 1));
    }

    #[test]
    fn void_static_call_pushes_nothing() {
        let call = Instruction::call(MethodRef::new("Demo.Log", "Write").params(["System.String"]));
        assert_eq!(oracle().effect(&call, 0).unwrap(), StackEffect::new(1, 0));
    }

    #[test]
    fn indirect_call_counts_function_pointer() {
        let calli = Instruction::new(
            OpCode::Calli,
            Operand::CallSite(CallSiteSig {
                has_this: false,
                params: vec!["System.Int32".into()],
                return_type: Some("System.Int32".into()),
            }),
        );
        assert_eq!(oracle().effect(&calli, 0).unwrap(), StackEffect::new(2, 1));
    }

    #[test]
    fn constructor_pushes_new_object() {
        let newobj = Instruction::newobj(
            MethodRef::new("System.Func`2", ".ctor")
                .instance()
                .params(["System.Object", "System.IntPtr"]),
        );
        assert_eq!(oracle().effect(&newobj, 0).unwrap(), StackEffect::new(2, 1));
    }

    #[test]
    fn ret_depends_on_routine() {
        let ret = Instruction::ret();
        assert_eq!(oracle().net_effect(&ret, 0).unwrap(), -1);
        assert_eq!(
            StackEffectOracle::from_operands(false)
                .net_effect(&ret, 0)
                .unwrap(),
            0
        );
    }

    #[test]
    fn call_without_method_operand_is_unresolved() {
        let bogus = Instruction::simple(OpCode::Call);
        let err = oracle().effect(&bogus, 7).unwrap_err();
        assert_eq!(err.to_string(), "Cannot resolve call signature of `call` at 7");
    }
}
