//! Opcode classification table.
//!
//! Macro forms (`ldarg.0`, `ldarg.s`, `ldc.i4.1`, `br.s`, ...) are normalized to a
//! single opcode carrying an operand, so every opcode here is one closed category
//! for pattern and stack-effect rules.

use serde::{Deserialize, Serialize};

/// How an opcode affects the evaluation stack.
///
/// Only `Fixed` is fully known from the opcode alone; the other behaviors need
/// the invoked signature or the enclosing routine's return type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StackBehavior {
    /// Constant pop/push counts.
    Fixed { pops: usize, pushes: usize },
    /// `call` / `callvirt`: parameters, receiver and return from the callee.
    Call,
    /// `calli`: like [`StackBehavior::Call`] plus the function pointer on top.
    Indirect,
    /// `newobj`: pops the constructor parameters, pushes the new object.
    Construct,
    /// `ret`: pops one value when the routine returns one.
    Return,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OpCode {
    #[serde(rename = "nop")]
    Nop,
    #[serde(rename = "ldarg")]
    Ldarg,
    #[serde(rename = "ldarga")]
    Ldarga,
    #[serde(rename = "starg")]
    Starg,
    #[serde(rename = "ldloc")]
    Ldloc,
    #[serde(rename = "ldloca")]
    Ldloca,
    #[serde(rename = "stloc")]
    Stloc,
    #[serde(rename = "ldnull")]
    Ldnull,
    #[serde(rename = "ldc.i4")]
    LdcI4,
    #[serde(rename = "ldc.i8")]
    LdcI8,
    #[serde(rename = "ldc.r8")]
    LdcR8,
    #[serde(rename = "ldstr")]
    Ldstr,
    #[serde(rename = "ldfld")]
    Ldfld,
    #[serde(rename = "ldflda")]
    Ldflda,
    #[serde(rename = "ldsfld")]
    Ldsfld,
    #[serde(rename = "ldsflda")]
    Ldsflda,
    #[serde(rename = "stfld")]
    Stfld,
    #[serde(rename = "stsfld")]
    Stsfld,
    #[serde(rename = "ldftn")]
    Ldftn,
    #[serde(rename = "ldvirtftn")]
    Ldvirtftn,
    #[serde(rename = "dup")]
    Dup,
    #[serde(rename = "pop")]
    Pop,
    #[serde(rename = "call")]
    Call,
    #[serde(rename = "callvirt")]
    Callvirt,
    #[serde(rename = "calli")]
    Calli,
    #[serde(rename = "newobj")]
    Newobj,
    #[serde(rename = "box")]
    Box,
    #[serde(rename = "unbox.any")]
    UnboxAny,
    #[serde(rename = "castclass")]
    Castclass,
    #[serde(rename = "isinst")]
    Isinst,
    #[serde(rename = "initobj")]
    Initobj,
    #[serde(rename = "add")]
    Add,
    #[serde(rename = "sub")]
    Sub,
    #[serde(rename = "mul")]
    Mul,
    #[serde(rename = "ceq")]
    Ceq,
    #[serde(rename = "br")]
    Br,
    #[serde(rename = "brtrue")]
    Brtrue,
    #[serde(rename = "brfalse")]
    Brfalse,
    #[serde(rename = "ret")]
    Ret,
    #[serde(rename = "throw")]
    Throw,
}

impl OpCode {
    /// Textual mnemonic, identical to the serialized name.
    pub fn mnemonic(self) -> &'static str {
        use OpCode::*;
        match self {
            Nop => "nop",
            Ldarg => "ldarg",
            Ldarga => "ldarga",
            Starg => "starg",
            Ldloc => "ldloc",
            Ldloca => "ldloca",
            Stloc => "stloc",
            Ldnull => "ldnull",
            LdcI4 => "ldc.i4",
            LdcI8 => "ldc.i8",
            LdcR8 => "ldc.r8",
            Ldstr => "ldstr",
            Ldfld => "ldfld",
            Ldflda => "ldflda",
            Ldsfld => "ldsfld",
            Ldsflda => "ldsflda",
            Stfld => "stfld",
            Stsfld => "stsfld",
            Ldftn => "ldftn",
            Ldvirtftn => "ldvirtftn",
            Dup => "dup",
            Pop => "pop",
            Call => "call",
            Callvirt => "callvirt",
            Calli => "calli",
            Newobj => "newobj",
            Box => "box",
            UnboxAny => "unbox.any",
            Castclass => "castclass",
            Isinst => "isinst",
            Initobj => "initobj",
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Ceq => "ceq",
            Br => "br",
            Brtrue => "brtrue",
            Brfalse => "brfalse",
            Ret => "ret",
            Throw => "throw",
        }
    }

    pub fn stack_behavior(self) -> StackBehavior {
        use OpCode::*;
        let fixed = |pops, pushes| StackBehavior::Fixed { pops, pushes };
        match self {
            Nop | Br => fixed(0, 0),
            Ldarg | Ldarga | Ldloc | Ldloca | Ldnull | LdcI4 | LdcI8 | LdcR8 | Ldstr | Ldsfld
            | Ldsflda | Ldftn => fixed(0, 1),
            Starg | Stloc | Stsfld | Pop | Initobj | Brtrue | Brfalse | Throw => fixed(1, 0),
            Ldfld | Ldflda | Ldvirtftn | Box | UnboxAny | Castclass | Isinst => fixed(1, 1),
            Stfld => fixed(2, 0),
            Dup => fixed(1, 2),
            Add | Sub | Mul | Ceq => fixed(2, 1),
            Call | Callvirt => StackBehavior::Call,
            Calli => StackBehavior::Indirect,
            Newobj => StackBehavior::Construct,
            Ret => StackBehavior::Return,
        }
    }

    /// Call-family opcodes whose effect depends on the invoked signature.
    pub fn is_call(self) -> bool {
        matches!(self, OpCode::Call | OpCode::Callvirt | OpCode::Calli)
    }

    /// Opcodes whose operand is a branch target.
    pub fn is_branch(self) -> bool {
        matches!(self, OpCode::Br | OpCode::Brtrue | OpCode::Brfalse)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Opcode groups shared by pattern tables.
pub mod groups {
    use super::OpCode;

    pub const CALLS: &[OpCode] = &[OpCode::Call, OpCode::Callvirt, OpCode::Calli];
    pub const DIRECT_CALLS: &[OpCode] = &[OpCode::Call, OpCode::Callvirt];
    pub const LOAD_ARGUMENTS: &[OpCode] = &[OpCode::Ldarg, OpCode::Ldarga];
}
