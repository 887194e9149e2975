//! Textual listing of instructions.

use std::fmt::{self, Display, Formatter, Write};

use crate::instruction::{CallSiteSig, Instruction, Operand};
use crate::sequence::InstructionSequence;

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Int(value) => write!(f, "{value}"),
            Operand::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Operand::String(value) => write!(f, "{value:?}"),
            Operand::Argument(index) | Operand::Local(index) => write!(f, "{index}"),
            Operand::Field(field) => write!(f, "{field}"),
            Operand::Method(method) => write!(f, "{method}"),
            Operand::Type(ty) => write!(f, "{ty}"),
            Operand::CallSite(sig) => write!(f, "{sig}"),
            Operand::Target(target) => write!(f, "{target:04}"),
        }
    }
}

impl Display for CallSiteSig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.has_this {
            f.write_str("instance ")?;
        }
        match &self.return_type {
            Some(ty) => write!(f, "{ty}")?,
            None => f.write_str("void")?,
        }
        f.write_char('(')?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write!(f, "{param}")?;
        }
        f.write_char(')')
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        if !matches!(self.operand, Operand::None) {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}

/// One line per instruction, prefixed with its index: `0003: call T::M`.
pub fn listing(sequence: &InstructionSequence) -> String {
    let mut out = String::new();
    for (index, instruction) in sequence.iter().enumerate() {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{index:04}: {instruction}");
    }
    out
}

impl Display for InstructionSequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&listing(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{FieldRef, MethodRef};
    use crate::opcode::OpCode;
    use insta::assert_snapshot;

    #[test]
    fn listing_shows_operands() {
        let seq = InstructionSequence::from(vec![
            Instruction::ldarg(0),
            Instruction::ldstr("Foo"),
            Instruction::call(MethodRef::new("Demo.Model", "get_Foo").instance()),
            Instruction::branch(OpCode::Brfalse, 5),
            Instruction::stfld(FieldRef::new("Demo.Model", "$Foo", "System.Int32")),
            Instruction::ret(),
        ]);
        assert_snapshot!(listing(&seq), @r#"
        0000: ldarg 0
        0001: ldstr "Foo"
        0002: call Demo.Model::get_Foo
        0003: brfalse 0005
        0004: stfld Demo.Model::$Foo
        0005: ret
        "#);
    }
}
