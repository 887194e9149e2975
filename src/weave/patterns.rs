//! Instruction shapes emitted by the C# compiler around placeholder calls.

use std::sync::LazyLock;

use weaver_analysis::{
    MatchContext, Matcher, Pattern, PatternElement, UnresolvedOperand, predicates,
};
use weaver_ir::opcode::groups;
use weaver_ir::{Instruction, OpCode};

/// `Prop = source.ToFodyProperty(..)`: the placeholder result goes straight into
/// a property setter.
pub static ASSIGNMENT: LazyLock<Pattern> = LazyLock::new(|| {
    Pattern::forward(
        "assignment",
        [
            PatternElement::new(&[OpCode::Call]).capture(),
            PatternElement::new(groups::DIRECT_CALLS)
                .when(is_setter_call)
                .capture()
                .named(predicates::accessor_name),
        ],
    )
});

/// The placeholder call on its own, once its operands are straight-line code.
pub static PLACEHOLDER_CALL: LazyLock<Pattern> = LazyLock::new(|| {
    Pattern::forward("placeholder-call", [PatternElement::new(&[OpCode::Call]).capture()])
});

/// Lazily initialized delegate cache for a non-capturing lambda:
///
/// ```text
/// ldsfld  <>9__0_0      ; cache
/// dup
/// brtrue  L
/// pop
/// ldsfld  <>9           ; closure singleton
/// ldftn   <ctor>b__0_0  ; the lambda
/// newobj  Func`2::.ctor
/// dup
/// stsfld  <>9__0_0
/// L:
/// ```
///
/// Anchored at the final `stsfld`. Captures the cache load, the branch and the
/// cache store; names the property the lambda reads.
pub static CACHED_DELEGATE: LazyLock<Pattern> = LazyLock::new(|| {
    Pattern::backward(
        "cached-delegate",
        [
            PatternElement::new(&[OpCode::Ldsfld]).when(is_func_field).capture(),
            PatternElement::new(&[OpCode::Dup]),
            PatternElement::new(&[OpCode::Brtrue]).capture(),
            PatternElement::new(&[OpCode::Pop]),
            PatternElement::new(&[OpCode::Ldsfld]),
            PatternElement::new(&[OpCode::Ldftn]).named(lambda_property_name),
            PatternElement::new(&[OpCode::Newobj]),
            PatternElement::new(&[OpCode::Dup]),
            PatternElement::new(&[OpCode::Stsfld]).when(is_func_field).capture(),
        ],
    )
});

/// Body of `x => x.Prop`, with the debug-build spill through a local.
pub static LAMBDA_GETTER: LazyLock<Pattern> = LazyLock::new(|| {
    Pattern::forward(
        "lambda-getter",
        [
            PatternElement::new(groups::LOAD_ARGUMENTS),
            PatternElement::new(groups::CALLS)
                .when(predicates::is_property_getter)
                .named(predicates::accessor_name),
            PatternElement::new(&[OpCode::Box]).optional(),
            PatternElement::new(&[OpCode::Stloc]).optional(),
            PatternElement::new(&[OpCode::Br]).optional(),
            PatternElement::new(&[OpCode::Ldloc]).optional(),
            PatternElement::new(&[OpCode::Ret]),
        ],
    )
});

/// Compiler-generated getter of an auto property.
pub static AUTO_GETTER: LazyLock<Pattern> = LazyLock::new(|| {
    Pattern::forward(
        "auto-getter",
        [
            PatternElement::new(&[OpCode::Ldarg]).when(predicates::is_this),
            PatternElement::new(&[OpCode::Ldfld]).capture(),
            PatternElement::new(&[OpCode::Stloc]).optional(),
            PatternElement::new(&[OpCode::Br]).optional(),
            PatternElement::new(&[OpCode::Ldloc]).optional(),
            PatternElement::new(&[OpCode::Ret]),
        ],
    )
});

fn is_setter_call(instruction: &Instruction, _cx: &MatchContext<'_>) -> bool {
    instruction.operand.as_method().is_some_and(|method| {
        method.has_this
            && method.name.starts_with("set_")
            && method.params.len() == 1
            && !method.returns_value()
    })
}

/// A static field holding a `System.Func`2`.
fn is_func_field(instruction: &Instruction, _cx: &MatchContext<'_>) -> bool {
    instruction.operand.as_field().is_some_and(|field| {
        field.is_static
            && field.field_type.simple_name() == "Func`2"
            && field.field_type.namespace() == "System"
    })
}

/// Property read by the lambda whose address `ldftn` loads.
fn lambda_property_name(
    instruction: &Instruction,
    cx: &MatchContext<'_>,
) -> Result<String, UnresolvedOperand> {
    let lambda = instruction
        .operand
        .as_method()
        .ok_or_else(|| UnresolvedOperand::new(format!("`{instruction}` has no method operand")))?;
    let body = cx
        .inspector
        .method_body(lambda)
        .ok_or_else(|| UnresolvedOperand::new(format!("body of `{lambda}` is not available")))?;

    let result = Matcher::new(cx.inspector).match_at(body, 0, &LAMBDA_GETTER);
    if let Some(failure) = result.failure {
        return Err(UnresolvedOperand::new(format!(
            "`{lambda}` is not a property selector: {failure}"
        )));
    }
    if result.range.end != body.len() {
        return Err(UnresolvedOperand::new(format!(
            "`{lambda}` does more than read a property"
        )));
    }
    result
        .names
        .into_iter()
        .next()
        .ok_or_else(|| UnresolvedOperand::new(format!("`{lambda}` reads no property")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weaver_analysis::ConventionInspector;
    use weaver_ir::{FieldRef, InstructionSequence, MethodRef};

    #[test]
    fn auto_getter_with_debug_spill() {
        let body = InstructionSequence::from(vec![
            Instruction::ldarg(0),
            Instruction::ldfld(FieldRef::new("Demo.Model", "<Total>k__BackingField", "System.Int32")),
            Instruction::stloc(0),
            Instruction::branch(OpCode::Br, 4),
            Instruction::ldloc(0),
            Instruction::ret(),
        ]);
        let result = Matcher::new(&ConventionInspector).match_at(&body, 0, &AUTO_GETTER);
        assert!(result.is_match());
        assert_eq!(result.range, 0..6);
        assert_eq!(result.captures[0].index, 1);
    }

    #[test]
    fn setter_call_predicate() {
        let seq = InstructionSequence::from(vec![
            Instruction::call(MethodRef::new("Demo.Model", "set_Total").instance().params(["System.Int32"])),
            Instruction::call(MethodRef::new("Demo.Model", "set_Total").params(["System.Int32"])),
        ]);
        let cx = |index| MatchContext {
            sequence: &seq,
            index,
            inspector: &ConventionInspector,
        };
        assert!(is_setter_call(&seq[0], &cx(0)));
        assert!(!is_setter_call(&seq[1], &cx(1)));
    }
}
