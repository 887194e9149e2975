//! Declarative instruction patterns.
//!
//! A [`Pattern`] is an ordered list of [`PatternElement`]s, always declared in
//! program order. Patterns are stateless and meant to live in `LazyLock` tables.

use derive_more::Display;
use weaver_ir::{FieldRef, Instruction, InstructionSequence, MethodRef, OpCode};

/// Host queries about operands that the instruction text alone cannot answer.
pub trait OperandInspector: Send + Sync {
    /// Does `method` name a property getter?
    fn is_property_getter(&self, method: &MethodRef) -> bool;

    /// Property an accessor belongs to.
    fn property_name(&self, method: &MethodRef) -> Option<String>;

    /// Do both references denote the same storage cell?
    fn same_storage(&self, a: &FieldRef, b: &FieldRef) -> bool {
        a.declaring_type == b.declaring_type && a.name == b.name
    }

    /// Body of a routine defined in the module being woven.
    fn method_body(&self, _method: &MethodRef) -> Option<&InstructionSequence> {
        None
    }
}

/// Inspector relying on accessor naming conventions only.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConventionInspector;

impl OperandInspector for ConventionInspector {
    fn is_property_getter(&self, method: &MethodRef) -> bool {
        method.name.starts_with("get_") && method.params.is_empty() && method.returns_value()
    }

    fn property_name(&self, method: &MethodRef) -> Option<String> {
        method.accessor_property_name().map(str::to_owned)
    }
}

/// What a predicate or name extractor sees besides the instruction itself.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    pub sequence: &'a InstructionSequence,
    pub index: usize,
    pub inspector: &'a dyn OperandInspector,
}

/// An extractor could not interpret the operand it was given.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
#[display("{_0}")]
pub struct UnresolvedOperand(pub String);

impl UnresolvedOperand {
    pub fn new(reason: impl Into<String>) -> Self {
        UnresolvedOperand(reason.into())
    }
}

pub type Predicate = fn(&Instruction, &MatchContext<'_>) -> bool;
pub type NameExtractor = fn(&Instruction, &MatchContext<'_>) -> Result<String, UnresolvedOperand>;

#[derive(Clone, Copy)]
pub struct PatternElement {
    pub opcodes: &'static [OpCode],
    pub predicate: Option<Predicate>,
    pub optional: bool,
    pub capture: bool,
    pub name: Option<NameExtractor>,
}

impl PatternElement {
    /// Required, non-capturing element accepting any of `opcodes`.
    pub const fn new(opcodes: &'static [OpCode]) -> Self {
        PatternElement {
            opcodes,
            predicate: None,
            optional: false,
            capture: false,
            name: None,
        }
    }

    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub const fn when(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub const fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    pub const fn named(mut self, extractor: NameExtractor) -> Self {
        self.name = Some(extractor);
        self
    }

    pub fn accepts(&self, instruction: &Instruction, cx: &MatchContext<'_>) -> bool {
        self.opcodes.contains(&instruction.op)
            && self.predicate.is_none_or(|predicate| predicate(instruction, cx))
    }
}

impl std::fmt::Debug for PatternElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternElement")
            .field("opcodes", &self.opcodes)
            .field("refined", &self.predicate.is_some())
            .field("optional", &self.optional)
            .field("capture", &self.capture)
            .field("named", &self.name.is_some())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From the anchor towards later instructions.
    Forward,
    /// From the anchor towards earlier instructions; the anchor is the last element.
    Backward,
}

#[derive(Clone, Debug)]
pub struct Pattern {
    pub name: &'static str,
    pub direction: Direction,
    pub elements: Vec<PatternElement>,
}

impl Pattern {
    pub fn forward(name: &'static str, elements: impl Into<Vec<PatternElement>>) -> Self {
        Pattern {
            name,
            direction: Direction::Forward,
            elements: elements.into(),
        }
    }

    pub fn backward(name: &'static str, elements: impl Into<Vec<PatternElement>>) -> Self {
        Pattern {
            name,
            direction: Direction::Backward,
            elements: elements.into(),
        }
    }

    /// Number of elements that must be present.
    pub fn required_len(&self) -> usize {
        self.elements.iter().filter(|e| !e.optional).count()
    }
}

/// Common predicates and extractors for pattern tables.
pub mod predicates {
    use weaver_ir::{Instruction, Operand};

    use super::{MatchContext, UnresolvedOperand};

    /// `ldarg 0`, the receiver of an instance routine.
    pub fn is_this(instruction: &Instruction, _cx: &MatchContext<'_>) -> bool {
        instruction.loads_argument(0)
    }

    pub fn is_property_getter(instruction: &Instruction, cx: &MatchContext<'_>) -> bool {
        instruction
            .operand
            .as_method()
            .is_some_and(|method| cx.inspector.is_property_getter(method))
    }

    /// Name of the property whose accessor is invoked.
    pub fn accessor_name(
        instruction: &Instruction,
        cx: &MatchContext<'_>,
    ) -> Result<String, UnresolvedOperand> {
        let method = instruction
            .operand
            .as_method()
            .ok_or_else(|| UnresolvedOperand::new(format!("`{instruction}` has no method operand")))?;
        cx.inspector
            .property_name(method)
            .ok_or_else(|| UnresolvedOperand::new(format!("`{method}` is not a property accessor")))
    }

    /// Name of the field a field instruction touches.
    pub fn field_name(
        instruction: &Instruction,
        _cx: &MatchContext<'_>,
    ) -> Result<String, UnresolvedOperand> {
        match &instruction.operand {
            Operand::Field(field) => Ok(field.name.clone()),
            _ => Err(UnresolvedOperand::new(format!(
                "`{instruction}` has no field operand"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convention_inspector_reads_accessor_names() {
        let getter = MethodRef::new("Demo.Model", "get_Foo")
            .instance()
            .returns("System.Int32");
        assert!(ConventionInspector.is_property_getter(&getter));
        assert_eq!(ConventionInspector.property_name(&getter).as_deref(), Some("Foo"));

        let setter = MethodRef::new("Demo.Model", "set_Foo")
            .instance()
            .params(["System.Int32"]);
        assert!(!ConventionInspector.is_property_getter(&setter));
    }

    #[test]
    fn same_storage_ignores_field_type_spelling() {
        let a = FieldRef::new("Demo.Model", "cache", "System.Func`2<A,B>");
        let b = FieldRef::new("Demo.Model", "cache", "System.Func`2");
        let c = FieldRef::new("Demo.Other", "cache", "System.Func`2<A,B>");
        assert!(ConventionInspector.same_storage(&a, &b));
        assert!(!ConventionInspector.same_storage(&a, &c));
    }

    #[test]
    fn element_accepts_opcode_and_predicate() {
        let seq = InstructionSequence::from(vec![Instruction::ldarg(0), Instruction::ldarg(1)]);
        let element = PatternElement::new(&[OpCode::Ldarg]).when(predicates::is_this);
        let cx = |index| MatchContext {
            sequence: &seq,
            index,
            inspector: &ConventionInspector,
        };
        assert!(element.accepts(&seq[0], &cx(0)));
        assert!(!element.accepts(&seq[1], &cx(1)));
        assert!(!PatternElement::new(&[OpCode::Ret]).accepts(&seq[0], &cx(0)));
    }
}
