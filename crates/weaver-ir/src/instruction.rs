//! Instructions and their operand handles.
//!
//! Operand references (fields, methods, types) carry names and signature text
//! only. What they *mean* is answered by the host through the analysis traits.

use serde::{Deserialize, Serialize};

use crate::opcode::OpCode;

/// A type named by its full name, e.g. `System.Int32` or
/// ``ReactiveUI.ObservableAsPropertyHelper`1<System.Int32>``.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        TypeRef(name.into())
    }

    /// Instantiate a generic type definition with the given arguments.
    pub fn instantiate(&self, args: &[TypeRef]) -> TypeRef {
        let args: Vec<&str> = args.iter().map(|a| a.0.as_str()).collect();
        TypeRef(format!("{}<{}>", self.0, args.join(",")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without namespace or generic arguments (`Func`2` for `System.Func`2<A,B>`).
    pub fn simple_name(&self) -> &str {
        let base = self.0.split('<').next().unwrap_or(&self.0);
        base.rsplit('.').next().unwrap_or(base)
    }

    /// Namespace part of the name, empty for the global namespace.
    pub fn namespace(&self) -> &str {
        let base = self.0.split('<').next().unwrap_or(&self.0);
        base.rsplit_once('.').map(|(ns, _)| ns).unwrap_or("")
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef(name.to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub declaring_type: TypeRef,
    pub name: String,
    pub field_type: TypeRef,
    #[serde(default)]
    pub is_static: bool,
}

impl FieldRef {
    pub fn new(
        declaring_type: impl Into<TypeRef>,
        name: impl Into<String>,
        field_type: impl Into<TypeRef>,
    ) -> Self {
        FieldRef {
            declaring_type: declaring_type.into(),
            name: name.into(),
            field_type: field_type.into(),
            is_static: false,
        }
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub declaring_type: TypeRef,
    pub name: String,
    /// Instance method (the receiver occupies an extra stack slot).
    #[serde(default)]
    pub has_this: bool,
    #[serde(default)]
    pub params: Vec<TypeRef>,
    /// `None` for `void`.
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    #[serde(default)]
    pub generic_args: Vec<TypeRef>,
}

impl MethodRef {
    /// A static `void` method without parameters; refine with the builder methods.
    pub fn new(declaring_type: impl Into<TypeRef>, name: impl Into<String>) -> Self {
        MethodRef {
            declaring_type: declaring_type.into(),
            name: name.into(),
            has_this: false,
            params: Vec::new(),
            return_type: None,
            generic_args: Vec::new(),
        }
    }

    pub fn instance(mut self) -> Self {
        self.has_this = true;
        self
    }

    pub fn params<I, T>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeRef>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn returns(mut self, ty: impl Into<TypeRef>) -> Self {
        self.return_type = Some(ty.into());
        self
    }

    pub fn generic<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeRef>,
    {
        self.generic_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn returns_value(&self) -> bool {
        self.return_type.is_some()
    }

    /// Property name encoded in an accessor name (`get_Foo` / `set_Foo` → `Foo`).
    pub fn accessor_property_name(&self) -> Option<&str> {
        self.name
            .strip_prefix("get_")
            .or_else(|| self.name.strip_prefix("set_"))
            .filter(|name| !name.is_empty())
    }
}

impl std::fmt::Display for MethodRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// Stand-alone signature of an indirect call site.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSiteSig {
    #[serde(default)]
    pub has_this: bool,
    #[serde(default)]
    pub params: Vec<TypeRef>,
    #[serde(default)]
    pub return_type: Option<TypeRef>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    #[default]
    None,
    Int(i64),
    /// IEEE-754 bit pattern, so operands stay `Eq + Hash`.
    Float(u64),
    String(String),
    Argument(u16),
    Local(u16),
    Field(FieldRef),
    Method(MethodRef),
    Type(TypeRef),
    CallSite(CallSiteSig),
    /// Index of the branch target within the owning sequence.
    Target(usize),
}

impl Operand {
    pub fn float(value: f64) -> Self {
        Operand::Float(value.to_bits())
    }

    pub fn as_field(&self) -> Option<&FieldRef> {
        match self {
            Operand::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodRef> {
        match self {
            Operand::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn as_argument(&self) -> Option<u16> {
        match self {
            Operand::Argument(index) => Some(*index),
            _ => None,
        }
    }

    pub fn as_target(&self) -> Option<usize> {
        match self {
            Operand::Target(target) => Some(*target),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub op: OpCode,
    #[serde(default, skip_serializing_if = "is_none")]
    pub operand: Operand,
}

fn is_none(operand: &Operand) -> bool {
    matches!(operand, Operand::None)
}

impl Instruction {
    pub fn new(op: OpCode, operand: Operand) -> Self {
        Instruction { op, operand }
    }

    /// An instruction without operand.
    pub fn simple(op: OpCode) -> Self {
        Instruction {
            op,
            operand: Operand::None,
        }
    }

    pub fn ldarg(index: u16) -> Self {
        Self::new(OpCode::Ldarg, Operand::Argument(index))
    }

    pub fn ldloc(index: u16) -> Self {
        Self::new(OpCode::Ldloc, Operand::Local(index))
    }

    pub fn stloc(index: u16) -> Self {
        Self::new(OpCode::Stloc, Operand::Local(index))
    }

    pub fn ldc_i4(value: i32) -> Self {
        Self::new(OpCode::LdcI4, Operand::Int(value.into()))
    }

    pub fn ldc_r8(value: f64) -> Self {
        Self::new(OpCode::LdcR8, Operand::float(value))
    }

    pub fn ldstr(value: impl Into<String>) -> Self {
        Self::new(OpCode::Ldstr, Operand::String(value.into()))
    }

    pub fn ldnull() -> Self {
        Self::simple(OpCode::Ldnull)
    }

    pub fn ldfld(field: FieldRef) -> Self {
        Self::new(OpCode::Ldfld, Operand::Field(field))
    }

    pub fn ldsfld(field: FieldRef) -> Self {
        Self::new(OpCode::Ldsfld, Operand::Field(field))
    }

    pub fn stfld(field: FieldRef) -> Self {
        Self::new(OpCode::Stfld, Operand::Field(field))
    }

    pub fn stsfld(field: FieldRef) -> Self {
        Self::new(OpCode::Stsfld, Operand::Field(field))
    }

    pub fn call(method: MethodRef) -> Self {
        Self::new(OpCode::Call, Operand::Method(method))
    }

    pub fn callvirt(method: MethodRef) -> Self {
        Self::new(OpCode::Callvirt, Operand::Method(method))
    }

    pub fn newobj(ctor: MethodRef) -> Self {
        Self::new(OpCode::Newobj, Operand::Method(ctor))
    }

    pub fn ldftn(method: MethodRef) -> Self {
        Self::new(OpCode::Ldftn, Operand::Method(method))
    }

    pub fn box_(ty: impl Into<TypeRef>) -> Self {
        Self::new(OpCode::Box, Operand::Type(ty.into()))
    }

    pub fn branch(op: OpCode, target: usize) -> Self {
        debug_assert!(op.is_branch(), "{op} is not a branch");
        Self::new(op, Operand::Target(target))
    }

    pub fn ret() -> Self {
        Self::simple(OpCode::Ret)
    }

    /// `true` when this is `ldarg` of the given argument slot.
    pub fn loads_argument(&self, index: u16) -> bool {
        self.op == OpCode::Ldarg && self.operand.as_argument() == Some(index)
    }

    /// Branch target, if this is a branch.
    pub fn target(&self) -> Option<usize> {
        if self.op.is_branch() {
            self.operand.as_target()
        } else {
            None
        }
    }
}
