//! Module fixtures shaped like the C# compiler's output for a small view model.

#![allow(dead_code)]

use oaph_weaver::{FieldDef, MethodDef, ModuleDef, PropertyDef, TypeDef};
use weaver_ir::{FieldRef, Instruction, InstructionSequence, MethodRef, OpCode, TypeRef};

pub const MODEL: &str = "Demo.Model";
pub const CLOSURE: &str = "Demo.Model/<>c";
pub const PLACEHOLDER_TYPE: &str = "ReactiveUI.Fody.Helpers.ObservableAsPropertyExtensions";
pub const SCHEDULER: &str = "System.Reactive.Concurrency.IScheduler";

fn observable(value: &str) -> TypeRef {
    TypeRef::new(format!("System.IObservable`1<{value}>"))
}

fn selector_type(owner: &str, value: &str) -> TypeRef {
    TypeRef::new(format!("System.Func`2<{owner},{value}>"))
}

/// `ToFodyProperty<TRet>(IObservable<TRet>, bool, IScheduler)`.
pub fn assignment_placeholder(value: &str) -> MethodRef {
    MethodRef::new(PLACEHOLDER_TYPE, "ToFodyProperty")
        .params([
            observable(value),
            TypeRef::new("System.Boolean"),
            TypeRef::new(SCHEDULER),
        ])
        .returns(value)
        .generic([value])
}

/// `ToFodyProperty<TObj, TRet>(IObservable<TRet>, TObj, Func<TObj, TRet>, bool, IScheduler)`.
pub fn selector_placeholder(owner: &str, value: &str) -> MethodRef {
    MethodRef::new(PLACEHOLDER_TYPE, "ToFodyProperty")
        .params([
            observable(value),
            TypeRef::new(owner),
            selector_type(owner, value),
            TypeRef::new("System.Boolean"),
            TypeRef::new(SCHEDULER),
        ])
        .generic([owner, value])
}

pub fn setter(owner: &str, property: &str, value: &str) -> MethodRef {
    MethodRef::new(owner, format!("set_{property}"))
        .instance()
        .params([value])
}

pub fn getter(owner: &str, property: &str, value: &str) -> MethodRef {
    MethodRef::new(owner, format!("get_{property}"))
        .instance()
        .returns(value)
}

pub fn backing_field(owner: &str, property: &str, value: &str) -> FieldRef {
    FieldRef::new(owner, format!("<{property}>k__BackingField"), value)
}

pub fn cache_field(value: &str) -> FieldRef {
    FieldRef::new(CLOSURE, "<>9__0_0", selector_type(MODEL, value)).with_static(true)
}

pub fn lambda() -> MethodRef {
    MethodRef::new(CLOSURE, "<.ctor>b__0_0")
        .instance()
        .params([MODEL])
        .returns("System.String")
}

fn base_ctor_call() -> [Instruction; 2] {
    [
        Instruction::ldarg(0),
        Instruction::call(MethodRef::new("ReactiveUI.ReactiveObject", ".ctor").instance()),
    ]
}

/// `this.Total = totals.ToFodyProperty(false, null)` at index 2.
pub fn assignment_statement() -> Vec<Instruction> {
    vec![
        Instruction::ldarg(0),
        Instruction::ldarg(1),
        Instruction::ldc_i4(0),
        Instruction::ldnull(),
        Instruction::call(assignment_placeholder("System.Int32")),
        Instruction::call(setter(MODEL, "Total", "System.Int32")),
    ]
}

/// Lazily cached `x => x.Name` delegate starting at `at`.
pub fn cached_selector(at: usize) -> Vec<Instruction> {
    let cache = cache_field("System.String");
    vec![
        Instruction::ldsfld(cache.clone()),
        Instruction::simple(OpCode::Dup),
        Instruction::branch(OpCode::Brtrue, at + 9),
        Instruction::simple(OpCode::Pop),
        Instruction::ldsfld(FieldRef::new(CLOSURE, "<>9", CLOSURE).with_static(true)),
        Instruction::ldftn(lambda()),
        Instruction::newobj(
            MethodRef::new(selector_type(MODEL, "System.String"), ".ctor")
                .instance()
                .params(["System.Object", "System.IntPtr"]),
        ),
        Instruction::simple(OpCode::Dup),
        Instruction::stsfld(cache),
    ]
}

/// `names.ToFodyProperty(this, x => x.Name, true, null)`, starting at `at`.
pub fn selector_statement(at: usize) -> Vec<Instruction> {
    let mut statement = vec![Instruction::ldarg(2), Instruction::ldarg(0)];
    statement.extend(cached_selector(at + 2));
    statement.extend([
        Instruction::ldc_i4(1),
        Instruction::ldnull(),
        Instruction::call(selector_placeholder(MODEL, "System.String")),
    ]);
    statement
}

/// Constructor body made of the base call followed by `statements`.
pub fn ctor(statements: impl IntoIterator<Item = Instruction>) -> MethodDef {
    let mut body: Vec<Instruction> = base_ctor_call().into();
    body.extend(statements);
    body.push(Instruction::ret());
    MethodDef {
        name: ".ctor".to_owned(),
        has_this: true,
        params: vec![
            TypeRef::new("System.IObservable`1<System.Int32>"),
            TypeRef::new("System.IObservable`1<System.String>"),
        ],
        return_type: None,
        attributes: Vec::new(),
        body: body.into(),
    }
}

pub fn auto_getter(owner: &str, property: &str, value: &str) -> MethodDef {
    MethodDef {
        name: format!("get_{property}"),
        has_this: true,
        params: Vec::new(),
        return_type: Some(TypeRef::new(value)),
        attributes: Vec::new(),
        body: InstructionSequence::from(vec![
            Instruction::ldarg(0),
            Instruction::ldfld(backing_field(owner, property, value)),
            Instruction::ret(),
        ]),
    }
}

/// Debug build: the value is spilled through a local before returning.
pub fn spilling_getter(owner: &str, property: &str, value: &str) -> MethodDef {
    MethodDef {
        body: InstructionSequence::from(vec![
            Instruction::ldarg(0),
            Instruction::ldfld(backing_field(owner, property, value)),
            Instruction::stloc(0),
            Instruction::branch(OpCode::Br, 4),
            Instruction::ldloc(0),
            Instruction::ret(),
        ]),
        ..auto_getter(owner, property, value)
    }
}

fn property(name: &str, value: &str) -> PropertyDef {
    PropertyDef {
        name: name.to_owned(),
        property_type: TypeRef::new(value),
        getter: Some(format!("get_{name}")),
        setter: Some(format!("set_{name}")),
    }
}

fn backing(property: &str, value: &str) -> FieldDef {
    FieldDef {
        name: format!("<{property}>k__BackingField"),
        field_type: TypeRef::new(value),
        is_static: false,
    }
}

/// `Demo.Model : ReactiveObject` with `int Total` and `string Name`.
pub fn model(ctor: MethodDef) -> TypeDef {
    TypeDef {
        name: TypeRef::new(MODEL),
        base_type: Some(TypeRef::new("ReactiveUI.ReactiveObject")),
        interfaces: Vec::new(),
        fields: vec![
            backing("Total", "System.Int32"),
            backing("Name", "System.String"),
        ],
        properties: vec![
            property("Total", "System.Int32"),
            property("Name", "System.String"),
        ],
        methods: vec![
            ctor,
            spilling_getter(MODEL, "Total", "System.Int32"),
            auto_getter(MODEL, "Name", "System.String"),
        ],
    }
}

/// Compiler-generated closure class holding `x => x.Name`.
pub fn closure() -> TypeDef {
    TypeDef {
        name: TypeRef::new(CLOSURE),
        base_type: Some(TypeRef::new("System.Object")),
        interfaces: Vec::new(),
        fields: vec![
            FieldDef::from(&cache_field("System.String")),
            FieldDef {
                name: "<>9".to_owned(),
                field_type: TypeRef::new(CLOSURE),
                is_static: true,
            },
        ],
        properties: Vec::new(),
        methods: vec![MethodDef {
            name: "<.ctor>b__0_0".to_owned(),
            has_this: true,
            params: vec![TypeRef::new(MODEL)],
            return_type: Some(TypeRef::new("System.String")),
            attributes: Vec::new(),
            body: InstructionSequence::from(vec![
                Instruction::ldarg(1),
                Instruction::callvirt(getter(MODEL, "Name", "System.String")),
                Instruction::ret(),
            ]),
        }],
    }
}

pub fn module(types: impl IntoIterator<Item = TypeDef>) -> ModuleDef {
    ModuleDef {
        name: "Demo".to_owned(),
        types: types.into_iter().collect(),
    }
}

/// Both placeholder forms in one constructor.
pub fn view_model() -> ModuleDef {
    let mut statements = assignment_statement();
    statements.extend(selector_statement(2 + statements.len()));
    module([model(ctor(statements)), closure()])
}
