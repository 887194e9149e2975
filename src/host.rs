//! Host module model.
//!
//! A minimal, serde-loadable picture of a compiled module: types with their
//! fields, properties and method bodies. Closure classes generated for lambdas
//! are ordinary types here (`Demo.Model/<>c`).

use serde::{Deserialize, Serialize};
use weaver_analysis::{ConventionInspector, OperandInspector};
use weaver_ir::{FieldRef, InstructionSequence, MethodRef, TypeRef};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDef {
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: TypeRef,
    #[serde(default)]
    pub base_type: Option<TypeRef>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: TypeRef,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub property_type: TypeRef,
    /// Name of the getter method, usually `get_{name}`.
    #[serde(default)]
    pub getter: Option<String>,
    #[serde(default)]
    pub setter: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub attribute_type: TypeRef,
    #[serde(default)]
    pub arguments: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    #[serde(default = "default_true")]
    pub has_this: bool,
    #[serde(default)]
    pub params: Vec<TypeRef>,
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    #[serde(default)]
    pub body: InstructionSequence,
}

fn default_true() -> bool {
    true
}

impl ModuleDef {
    pub fn find_type(&self, name: &TypeRef) -> Option<&TypeDef> {
        self.types.iter().find(|ty| &ty.name == name)
    }

    /// Definition behind a method reference, matched by owner, name and arity.
    pub fn find_method(&self, method: &MethodRef) -> Option<&MethodDef> {
        self.find_type(&method.declaring_type)?
            .methods
            .iter()
            .find(|def| def.name == method.name && def.params.len() == method.params.len())
    }

    /// Does `ty` implement `interface` or derive from `base`, directly or through
    /// base types defined in this module?
    pub fn is_reactive(&self, ty: &TypeDef, interface: &TypeRef, base: &TypeRef) -> bool {
        let mut current = Some(ty);
        // Bounded by the type count so a malformed cycle terminates.
        for _ in 0..=self.types.len() {
            let Some(ty) = current else {
                return false;
            };
            if ty.interfaces.contains(interface) || ty.base_type.as_ref() == Some(base) {
                return true;
            }
            current = ty.base_type.as_ref().and_then(|name| self.find_type(name));
        }
        false
    }
}

impl TypeDef {
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|property| property.name == name)
    }

    pub fn method_index(&self, name: &str) -> Option<usize> {
        self.methods.iter().position(|method| method.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }

    /// `Type::Method`, as used in diagnostics.
    pub fn routine_name(&self, method: &MethodDef) -> String {
        format!("{}::{}", self.name, method.name)
    }
}

impl FieldDef {
    pub fn reference(&self, owner: &TypeRef) -> FieldRef {
        FieldRef::new(owner.clone(), self.name.clone(), self.field_type.clone())
            .with_static(self.is_static)
    }
}

impl From<&FieldRef> for FieldDef {
    fn from(field: &FieldRef) -> Self {
        FieldDef {
            name: field.name.clone(),
            field_type: field.field_type.clone(),
            is_static: field.is_static,
        }
    }
}

impl MethodDef {
    pub fn returns_value(&self) -> bool {
        self.return_type.is_some()
    }

    pub fn reference(&self, owner: &TypeRef) -> MethodRef {
        MethodRef {
            declaring_type: owner.clone(),
            name: self.name.clone(),
            has_this: self.has_this,
            params: self.params.clone(),
            return_type: self.return_type.clone(),
            generic_args: Vec::new(),
        }
    }

    pub fn has_attribute(&self, attribute_type: &TypeRef) -> bool {
        self.attributes
            .iter()
            .any(|attribute| &attribute.attribute_type == attribute_type)
    }
}

/// Answers operand queries from the module definition, falling back to accessor
/// naming conventions for routines declared elsewhere.
#[derive(Clone, Copy, Debug)]
pub struct ModuleInspector<'m> {
    module: &'m ModuleDef,
}

impl<'m> ModuleInspector<'m> {
    pub fn new(module: &'m ModuleDef) -> Self {
        ModuleInspector { module }
    }

    fn declared_property(&self, method: &MethodRef) -> Option<Option<&'m PropertyDef>> {
        let ty = self.module.find_type(&method.declaring_type)?;
        Some(ty.properties.iter().find(|property| {
            property.getter.as_deref() == Some(method.name.as_str())
                || property.setter.as_deref() == Some(method.name.as_str())
        }))
    }
}

impl OperandInspector for ModuleInspector<'_> {
    fn is_property_getter(&self, method: &MethodRef) -> bool {
        match self.declared_property(method) {
            Some(property) => property
                .is_some_and(|property| property.getter.as_deref() == Some(method.name.as_str())),
            None => ConventionInspector.is_property_getter(method),
        }
    }

    fn property_name(&self, method: &MethodRef) -> Option<String> {
        match self.declared_property(method) {
            Some(property) => property.map(|property| property.name.clone()),
            None => ConventionInspector.property_name(method),
        }
    }

    fn method_body(&self, method: &MethodRef) -> Option<&InstructionSequence> {
        self.module.find_method(method).map(|def| &def.body)
    }
}
