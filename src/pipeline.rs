//! Weaving pipeline for a whole module.
//!
//! ```text
//! ModuleDef
//!     │
//!     ▼
//! reactive types ─► weave_routine (per method, on a working copy)
//!     │
//!     ▼
//! redirect_getter (per woven property)
//!     │
//!     ▼
//! commit ─► bodies, helper fields, generated-code attributes
//! ```
//!
//! Planning only reads the module; every change is collected first and
//! committed afterwards, so a routine that fails is never partially written.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;
use tracing::{debug, warn};
use weaver_analysis::{Slice, StackEffectOracle, slice};
use weaver_ir::{FieldRef, InstructionSequence, TypeRef, listing};

use crate::config::WeaverConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::errors::{WeaveError, WeaveResult};
use crate::host::{AttributeDef, FieldDef, ModuleDef, TypeDef};
use crate::weave::{SiteError, WeaveContext, WovenProperty, redirect_getter, weave_routine};

const GENERATED_CODE_ATTRIBUTE: &str = "System.CodeDom.Compiler.GeneratedCodeAttribute";
const NON_USER_CODE_ATTRIBUTE: &str = "System.Diagnostics.DebuggerNonUserCodeAttribute";

/// Outcome of weaving a module.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WeaveReport {
    pub woven: Vec<WovenProperty>,
    pub diagnostics: Vec<Diagnostic>,
    /// Fields that may no longer be read: delegate caches and old backing fields.
    pub unused_fields: Vec<FieldRef>,
}

impl WeaveReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Changes to one type, collected before anything is written.
#[derive(Debug, Default)]
struct TypeChanges {
    type_index: usize,
    bodies: BTreeMap<usize, InstructionSequence>,
    fields: Vec<FieldDef>,
    /// Methods to mark as generated code.
    marked: Vec<usize>,
}

/// Weave every reactive type of `module` in place.
pub fn weave(module: &mut ModuleDef, config: &WeaverConfig) -> WeaveReport {
    let mut report = WeaveReport::default();

    let changes: Vec<TypeChanges> = module
        .types
        .iter()
        .enumerate()
        .filter(|(_, ty)| {
            let reactive =
                module.is_reactive(ty, &config.reactive_interface, &config.reactive_base_type);
            if !reactive {
                debug!(ty = %ty.name, "not a reactive object, skipped");
            }
            reactive
        })
        .map(|(type_index, ty)| plan_type(module, type_index, ty, config, &mut report))
        .collect();

    for change in changes {
        commit(&mut module.types[change.type_index], change, config);
    }
    dedup(&mut report.unused_fields);
    report
}

fn plan_type(
    module: &ModuleDef,
    type_index: usize,
    ty: &TypeDef,
    config: &WeaverConfig,
    report: &mut WeaveReport,
) -> TypeChanges {
    let cx = WeaveContext::new(module, ty, config);
    let mut changes = TypeChanges {
        type_index,
        ..TypeChanges::default()
    };
    let mut woven: Vec<WovenProperty> = Vec::new();

    for (method_index, method) in ty.methods.iter().enumerate() {
        if method.body.is_empty() {
            continue;
        }
        let outcome = weave_routine(&cx, method);
        report.diagnostics.extend(outcome.diagnostics);
        if !outcome.changed {
            continue;
        }
        changes.bodies.insert(method_index, outcome.body);
        for field in &outcome.storage {
            if !ty.has_field(&field.name) && !changes.fields.iter().any(|def| def.name == field.name) {
                changes.fields.push(FieldDef::from(field));
            }
        }
        report.unused_fields.extend(outcome.unused_fields);
        for property in outcome.woven {
            if !woven.iter().any(|seen| seen.name == property.name) {
                woven.push(property);
            }
        }
    }

    for property in &woven {
        redirect_property(&cx, property, &mut changes, report);
    }
    report.woven.extend(woven);
    changes
}

/// Call sites were only rewritten after checking the getter, so failing here
/// leaves a woven property behind a stale getter and is an error.
fn redirect_property(
    cx: &WeaveContext<'_>,
    property: &WovenProperty,
    changes: &mut TypeChanges,
    report: &mut WeaveReport,
) {
    let ty = cx.owner;
    let Some(method_index) = ty
        .property(&property.name)
        .and_then(|def| def.getter.as_deref())
        .and_then(|getter| ty.method_index(getter))
    else {
        report.diagnostics.push(Diagnostic::error(
            format!("{}::{}", ty.name, property.name),
            DiagnosticKind::Getter,
            "property was woven but has no getter to redirect",
        ));
        return;
    };
    let method = &ty.methods[method_index];
    let body = changes.bodies.get(&method_index).unwrap_or(&method.body);

    match redirect_getter(cx, body, property) {
        Ok((body, backing)) => {
            debug!(routine = %ty.routine_name(method), "redirected getter");
            changes.bodies.insert(method_index, body);
            report.unused_fields.extend(backing);
            if cx.config.mark_generated_code {
                changes.marked.push(method_index);
            }
        }
        Err(error) => {
            let (kind, message) = match error {
                SiteError::Skip { kind, message } => (kind, message),
                SiteError::Fatal(error) => (DiagnosticKind::StackImbalance, error.to_string()),
            };
            warn!(routine = %ty.routine_name(method), "{message}");
            report.diagnostics.push(Diagnostic::error(
                ty.routine_name(method),
                kind,
                format!("{message}; the getter no longer reflects the woven property"),
            ));
        }
    }
}

fn commit(ty: &mut TypeDef, changes: TypeChanges, config: &WeaverConfig) {
    for (method_index, body) in changes.bodies {
        ty.methods[method_index].body = body;
    }
    for method_index in changes.marked {
        mark_generated(&mut ty.methods[method_index].attributes, config);
    }
    ty.fields.extend(changes.fields);
}

fn mark_generated(attributes: &mut Vec<AttributeDef>, config: &WeaverConfig) {
    let generated = TypeRef::new(GENERATED_CODE_ATTRIBUTE);
    let non_user = TypeRef::new(NON_USER_CODE_ATTRIBUTE);
    if !attributes.iter().any(|attribute| attribute.attribute_type == generated) {
        attributes.push(AttributeDef {
            attribute_type: generated,
            arguments: vec![config.generator_name.clone(), config.generator_version.clone()],
        });
    }
    if !attributes.iter().any(|attribute| attribute.attribute_type == non_user) {
        attributes.push(AttributeDef {
            attribute_type: non_user,
            arguments: Vec::new(),
        });
    }
}

fn dedup(fields: &mut Vec<FieldRef>) {
    let mut seen = Vec::with_capacity(fields.len());
    fields.retain(|field| {
        if seen.contains(field) {
            false
        } else {
            seen.push(field.clone());
            true
        }
    });
}

/// Dependency tree of instruction `index` in the routine `Type::Method`.
pub fn slice_method(module: &ModuleDef, path: &str, index: usize) -> WeaveResult<Slice> {
    let (type_name, method_name) = path
        .rsplit_once("::")
        .ok_or_else(|| WeaveError::invalid_method_path(path))?;
    let method = module
        .find_type(&TypeRef::new(type_name))
        .and_then(|ty| ty.methods.iter().find(|method| method.name == method_name))
        .ok_or_else(|| WeaveError::unknown_method(path))?;
    let oracle = StackEffectOracle::from_operands(method.returns_value());
    Ok(slice(&method.body, index, &oracle)?)
}

/// Listing of every routine with a body, headed by its name.
pub fn dump(module: &ModuleDef) -> String {
    let mut out = String::new();
    for ty in &module.types {
        for method in ty.methods.iter().filter(|method| !method.body.is_empty()) {
            let _ = writeln!(out, "{}:\n{}", ty.routine_name(method), listing(&method.body));
        }
    }
    out
}
