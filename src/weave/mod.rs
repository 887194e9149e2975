//! Call-site weaving for one routine.
//!
//! Each placeholder call is rewritten in place; a failure skips that call site
//! only, except a stack imbalance, which abandons the whole routine.

mod assignment;
mod getter;
pub mod patterns;
mod selector;

pub use getter::redirect_getter;

use serde::Serialize;
use tracing::{debug, warn};
use weaver_analysis::{MatchFailure, SliceError, StackEffectOracle};
use weaver_ir::{FieldRef, InstructionSequence, OpCode, TypeRef};
use weaver_rewrite::{EditError, EditPlan};

use crate::config::WeaverConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::host::{MethodDef, ModuleDef, ModuleInspector, TypeDef};

/// Everything a call-site rewrite may consult. Read-only.
#[derive(Clone, Copy)]
pub struct WeaveContext<'a> {
    pub module: &'a ModuleDef,
    pub owner: &'a TypeDef,
    pub config: &'a WeaverConfig,
    pub inspector: ModuleInspector<'a>,
}

impl<'a> WeaveContext<'a> {
    pub fn new(module: &'a ModuleDef, owner: &'a TypeDef, config: &'a WeaverConfig) -> Self {
        WeaveContext {
            module,
            owner,
            config,
            inspector: ModuleInspector::new(module),
        }
    }

    /// Helper field backing `property` on the owner type.
    fn helper_field(&self, property: &str, value: &TypeRef) -> FieldRef {
        FieldRef::new(
            self.owner.name.clone(),
            self.config.helper_field_name(property),
            self.config.helper_of(value),
        )
    }

    /// Declared type of a property of the owner, or a skip when there is none.
    fn property_type(&self, property: &str) -> Result<TypeRef, SiteError> {
        self.owner
            .property(property)
            .map(|def| def.property_type.clone())
            .ok_or_else(|| {
                SiteError::skip(
                    DiagnosticKind::UnsupportedShape,
                    format!("`{property}` is not a property of {}", self.owner.name),
                )
            })
    }
}

/// A property turned into an observable-backed one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct WovenProperty {
    pub owner: TypeRef,
    pub name: String,
    pub value_type: TypeRef,
    pub field: FieldRef,
}

/// Result of one successful call-site rewrite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rewrite {
    pub property: WovenProperty,
    /// First index after the inserted replacement.
    pub resume_at: usize,
    pub storage: Vec<FieldRef>,
    pub unused_fields: Vec<FieldRef>,
}

impl Rewrite {
    fn new(property: WovenProperty, plan: &EditPlan, unused_fields: Vec<FieldRef>) -> Self {
        let start = plan.edits.iter().map(|edit| edit.position()).min().unwrap_or(0);
        Rewrite {
            resume_at: start + plan.inserted_len(),
            storage: plan.required_storage.clone(),
            property,
            unused_fields,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SiteError {
    /// Leave the call site alone and report why.
    Skip {
        kind: DiagnosticKind,
        message: String,
    },
    /// Abandon the routine.
    Fatal(EditError),
}

impl SiteError {
    pub fn skip(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        SiteError::Skip {
            kind,
            message: message.into(),
        }
    }

    fn mismatch(failure: MatchFailure) -> Self {
        let kind = match failure {
            MatchFailure::PatternMismatch { .. } => DiagnosticKind::PatternMismatch,
            MatchFailure::UnresolvedOperand { .. } => DiagnosticKind::UnresolvedOperand,
        };
        SiteError::skip(kind, failure.to_string())
    }
}

impl From<EditError> for SiteError {
    fn from(error: EditError) -> Self {
        if error.is_fatal() {
            SiteError::Fatal(error)
        } else {
            SiteError::skip(DiagnosticKind::Edit, error.to_string())
        }
    }
}

impl From<SliceError> for SiteError {
    fn from(error: SliceError) -> Self {
        SiteError::skip(DiagnosticKind::Edit, error.to_string())
    }
}

/// What weaving one routine produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutineOutcome {
    /// The rewritten body; equal to the original unless `changed`.
    pub body: InstructionSequence,
    pub changed: bool,
    pub woven: Vec<WovenProperty>,
    pub storage: Vec<FieldRef>,
    pub unused_fields: Vec<FieldRef>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrite every placeholder call in `method`, working on a copy of its body.
pub fn weave_routine(cx: &WeaveContext<'_>, method: &MethodDef) -> RoutineOutcome {
    let routine = cx.owner.routine_name(method);
    let oracle = StackEffectOracle::from_operands(method.returns_value());
    let mut outcome = RoutineOutcome {
        body: method.body.clone(),
        ..RoutineOutcome::default()
    };

    let mut cursor = 0;
    while cursor < outcome.body.len() {
        let instruction = &outcome.body[cursor];
        let assigns = match instruction.operand.as_method() {
            Some(callee) if instruction.op == OpCode::Call && cx.config.is_placeholder(callee) => {
                callee.returns_value()
            }
            _ => {
                cursor += 1;
                continue;
            }
        };

        let result = if assigns {
            assignment::rewrite(cx, &mut outcome.body, cursor, &oracle)
        } else {
            selector::rewrite(cx, &mut outcome.body, cursor, &oracle)
        };
        match result {
            Ok(rewrite) => {
                debug!(
                    routine = %routine,
                    property = %rewrite.property.name,
                    at = cursor,
                    "rewrote placeholder call"
                );
                cursor = rewrite.resume_at;
                outcome.changed = true;
                outcome.woven.push(rewrite.property);
                outcome.storage.extend(rewrite.storage);
                outcome.unused_fields.extend(rewrite.unused_fields);
            }
            Err(SiteError::Skip { kind, message }) => {
                warn!(routine = %routine, at = cursor, %kind, "{message}");
                outcome.diagnostics.push(Diagnostic::warning(
                    routine.clone(),
                    kind,
                    format!("call site at {cursor} skipped: {message}"),
                ));
                cursor += 1;
            }
            Err(SiteError::Fatal(error)) => {
                warn!(routine = %routine, "{error}");
                let mut diagnostics = outcome.diagnostics;
                diagnostics.push(Diagnostic::error(
                    routine,
                    DiagnosticKind::StackImbalance,
                    format!("{error}; routine left unmodified"),
                ));
                return RoutineOutcome {
                    body: method.body.clone(),
                    diagnostics,
                    ..RoutineOutcome::default()
                };
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_imbalance_is_fatal() {
        let fatal = SiteError::from(EditError::stack_imbalance(0, 1));
        assert!(matches!(fatal, SiteError::Fatal(_)));

        let skipped = SiteError::from(EditError::non_contiguous(4));
        assert_eq!(
            skipped,
            SiteError::skip(
                DiagnosticKind::Edit,
                "Deletion set is not contiguous: index 4 is missing"
            )
        );
    }

    #[test]
    fn mismatch_kind_follows_failure() {
        let failure = MatchFailure::PatternMismatch {
            pattern: "assignment",
            element: 1,
            index: Some(3),
        };
        assert!(matches!(
            SiteError::mismatch(failure),
            SiteError::Skip {
                kind: DiagnosticKind::PatternMismatch,
                ..
            }
        ));
    }
}
