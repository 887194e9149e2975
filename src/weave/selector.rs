//! `source.ToFodyProperty(this, x => x.Prop, defer, scheduler)`.
//!
//! The selector argument is the compiler's cached-delegate idiom, whose branch
//! defeats slicing. It is first collapsed to `ldnull`, which leaves the stack
//! unchanged and the call operands straight-line; the call is then rebuilt as
//!
//! ```text
//! ldarg 0; <source>; ldarg 0; ldstr "Prop"; <defer>; <scheduler>;
//! call ToProperty; stfld $Prop
//! ```
//!
//! If the second step fails the collapse is undone.

use tracing::debug;
use weaver_analysis::{
    MatchFailure, MatchResult, Matcher, OperandInspector, StackEffectOracle, slice,
};
use weaver_ir::{FieldRef, Instruction, InstructionSequence, OpCode};
use weaver_rewrite::{EditPlan, Planner, ReplacementTemplate, TemplatePart, apply};

use super::getter;
use super::patterns::{CACHED_DELEGATE, PLACEHOLDER_CALL};
use super::{Rewrite, SiteError, WeaveContext, WovenProperty};
use crate::diagnostic::DiagnosticKind;

/// Operands of the placeholder: source, owner, selector, defer flag, scheduler.
const PLACEHOLDER_OPERANDS: usize = 5;

pub(super) fn rewrite(
    cx: &WeaveContext<'_>,
    body: &mut InstructionSequence,
    anchor: usize,
    oracle: &StackEffectOracle<'_>,
) -> Result<Rewrite, SiteError> {
    let arity = body[anchor]
        .operand
        .as_method()
        .map_or(0, |method| method.params.len());
    if arity != PLACEHOLDER_OPERANDS {
        return Err(SiteError::skip(
            DiagnosticKind::UnsupportedShape,
            format!("placeholder overload with {arity} parameters is not rewritten"),
        ));
    }

    let delegate = find_cached_delegate(cx, body, anchor)?;
    let property = delegate
        .name(0)
        .ok_or_else(|| SiteError::skip(DiagnosticKind::UnresolvedOperand, "selector names no property"))?
        .to_owned();
    let cache = captured_field(&delegate, 2).cloned();
    getter::check_redirectable(cx, &property)?;

    let collapse = ReplacementTemplate::new([TemplatePart::Emit(Instruction::ldnull())]);
    let collapse = Planner::new(body, oracle).plan(&delegate, &[], &collapse)?;
    apply(body, &collapse)?;
    let call_index = anchor + 1 - delegate.range.len();
    let selector_index = delegate.range.start;
    debug!(range = ?delegate.range, property = %property, "collapsed selector delegate");

    match rebuild_call(cx, body, call_index, selector_index, oracle, &property) {
        Ok((woven, plan)) => Ok(Rewrite::new(woven, &plan, cache.into_iter().collect())),
        Err(error) => {
            apply(body, &collapse.invert()?)?;
            Err(error)
        }
    }
}

/// Nearest cached-delegate idiom ending before the call.
fn find_cached_delegate(
    cx: &WeaveContext<'_>,
    body: &InstructionSequence,
    anchor: usize,
) -> Result<MatchResult, SiteError> {
    let matcher = Matcher::new(&cx.inspector);
    let mut last_failure: Option<MatchFailure> = None;

    for store in (0..anchor).rev() {
        if body[store].op != OpCode::Stsfld {
            continue;
        }
        let matched = matcher.match_at(body, store, &CACHED_DELEGATE);
        if let Some(failure) = matched.failure {
            last_failure = Some(failure);
            continue;
        }
        check_cache_idiom(&cx.inspector, &matched)?;
        return Ok(matched);
    }

    Err(match last_failure {
        Some(failure) => SiteError::mismatch(failure),
        None => SiteError::skip(
            DiagnosticKind::PatternMismatch,
            "no property selector delegate precedes the call",
        ),
    })
}

/// The load and the store must target the same cache, and the branch must skip
/// exactly the initialization.
fn check_cache_idiom(
    inspector: &dyn OperandInspector,
    matched: &MatchResult,
) -> Result<(), SiteError> {
    let same_cache = match (captured_field(matched, 0), captured_field(matched, 2)) {
        (Some(load), Some(store)) => inspector.same_storage(load, store),
        _ => false,
    };
    let branch_target = matched
        .capture(1)
        .and_then(|branch| branch.instruction.target());
    if !same_cache || branch_target != Some(matched.range.end) {
        return Err(SiteError::skip(
            DiagnosticKind::UnsupportedShape,
            "selector delegate is not a cached lambda",
        ));
    }
    Ok(())
}

fn captured_field(matched: &MatchResult, n: usize) -> Option<&FieldRef> {
    matched
        .capture(n)
        .and_then(|capture| capture.instruction.operand.as_field())
}

fn rebuild_call(
    cx: &WeaveContext<'_>,
    body: &mut InstructionSequence,
    call_index: usize,
    selector_index: usize,
    oracle: &StackEffectOracle<'_>,
    property: &str,
) -> Result<(WovenProperty, EditPlan), SiteError> {
    let matched = Matcher::new(&cx.inspector).match_at(body, call_index, &PLACEHOLDER_CALL);
    if let Some(failure) = matched.failure {
        return Err(SiteError::mismatch(failure));
    }

    let call = slice(body, call_index, oracle)?;
    if !call.is_exact() {
        return Err(SiteError::skip(
            DiagnosticKind::SliceApproximation,
            format!("operands of the `{property}` placeholder are not straight-line code"),
        ));
    }
    let root = &call.root;
    if root.children.len() != PLACEHOLDER_OPERANDS {
        return Err(SiteError::skip(
            DiagnosticKind::UnsupportedShape,
            format!("placeholder for `{property}` has {} operands", root.children.len()),
        ));
    }
    let owner_is_this = root
        .child(&[1])
        .is_some_and(|owner| owner.instruction.loads_argument(0) && owner.children.is_empty());
    if !owner_is_this {
        return Err(SiteError::skip(
            DiagnosticKind::UnsupportedShape,
            format!("`{property}` is bound to an object other than `this`"),
        ));
    }

    // The collapsed delegate must be the selector argument of this very call.
    let selector_is_collapsed = root.child(&[2]).is_some_and(|selector| {
        selector.index == selector_index
            && selector.instruction.op == OpCode::Ldnull
            && selector.children.is_empty()
    });
    if !selector_is_collapsed {
        return Err(SiteError::skip(
            DiagnosticKind::UnsupportedShape,
            format!("the `{property}` delegate is not the selector of this placeholder call"),
        ));
    }

    let value_type = cx.property_type(property)?;
    let field = cx.helper_field(property, &value_type);
    let template = ReplacementTemplate::new([
        TemplatePart::Emit(Instruction::ldarg(0)),
        TemplatePart::operand(0, [0]),
        TemplatePart::operand(0, [1]),
        TemplatePart::Emit(Instruction::ldstr(property)),
        TemplatePart::operand(0, [3]),
        TemplatePart::operand(0, [4]),
        TemplatePart::Emit(Instruction::call(
            cx.config.creation_method(&cx.owner.name, &value_type),
        )),
        TemplatePart::Emit(Instruction::stfld(field.clone())),
    ])
    .with_storage(field.clone());

    let plan = Planner::new(body, oracle).plan(&matched, &[root], &template)?;
    apply(body, &plan)?;

    let woven = WovenProperty {
        owner: cx.owner.name.clone(),
        name: property.to_owned(),
        value_type,
        field,
    };
    Ok((woven, plan))
}
