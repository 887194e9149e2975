//! Redirect an auto-property getter to its observable helper.

use weaver_analysis::{MatchResult, Matcher, StackEffectOracle};
use weaver_ir::{FieldRef, Instruction, InstructionSequence};
use weaver_rewrite::{Planner, ReplacementTemplate, TemplatePart, apply};

use super::patterns::AUTO_GETTER;
use super::{SiteError, WeaveContext, WovenProperty};
use crate::diagnostic::DiagnosticKind;

/// Rewrite `ldarg 0; ldfld backing; ret` into
/// `ldarg 0; ldfld $Prop; callvirt Helper<T>::get_Value; ret`.
///
/// Returns the new body and the backing field it no longer reads.
pub fn redirect_getter(
    cx: &WeaveContext<'_>,
    body: &InstructionSequence,
    woven: &WovenProperty,
) -> Result<(InstructionSequence, Option<FieldRef>), SiteError> {
    let matched = match_auto_getter(cx, body, &woven.name)?;
    let backing = matched
        .capture(0)
        .and_then(|load| load.instruction.operand.as_field())
        .cloned();

    let template = ReplacementTemplate::new([
        TemplatePart::Emit(Instruction::ldarg(0)),
        TemplatePart::Emit(Instruction::ldfld(woven.field.clone())),
        TemplatePart::Emit(Instruction::callvirt(
            cx.config.helper_value_getter(&woven.value_type),
        )),
        TemplatePart::Emit(Instruction::ret()),
    ]);
    let oracle = StackEffectOracle::from_operands(true);
    let plan = Planner::new(body, &oracle).plan(&matched, &[], &template)?;

    let mut rewritten = body.clone();
    apply(&mut rewritten, &plan)?;
    Ok((rewritten, backing))
}

/// The property's getter must be redirectable before any of its call sites is
/// rewritten.
pub(super) fn check_redirectable(cx: &WeaveContext<'_>, property: &str) -> Result<(), SiteError> {
    let getter = cx
        .owner
        .property(property)
        .and_then(|def| def.getter.as_deref())
        .and_then(|name| cx.owner.method_index(name))
        .map(|index| &cx.owner.methods[index])
        .ok_or_else(|| {
            SiteError::skip(
                DiagnosticKind::Getter,
                format!("`{property}` has no getter to redirect"),
            )
        })?;
    match_auto_getter(cx, &getter.body, property).map(|_| ())
}

fn match_auto_getter(
    cx: &WeaveContext<'_>,
    body: &InstructionSequence,
    property: &str,
) -> Result<MatchResult, SiteError> {
    let matched = Matcher::new(&cx.inspector).match_at(body, 0, &AUTO_GETTER);
    if let Some(failure) = &matched.failure {
        return Err(SiteError::skip(
            DiagnosticKind::Getter,
            format!("getter of `{property}` is not an auto getter: {failure}"),
        ));
    }
    if matched.range.end != body.len() {
        return Err(SiteError::skip(
            DiagnosticKind::Getter,
            format!("getter of `{property}` does more than return its backing field"),
        ));
    }
    Ok(matched)
}
