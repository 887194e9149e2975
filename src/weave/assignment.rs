//! `Prop = source.ToFodyProperty(defer, scheduler)`.
//!
//! ```text
//! ldarg 0; <source>; <defer>; <scheduler>; call ToFodyProperty; call set_Prop
//! ```
//! becomes
//! ```text
//! ldarg 0; <source>; ldarg 0; ldstr "Prop"; <defer>; <scheduler>;
//! call ToProperty; stfld $Prop
//! ```

use weaver_analysis::{Matcher, StackEffectOracle, slice};
use weaver_ir::{Instruction, InstructionSequence};
use weaver_rewrite::{Planner, ReplacementTemplate, TemplatePart, apply};

use super::getter;
use super::patterns::ASSIGNMENT;
use super::{Rewrite, SiteError, WeaveContext, WovenProperty};
use crate::diagnostic::DiagnosticKind;

/// Operands of the placeholder: source, defer flag, scheduler.
const PLACEHOLDER_OPERANDS: usize = 3;

pub(super) fn rewrite(
    cx: &WeaveContext<'_>,
    body: &mut InstructionSequence,
    anchor: usize,
    oracle: &StackEffectOracle<'_>,
) -> Result<Rewrite, SiteError> {
    let matched = Matcher::new(&cx.inspector).match_at(body, anchor, &ASSIGNMENT);
    if let Some(failure) = matched.failure {
        return Err(SiteError::mismatch(failure));
    }
    let property = matched
        .name(0)
        .ok_or_else(|| SiteError::skip(DiagnosticKind::UnresolvedOperand, "setter names no property"))?
        .to_owned();
    let setter_index = matched.range.end - 1;

    let setter = slice(body, setter_index, oracle)?;
    if !setter.is_exact() {
        return Err(SiteError::skip(
            DiagnosticKind::SliceApproximation,
            format!("operands of the `{property}` setter are not straight-line code"),
        ));
    }
    let root = &setter.root;

    let setter_owner = root
        .instruction
        .operand
        .as_method()
        .map(|method| &method.declaring_type);
    if setter_owner != Some(&cx.owner.name) {
        return Err(SiteError::skip(
            DiagnosticKind::UnsupportedShape,
            format!("`{property}` is not set on {}", cx.owner.name),
        ));
    }
    match root.child(&[0]) {
        Some(receiver) if receiver.instruction.loads_argument(0) && receiver.children.is_empty() => {}
        _ => {
            return Err(SiteError::skip(
                DiagnosticKind::UnsupportedShape,
                format!("`{property}` is set on an object other than `this`"),
            ));
        }
    }
    match root.child(&[1]) {
        Some(call) if call.index == anchor && call.children.len() == PLACEHOLDER_OPERANDS => {}
        _ => {
            return Err(SiteError::skip(
                DiagnosticKind::UnsupportedShape,
                format!("`{property}` is not assigned the placeholder result directly"),
            ));
        }
    }

    let value_type = cx.property_type(&property)?;
    getter::check_redirectable(cx, &property)?;
    let field = cx.helper_field(&property, &value_type);
    let template = ReplacementTemplate::new([
        TemplatePart::operand(0, [0]),
        TemplatePart::operand(0, [1, 0]),
        TemplatePart::Emit(Instruction::ldarg(0)),
        TemplatePart::LoadName(0),
        TemplatePart::operand(0, [1, 1]),
        TemplatePart::operand(0, [1, 2]),
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
        name: property,
        value_type,
        field,
    };
    Ok(Rewrite::new(woven, &plan, Vec::new()))
}
