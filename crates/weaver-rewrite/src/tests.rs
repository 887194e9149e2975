//! Tests for planning and applying rewrites

use insta::assert_snapshot;
use weaver_analysis::{
    ConventionInspector, Matcher, Pattern, PatternElement, StackEffectOracle, predicates, slice,
};
use weaver_ir::{FieldRef, Instruction, InstructionSequence, MethodRef, OpCode, listing};

use crate::{Edit, EditErrorKind, EditPlan, Planner, ReplacementTemplate, TemplatePart, apply};

fn binary(name: &str) -> MethodRef {
    MethodRef::new("Demo.Math", name)
        .params(["System.Int32", "System.Int32"])
        .returns("System.Int32")
}

fn set_total() -> MethodRef {
    MethodRef::new("Demo.Model", "set_Total")
        .instance()
        .params(["System.Int32"])
}

fn total_field() -> FieldRef {
    FieldRef::new("Demo.Model", "$Total", "System.Int32")
}

/// `this.Total = Math.Add(1, 2); return;`
fn setter_body() -> InstructionSequence {
    InstructionSequence::from(vec![
        Instruction::ldarg(0),
        Instruction::ldc_i4(1),
        Instruction::ldc_i4(2),
        Instruction::call(binary("Add")),
        Instruction::call(set_total()),
        Instruction::ret(),
    ])
}

fn call_then_setter() -> Pattern {
    Pattern::forward(
        "call-then-setter",
        [
            PatternElement::new(&[OpCode::Call]).capture(),
            PatternElement::new(&[OpCode::Call, OpCode::Callvirt])
                .capture()
                .named(predicates::accessor_name),
        ],
    )
}

fn oracle() -> StackEffectOracle<'static> {
    StackEffectOracle::from_operands(false)
}

fn store_template(with_store: bool) -> ReplacementTemplate {
    let mut parts = vec![
        TemplatePart::operand(0, [0]),
        TemplatePart::operand(0, [1, 0]),
        TemplatePart::operand(0, [1, 1]),
        TemplatePart::Emit(Instruction::call(binary("Mul"))),
    ];
    if with_store {
        parts.push(TemplatePart::Emit(Instruction::stfld(total_field())));
    }
    ReplacementTemplate::new(parts).with_storage(total_field())
}

fn plan_store(seq: &InstructionSequence, template: &ReplacementTemplate) -> crate::EditResult<EditPlan> {
    let matched = Matcher::new(&ConventionInspector).match_at(seq, 3, &call_then_setter());
    assert!(matched.is_match());
    assert_eq!(matched.names.as_slice(), ["Total"]);
    let oracle = oracle();
    let setter = slice(seq, 4, &oracle).unwrap();
    Planner::new(seq, &oracle).plan(&matched, &[&setter.root], template)
}

#[test]
fn plan_and_apply_store_rewrite() {
    let mut seq = setter_body();
    let plan = plan_store(&seq, &store_template(true)).unwrap();
    assert_eq!(plan.required_storage, vec![total_field()]);
    assert_eq!(plan.removed_len(), 5);
    assert_eq!(plan.inserted_len(), 5);

    apply(&mut seq, &plan).unwrap();
    assert_snapshot!(listing(&seq), @r"
    0000: ldarg 0
    0001: ldc.i4 1
    0002: ldc.i4 2
    0003: call Demo.Math::Mul
    0004: stfld Demo.Model::$Total
    0005: ret
    ");
}

#[test]
fn unbalanced_template_is_rejected() {
    let seq = setter_body();
    let err = plan_store(&seq, &store_template(false)).unwrap_err();
    assert_eq!(
        err.kind(),
        &EditErrorKind::StackImbalance {
            declared: 0,
            actual: 2
        }
    );
    assert!(err.is_fatal());
}

#[test]
fn declared_delta_requires_storage() {
    let seq = setter_body();
    let mut template = store_template(false).with_delta(2);
    assert!(plan_store(&seq, &template).is_ok());

    template.new_storage.clear();
    let err = plan_store(&seq, &template).unwrap_err();
    assert_eq!(err.kind(), &EditErrorKind::UnregisteredStorage { declared: 2 });
    assert!(!err.is_fatal());
}

#[test]
fn non_contiguous_deletion_is_rejected() {
    let seq = setter_body();
    let ret = Pattern::forward("ret", [PatternElement::new(&[OpCode::Ret])]);
    let matched = Matcher::new(&ConventionInspector).match_at(&seq, 5, &ret);
    let oracle = oracle();
    let add = slice(&seq, 3, &oracle).unwrap();
    let err = Planner::new(&seq, &oracle)
        .plan(&matched, &[&add.root], &ReplacementTemplate::default())
        .unwrap_err();
    assert_eq!(err.kind(), &EditErrorKind::NonContiguous { gap: 4 });
}

#[test]
fn failed_match_cannot_be_planned() {
    let seq = setter_body();
    let matched = Matcher::new(&ConventionInspector).match_at(&seq, 0, &call_then_setter());
    let oracle = oracle();
    let err = Planner::new(&seq, &oracle)
        .plan(&matched, &[], &ReplacementTemplate::default())
        .unwrap_err();
    assert!(matches!(err.kind(), EditErrorKind::Unmatched(_)));
}

#[test]
fn missing_template_operand() {
    let seq = setter_body();
    let template = ReplacementTemplate::new([TemplatePart::operand(0, [3])]);
    let err = plan_store(&seq, &template).unwrap_err();
    assert_eq!(err.to_string(), "Template operand [3] of block 0 does not exist");
}

#[test]
fn stale_blocks_are_rejected_at_planning() {
    let original = setter_body();
    let oracle = oracle();
    let setter = slice(&original, 4, &oracle).unwrap();
    let matched = Matcher::new(&ConventionInspector).match_at(&original, 3, &call_then_setter());

    let mut changed = original.clone();
    changed
        .replace_range(1, 1, vec![Instruction::ldc_i4(9)])
        .unwrap();
    let err = Planner::new(&changed, &oracle)
        .plan(&matched, &[&setter.root], &store_template(true))
        .unwrap_err();
    assert_eq!(err.kind(), &EditErrorKind::Stale { at: 1 });
}

#[test]
fn stale_plan_leaves_sequence_untouched() {
    let original = setter_body();
    let plan = plan_store(&original, &store_template(true)).unwrap();

    let mut changed = original.clone();
    changed
        .replace_range(2, 1, vec![Instruction::ldc_i4(7)])
        .unwrap();
    let before = changed.clone();
    let err = apply(&mut changed, &plan).unwrap_err();
    assert_eq!(err.kind(), &EditErrorKind::Stale { at: 0 });
    assert_eq!(changed, before);
}

#[test]
fn failure_in_an_earlier_group_rolls_back_later_ones() {
    let mut seq = setter_body();
    let before = seq.clone();
    let plan = EditPlan {
        edits: vec![
            Edit::Delete {
                start: 0,
                removed: vec![Instruction::ldarg(1)],
            },
            Edit::Insert {
                at: 5,
                instructions: vec![Instruction::simple(OpCode::Nop)],
            },
        ],
        required_storage: Vec::new(),
    };
    assert!(apply(&mut seq, &plan).is_err());
    assert_eq!(seq, before);
}

#[test]
fn overlapping_edits_are_rejected() {
    let mut seq = setter_body();
    let plan = EditPlan {
        edits: vec![
            Edit::Delete {
                start: 0,
                removed: seq.slice(0..3).unwrap().to_vec(),
            },
            Edit::Insert {
                at: 1,
                instructions: vec![Instruction::simple(OpCode::Nop)],
            },
        ],
        required_storage: Vec::new(),
    };
    let err = apply(&mut seq, &plan).unwrap_err();
    assert_eq!(err.kind(), &EditErrorKind::Overlap { at: 1 });
}

#[test]
fn dangling_branch_aborts_application() {
    let mut seq = InstructionSequence::from(vec![
        Instruction::branch(OpCode::Br, 2),
        Instruction::simple(OpCode::Nop),
        Instruction::simple(OpCode::Nop),
        Instruction::ret(),
    ]);
    let before = seq.clone();
    let plan = EditPlan {
        edits: vec![Edit::Delete {
            start: 1,
            removed: seq.slice(1..3).unwrap().to_vec(),
        }],
        required_storage: Vec::new(),
    };
    let err = apply(&mut seq, &plan).unwrap_err();
    assert!(matches!(err.kind(), EditErrorKind::Sequence(_)));
    assert_eq!(seq, before);
}

#[test]
fn invert_restores_original() {
    let original = setter_body();
    let plan = plan_store(&original, &store_template(true)).unwrap();
    let mut seq = original.clone();
    apply(&mut seq, &plan).unwrap();
    apply(&mut seq, &plan.invert().unwrap()).unwrap();
    assert_eq!(seq, original);
}

#[test]
fn invert_positions_account_for_earlier_groups() {
    let original = InstructionSequence::from(vec![
        Instruction::simple(OpCode::Nop),
        Instruction::ldc_i4(1),
        Instruction::simple(OpCode::Pop),
        Instruction::ret(),
    ]);
    let plan = EditPlan {
        edits: vec![
            Edit::Insert {
                at: 0,
                instructions: vec![Instruction::simple(OpCode::Nop); 2],
            },
            Edit::Delete {
                start: 1,
                removed: original.slice(1..3).unwrap().to_vec(),
            },
        ],
        required_storage: Vec::new(),
    };
    let inverse = plan.invert().unwrap();
    assert_eq!(
        inverse.edits,
        vec![
            Edit::Delete {
                start: 0,
                removed: vec![Instruction::simple(OpCode::Nop); 2],
            },
            Edit::Insert {
                at: 3,
                instructions: original.slice(1..3).unwrap().to_vec(),
            },
        ]
    );
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    const ALPHABET: &[OpCode] = &[OpCode::Nop, OpCode::Dup, OpCode::Pop, OpCode::Add, OpCode::Ret];

    fn body() -> impl Strategy<Value = Vec<OpCode>> {
        prop::collection::vec(prop::sample::select(ALPHABET), 0..16)
    }

    fn shape() -> impl Strategy<Value = Vec<(usize, usize, usize)>> {
        prop::collection::vec((0usize..3, 0usize..3, 0usize..3), 0..5)
    }

    fn build_plan(seq: &InstructionSequence, shape: &[(usize, usize, usize)]) -> EditPlan {
        let mut edits = Vec::new();
        let mut cursor = 0;
        for (i, &(gap, delete, insert)) in shape.iter().enumerate() {
            let start = cursor + gap;
            if start > seq.len() {
                break;
            }
            let delete = delete.min(seq.len() - start);
            if delete > 0 {
                edits.push(Edit::Delete {
                    start,
                    removed: seq.slice(start..start + delete).unwrap().to_vec(),
                });
            }
            if insert > 0 {
                edits.push(Edit::Insert {
                    at: start,
                    instructions: vec![Instruction::ldc_i4(i as i32); insert],
                });
            }
            cursor = start + delete + 1;
        }
        EditPlan {
            edits,
            required_storage: Vec::new(),
        }
    }

    proptest! {
        #[test]
        fn apply_then_invert_round_trips(ops in body(), shape in shape()) {
            let original: InstructionSequence = ops.into_iter().map(Instruction::simple).collect();
            let plan = build_plan(&original, &shape);

            let mut seq = original.clone();
            apply(&mut seq, &plan).unwrap();
            prop_assert_eq!(
                seq.len(),
                original.len() + plan.inserted_len() - plan.removed_len()
            );
            apply(&mut seq, &plan.invert().unwrap()).unwrap();
            prop_assert_eq!(seq, original);
        }
    }
}
